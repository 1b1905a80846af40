use crate::{
    archive::{self, Archive, Bucket, Disposition},
    config::Config,
    error::ParseError,
    grade::DefectBank,
    reconcile::{ReconcileOutcome, Reconciler},
    remote::Transport,
    report::{self, ReportRecord},
    util::now_rfc3339,
};
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info, warn};

pub struct Pipeline<T: Transport> {
    cfg: Config,
    reconciler: Reconciler<T>,
    archive: Archive,
}

/// What happened to one report file.
#[derive(Debug, Clone, Serialize)]
pub struct ReportResult {
    pub path: PathBuf,
    pub uid: String,
    pub outcome: Option<ReconcileOutcome>,
    pub disposition: Option<Disposition>,
    pub archived_to: Option<PathBuf>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub started: String,
    pub finished: String,
    pub discovered: usize,
    pub parse_failures: usize,
    pub left_in_place: usize,
    pub archive_failures: usize,
    pub outcomes: BTreeMap<String, usize>,
}

impl<T: Transport> Pipeline<T> {
    pub fn new(cfg: &Config, bank: &DefectBank, transport: T) -> Self {
        Self {
            cfg: cfg.clone(),
            reconciler: Reconciler::new(cfg, bank, transport),
            archive: Archive::new(cfg),
        }
    }

    /// Report files waiting in the reports directory, sorted by path.
    pub fn discover(&self) -> Result<Vec<PathBuf>> {
        let dir = glob::Pattern::escape(&self.cfg.paths.reports_dir);
        let pattern = Path::new(&dir).join(&self.cfg.paths.report_pattern);
        let pattern = pattern.to_string_lossy();
        let mut reports: Vec<PathBuf> = glob::glob(&pattern)
            .with_context(|| format!("bad report pattern: {pattern}"))?
            .filter_map(|entry| match entry {
                Ok(p) if p.is_file() => Some(p),
                Ok(_) => None,
                Err(err) => {
                    warn!("skipping unreadable report path: {err}");
                    None
                }
            })
            .collect();
        reports.sort();
        Ok(reports)
    }

    pub fn run_batch(&self) -> Result<BatchSummary> {
        let mut summary = BatchSummary {
            started: now_rfc3339(),
            ..Default::default()
        };

        self.archive.ensure_dirs()?;
        let reports = self.discover()?;
        summary.discovered = reports.len();
        if reports.is_empty() {
            info!("no reports found in {}", self.cfg.paths.reports_dir);
        } else {
            info!("{} new report(s) found", reports.len());
        }

        for path in &reports {
            let result = self.process_report(path);
            match (&result.outcome, &result.disposition) {
                (None, _) => summary.parse_failures += 1,
                (Some(outcome), disposition) => {
                    *summary.outcomes.entry(outcome.label().to_string()).or_default() += 1;
                    if matches!(disposition, Some(Disposition::Leave)) {
                        summary.left_in_place += 1;
                    }
                }
            }
            if result.outcome.is_some() && result.error.is_some() {
                summary.archive_failures += 1;
            }
        }

        summary.finished = now_rfc3339();
        Ok(summary)
    }

    /// Parse, reconcile and file one report. Never aborts the batch.
    pub fn process_report(&self, path: &Path) -> ReportResult {
        let name = display_name(path);
        let mut result = ReportResult {
            path: path.to_path_buf(),
            uid: String::new(),
            outcome: None,
            disposition: None,
            archived_to: None,
            error: None,
        };

        let record = match load_record(path) {
            Ok(r) => r,
            Err(err) => {
                error!("{name}: report skipped: {err}");
                result.error = Some(err.to_string());
                self.file_unparsable(path, &name, &mut result);
                return result;
            }
        };
        result.uid = record.uid.clone();

        let outcome = self.reconciler.reconcile(&record);
        match &outcome {
            ReconcileOutcome::TransientServerError { status, message } => warn!(
                uid = record.uid.as_str(),
                "{name}: server error [{status}]: {}",
                message.trim()
            ),
            ReconcileOutcome::ReferenceDataFailed { reason } => {
                warn!(uid = record.uid.as_str(), "{name}: needs manual follow-up: {reason}")
            }
            ReconcileOutcome::NotFound => {
                warn!(uid = record.uid.as_str(), "{name}: bad UID")
            }
            _ => {}
        }
        let age = if outcome == ReconcileOutcome::DiagnosticsPending {
            archive::report_age(path).unwrap_or_else(|err| {
                warn!("{name}: {err:#}");
                Duration::ZERO
            })
        } else {
            Duration::ZERO
        };
        let stale_after = Duration::from_secs(self.cfg.staleness.stale_after_seconds);
        let disposition = archive::route(&outcome, age, stale_after);

        match disposition {
            Disposition::Archive(bucket) => {
                let file_name = archive::archive_name(bucket, &record.uid, path);
                match self.archive.file(path, bucket, &file_name) {
                    Ok(target) => result.archived_to = Some(target),
                    Err(err) => {
                        error!(uid = record.uid.as_str(), "{name}: could not archive: {err:#}");
                        result.error = Some(format!("{err:#}"));
                    }
                }
            }
            Disposition::Leave => {
                info!(
                    uid = record.uid.as_str(),
                    "{name}: diagnostics not linked yet ({}s old); leaving for a later run",
                    age.as_secs()
                );
            }
        }

        if outcome.is_success() {
            info!(uid = record.uid.as_str(), "report {name} has completed all operations");
        }

        result.outcome = Some(outcome);
        result.disposition = Some(disposition);
        result
    }

    /// An unparsable report may still be mid-write, so it gets one staleness
    /// window before it is filed in Issues under its own name.
    fn file_unparsable(&self, path: &Path, name: &str, result: &mut ReportResult) {
        let stale_after = Duration::from_secs(self.cfg.staleness.stale_after_seconds);
        let age = match archive::report_age(path) {
            Ok(age) => age,
            Err(err) => {
                warn!("{name}: {err:#}");
                return;
            }
        };
        if age <= stale_after {
            result.disposition = Some(Disposition::Leave);
            return;
        }
        match self.archive.file(path, Bucket::Issues, name) {
            Ok(target) => {
                warn!("{name}: unparsable for {}s; filed in Issues", age.as_secs());
                result.disposition = Some(Disposition::Archive(Bucket::Issues));
                result.archived_to = Some(target);
            }
            Err(err) => error!("{name}: could not archive: {err:#}"),
        }
    }
}

fn load_record(path: &Path) -> Result<ReportRecord, ParseError> {
    let record = report::parse_report_file(path)?;
    record.validate()?;
    Ok(record)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
