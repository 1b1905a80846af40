use crate::{config::Config, reconcile::ReconcileOutcome, util::ensure_dir};
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Bucket {
    Processed,
    UidError,
    Issues,
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Disposition {
    Archive(Bucket),
    /// Leave the report where it is for a later run.
    Leave,
}

/// Where a report goes once reconciliation has finished with it.
pub fn route(outcome: &ReconcileOutcome, report_age: Duration, stale_after: Duration) -> Disposition {
    match outcome {
        ReconcileOutcome::Updated
        | ReconcileOutcome::NoChangeNeeded
        | ReconcileOutcome::ReferenceDataRecovered => Disposition::Archive(Bucket::Processed),
        ReconcileOutcome::NotFound => Disposition::Archive(Bucket::UidError),
        ReconcileOutcome::TransientServerError { .. }
        | ReconcileOutcome::ReferenceDataFailed { .. } => Disposition::Archive(Bucket::Issues),
        ReconcileOutcome::DiagnosticsPending if report_age > stale_after => {
            Disposition::Archive(Bucket::Expired)
        }
        ReconcileOutcome::DiagnosticsPending => Disposition::Leave,
    }
}

/// Time since the report was last modified. A clock that runs behind the
/// file's mtime reads as zero.
pub fn report_age(path: &Path) -> Result<Duration> {
    let modified = std::fs::metadata(path)
        .and_then(|m| m.modified())
        .with_context(|| format!("reading mtime: {}", path.display()))?;
    Ok(SystemTime::now()
        .duration_since(modified)
        .unwrap_or(Duration::ZERO))
}

pub struct Archive {
    processed: PathBuf,
    uid_error: PathBuf,
    issues: PathBuf,
    expired: PathBuf,
}

impl Archive {
    pub fn new(cfg: &Config) -> Self {
        Self {
            processed: PathBuf::from(&cfg.paths.processed_dir),
            uid_error: PathBuf::from(&cfg.paths.uid_error_dir),
            issues: PathBuf::from(&cfg.paths.issues_dir),
            expired: PathBuf::from(&cfg.paths.expired_dir),
        }
    }

    pub fn dir(&self, bucket: Bucket) -> &Path {
        match bucket {
            Bucket::Processed => &self.processed,
            Bucket::UidError => &self.uid_error,
            Bucket::Issues => &self.issues,
            Bucket::Expired => &self.expired,
        }
    }

    pub fn ensure_dirs(&self) -> Result<()> {
        for bucket in [Bucket::Processed, Bucket::UidError, Bucket::Issues, Bucket::Expired] {
            ensure_dir(self.dir(bucket))?;
        }
        Ok(())
    }

    /// Moves `report` into the bucket as `file_name`, picking `stem_1.ext`,
    /// `stem_2.ext`, ... when the name is taken. Returns the final path.
    pub fn file(&self, report: &Path, bucket: Bucket, file_name: &str) -> Result<PathBuf> {
        let dir = self.dir(bucket);
        ensure_dir(dir)?;
        let target = unique_target(dir, file_name);

        if let Err(err) = std::fs::rename(report, &target) {
            warn!(
                "rename {} -> {} failed ({err}); copying instead",
                report.display(),
                target.display()
            );
            std::fs::copy(report, &target).with_context(|| {
                format!("copying {} -> {}", report.display(), target.display())
            })?;
            std::fs::remove_file(report)
                .with_context(|| format!("removing {}", report.display()))?;
        }

        info!("archived {} -> {}", report.display(), target.display());
        Ok(target)
    }
}

/// First free path for `file_name` in `dir`.
pub fn unique_target(dir: &Path, file_name: &str) -> PathBuf {
    let candidate = dir.join(file_name);
    if !candidate.exists() {
        return candidate;
    }
    let name = Path::new(file_name);
    let stem = name
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name);
    let ext = name.extension().and_then(|s| s.to_str());
    (1u32..)
        .map(|n| match ext {
            Some(ext) => dir.join(format!("{stem}_{n}.{ext}")),
            None => dir.join(format!("{stem}_{n}")),
        })
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}

/// Archive name for a report: `<UID>.xml` where the UID identifies it,
/// otherwise the report's own filename.
pub fn archive_name(bucket: Bucket, uid: &str, report: &Path) -> String {
    let original = report
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report.xml".to_string());
    let uid = uid.trim();
    match bucket {
        Bucket::Issues => original,
        _ if uid.is_empty() || uid.contains(['/', '\\']) => original,
        _ => format!("{uid}.xml"),
    }
}
