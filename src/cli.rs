use crate::{
    archive::Archive,
    config::{Config, ConfigLoad},
    grade::{self, DefectBank},
    pipeline::Pipeline,
    remote::http::HttpTransport,
    report,
    util::ensure_dir,
};
use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "asset-grader")]
#[command(about = "Grade diagnostic reports and sync the results into the asset inventory")]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Path to config TOML. Created with defaults if missing.
    #[arg(long, default_value = "asset-grader.toml")]
    pub config: PathBuf,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the report folders, config and an empty defect rulebook.
    Init {},
    /// Process every waiting report once.
    Run {},
    /// Process reports repeatedly, sleeping `poll.interval_seconds` between passes.
    Watch {},
    /// Print the record extracted from one report.
    Parse {
        #[arg(long)]
        input: PathBuf,
    },
    /// Grade one report offline against the defect rulebook.
    Grade {
        #[arg(long)]
        input: PathBuf,
    },
}

pub fn dispatch(args: Args) -> Result<()> {
    let loaded = Config::load_or_init(&args.config)?;
    let cfg = &loaded.config;
    let _guard = init_logging(&args, cfg)?;
    log_config_load(&args.config, &loaded);

    match &args.cmd {
        Command::Init {} => init(cfg),
        Command::Run {} => run(cfg),
        Command::Watch {} => watch(cfg),
        Command::Parse { input } => parse(input),
        Command::Grade { input } => grade_offline(cfg, input),
    }
}

fn log_config_load(path: &Path, loaded: &ConfigLoad) {
    if loaded.created {
        info!("created config file {}", path.display());
    }
    for key in &loaded.backfilled {
        info!("config key {key} was missing; filled from defaults");
    }
}

fn init_logging(args: &Args, cfg: &Config) -> Result<Option<WorkerGuard>> {
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(cfg.logging.level.as_str());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let stdout_layer = if cfg.logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer().with_target(true).boxed()
    };

    let (file_layer, guard) = match resolve_log_path(cfg) {
        Some(path) => {
            let parent = path.parent().unwrap_or_else(|| Path::new("."));
            ensure_dir(parent)?;
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("open log file: {}", path.display()))?;
            let (non_blocking, guard) = tracing_appender::non_blocking(file);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(guard)
}

fn resolve_log_path(cfg: &Config) -> Option<PathBuf> {
    if !cfg.logging.write_to_file || cfg.logging.file_path.is_empty() {
        return None;
    }
    Some(PathBuf::from(&cfg.logging.file_path))
}

fn init(cfg: &Config) -> Result<()> {
    ensure_dir(Path::new(&cfg.paths.reports_dir))?;
    Archive::new(cfg).ensure_dirs()?;

    let defects = Path::new(&cfg.paths.defects_file);
    let rulebook = if defects.exists() {
        match DefectBank::load(defects) {
            Ok(bank) => format!(
                "ok ({} cosmetic, {} functional)",
                bank.cosmetic.len(),
                bank.functional.len()
            ),
            Err(err) => format!("{err:#}"),
        }
    } else {
        if let Some(parent) = defects.parent().filter(|p| !p.as_os_str().is_empty()) {
            ensure_dir(parent)?;
        }
        std::fs::write(defects, "{}\n")
            .with_context(|| format!("creating {}", defects.display()))?;
        "created empty; add defects before running".to_string()
    };

    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "reports_dir": cfg.paths.reports_dir,
            "defects_file": cfg.paths.defects_file,
            "rulebook": rulebook,
            "remote_configured": !cfg.remote.base_url.trim().is_empty(),
        }))?
    );
    Ok(())
}

fn build_pipeline(cfg: &Config) -> Result<Pipeline<HttpTransport>> {
    let bank = DefectBank::load(Path::new(&cfg.paths.defects_file))?;
    let transport = HttpTransport::new(cfg)?;
    Ok(Pipeline::new(cfg, &bank, transport))
}

fn run(cfg: &Config) -> Result<()> {
    let pipeline = build_pipeline(cfg)?;
    let summary = pipeline.run_batch()?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn watch(cfg: &Config) -> Result<()> {
    let pipeline = build_pipeline(cfg)?;
    let interval = Duration::from_secs(cfg.poll.interval_seconds.max(1));
    info!("watching {} every {}s", cfg.paths.reports_dir, interval.as_secs());
    loop {
        let summary = pipeline.run_batch()?;
        info!(
            discovered = summary.discovered,
            parse_failures = summary.parse_failures,
            left_in_place = summary.left_in_place,
            "batch finished"
        );
        std::thread::sleep(interval);
    }
}

fn parse(input: &Path) -> Result<()> {
    let record = report::parse_report_file(input)
        .with_context(|| format!("parsing {}", input.display()))?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

fn grade_offline(cfg: &Config, input: &Path) -> Result<()> {
    let bank = DefectBank::load(Path::new(&cfg.paths.defects_file))?;
    let record = report::parse_report_file(input)
        .with_context(|| format!("parsing {}", input.display()))?;
    let result = grade::grade(&record.cosmetic_defects, &record.functional_defects, &bank);
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "input": input,
            "uid": record.uid,
            "grade": result,
        }))?
    );
    Ok(())
}
