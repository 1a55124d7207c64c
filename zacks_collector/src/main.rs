//! Zacks data collector
//! Logs in, runs the configured scrape jobs and writes their exports

use anyhow::{anyhow, Result};
use clap::Parser;
use shared::Config;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "zacks-collector", version, about = "Collect Zacks screener, calendar, release and ESP data")]
struct Cli {
    /// YAML config file
    #[arg(short, long, default_value = "config.yml")]
    config: PathBuf,

    /// Run only the job at this index
    #[arg(long)]
    job: Option<usize>,

    /// Write every job's output under this directory instead of its configured outDir
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("🚀 Starting Zacks collector");

    let mut config = Config::load(&cli.config)?;
    if let Some(idx) = cli.job {
        if idx >= config.jobs.len() {
            return Err(anyhow!("job index {idx} out of range ({} configured)", config.jobs.len()));
        }
        config.jobs = vec![config.jobs.swap_remove(idx)];
    }
    if let Some(dir) = &cli.out_dir {
        for job in &mut config.jobs {
            job.out_dir = dir.join(job.job_type.to_string());
        }
    }
    info!("✅ Configuration loaded: {} job(s)", config.jobs.len());

    let summary = zacks_collector::run_all(&config).await;

    if !summary.is_success() {
        for (idx, kind, err) in &summary.failures {
            error!("job {idx} ({kind}) failed: {err}");
        }
        return Err(anyhow!("{} of {} job(s) failed", summary.failures.len(), config.jobs.len()));
    }

    info!("🎉 All {} job(s) finished", summary.reports.len());
    Ok(())
}
