//! Job runner
//! Runs configured jobs in order, each attempt on a fresh session, with bounded retries

use anyhow::{anyhow, Context};
use shared::{Config, JobKind, ScrapeJob};
use std::time::Duration;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::error::Result;
use crate::jobs::{self, JobReport};
use crate::session::Session;

#[derive(Debug, Default)]
pub struct RunSummary {
    pub reports: Vec<JobReport>,
    /// `(job index, kind, last error)` for jobs that used up their attempts.
    pub failures: Vec<(usize, JobKind, String)>,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Login, then the job itself, on a session nobody else sees.
async fn attempt(config: &Config, job: &ScrapeJob) -> Result<JobReport> {
    let runnable = jobs::from_config(job)?;
    let mut session = Session::new(
        &config.endpoints,
        Duration::from_secs(config.request_timeout_secs),
    )?;
    session.login(&config.username, &config.password).await?;
    runnable.execute(&mut session, &job.out_dir).await
}

/// Retries every error up to `config.max_retries` attempts in total.
pub async fn run_job(config: &Config, job: &ScrapeJob) -> anyhow::Result<JobReport> {
    let attempts = config.max_retries.max(1);
    let mut last_err = None;

    for n in 1..=attempts {
        let span = info_span!("job", kind = %job.job_type, attempt = n, run_id = %Uuid::new_v4());
        match attempt(config, job).instrument(span).await {
            Ok(report) => return Ok(report),
            Err(e) => {
                warn!("❌ {} attempt {n}/{attempts} failed: {e}", job.job_type);
                last_err = Some(e);
            }
        }
        if n < attempts {
            tokio::time::sleep(Duration::from_millis(config.delay_between_retries)).await;
        }
    }

    match last_err {
        Some(e) => Err(e).with_context(|| format!("{} failed after {attempts} attempt(s)", job.job_type)),
        None => Err(anyhow!("{} never ran", job.job_type)),
    }
}

/// Runs every job in order; a failed job never stops the ones after it.
pub async fn run_all(config: &Config) -> RunSummary {
    let mut summary = RunSummary::default();

    for (idx, job) in config.jobs.iter().enumerate() {
        info!("▶️ Job {} ({}) -> {}", idx, job.job_type, job.out_dir.display());
        match run_job(config, job).await {
            Ok(report) => {
                info!(
                    "✅ {} finished: {} file(s), {} row(s), {} skipped",
                    report.kind,
                    report.files.len(),
                    report.rows,
                    report.skipped
                );
                summary.reports.push(report);
            }
            Err(e) => {
                error!("💥 {e:#}");
                summary.failures.push((idx, job.job_type, format!("{e:#}")));
            }
        }
    }

    summary
}
