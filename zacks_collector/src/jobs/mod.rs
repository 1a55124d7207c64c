//! Scrape jobs
//! Each configured job type runs against an already logged-in session

use async_trait::async_trait;
use serde::Serialize;
use shared::{JobKind, ScrapeJob};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::session::Session;

pub mod calendar;
pub mod esp;
pub mod release;
pub mod screener;

pub use calendar::{CalendarTab, EarningsCalendarJob};
pub use esp::{EspFilterJob, EspSide};
pub use release::EarningsReleaseJob;
pub use screener::StockScreenerJob;

/// What one job produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobReport {
    pub kind: JobKind,
    pub files: Vec<PathBuf>,
    pub rows: usize,
    /// Best-effort parse / write failures that were logged and skipped.
    pub skipped: usize,
}

impl JobReport {
    pub fn new(kind: JobKind) -> Self {
        Self {
            kind,
            files: Vec::new(),
            rows: 0,
            skipped: 0,
        }
    }
}

#[async_trait]
pub trait Job: Send + Sync {
    fn kind(&self) -> JobKind;

    /// Runs the job. The session must already be logged in.
    async fn execute(&self, session: &mut Session, out_dir: &Path) -> Result<JobReport>;
}

/// Decodes a configured job's parameter blocks into a runnable job.
pub fn from_config(job: &ScrapeJob) -> Result<Box<dyn Job>> {
    let blocks = &job.parameters;
    Ok(match job.job_type {
        JobKind::StockScreener => Box::new(StockScreenerJob::from_blocks(blocks)?),
        JobKind::EarningsCalendar => Box::new(EarningsCalendarJob::from_blocks(blocks)?),
        JobKind::EarningsRelease => Box::new(EarningsReleaseJob::from_blocks(blocks)?),
        JobKind::EspFilter => Box::new(EspFilterJob::from_blocks(blocks)?),
    })
}
