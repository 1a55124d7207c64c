//! Earnings release job

use async_trait::async_trait;
use chrono::Utc;
use shared::{JobKind, ParamBlock, ReleaseRow};
use std::path::Path;
use tracing::{info, warn};

use super::{Job, JobReport};
use crate::error::Result;
use crate::export::{self, ExportFormat};
use crate::fetcher;
use crate::normalize::{self, Extract};
use crate::params::DateRange;
use crate::session::Session;

#[derive(Debug, Clone)]
pub struct EarningsReleaseJob {
    pub range: DateRange,
    pub format: ExportFormat,
}

impl EarningsReleaseJob {
    pub fn from_blocks(blocks: &[ParamBlock]) -> Result<Self> {
        Ok(Self {
            range: DateRange::from_blocks(blocks, Utc::now())?,
            format: ExportFormat::from_blocks(blocks, ExportFormat::Parquet)?,
        })
    }
}

#[async_trait]
impl Job for EarningsReleaseJob {
    fn kind(&self) -> JobKind {
        JobKind::EarningsRelease
    }

    async fn execute(&self, session: &mut Session, out_dir: &Path) -> Result<JobReport> {
        std::fs::create_dir_all(out_dir)?;
        let mut report = JobReport::new(self.kind());

        for day in self.range.days() {
            let body = fetcher::fetch_release(session, day).await?;
            let rows = ReleaseRow::extract_all(&normalize::parse_release_payload(&body));

            let path = out_dir.join(format!("{}.{}", day.format("%Y%m%d"), self.format.extension()));
            match export::write_records(&path, &rows, self.format) {
                Ok(()) => {
                    info!("💾 {} releases for {}", rows.len(), day.format("%Y-%m-%d"));
                    report.rows += rows.len();
                    report.files.push(path);
                }
                Err(e) => {
                    warn!("⚠️ Failed to write {}: {e}", path.display());
                    report.skipped += 1;
                }
            }
        }

        Ok(report)
    }
}
