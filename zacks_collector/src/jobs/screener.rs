//! Stock screener job
//! Binds the screener context, submits the filters and saves the exported table

use async_trait::async_trait;
use chrono::Utc;
use shared::{JobKind, ParamBlock};
use std::path::Path;
use tracing::{info, warn};

use super::{Job, JobReport};
use crate::error::Result;
use crate::export;
use crate::fetcher;
use crate::query::{self, FilterSpec};
use crate::session::Session;

#[derive(Debug, Clone)]
pub struct StockScreenerJob {
    pub filters: Vec<FilterSpec>,
}

impl StockScreenerJob {
    /// Every block is one filter.
    pub fn from_blocks(blocks: &[ParamBlock]) -> Result<Self> {
        let filters = blocks
            .iter()
            .map(FilterSpec::from_block)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { filters })
    }
}

#[async_trait]
impl Job for StockScreenerJob {
    fn kind(&self) -> JobKind {
        JobKind::StockScreener
    }

    async fn execute(&self, session: &mut Session, out_dir: &Path) -> Result<JobReport> {
        let context_key = session.bind_context().await?;
        session.establish_api_session(&context_key).await?;

        match session.reset_query_state().await {
            Err(e) if e.is_warning() => warn!("⚠️ Continuing without query reset: {e}"),
            other => other?,
        }

        let query = query::build(&self.filters)?;
        info!("🔎 Running screen with {} filter(s)", query.fields().len());
        fetcher::submit_query(session, &query).await?;
        let table = fetcher::download_results(session).await?;

        std::fs::create_dir_all(out_dir)?;
        let path = out_dir.join(format!("{}.csv", Utc::now().format("%Y%m%d")));
        export::write_table(&path, &table)?;
        info!("💾 Saved {} rows to {}", data_rows(&table), path.display());

        let mut report = JobReport::new(self.kind());
        report.rows = data_rows(&table);
        report.files.push(path);
        Ok(report)
    }
}

/// The export always leads with a header line.
fn data_rows(table: &[Vec<String>]) -> usize {
    table.len().saturating_sub(1)
}
