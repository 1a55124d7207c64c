//! Earnings calendar job
//! Walks a date range day by day and exports every requested calendar tab

use async_trait::async_trait;
use chrono::Utc;
use shared::{DividendsRow, EarningsRow, GuidanceRow, JobKind, ParamBlock, RevisionsRow, SplitsRow};
use std::{fmt, path::Path, str::FromStr};
use tracing::{info, warn};

use super::{Job, JobReport};
use crate::error::{Result, ScrapeError};
use crate::export::{self, ExportFormat};
use crate::fetcher;
use crate::normalize::{self, Extract, RawRow};
use crate::params::{self, DateRange};
use crate::session::Session;

pub const TABS_KEY: &str = "tabs";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CalendarTab {
    Earnings,
    Sales,
    Guidance,
    Revisions,
    Dividends,
    Splits,
}

impl CalendarTab {
    pub const ALL: [CalendarTab; 6] = [
        CalendarTab::Earnings,
        CalendarTab::Sales,
        CalendarTab::Guidance,
        CalendarTab::Revisions,
        CalendarTab::Dividends,
        CalendarTab::Splits,
    ];

    /// `type` parameter of the calendar data call.
    pub fn code(self) -> u8 {
        match self {
            CalendarTab::Earnings => 1,
            CalendarTab::Sales => 9,
            CalendarTab::Guidance => 6,
            CalendarTab::Revisions => 3,
            CalendarTab::Dividends => 5,
            CalendarTab::Splits => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CalendarTab::Earnings => "earnings",
            CalendarTab::Sales => "sales",
            CalendarTab::Guidance => "guidance",
            CalendarTab::Revisions => "revisions",
            CalendarTab::Dividends => "dividends",
            CalendarTab::Splits => "splits",
        }
    }

    /// Normalizes `rows` into this tab's schema and writes them; returns the row count.
    pub fn write(self, rows: &[RawRow], path: &Path, format: ExportFormat) -> Result<usize> {
        match self {
            // sales has no schema of its own
            CalendarTab::Earnings | CalendarTab::Sales => {
                export::write_records(path, &EarningsRow::extract_all(rows), format)?
            }
            CalendarTab::Guidance => export::write_records(path, &GuidanceRow::extract_all(rows), format)?,
            CalendarTab::Revisions => export::write_records(path, &RevisionsRow::extract_all(rows), format)?,
            CalendarTab::Dividends => export::write_records(path, &DividendsRow::extract_all(rows), format)?,
            CalendarTab::Splits => export::write_records(path, &SplitsRow::extract_all(rows), format)?,
        }
        Ok(rows.len())
    }
}

impl fmt::Display for CalendarTab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CalendarTab {
    type Err = ScrapeError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        CalendarTab::ALL
            .into_iter()
            .find(|t| t.name() == wanted)
            .ok_or_else(|| ScrapeError::InvalidValue {
                id: TABS_KEY.into(),
                value: s.to_string(),
                reason: "unknown calendar tab".into(),
            })
    }
}

#[derive(Debug, Clone)]
pub struct EarningsCalendarJob {
    pub range: DateRange,
    pub tabs: Vec<CalendarTab>,
    pub format: ExportFormat,
}

impl EarningsCalendarJob {
    pub fn from_blocks(blocks: &[ParamBlock]) -> Result<Self> {
        let mut tabs: Vec<CalendarTab> = Vec::new();
        for name in params::string_list(blocks, TABS_KEY)? {
            let tab = name.parse()?;
            if !tabs.contains(&tab) {
                tabs.push(tab);
            }
        }
        if tabs.is_empty() {
            tabs = CalendarTab::ALL.to_vec();
        }

        Ok(Self {
            range: DateRange::from_blocks(blocks, Utc::now())?,
            tabs,
            format: ExportFormat::from_blocks(blocks, ExportFormat::Parquet)?,
        })
    }
}

#[async_trait]
impl Job for EarningsCalendarJob {
    fn kind(&self) -> JobKind {
        JobKind::EarningsCalendar
    }

    async fn execute(&self, session: &mut Session, out_dir: &Path) -> Result<JobReport> {
        let days = self.range.days();
        info!("📅 Collecting {} day(s) x {} tab(s) of calendar data", days.len(), self.tabs.len());

        let run_dir = out_dir.join(Utc::now().format("%Y%m%d%H%M").to_string());
        std::fs::create_dir_all(&run_dir)?;

        let mut report = JobReport::new(self.kind());
        for day in days {
            for tab in &self.tabs {
                let body = fetcher::fetch_calendar(session, day, tab.code()).await?;
                let rows = normalize::parse_calendar_payload(&body).unwrap_or_else(|e| {
                    warn!("⚠️ {tab} payload for {} unreadable: {e}", day.format("%Y-%m-%d"));
                    report.skipped += 1;
                    Vec::new()
                });

                let path = run_dir.join(format!(
                    "{}_{}.{}",
                    day.format("%Y%m%d%H%M%S"),
                    tab,
                    self.format.extension()
                ));
                match tab.write(&rows, &path, self.format) {
                    Ok(n) => {
                        report.rows += n;
                        report.files.push(path);
                    }
                    Err(e) => {
                        warn!("⚠️ Failed to write {}: {e}", path.display());
                        report.skipped += 1;
                    }
                }
            }
        }

        info!("💾 Calendar done: {} files, {} rows", report.files.len(), report.rows);
        Ok(report)
    }
}
