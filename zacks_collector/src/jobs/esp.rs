//! ESP buy/sell filter job
//! Posts the checkbox selection and saves the matching stocks

use async_trait::async_trait;
use chrono::Utc;
use shared::{EspRow, JobKind, ParamBlock};
use std::path::Path;
use tracing::info;
use url::form_urlencoded;

use super::{Job, JobReport};
use crate::error::{Result, ScrapeError};
use crate::export::{self, ExportFormat};
use crate::fetcher;
use crate::normalize::{self, Extract};
use crate::params;
use crate::session::Session;

pub const FILTER_TYPE_KEY: &str = "filter_type";

/// Parameter key and the checklist group number it maps to.
pub const CHECKBOX_GROUPS: [(&str, u8); 4] = [
    ("esp_checkboxes", 1),
    ("zacks_rank_checkboxes", 2),
    ("surp_checkboxes", 3),
    ("reporting_date_checkboxes", 5),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EspSide {
    Buys,
    Sells,
}

impl EspSide {
    pub fn code(self) -> u8 {
        match self {
            EspSide::Buys => 1,
            EspSide::Sells => 2,
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "buys" => Ok(EspSide::Buys),
            "sells" => Ok(EspSide::Sells),
            other => Err(ScrapeError::InvalidValue {
                id: FILTER_TYPE_KEY.into(),
                value: other.to_string(),
                reason: "expected buys or sells".into(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EspFilterJob {
    pub side: EspSide,
    /// `(group, value)` pairs in request order.
    pub checklist: Vec<(u8, i64)>,
    pub format: ExportFormat,
}

impl EspFilterJob {
    pub fn from_blocks(blocks: &[ParamBlock]) -> Result<Self> {
        let side = match params::string_param(blocks, FILTER_TYPE_KEY)? {
            Some(value) => EspSide::parse(&value)?,
            None => {
                return Err(ScrapeError::InvalidValue {
                    id: FILTER_TYPE_KEY.into(),
                    value: String::new(),
                    reason: "filter_type is required".into(),
                })
            }
        };

        let mut checklist = Vec::new();
        for (key, group) in CHECKBOX_GROUPS {
            for value in params::int_list(blocks, key)? {
                checklist.push((group, value));
            }
        }

        Ok(Self {
            side,
            checklist,
            format: ExportFormat::from_blocks(blocks, ExportFormat::Csv)?,
        })
    }

    /// Url-encoded request body.
    pub fn form(&self) -> String {
        let mut form = form_urlencoded::Serializer::new(String::new());
        for (group, value) in &self.checklist {
            form.append_pair("filter_checklist[]", &format!("{group}#{value}"));
        }
        form.append_pair("hd_esp_type", &self.side.code().to_string());
        form.finish()
    }
}

#[async_trait]
impl Job for EspFilterJob {
    fn kind(&self) -> JobKind {
        JobKind::EspFilter
    }

    async fn execute(&self, session: &mut Session, out_dir: &Path) -> Result<JobReport> {
        let body = fetcher::fetch_esp(session, self.form()).await?;
        let rows = EspRow::extract_all(&normalize::parse_esp_payload(&body)?);

        std::fs::create_dir_all(out_dir)?;
        let path = out_dir.join(format!("{}.{}", Utc::now().format("%Y%m%d"), self.format.extension()));
        export::write_records(&path, &rows, self.format)?;
        info!("💾 Saved {} ESP {:?} rows to {}", rows.len(), self.side, path.display());

        let mut report = JobReport::new(self.kind());
        report.rows = rows.len();
        report.files.push(path);
        Ok(report)
    }
}
