//! Record normalization
//! Pulls typed columns out of raw payload rows; cells often carry HTML fragments

use serde::Deserialize;
use serde_json::Value;
use shared::{
    DividendsRow, EarningsRow, EspRow, GuidanceRow, ReleaseRow, RevisionsRow, SplitsRow,
};
use tracing::debug;

use crate::error::Result;

pub const SYMBOL_LEFT: &str = r#"<span class="hoverquote-symbol">"#;
pub const SYMBOL_RIGHT: &str = r#"<span class="sr-only">"#;
pub const COMPANY_LEFT: &str = r#"<span title=""#;
pub const COMPANY_RIGHT: &str = r#"" >"#;
pub const DIV_LEFT: &str = r#"">"#;
pub const DIV_RIGHT: &str = "</div>";

/// "Not applicable" marker in the earnings/sales surprise columns.
pub const DASH_SENTINEL: &str = "--";
/// "Not applicable" marker in the revisions change columns.
pub const NA_SENTINEL: &str = "NA";

const APP_DATA_PREFIX: &str = "window.app_data = ";

/// Text strictly between the first `left` and the first `right` in `cell`.
///
/// Returns an empty string when either marker is missing or when `right`
/// starts at or before the end of `left`.
pub fn strip_between<'a>(left: &str, right: &str, cell: &'a str) -> &'a str {
    let Some(first) = cell.find(left) else {
        return "";
    };
    let Some(last) = cell.find(right) else {
        return "";
    };
    let start = first + left.len();
    if start >= last {
        return "";
    }
    &cell[start..last]
}

/// Extract between markers unless the cell is exactly `sentinel`.
pub fn strip_unless_sentinel<'a>(sentinel: &str, left: &str, right: &str, cell: &'a str) -> &'a str {
    if cell == sentinel {
        cell
    } else {
        strip_between(left, right, cell)
    }
}

/// One row of opaque cells, indexed by position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "Vec<Value>")]
pub struct RawRow(pub Vec<String>);

/// Non-string cells are kept as their JSON text; null reads as empty.
impl From<Vec<Value>> for RawRow {
    fn from(cells: Vec<Value>) -> Self {
        Self(
            cells
                .into_iter()
                .map(|v| match v {
                    Value::String(s) => s,
                    Value::Null => String::new(),
                    other => other.to_string(),
                })
                .collect(),
        )
    }
}

impl RawRow {
    pub fn new<S: Into<String>>(cells: impl IntoIterator<Item = S>) -> Self {
        Self(cells.into_iter().map(Into::into).collect())
    }

    /// Missing cells read as empty.
    pub fn cell(&self, idx: usize) -> &str {
        self.0.get(idx).map(String::as_str).unwrap_or("")
    }

    fn symbol(&self) -> String {
        strip_between(SYMBOL_LEFT, SYMBOL_RIGHT, self.cell(0)).to_string()
    }

    fn company(&self) -> String {
        strip_between(COMPANY_LEFT, COMPANY_RIGHT, self.cell(1)).to_string()
    }

    fn copied(&self, idx: usize) -> String {
        self.cell(idx).to_string()
    }

    fn div(&self, idx: usize) -> String {
        strip_between(DIV_LEFT, DIV_RIGHT, self.cell(idx)).to_string()
    }

    fn div_or(&self, sentinel: &str, idx: usize) -> String {
        strip_unless_sentinel(sentinel, DIV_LEFT, DIV_RIGHT, self.cell(idx)).to_string()
    }
}

/// Builds a normalized record from one raw row of a known schema.
pub trait Extract: Sized {
    fn extract(row: &RawRow) -> Self;

    fn extract_all(rows: &[RawRow]) -> Vec<Self> {
        rows.iter().map(Self::extract).collect()
    }
}

impl Extract for EarningsRow {
    fn extract(row: &RawRow) -> Self {
        EarningsRow {
            symbol: row.symbol(),
            company: row.company(),
            market_cap: row.copied(2),
            time: row.copied(3),
            estimate: row.copied(4),
            reported: row.copied(5),
            surprise: row.div_or(DASH_SENTINEL, 6),
            percent_surp: row.div_or(DASH_SENTINEL, 7),
            percent_price_change: row.div(8),
        }
    }
}

impl Extract for GuidanceRow {
    fn extract(row: &RawRow) -> Self {
        GuidanceRow {
            symbol: row.symbol(),
            company: row.company(),
            market_cap: row.copied(2),
            period: row.copied(3),
            period_end: row.copied(4),
            guid_range: row.copied(5),
            mid_guid: row.copied(6),
            cons: row.copied(7),
            percent_to_high_point: row.copied(8),
        }
    }
}

impl Extract for RevisionsRow {
    fn extract(row: &RawRow) -> Self {
        RevisionsRow {
            symbol: row.symbol(),
            company: row.company(),
            market_cap: row.copied(2),
            period: row.copied(3),
            period_end: row.copied(4),
            old: row.copied(5),
            new: row.copied(6),
            est_change: row.div_or(NA_SENTINEL, 7),
            cons: row.copied(8),
            new_est_vs_cons: row.div_or(NA_SENTINEL, 9),
        }
    }
}

impl Extract for DividendsRow {
    fn extract(row: &RawRow) -> Self {
        DividendsRow {
            symbol: row.symbol(),
            company: row.company(),
            market_cap: row.copied(2),
            amount: row.copied(3),
            dividend_yield: row.copied(4),
            ex_div_date: row.copied(5),
            current_price: row.copied(6),
            payable_date: row.copied(7),
        }
    }
}

impl Extract for SplitsRow {
    fn extract(row: &RawRow) -> Self {
        SplitsRow {
            symbol: row.symbol(),
            company: row.company(),
            market_cap: row.copied(2),
            price: row.copied(3),
            split_factor: row.copied(4),
        }
    }
}

/// Release rows are already plain text.
impl Extract for ReleaseRow {
    fn extract(row: &RawRow) -> Self {
        ReleaseRow {
            symbol: row.copied(0),
            company: row.copied(1),
            report_time: row.copied(2),
            estimate: row.copied(3),
            reported: row.copied(4),
            surprise: row.copied(5),
            current_price: row.copied(6),
            price_percent_change: row.copied(7),
        }
    }
}

impl Extract for EspRow {
    fn extract(row: &RawRow) -> Self {
        EspRow {
            symbol: row.symbol(),
            company: strip_between(">", "</a>", row.cell(1)).to_string(),
            esp: strip_between(">", "</span>", row.cell(2)).to_string(),
            most_accurate_estimate: row.copied(3),
            consensus_estimate: row.copied(4),
            price: row.copied(5),
            zacks_rank: strip_between(">", "</span>", row.cell(6)).to_string(),
            percent_surprise: strip_between(">", "</span>", row.cell(7)).to_string(),
            reporting_date: row.copied(8),
        }
    }
}

#[derive(Debug, Deserialize)]
struct DataEnvelope {
    #[serde(default)]
    data: Vec<RawRow>,
}

/// Calendar payloads are a JS assignment wrapping `{"data": [[...], ...]}`.
pub fn parse_calendar_payload(body: &[u8]) -> Result<Vec<RawRow>> {
    let text = String::from_utf8_lossy(body);
    let json = text.trim_start();
    let json = json.strip_prefix(APP_DATA_PREFIX).unwrap_or(json);
    let json = json.trim_end().trim_end_matches(';');
    let envelope: DataEnvelope = serde_json::from_str(json)?;
    debug!("calendar payload: {} rows", envelope.data.len());
    Ok(envelope.data)
}

/// ESP filter responses are plain `{"data": [[...], ...]}` JSON.
pub fn parse_esp_payload(body: &[u8]) -> Result<Vec<RawRow>> {
    let envelope: DataEnvelope = serde_json::from_slice(body)?;
    debug!("esp payload: {} rows", envelope.data.len());
    Ok(envelope.data)
}

pub const RELEASE_CELLS: usize = 9;

/// Tab-delimited release export; the header line is skipped and only
/// complete lines are kept.
pub fn parse_release_payload(body: &[u8]) -> Vec<RawRow> {
    let text = String::from_utf8_lossy(body);
    text.split('\n')
        .skip(1)
        .map(|line| line.trim_end_matches('\r'))
        .filter_map(|line| {
            let cells: Vec<&str> = line.split('\t').collect();
            (cells.len() == RELEASE_CELLS).then(|| RawRow::new(cells))
        })
        .collect()
}
