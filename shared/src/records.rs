//! Normalized record shapes for every exported dataset
//! All values stay textual; sentinels like "--" and "NA" are kept verbatim

use serde::{Deserialize, Serialize};

/// Column descriptor: `name` is the columnar field name, `label` the CSV header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub label: &'static str,
}

const fn col(name: &'static str, label: &'static str) -> Column {
    Column { name, label }
}

/// A fixed-shape record that can be written as one table row.
pub trait Tabular {
    const COLUMNS: &'static [Column];

    /// Cell values in `COLUMNS` order.
    fn cells(&self) -> Vec<&str>;

    fn headers() -> Vec<&'static str> {
        Self::COLUMNS.iter().map(|c| c.label).collect()
    }
}

/// Earnings and sales calendar tabs share this shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EarningsRow {
    pub symbol: String,
    pub company: String,
    pub market_cap: String,
    pub time: String,
    pub estimate: String,
    pub reported: String,
    pub surprise: String,
    pub percent_surp: String,
    pub percent_price_change: String,
}

impl Tabular for EarningsRow {
    const COLUMNS: &'static [Column] = &[
        col("symbol", "Symbol"),
        col("company", "Company"),
        col("marketCap", "Market Cap (M)"),
        col("time", "Time"),
        col("estimate", "Estimate"),
        col("reported", "Reported"),
        col("surprise", "Surprise"),
        col("percentSurp", "% Surp"),
        col("percentPriceChange", "Price % Change"),
    ];

    fn cells(&self) -> Vec<&str> {
        vec![
            self.symbol.as_str(),
            self.company.as_str(),
            self.market_cap.as_str(),
            self.time.as_str(),
            self.estimate.as_str(),
            self.reported.as_str(),
            self.surprise.as_str(),
            self.percent_surp.as_str(),
            self.percent_price_change.as_str(),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuidanceRow {
    pub symbol: String,
    pub company: String,
    pub market_cap: String,
    pub period: String,
    pub period_end: String,
    pub guid_range: String,
    pub mid_guid: String,
    pub cons: String,
    pub percent_to_high_point: String,
}

impl Tabular for GuidanceRow {
    const COLUMNS: &'static [Column] = &[
        col("symbol", "Symbol"),
        col("company", "Company"),
        col("marketCap", "Market Cap (M)"),
        col("period", "Period"),
        col("periodEnd", "Period End"),
        col("guidRange", "Guid Range"),
        col("midGuid", "Mid Guid"),
        col("cons", "Cons"),
        col("percentToHighPoint", "% to High Point"),
    ];

    fn cells(&self) -> Vec<&str> {
        vec![
            self.symbol.as_str(),
            self.company.as_str(),
            self.market_cap.as_str(),
            self.period.as_str(),
            self.period_end.as_str(),
            self.guid_range.as_str(),
            self.mid_guid.as_str(),
            self.cons.as_str(),
            self.percent_to_high_point.as_str(),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionsRow {
    pub symbol: String,
    pub company: String,
    pub market_cap: String,
    pub period: String,
    pub period_end: String,
    pub old: String,
    pub new: String,
    pub est_change: String,
    pub cons: String,
    pub new_est_vs_cons: String,
}

impl Tabular for RevisionsRow {
    const COLUMNS: &'static [Column] = &[
        col("symbol", "Symbol"),
        col("company", "Company"),
        col("marketCap", "Market Cap (M)"),
        col("period", "Period"),
        col("periodEnd", "Period End"),
        col("old", "Old"),
        col("new", "New"),
        col("estChange", "Est. Change"),
        col("cons", "Cons"),
        col("newEstVsCons", "New Est. vs Cons"),
    ];

    fn cells(&self) -> Vec<&str> {
        vec![
            self.symbol.as_str(),
            self.company.as_str(),
            self.market_cap.as_str(),
            self.period.as_str(),
            self.period_end.as_str(),
            self.old.as_str(),
            self.new.as_str(),
            self.est_change.as_str(),
            self.cons.as_str(),
            self.new_est_vs_cons.as_str(),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DividendsRow {
    pub symbol: String,
    pub company: String,
    pub market_cap: String,
    pub amount: String,
    #[serde(rename = "yield")]
    pub dividend_yield: String,
    pub ex_div_date: String,
    pub current_price: String,
    pub payable_date: String,
}

impl Tabular for DividendsRow {
    const COLUMNS: &'static [Column] = &[
        col("symbol", "Symbol"),
        col("company", "Company"),
        col("marketCap", "Market Cap (M)"),
        col("amount", "Amount"),
        col("yield", "Yield"),
        col("exDivDate", "Ex-Div Date"),
        col("currentPrice", "Current Price"),
        col("payableDate", "Payable Date"),
    ];

    fn cells(&self) -> Vec<&str> {
        vec![
            self.symbol.as_str(),
            self.company.as_str(),
            self.market_cap.as_str(),
            self.amount.as_str(),
            self.dividend_yield.as_str(),
            self.ex_div_date.as_str(),
            self.current_price.as_str(),
            self.payable_date.as_str(),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitsRow {
    pub symbol: String,
    pub company: String,
    pub market_cap: String,
    pub price: String,
    pub split_factor: String,
}

impl Tabular for SplitsRow {
    const COLUMNS: &'static [Column] = &[
        col("symbol", "Symbol"),
        col("company", "Company"),
        col("marketCap", "Market Cap (M)"),
        col("price", "Price"),
        col("splitFactor", "Split Factor"),
    ];

    fn cells(&self) -> Vec<&str> {
        vec![
            self.symbol.as_str(),
            self.company.as_str(),
            self.market_cap.as_str(),
            self.price.as_str(),
            self.split_factor.as_str(),
        ]
    }
}

/// Row of the daily earnings release export.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseRow {
    pub symbol: String,
    pub company: String,
    pub report_time: String,
    pub estimate: String,
    pub reported: String,
    pub surprise: String,
    pub current_price: String,
    pub price_percent_change: String,
}

impl Tabular for ReleaseRow {
    const COLUMNS: &'static [Column] = &[
        col("symbol", "Symbol"),
        col("company", "Company"),
        col("reportTime", "Report Time"),
        col("estimate", "Estimate"),
        col("reported", "Reported"),
        col("surprise", "Surprise"),
        col("currentPrice", "Current Price"),
        col("pricePercentChange", "Price % Change"),
    ];

    fn cells(&self) -> Vec<&str> {
        vec![
            self.symbol.as_str(),
            self.company.as_str(),
            self.report_time.as_str(),
            self.estimate.as_str(),
            self.reported.as_str(),
            self.surprise.as_str(),
            self.current_price.as_str(),
            self.price_percent_change.as_str(),
        ]
    }
}

/// Row of the ESP buy/sell filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EspRow {
    pub symbol: String,
    pub company: String,
    pub esp: String,
    pub most_accurate_estimate: String,
    pub consensus_estimate: String,
    pub price: String,
    pub zacks_rank: String,
    pub percent_surprise: String,
    pub reporting_date: String,
}

impl Tabular for EspRow {
    const COLUMNS: &'static [Column] = &[
        col("symbol", "Symbol"),
        col("company", "Company"),
        col("esp", "ESP"),
        col("mostAccurateEstimate", "Most Accurate Estimate"),
        col("consensusEstimate", "Consensus Estimate"),
        col("price", "Price"),
        col("zacksRank", "Zacks Rank"),
        col("percentSurprise", "% Surprise (Last Qtr.)"),
        col("reportingDate", "Reporting Date"),
    ];

    fn cells(&self) -> Vec<&str> {
        vec![
            self.symbol.as_str(),
            self.company.as_str(),
            self.esp.as_str(),
            self.most_accurate_estimate.as_str(),
            self.consensus_estimate.as_str(),
            self.price.as_str(),
            self.zacks_rank.as_str(),
            self.percent_surprise.as_str(),
            self.reporting_date.as_str(),
        ]
    }
}
