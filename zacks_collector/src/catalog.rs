//! Screener field catalog
//! Static mapping from filter ids to the remote field codes and operator tables

/// Operator name to the numeric code the screener form expects.
#[derive(Debug)]
pub struct OperatorTable {
    codes: &'static [(&'static str, u16)],
}

impl OperatorTable {
    pub fn code(&self, operator: &str) -> Option<u16> {
        self.codes
            .iter()
            .find(|(op, _)| *op == operator)
            .map(|(_, code)| *code)
    }
}

/// Rank, industry rank, dates and the other numeric comparisons.
pub static RANK_OPERATORS: OperatorTable = OperatorTable {
    codes: &[(">=", 6), ("<=", 7), ("=", 8), ("<>", 17)],
};

/// Value / Growth / Momentum / VGM style scores.
pub static SCORE_OPERATORS: OperatorTable = OperatorTable {
    codes: &[(">=", 12), ("<=", 13), ("=", 19), ("<>", 20)],
};

pub static BOOLEAN_OPERATORS: OperatorTable = OperatorTable {
    codes: &[("EQUAL", 9), ("NOT EQUAL", 18)],
};

pub const GRADES: [&str; 5] = ["A", "B", "C", "D", "F"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Whole number, optionally bounded (inclusive).
    Integer { range: Option<(i64, i64)> },
    /// One of `GRADES`.
    Grade,
    /// YES or NO.
    YesNo,
    /// Passed through as typed by the user.
    Text,
}

#[derive(Debug)]
pub struct FieldDef {
    pub id: &'static str,
    /// Remote numeric field id (`p_items[]`).
    pub code: u32,
    /// Display label (`p_item_name[]`).
    pub label: &'static str,
    /// Positional key (`p_item_key[]`).
    pub key: u32,
    pub operators: &'static OperatorTable,
    pub kind: ValueKind,
}

impl FieldDef {
    pub fn operator_code(&self, operator: &str) -> Option<u16> {
        self.operators.code(operator)
    }
}

const fn field(
    id: &'static str,
    code: u32,
    label: &'static str,
    key: u32,
    operators: &'static OperatorTable,
    kind: ValueKind,
) -> FieldDef {
    FieldDef { id, code, label, key, operators, kind }
}

static FIELDS: [FieldDef; 20] = [
    field("zacks_rank", 15005, "Zacks Rank", 0, &RANK_OPERATORS, ValueKind::Integer { range: Some((1, 5)) }),
    field("zacks_industry_rank", 15025, "Zacks Industry Rank", 1, &RANK_OPERATORS, ValueKind::Integer { range: None }),
    field("value_score", 15030, "Value Score", 2, &SCORE_OPERATORS, ValueKind::Grade),
    field("growth_score", 15035, "Growth Score", 3, &SCORE_OPERATORS, ValueKind::Grade),
    field("momentum_score", 15040, "Momentum Score", 4, &SCORE_OPERATORS, ValueKind::Grade),
    field("vgm_score", 15045, "VGM Score", 5, &SCORE_OPERATORS, ValueKind::Grade),
    field("earnings_esp", 17060, "Earnings ESP", 6, &RANK_OPERATORS, ValueKind::Text),
    field("52_week_high", 14010, "52 Week High", 7, &RANK_OPERATORS, ValueKind::Text),
    field("market_cap", 12010, "Market Cap (mil)", 8, &RANK_OPERATORS, ValueKind::Text),
    field("last_eps_surprise", 17005, "Last EPS Surprise (%)", 9, &RANK_OPERATORS, ValueKind::Text),
    field("p_n_e", 22010, "P/E (F1)", 10, &RANK_OPERATORS, ValueKind::Text),
    field("num_brokers", 16010, "# of Brokers in Rating", 11, &RANK_OPERATORS, ValueKind::Text),
    field("optionable", 11015, "Optionable", 12, &BOOLEAN_OPERATORS, ValueKind::YesNo),
    field("percent_change_f1", 18020, "% Change F1 Est. (4 weeks)", 13, &RANK_OPERATORS, ValueKind::Text),
    field("div_yield", 25005, "Div. Yield %", 14, &RANK_OPERATORS, ValueKind::Text),
    field("avg_volume", 12015, "Avg Volume", 15, &RANK_OPERATORS, ValueKind::Text),
    field("last_eps_report_date", 17050, "Last EPS Report Date (yyyymmdd)", 72, &RANK_OPERATORS, ValueKind::Text),
    field("next_eps_report_date", 17055, "Next EPS Report Date (yyyymmdd)", 73, &RANK_OPERATORS, ValueKind::Text),
    field("q0_consensus_est", 19005, "Q0 Consensus Est. (last completed fiscal Qtr)", 80, &RANK_OPERATORS, ValueKind::Text),
    field("last_reported_quarter", 17030, "Last Reported Qtr (yyyymm)", 68, &RANK_OPERATORS, ValueKind::Text),
];

pub fn lookup(id: &str) -> Option<&'static FieldDef> {
    FIELDS.iter().find(|f| f.id == id)
}

pub fn fields() -> &'static [FieldDef] {
    &FIELDS
}
