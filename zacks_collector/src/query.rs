//! Stock screener query construction
//! Validates filter specs against the catalog and encodes the positional form body

use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::ParamBlock;
use tracing::debug;

use crate::catalog::{self, FieldDef, ValueKind, GRADES};
use crate::error::{Result, ScrapeError};

/// Multipart boundary the screener API was recorded with.
pub const FORM_BOUNDARY: &str = "----WebKitFormBoundarynYAVaZAwVXgNHDGd";

/// Fields sent with every query, in wire order.
pub const BOILERPLATE: [(&str, &str); 9] = [
    ("is_only_matches", "0"),
    ("is_premium_exists", "0"),
    ("is_edit_view", "0"),
    ("saved_screen_name", ""),
    ("tab_id", "1"),
    ("start_page", "1"),
    ("no_of_rec", "15"),
    ("sort_col", "2"),
    ("sort_type", "ASC"),
];

/// One user-declared screener constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub id: String,
    pub value: String,
    pub operator: String,
}

impl FilterSpec {
    pub fn new(id: impl Into<String>, value: impl Into<String>, operator: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            value: value.into(),
            operator: operator.into(),
        }
    }

    /// Read a spec out of a job parameter block; `id`, `value` and `operator` are required.
    pub fn from_block(block: &ParamBlock) -> Result<Self> {
        let field = |name: &str| -> Result<String> {
            match block.get(name) {
                Some(Value::String(s)) => Ok(s.clone()),
                Some(Value::Number(n)) => Ok(n.to_string()),
                Some(other) => Err(ScrapeError::MalformedSpec(format!(
                    "'{name}' must be a string, got {other}"
                ))),
                None => Err(ScrapeError::MalformedSpec(format!(
                    "each item in the query list must have a '{name}' field"
                ))),
            }
        };

        Ok(Self {
            id: field("id")?,
            value: field("value")?,
            operator: field("operator")?,
        })
    }
}

/// A validated filter, typed, before it is flattened into parallel arrays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryField {
    pub operator_code: u16,
    pub value: String,
    pub field_code: u32,
    pub label: &'static str,
    pub key: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodedQuery {
    fields: Vec<QueryField>,
}

impl EncodedQuery {
    pub fn fields(&self) -> &[QueryField] {
        &self.fields
    }

    pub fn operators(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.operator_code.to_string()).collect()
    }

    pub fn values(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.value.clone()).collect()
    }

    pub fn items(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.field_code.to_string()).collect()
    }

    pub fn item_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.label.to_string()).collect()
    }

    pub fn item_keys(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.key.to_string()).collect()
    }

    /// Name/value pairs in the exact order the screener expects them.
    pub fn form_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs: Vec<(&'static str, String)> = BOILERPLATE
            .iter()
            .map(|(name, value)| (*name, value.to_string()))
            .collect();

        for f in &self.fields {
            pairs.push(("operator[]", f.operator_code.to_string()));
            pairs.push(("value[]", f.value.clone()));
            pairs.push(("p_items[]", f.field_code.to_string()));
            pairs.push(("p_item_name[]", f.label.to_string()));
            pairs.push(("p_item_key[]", f.key.to_string()));
        }
        pairs
    }

    /// multipart/form-data body using a caller-chosen boundary.
    pub fn to_multipart(&self, boundary: &str) -> Vec<u8> {
        let mut body = String::new();
        for (name, value) in self.form_pairs() {
            body.push_str("--");
            body.push_str(boundary);
            body.push_str("\r\n");
            body.push_str(&format!(
                "Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
                escape_quotes(name)
            ));
            body.push_str(&value);
            body.push_str("\r\n");
        }
        body.push_str(&format!("--{boundary}--\r\n"));
        body.into_bytes()
    }
}

fn escape_quotes(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Accumulates validated filters; a rejected spec leaves the query untouched.
#[derive(Debug, Default)]
pub struct QueryBuilder {
    fields: Vec<QueryField>,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, spec: &FilterSpec) -> Result<()> {
        let def = catalog::lookup(&spec.id)
            .ok_or_else(|| ScrapeError::MalformedSpec(format!("unknown filter id '{}'", spec.id)))?;

        let operator_code = def
            .operator_code(&spec.operator)
            .ok_or_else(|| ScrapeError::UnsupportedOperator {
                id: spec.id.clone(),
                operator: spec.operator.clone(),
            })?;

        let value = validate_value(def, &spec.value)?;

        debug!(
            "filter {} {} {} -> p_items {} op {}",
            spec.id, spec.operator, value, def.code, operator_code
        );

        self.fields.push(QueryField {
            operator_code,
            value,
            field_code: def.code,
            label: def.label,
            key: def.key,
        });
        Ok(())
    }

    pub fn query(&self) -> EncodedQuery {
        EncodedQuery {
            fields: self.fields.clone(),
        }
    }

    pub fn finish(self) -> EncodedQuery {
        EncodedQuery { fields: self.fields }
    }
}

fn validate_value(def: &FieldDef, value: &str) -> Result<String> {
    let invalid = |reason: &str| ScrapeError::InvalidValue {
        id: def.id.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    };

    match def.kind {
        ValueKind::Integer { range } => {
            let n: i64 = value.parse().map_err(|_| invalid("expected an integer"))?;
            if let Some((min, max)) = range {
                if n < min || n > max {
                    return Err(ScrapeError::OutOfRange {
                        id: def.id.to_string(),
                        value: n,
                        min,
                        max,
                    });
                }
            }
            Ok(n.to_string())
        }
        ValueKind::Grade => {
            if GRADES.contains(&value) {
                Ok(value.to_string())
            } else {
                Err(invalid("expected one of A, B, C, D, F"))
            }
        }
        ValueKind::YesNo => {
            if value == "YES" || value == "NO" {
                Ok(value.to_string())
            } else {
                Err(invalid("expected YES or NO"))
            }
        }
        ValueKind::Text => Ok(value.to_string()),
    }
}

/// Validate and encode filters in input order; the first bad spec aborts the build.
pub fn build(specs: &[FilterSpec]) -> Result<EncodedQuery> {
    let mut builder = QueryBuilder::new();
    for spec in specs {
        builder.push(spec)?;
    }
    Ok(builder.finish())
}

/// Same as [`build`], reading the specs from job parameter blocks.
pub fn build_from_blocks(blocks: &[ParamBlock]) -> Result<EncodedQuery> {
    let specs = blocks
        .iter()
        .map(FilterSpec::from_block)
        .collect::<Result<Vec<_>>>()?;
    build(&specs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn block(v: Value) -> ParamBlock {
        v.as_object().unwrap().clone()
    }

    #[test]
    fn test_grade_validation() {
        assert!(build(&[FilterSpec::new("value_score", "A", "=")]).is_ok());
        let err = build(&[FilterSpec::new("value_score", "Z", "=")]).unwrap_err();
        assert!(matches!(err, ScrapeError::InvalidValue { .. }));
    }

    #[test]
    fn test_zacks_rank_range() {
        let err = build(&[FilterSpec::new("zacks_rank", "6", ">=")]).unwrap_err();
        assert!(matches!(err, ScrapeError::OutOfRange { value: 6, .. }));

        let q = build(&[FilterSpec::new("zacks_rank", "3", ">=")]).unwrap();
        assert_eq!(q.operators(), vec!["6"]);
        assert_eq!(q.values(), vec!["3"]);
        assert_eq!(q.items(), vec!["15005"]);
        assert_eq!(q.item_names(), vec!["Zacks Rank"]);
        assert_eq!(q.item_keys(), vec!["0"]);
    }

    #[test]
    fn test_rank_requires_integer() {
        let err = build(&[FilterSpec::new("zacks_industry_rank", "high", "<=")]).unwrap_err();
        assert!(matches!(err, ScrapeError::InvalidValue { .. }));
        // industry rank has no 1..=5 bound
        assert!(build(&[FilterSpec::new("zacks_industry_rank", "120", "<=")]).is_ok());
    }

    #[test]
    fn test_unsupported_operator_names_id() {
        let err = build(&[FilterSpec::new("optionable", "YES", "=")]).unwrap_err();
        match err {
            ScrapeError::UnsupportedOperator { id, operator } => {
                assert_eq!(id, "optionable");
                assert_eq!(operator, "=");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(build(&[FilterSpec::new("value_score", "A", "EQUAL")]).is_err());
    }

    #[test]
    fn test_optionable_values() {
        let q = build(&[FilterSpec::new("optionable", "YES", "NOT EQUAL")]).unwrap();
        assert_eq!(q.operators(), vec!["18"]);
        assert!(matches!(
            build(&[FilterSpec::new("optionable", "yes", "EQUAL")]),
            Err(ScrapeError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_unknown_id_is_malformed() {
        let err = build(&[FilterSpec::new("beta", "1", ">=")]).unwrap_err();
        assert!(matches!(err, ScrapeError::MalformedSpec(_)));
    }

    #[test]
    fn test_parallel_arrays_keep_input_order() {
        let specs = vec![
            FilterSpec::new("market_cap", "1000", ">="),
            FilterSpec::new("growth_score", "B", "<="),
            FilterSpec::new("zacks_rank", "2", "<="),
        ];
        let q = build(&specs).unwrap();
        assert_eq!(q.items(), vec!["12010", "15035", "15005"]);
        assert_eq!(q.operators(), vec!["6", "13", "7"]);
        assert_eq!(q.values(), vec!["1000", "B", "2"]);
        assert_eq!(q.item_keys(), vec!["8", "3", "0"]);
        assert_eq!(q.operators().len(), q.item_names().len());
    }

    #[test]
    fn test_build_is_deterministic() {
        let specs = vec![
            FilterSpec::new("vgm_score", "A", "="),
            FilterSpec::new("div_yield", "2.5", ">="),
        ];
        let a = build(&specs).unwrap().to_multipart(FORM_BOUNDARY);
        let b = build(&specs).unwrap().to_multipart(FORM_BOUNDARY);
        assert_eq!(a, b);
    }

    #[test]
    fn test_rejected_spec_leaves_builder_untouched() {
        let mut builder = QueryBuilder::new();
        builder.push(&FilterSpec::new("momentum_score", "C", ">=")).unwrap();
        let before = builder.query();

        assert!(builder.push(&FilterSpec::new("nope", "1", "=")).is_err());
        assert!(builder.push(&FilterSpec::new("zacks_rank", "0", "=")).is_err());

        let after = builder.finish();
        assert_eq!(before, after);
        assert_eq!(&after.form_pairs()[..9], &before.form_pairs()[..9]);
    }

    #[test]
    fn test_boilerplate_leads_form() {
        let q = build(&[FilterSpec::new("p_n_e", "15", "<=")]).unwrap();
        let pairs = q.form_pairs();
        let names: Vec<_> = pairs.iter().map(|(n, _)| *n).collect();
        assert_eq!(
            names,
            vec![
                "is_only_matches",
                "is_premium_exists",
                "is_edit_view",
                "saved_screen_name",
                "tab_id",
                "start_page",
                "no_of_rec",
                "sort_col",
                "sort_type",
                "operator[]",
                "value[]",
                "p_items[]",
                "p_item_name[]",
                "p_item_key[]",
            ]
        );
        assert_eq!(pairs[9].1, "7");
        assert_eq!(pairs[12].1, "P/E (F1)");
    }

    #[test]
    fn test_multipart_layout() {
        let body = String::from_utf8(EncodedQuery::default().to_multipart("XYZ")).unwrap();
        assert!(body.starts_with("--XYZ\r\nContent-Disposition: form-data; name=\"is_only_matches\"\r\n\r\n0\r\n"));
        assert!(body.contains("name=\"saved_screen_name\"\r\n\r\n\r\n--XYZ\r\n"));
        assert!(body.ends_with("\r\n--XYZ--\r\n"));
        assert_eq!(body.matches("--XYZ\r\n").count(), 9);
    }

    #[test]
    fn test_from_block_requires_fields() {
        let ok = FilterSpec::from_block(&block(json!({"id": "zacks_rank", "value": 3, "operator": "<="}))).unwrap();
        assert_eq!(ok, FilterSpec::new("zacks_rank", "3", "<="));

        let missing = FilterSpec::from_block(&block(json!({"id": "zacks_rank", "value": "3"})));
        assert!(matches!(missing, Err(ScrapeError::MalformedSpec(_))));

        let nested = FilterSpec::from_block(&block(json!({"id": "x", "value": ["a"], "operator": "="})));
        assert!(matches!(nested, Err(ScrapeError::MalformedSpec(_))));
    }

    #[test]
    fn test_build_from_blocks_checks_all_specs_before_encoding() {
        let blocks = vec![
            block(json!({"id": "value_score", "value": "A", "operator": "="})),
            block(json!({"value": "A", "operator": "="})),
        ];
        assert!(matches!(build_from_blocks(&blocks), Err(ScrapeError::MalformedSpec(_))));
    }
}
