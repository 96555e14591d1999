//! Metadata filters and the inline `field:value` syntax

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Numeric comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterOrEqual,
    LessThan,
    LessOrEqual,
}

impl CompareOp {
    fn holds(&self, lhs: f64, rhs: f64) -> bool {
        match self {
            Self::Equal => lhs == rhs,
            Self::NotEqual => lhs != rhs,
            Self::GreaterThan => lhs > rhs,
            Self::GreaterOrEqual => lhs >= rhs,
            Self::LessThan => lhs < rhs,
            Self::LessOrEqual => lhs <= rhs,
        }
    }

    fn parse_prefix(s: &str) -> (Self, &str) {
        for (prefix, op) in [
            (">=", Self::GreaterOrEqual),
            ("<=", Self::LessOrEqual),
            ("!=", Self::NotEqual),
            (">", Self::GreaterThan),
            ("<", Self::LessThan),
            ("=", Self::Equal),
        ] {
            if let Some(rest) = s.strip_prefix(prefix) {
                return (op, rest);
            }
        }
        (Self::Equal, s)
    }
}

/// Hard filter on one metadata field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "snake_case")]
pub enum FieldFilter {
    /// Field equals the value; list fields must contain it. Strings compare case-insensitively.
    Equals(Value),
    /// Numeric comparison; null or missing fields never match
    Compare(CompareOp, f64),
    /// Field is null or missing
    IsNull,
    /// Every inner filter must match
    All(Vec<FieldFilter>),
}

impl FieldFilter {
    /// Evaluate against a field value (`None` when the field is missing)
    pub fn matches(&self, value: Option<&Value>) -> bool {
        match self {
            Self::Equals(expected) => match value {
                Some(Value::Array(items)) => items.iter().any(|item| values_equal(item, expected)),
                Some(actual) => values_equal(actual, expected),
                None => false,
            },
            Self::Compare(op, rhs) => value
                .and_then(Value::as_f64)
                .is_some_and(|lhs| op.holds(lhs, *rhs)),
            Self::IsNull => value.map_or(true, Value::is_null),
            Self::All(filters) => filters.iter().all(|f| f.matches(value)),
        }
    }

    /// Combine with another filter on the same field
    pub fn and(self, other: FieldFilter) -> FieldFilter {
        match self {
            Self::All(mut filters) => {
                filters.push(other);
                Self::All(filters)
            }
            first => Self::All(vec![first, other]),
        }
    }
}

fn values_equal(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::String(a), Value::String(b)) => a.trim().eq_ignore_ascii_case(b.trim()),
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => actual == expected,
    }
}

/// Check a metadata map against every filter
pub(crate) fn matches_all(
    filters: &BTreeMap<String, FieldFilter>,
    metadata: &BTreeMap<String, Value>,
) -> bool {
    filters
        .iter()
        .all(|(field, filter)| filter.matches(metadata.get(field)))
}

/// Parse inline filters from a request
///
/// Supports syntax: "tag:vegan rating:>=3 cooked:false chocolate cake"
/// Returns: (remaining text, filters keyed by metadata field)
pub fn parse_inline_filters(request: &str) -> (String, BTreeMap<String, FieldFilter>) {
    let mut filters: BTreeMap<String, FieldFilter> = BTreeMap::new();
    let mut remaining_terms = Vec::new();

    for term in request.split_whitespace() {
        if let Some((field, filter)) = parse_filter_term(term) {
            let combined = match filters.remove(field) {
                Some(existing) => existing.and(filter),
                None => filter,
            };
            filters.insert(field.to_string(), combined);
            continue;
        }
        remaining_terms.push(term);
    }

    (remaining_terms.join(" "), filters)
}

fn parse_filter_term(term: &str) -> Option<(&'static str, FieldFilter)> {
    let (key, raw) = term.split_once(':')?;
    if raw.is_empty() {
        return None;
    }
    let value = raw.replace('_', " ");

    match key.to_lowercase().as_str() {
        "tag" => Some(("tags", FieldFilter::Equals(Value::String(value)))),
        "ingredient" => Some(("shopping_list", FieldFilter::Equals(Value::String(value)))),
        "source" => Some(("source_name", FieldFilter::Equals(Value::String(value)))),
        "author" => Some(("author", FieldFilter::Equals(Value::String(value)))),
        "cooked" => match raw.to_lowercase().as_str() {
            "true" | "yes" => Some(("cooked", FieldFilter::Equals(Value::Bool(true)))),
            "false" | "no" => Some(("cooked", FieldFilter::Equals(Value::Bool(false)))),
            _ => None,
        },
        "rating" => {
            if raw.eq_ignore_ascii_case("null") || raw.eq_ignore_ascii_case("none") {
                return Some(("rating", FieldFilter::IsNull));
            }
            let (op, number) = CompareOp::parse_prefix(raw);
            let threshold: f64 = number.parse().ok()?;
            threshold
                .is_finite()
                .then_some(("rating", FieldFilter::Compare(op, threshold)))
        }
        _ => None,
    }
}
