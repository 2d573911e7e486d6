//! WHERE filter compilation.
//!
//! Each filter node is a single-key object whose key selects the variant:
//! - Connectives: `AND`, `OR` (non-empty arrays), `NOT` (one filter)
//! - Numeric comparisons: `LT`, `GT`, `EQ` (numeric field-key to number)
//! - String comparison: `IS` (text field-key to wildcard pattern)
//!
//! Wildcard patterns are classified here, at compile time; a pattern with an
//! interior `*` never reaches the executor.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::ast::{ComparisonOp, Filter, WildcardPattern};
use crate::error::{FdqlError, FdqlResult};

use super::keys;
use super::{single_entry, Compiler};

static CONTAINS_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\*[^*]*\*$").expect("contains shape regex"));
static SUFFIX_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\*[^*]*$").expect("suffix shape regex"));
static PREFIX_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^*]*\*$").expect("prefix shape regex"));
static EXACT_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^*]*$").expect("exact shape regex"));

impl Compiler {
    /// Parse one filter node.
    pub(super) fn parse_filter(&mut self, value: &Value) -> FdqlResult<Filter> {
        let obj = value
            .as_object()
            .ok_or_else(|| FdqlError::MalformedQuery("filter is not an object".to_string()))?;
        if obj.len() != 1 {
            return Err(FdqlError::MalformedQuery(
                "filter must have exactly one key".to_string(),
            ));
        }
        let (node, body) = obj.iter().next().ok_or_else(|| {
            FdqlError::MalformedQuery("filter must have exactly one key".to_string())
        })?;

        match node.as_str() {
            "AND" => Ok(Filter::And(self.parse_filter_list("AND", body)?)),
            "OR" => Ok(Filter::Or(self.parse_filter_list("OR", body)?)),
            "NOT" => Ok(Filter::Not(Box::new(self.parse_filter(body)?))),
            "LT" => self.parse_comparison(ComparisonOp::Lt, body),
            "GT" => self.parse_comparison(ComparisonOp::Gt, body),
            "EQ" => self.parse_comparison(ComparisonOp::Eq, body),
            "IS" => self.parse_wildcard(body),
            other => Err(FdqlError::MalformedQuery(format!(
                "'{other}' is not a recognized filter"
            ))),
        }
    }

    fn parse_filter_list(&mut self, name: &str, value: &Value) -> FdqlResult<Vec<Filter>> {
        let arr = value.as_array().ok_or_else(|| {
            FdqlError::MalformedQuery(format!("{name} body is not an array"))
        })?;
        if arr.is_empty() {
            return Err(FdqlError::MalformedQuery(format!("{name} body is empty")));
        }
        arr.iter().map(|f| self.parse_filter(f)).collect()
    }

    fn parse_comparison(&mut self, op: ComparisonOp, body: &Value) -> FdqlResult<Filter> {
        let (key, value) = single_entry(body, op.as_str())?;
        let id = keys::validate_numeric_key(key)?;
        self.bind_dataset(id)?;
        let number = value.as_f64().ok_or_else(|| {
            FdqlError::MalformedQuery(format!(
                "{} value for '{key}' is not a number",
                op.as_str()
            ))
        })?;
        Ok(Filter::Comparison {
            op,
            key: key.clone(),
            value: number,
        })
    }

    fn parse_wildcard(&mut self, body: &Value) -> FdqlResult<Filter> {
        let (key, value) = single_entry(body, "IS")?;
        let id = keys::validate_text_key(key)?;
        self.bind_dataset(id)?;
        let pattern = value.as_str().ok_or_else(|| {
            FdqlError::MalformedQuery(format!("IS value for '{key}' is not a string"))
        })?;
        Ok(Filter::Wildcard {
            key: key.clone(),
            pattern: compile_pattern(pattern)?,
        })
    }
}

/// Classify an IS pattern by its wildcard anchoring. The `*` slices below are
/// single bytes, so the string indexing is safe.
pub(super) fn compile_pattern(pattern: &str) -> FdqlResult<WildcardPattern> {
    if CONTAINS_SHAPE.is_match(pattern) {
        Ok(WildcardPattern::Contains(
            pattern[1..pattern.len() - 1].to_string(),
        ))
    } else if SUFFIX_SHAPE.is_match(pattern) {
        Ok(WildcardPattern::Suffix(pattern[1..].to_string()))
    } else if PREFIX_SHAPE.is_match(pattern) {
        Ok(WildcardPattern::Prefix(
            pattern[..pattern.len() - 1].to_string(),
        ))
    } else if EXACT_SHAPE.is_match(pattern) {
        Ok(WildcardPattern::Exact(pattern.to_string()))
    } else {
        Err(FdqlError::MalformedQuery(format!(
            "pattern '{pattern}' has an interior wildcard"
        )))
    }
}
