//! Field-key and apply-key grammar.
//!
//! Field-keys name record attributes and are always `<idstring>_<field>`,
//! where the idstring is the dataset identifier (non-empty, no underscore)
//! and the field is drawn from a fixed enumerated set partitioned into
//! numeric and text fields. Apply-keys name synthesized aggregate columns
//! and must not contain the namespace separator at all.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{FdqlError, FdqlResult};

/// Fields holding numeric values.
pub(crate) const NUMERIC_FIELDS: &[&str] =
    &["avg", "pass", "fail", "audit", "year", "lat", "lon", "seats"];

/// Fields holding text values.
pub(crate) const TEXT_FIELDS: &[&str] = &[
    "dept",
    "id",
    "instructor",
    "title",
    "uuid",
    "fullname",
    "shortname",
    "number",
    "name",
    "address",
    "type",
    "furniture",
    "href",
];

static FIELD_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new("^([^_]+)_([^_]+)$").expect("field-key regex"));

/// Split a field-key into (idstring, field), checking the grammar only.
pub(crate) fn split_field_key(key: &str) -> FdqlResult<(&str, &str)> {
    let captures = FIELD_KEY.captures(key).ok_or_else(|| {
        FdqlError::MalformedQuery(format!("'{key}' is not of the form <id>_<field>"))
    })?;
    let id = captures.get(1).map_or("", |m| m.as_str());
    let field = captures.get(2).map_or("", |m| m.as_str());
    Ok((id, field))
}

/// Validate a field-key used in a numeric comparison or aggregate context.
/// Returns the dataset id.
pub(crate) fn validate_numeric_key(key: &str) -> FdqlResult<&str> {
    let (id, field) = split_field_key(key)?;
    if NUMERIC_FIELDS.contains(&field) {
        Ok(id)
    } else if TEXT_FIELDS.contains(&field) {
        Err(FdqlError::SemanticError(format!(
            "text field '{field}' used in a numeric comparison"
        )))
    } else {
        Err(FdqlError::MalformedQuery(format!(
            "'{field}' is not a recognized field"
        )))
    }
}

/// Validate a field-key used in a string comparison. Returns the dataset id.
pub(crate) fn validate_text_key(key: &str) -> FdqlResult<&str> {
    let (id, field) = split_field_key(key)?;
    if TEXT_FIELDS.contains(&field) {
        Ok(id)
    } else if NUMERIC_FIELDS.contains(&field) {
        Err(FdqlError::SemanticError(format!(
            "numeric field '{field}' used in a string comparison"
        )))
    } else {
        Err(FdqlError::MalformedQuery(format!(
            "'{field}' is not a recognized field"
        )))
    }
}

/// Validate a field-key in a context accepting either kind (COLUMNS, ORDER,
/// GROUP, APPLY sources). Returns the dataset id.
pub(crate) fn validate_any_field_key(key: &str) -> FdqlResult<&str> {
    let (id, field) = split_field_key(key)?;
    if NUMERIC_FIELDS.contains(&field) || TEXT_FIELDS.contains(&field) {
        Ok(id)
    } else {
        Err(FdqlError::MalformedQuery(format!(
            "'{field}' is not a recognized field"
        )))
    }
}

/// Validate an apply-key: non-empty, no namespace separator.
pub(crate) fn validate_apply_key(key: &str) -> FdqlResult<()> {
    if key.is_empty() {
        return Err(FdqlError::MalformedQuery("apply key is empty".to_string()));
    }
    if key.contains('_') {
        return Err(FdqlError::MalformedQuery(format!(
            "apply key '{key}' contains an underscore"
        )));
    }
    Ok(())
}
