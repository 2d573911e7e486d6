//! Evaluation helpers for the FDQL executor.
//!
//! Field access with type checking, scalar ordering for SORT, and the
//! decimal arithmetic used by the aggregates.

use std::cmp::Ordering;
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::Value;

use crate::error::{FdqlError, FdqlResult};

/// Read a numeric field from a record.
pub(crate) fn numeric_field(record: &Value, key: &str) -> FdqlResult<f64> {
    match record.get(key) {
        Some(value) => value.as_f64().ok_or_else(|| {
            FdqlError::SemanticError(format!("field '{key}' does not hold a numeric value"))
        }),
        None => Err(FdqlError::SemanticError(format!(
            "record has no field '{key}'"
        ))),
    }
}

/// Read a text field from a record.
pub(crate) fn text_field<'a>(record: &'a Value, key: &str) -> FdqlResult<&'a str> {
    match record.get(key) {
        Some(value) => value.as_str().ok_or_else(|| {
            FdqlError::SemanticError(format!("field '{key}' does not hold a text value"))
        }),
        None => Err(FdqlError::SemanticError(format!(
            "record has no field '{key}'"
        ))),
    }
}

/// Create a serde_json::Number from an f64 value.
#[inline]
pub(crate) fn number_from_f64(n: f64) -> serde_json::Number {
    serde_json::Number::from_f64(n).unwrap_or_else(|| serde_json::Number::from(0))
}

/// Convert a JSON number to a Decimal through its shortest decimal string
/// form, so 10.005 stays 10.005 rather than its binary expansion.
pub(crate) fn decimal_from_f64(n: f64) -> FdqlResult<Decimal> {
    Decimal::from_str(&n.to_string()).map_err(|_| {
        FdqlError::SemanticError(format!("numeric value {n} is outside the decimal range"))
    })
}

/// Round to two decimal places, midpoints away from zero.
#[inline]
pub(crate) fn round2(d: Decimal) -> Decimal {
    d.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Emit a Decimal as a JSON number.
pub(crate) fn decimal_to_value(d: Decimal) -> Value {
    Value::Number(number_from_f64(d.to_f64().unwrap_or(0.0)))
}

/// Canonical string form of a scalar, used for group keys and COUNT's
/// distinct set. Numbers canonicalize through f64 so 85 and 85.0 coincide;
/// other values keep their JSON encoding so the string "1" stays distinct
/// from the number 1.
pub(crate) fn canonical_value_key(value: &Value) -> String {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0).to_string(),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

/// Compare two scalar JSON values for ordering.
///
/// Null < Bool < Number < String; numbers compare by their f64 value.
#[inline]
pub(crate) fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Bool(_), _) => Ordering::Less,
        (_, Value::Bool(_)) => Ordering::Greater,
        (Value::Number(a), Value::Number(b)) => {
            let a = a.as_f64().unwrap_or(0.0);
            let b = b.as_f64().unwrap_or(0.0);
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        (Value::Number(_), _) => Ordering::Less,
        (_, Value::Number(_)) => Ordering::Greater,
        (Value::String(a), Value::String(b)) => a.cmp(b),
        _ => Ordering::Equal,
    }
}
