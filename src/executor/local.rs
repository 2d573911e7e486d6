//! Local executor for compiled FDQL queries.
//!
//! Runs the query pipeline against a RecordStore snapshot: filter evaluation
//! per record, grouped aggregation when a transformation is present, sorting,
//! projection, and the result-size guard.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;
use serde_json::Value;
use tracing::debug;

use crate::ast::{ApplyRule, ApplyToken, ComparisonOp, Direction, Filter, Order, Query, Transformation};
use crate::error::{FdqlError, FdqlResult};
use crate::parser;

use super::helpers::*;
use super::{RecordStore, ResultLimits};

/// Local executor for FDQL queries.
///
/// Executes queries against any RecordStore implementation. The executor
/// takes `&self` only; queries share no mutable state and may run
/// concurrently when the store is `Sync`.
pub struct LocalExecutor<S: RecordStore> {
    store: S,
    limits: ResultLimits,
}

impl<S: RecordStore> LocalExecutor<S> {
    /// Create a new executor with the given record store.
    pub fn new(store: S) -> Self {
        Self {
            store,
            limits: ResultLimits::default(),
        }
    }

    /// Create a new executor with custom limits.
    pub fn with_limits(store: S, limits: ResultLimits) -> Self {
        Self { store, limits }
    }

    /// Compile and run a raw query document.
    ///
    /// # Arguments
    /// * `document` - JSON query document (WHERE / OPTIONS / TRANSFORMATIONS)
    ///
    /// # Returns
    /// Result rows restricted to the requested columns.
    pub fn execute(&self, document: &Value) -> FdqlResult<Vec<Value>> {
        let query = parser::compile(document)?;
        self.execute_query(&query)
    }

    /// Run a compiled query against the store.
    pub fn execute_query(&self, query: &Query) -> FdqlResult<Vec<Value>> {
        let records = self
            .store
            .load(&query.dataset_id)
            .ok_or_else(|| FdqlError::DatasetNotFound(query.dataset_id.clone()))?;
        debug!(
            dataset = %query.dataset_id,
            records = records.len(),
            "loaded dataset snapshot"
        );

        let mut matched = Vec::new();
        for record in records {
            let keep = match &query.filter {
                Some(filter) => evaluate_filter(filter, &record)?,
                None => true,
            };
            if keep {
                matched.push(record);
            }
        }
        debug!(matched = matched.len(), "filter evaluation complete");

        let mut rows = match &query.transformation {
            Some(transformation) => aggregate(transformation, &matched)?,
            None => matched,
        };

        if let Some(order) = &query.options.order {
            sort_rows(&mut rows, order);
        }
        let rows = project(&query.options.columns, rows)?;

        if rows.len() > self.limits.max_results {
            return Err(FdqlError::ResultTooLarge(rows.len()));
        }
        debug!(rows = rows.len(), "query complete");
        Ok(rows)
    }
}

/// Evaluate a filter tree against one record. Pure; every child of a
/// connective is evaluated, so type errors surface regardless of position.
fn evaluate_filter(filter: &Filter, record: &Value) -> FdqlResult<bool> {
    match filter {
        Filter::And(children) => {
            let mut all = true;
            for child in children {
                all &= evaluate_filter(child, record)?;
            }
            Ok(all)
        }
        Filter::Or(children) => {
            let mut any = false;
            for child in children {
                any |= evaluate_filter(child, record)?;
            }
            Ok(any)
        }
        Filter::Not(inner) => Ok(!evaluate_filter(inner, record)?),
        Filter::Comparison { op, key, value } => {
            let field = numeric_field(record, key)?;
            Ok(match op {
                ComparisonOp::Lt => field < *value,
                ComparisonOp::Gt => field > *value,
                ComparisonOp::Eq => field == *value,
            })
        }
        Filter::Wildcard { key, pattern } => Ok(pattern.matches(text_field(record, key)?)),
    }
}

/// Group matched records by their GROUP value tuple and synthesize one row
/// per group. Groups appear in first-seen order.
fn aggregate(transformation: &Transformation, matched: &[Value]) -> FdqlResult<Vec<Value>> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<Vec<&Value>> = Vec::new();

    for record in matched {
        let mut parts = Vec::with_capacity(transformation.group.len());
        for key in &transformation.group {
            let value = record.get(key).ok_or_else(|| {
                FdqlError::SemanticError(format!("record has no field '{key}'"))
            })?;
            parts.push(canonical_value_key(value));
        }
        let group_key = parts.join("|");
        match seen.get(&group_key) {
            Some(&index) => groups[index].push(record),
            None => {
                seen.insert(group_key, groups.len());
                groups.push(vec![record]);
            }
        }
    }
    debug!(groups = groups.len(), "grouping complete");

    let mut rows = Vec::with_capacity(groups.len());
    for members in &groups {
        let mut row = serde_json::Map::new();
        for key in &transformation.group {
            // every member shares the group values by construction
            let value = members[0].get(key).cloned().unwrap_or(Value::Null);
            row.insert(key.clone(), value);
        }
        for rule in &transformation.apply {
            row.insert(rule.output_key.clone(), apply_rule_value(rule, members)?);
        }
        rows.push(Value::Object(row));
    }
    Ok(rows)
}

/// Compute one aggregate value over a non-empty group.
fn apply_rule_value(rule: &ApplyRule, members: &[&Value]) -> FdqlResult<Value> {
    match rule.token {
        ApplyToken::Count => {
            let mut distinct: HashSet<String> = HashSet::new();
            for member in members {
                let value = member.get(&rule.source_key).ok_or_else(|| {
                    FdqlError::SemanticError(format!(
                        "record has no field '{}'",
                        rule.source_key
                    ))
                })?;
                distinct.insert(canonical_value_key(value));
            }
            Ok(Value::Number(serde_json::Number::from(distinct.len())))
        }
        ApplyToken::Max => {
            let values = numeric_values(rule, members)?;
            Ok(decimal_to_value(
                values.into_iter().max().unwrap_or_default(),
            ))
        }
        ApplyToken::Min => {
            let values = numeric_values(rule, members)?;
            Ok(decimal_to_value(
                values.into_iter().min().unwrap_or_default(),
            ))
        }
        ApplyToken::Sum => {
            let total: Decimal = numeric_values(rule, members)?.into_iter().sum();
            Ok(decimal_to_value(round2(total)))
        }
        ApplyToken::Avg => {
            let values = numeric_values(rule, members)?;
            let count = values.len();
            let total: Decimal = values.into_iter().sum();
            Ok(decimal_to_value(round2(total / Decimal::from(count as u64))))
        }
    }
}

/// Collect the source values of a numeric aggregate as Decimals.
fn numeric_values(rule: &ApplyRule, members: &[&Value]) -> FdqlResult<Vec<Decimal>> {
    let mut values = Vec::with_capacity(members.len());
    for member in members {
        let n = numeric_field(member, &rule.source_key).map_err(|_| {
            FdqlError::SemanticError(format!(
                "{} requires numeric values at '{}'",
                rule.token.as_str(),
                rule.source_key
            ))
        })?;
        values.push(decimal_from_f64(n)?);
    }
    Ok(values)
}

/// Sort rows in place. Single-key orders ascend; multi-key orders compare
/// keys in listed order with one direction applied to all of them.
fn sort_rows(rows: &mut [Value], order: &Order) {
    match order {
        Order::Single(key) => rows.sort_by(|a, b| compare_field(a, b, key)),
        Order::Multi { dir, keys } => rows.sort_by(|a, b| {
            for key in keys {
                let ordering = compare_field(a, b, key);
                if ordering != Ordering::Equal {
                    return match dir {
                        Direction::Up => ordering,
                        Direction::Down => ordering.reverse(),
                    };
                }
            }
            Ordering::Equal
        }),
    }
}

fn compare_field(a: &Value, b: &Value, key: &str) -> Ordering {
    compare_values(
        a.get(key).unwrap_or(&Value::Null),
        b.get(key).unwrap_or(&Value::Null),
    )
}

/// Restrict every row to the requested columns.
fn project(columns: &[String], rows: Vec<Value>) -> FdqlResult<Vec<Value>> {
    let mut projected = Vec::with_capacity(rows.len());
    for row in rows {
        let mut out = serde_json::Map::new();
        for column in columns {
            let value = row.get(column).cloned().ok_or_else(|| {
                FdqlError::SemanticError(format!("'{column}' is missing from the result row"))
            })?;
            out.insert(column.clone(), value);
        }
        projected.push(Value::Object(out));
    }
    Ok(projected)
}
