//! Validator + compiler for FDQL query documents.
//!
//! Converts an untyped `serde_json::Value` into a typed [`Query`], rejecting
//! structurally or semantically invalid documents before any record is
//! touched. Structural rules (key sets, value kinds, non-empty lists) fail
//! with [`FdqlError::MalformedQuery`]; logically inconsistent documents
//! (mixed dataset ids, wrong field kind for a comparator, columns outside the
//! result schema) fail with [`FdqlError::SemanticError`].

mod filter;
mod keys;

use std::collections::HashSet;

use serde_json::Value;

use crate::ast::{ApplyRule, ApplyToken, Direction, Options, Order, Query, Transformation};
use crate::error::{FdqlError, FdqlResult};

/// Compile a raw query document into a typed [`Query`].
///
/// A successful compile guarantees the executor only ever runs against a
/// well-typed AST: every field-key is well-formed and bound to the single
/// dataset id, and every projected or ordered key exists in the result
/// schema.
pub fn compile(document: &Value) -> FdqlResult<Query> {
    Compiler::default().compile(document)
}

/// Recursive-descent compiler over the document. Holds the dataset binding
/// accumulated from the field-keys seen so far; traversal is depth-first,
/// left-to-right (WHERE, then OPTIONS, then TRANSFORMATIONS), so the first
/// field-key in document order fixes the id.
#[derive(Default)]
struct Compiler {
    dataset_id: Option<String>,
}

impl Compiler {
    fn compile(mut self, document: &Value) -> FdqlResult<Query> {
        let root = document
            .as_object()
            .ok_or_else(|| FdqlError::MalformedQuery("query is not an object".to_string()))?;
        for key in root.keys() {
            if key != "WHERE" && key != "OPTIONS" && key != "TRANSFORMATIONS" {
                return Err(FdqlError::MalformedQuery(format!(
                    "'{key}' is not a recognized top-level key"
                )));
            }
        }
        let where_clause = root
            .get("WHERE")
            .ok_or_else(|| FdqlError::MalformedQuery("query has no WHERE".to_string()))?;
        let options_clause = root
            .get("OPTIONS")
            .ok_or_else(|| FdqlError::MalformedQuery("query has no OPTIONS".to_string()))?;

        let where_obj = where_clause
            .as_object()
            .ok_or_else(|| FdqlError::MalformedQuery("WHERE is not an object".to_string()))?;
        // an empty WHERE matches every record
        let filter = if where_obj.is_empty() {
            None
        } else {
            Some(self.parse_filter(where_clause)?)
        };

        let options = self.parse_options(options_clause)?;
        let transformation = match root.get("TRANSFORMATIONS") {
            Some(t) => Some(self.parse_transformations(t)?),
            None => None,
        };

        self.check_result_schema(&options, transformation.as_ref())?;

        let dataset_id = self.dataset_id.ok_or_else(|| {
            FdqlError::MalformedQuery("query references no dataset field-key".to_string())
        })?;

        Ok(Query {
            filter,
            options,
            transformation,
            dataset_id,
        })
    }

    /// Bind a dataset id, or check it against the one already bound.
    fn bind_dataset(&mut self, id: &str) -> FdqlResult<()> {
        match &self.dataset_id {
            None => {
                self.dataset_id = Some(id.to_string());
                Ok(())
            }
            Some(bound) if bound == id => Ok(()),
            Some(bound) => Err(FdqlError::SemanticError(format!(
                "key references dataset '{id}' but the query is bound to '{bound}'"
            ))),
        }
    }

    fn parse_options(&mut self, value: &Value) -> FdqlResult<Options> {
        let obj = value
            .as_object()
            .ok_or_else(|| FdqlError::MalformedQuery("OPTIONS is not an object".to_string()))?;
        for key in obj.keys() {
            if key != "COLUMNS" && key != "ORDER" {
                return Err(FdqlError::MalformedQuery(format!(
                    "'{key}' is not a recognized OPTIONS key"
                )));
            }
        }
        let columns_value = obj
            .get("COLUMNS")
            .ok_or_else(|| FdqlError::MalformedQuery("OPTIONS has no COLUMNS".to_string()))?;
        let columns = self.parse_key_list(columns_value, "COLUMNS")?;
        let order = match obj.get("ORDER") {
            Some(o) => Some(self.parse_order(o)?),
            None => None,
        };
        Ok(Options { columns, order })
    }

    fn parse_order(&mut self, value: &Value) -> FdqlResult<Order> {
        if value.is_string() {
            return Ok(Order::Single(self.parse_any_key(value, "ORDER")?));
        }
        let obj = value.as_object().ok_or_else(|| {
            FdqlError::MalformedQuery("ORDER is not a string or object".to_string())
        })?;
        if obj.len() != 2 || !obj.contains_key("dir") || !obj.contains_key("keys") {
            return Err(FdqlError::MalformedQuery(
                "ORDER object must have exactly dir and keys".to_string(),
            ));
        }
        let dir = match obj.get("dir").and_then(Value::as_str) {
            Some("UP") => Direction::Up,
            Some("DOWN") => Direction::Down,
            Some(other) => {
                return Err(FdqlError::MalformedQuery(format!(
                    "ORDER dir '{other}' is not UP or DOWN"
                )))
            }
            None => {
                return Err(FdqlError::MalformedQuery(
                    "ORDER dir is not a string".to_string(),
                ))
            }
        };
        let keys = self.parse_key_list(&obj["keys"], "ORDER keys")?;
        Ok(Order::Multi { dir, keys })
    }

    fn parse_transformations(&mut self, value: &Value) -> FdqlResult<Transformation> {
        let obj = value.as_object().ok_or_else(|| {
            FdqlError::MalformedQuery("TRANSFORMATIONS is not an object".to_string())
        })?;
        if obj.len() != 2 || !obj.contains_key("GROUP") || !obj.contains_key("APPLY") {
            return Err(FdqlError::MalformedQuery(
                "TRANSFORMATIONS must have exactly GROUP and APPLY".to_string(),
            ));
        }
        let group = self.parse_group_list(&obj["GROUP"])?;
        let apply = self.parse_apply_list(&obj["APPLY"])?;
        Ok(Transformation { group, apply })
    }

    /// GROUP accepts field-keys only, never apply-keys.
    fn parse_group_list(&mut self, value: &Value) -> FdqlResult<Vec<String>> {
        let arr = value
            .as_array()
            .ok_or_else(|| FdqlError::MalformedQuery("GROUP is not an array".to_string()))?;
        if arr.is_empty() {
            return Err(FdqlError::MalformedQuery("GROUP is empty".to_string()));
        }
        let mut group = Vec::with_capacity(arr.len());
        for value in arr {
            let key = value.as_str().ok_or_else(|| {
                FdqlError::MalformedQuery("GROUP key is not a string".to_string())
            })?;
            let id = keys::validate_any_field_key(key)?;
            self.bind_dataset(id)?;
            group.push(key.to_string());
        }
        Ok(group)
    }

    fn parse_apply_list(&mut self, value: &Value) -> FdqlResult<Vec<ApplyRule>> {
        let arr = value
            .as_array()
            .ok_or_else(|| FdqlError::MalformedQuery("APPLY is not an array".to_string()))?;
        // APPLY may be empty: grouping alone still collapses duplicates
        let mut rules = Vec::with_capacity(arr.len());
        let mut seen: HashSet<String> = HashSet::new();
        for rule in arr {
            let rule = self.parse_apply_rule(rule)?;
            if !seen.insert(rule.output_key.clone()) {
                return Err(FdqlError::SemanticError(format!(
                    "duplicate APPLY key '{}'",
                    rule.output_key
                )));
            }
            rules.push(rule);
        }
        Ok(rules)
    }

    fn parse_apply_rule(&mut self, value: &Value) -> FdqlResult<ApplyRule> {
        let (output_key, body) = single_entry(value, "APPLY rule")?;
        keys::validate_apply_key(output_key)?;
        let (token_name, source) = single_entry(body, "APPLY token")?;
        let token = ApplyToken::from_token(token_name).ok_or_else(|| {
            FdqlError::MalformedQuery(format!("'{token_name}' is not a valid APPLY token"))
        })?;
        let source_key = self.parse_any_key(source, "APPLY")?;
        Ok(ApplyRule {
            output_key: output_key.clone(),
            token,
            source_key,
        })
    }

    fn parse_key_list(&mut self, value: &Value, what: &str) -> FdqlResult<Vec<String>> {
        let arr = value
            .as_array()
            .ok_or_else(|| FdqlError::MalformedQuery(format!("{what} is not an array")))?;
        if arr.is_empty() {
            return Err(FdqlError::MalformedQuery(format!("{what} is empty")));
        }
        arr.iter().map(|k| self.parse_any_key(k, what)).collect()
    }

    /// Parse a key that may be either a field-key or an apply-key. The
    /// namespace separator decides which grammar applies.
    fn parse_any_key(&mut self, value: &Value, what: &str) -> FdqlResult<String> {
        let key = value
            .as_str()
            .ok_or_else(|| FdqlError::MalformedQuery(format!("{what} key is not a string")))?;
        if key.contains('_') {
            let id = keys::validate_any_field_key(key)?;
            self.bind_dataset(id)?;
        } else {
            keys::validate_apply_key(key)?;
        }
        Ok(key.to_string())
    }

    /// Check COLUMNS and ORDER keys against the result schema. With a
    /// transformation the schema is exactly the GROUP keys plus the APPLY
    /// output keys; without one, only raw field-keys exist.
    fn check_result_schema(
        &self,
        options: &Options,
        transformation: Option<&Transformation>,
    ) -> FdqlResult<()> {
        let order_keys: &[String] = match &options.order {
            Some(Order::Single(key)) => std::slice::from_ref(key),
            Some(Order::Multi { keys, .. }) => keys,
            None => &[],
        };
        match transformation {
            Some(t) => {
                let mut schema: HashSet<&str> = t.group.iter().map(String::as_str).collect();
                schema.extend(t.apply.iter().map(|r| r.output_key.as_str()));
                for key in options.columns.iter().chain(order_keys) {
                    if !schema.contains(key.as_str()) {
                        return Err(FdqlError::SemanticError(format!(
                            "'{key}' is not a GROUP key or APPLY key of the transformation"
                        )));
                    }
                }
            }
            None => {
                for key in options.columns.iter().chain(order_keys) {
                    if !key.contains('_') {
                        return Err(FdqlError::SemanticError(format!(
                            "'{key}' is an apply key but the query has no TRANSFORMATIONS"
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Unwrap an object with exactly one entry, the shape shared by comparison
/// bodies and apply rules.
fn single_entry<'a>(value: &'a Value, what: &str) -> FdqlResult<(&'a String, &'a Value)> {
    let obj = value
        .as_object()
        .ok_or_else(|| FdqlError::MalformedQuery(format!("{what} body is not an object")))?;
    if obj.len() != 1 {
        return Err(FdqlError::MalformedQuery(format!(
            "{what} body must have exactly one key"
        )));
    }
    obj.iter().next().ok_or_else(|| {
        FdqlError::MalformedQuery(format!("{what} body must have exactly one key"))
    })
}
