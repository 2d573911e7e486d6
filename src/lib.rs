//! FDQL Core - Storage-independent FDQL query compiler and executor.
//!
//! FDQL queries are JSON documents describing a filter predicate (WHERE), a
//! projection and sort order (OPTIONS), and an optional grouping/aggregation
//! step (TRANSFORMATIONS) over one flat dataset. This crate compiles such a
//! document into a typed AST, validates it fully before any record is
//! touched, and evaluates it against a [`RecordStore`] implementation.
//!
//! # Main Components
//!
//! - **Parser**: Validates and compiles JSON query documents into an AST
//! - **AST**: Typed representation of filter, options, and transformation
//! - **Executor**: Runs compiled queries against a `RecordStore` trait
//!   implementation
//!
//! # Example
//!
//! ```rust
//! use fdql_core::{InMemoryRecordStore, LocalExecutor};
//! use serde_json::json;
//!
//! // Create an in-memory record store for testing
//! let mut store = InMemoryRecordStore::new();
//! store.add_dataset("sections", vec![
//!     json!({"sections_dept": "cpsc", "sections_avg": 85.2}),
//!     json!({"sections_dept": "math", "sections_avg": 71.4}),
//! ]);
//!
//! // Create executor
//! let executor = LocalExecutor::new(store);
//!
//! // Execute a query document
//! let results = executor.execute(&json!({
//!     "WHERE": {"GT": {"sections_avg": 80}},
//!     "OPTIONS": {"COLUMNS": ["sections_dept", "sections_avg"]}
//! })).unwrap();
//! assert_eq!(results, vec![json!({"sections_dept": "cpsc", "sections_avg": 85.2})]);
//! ```

pub mod ast;
pub mod error;
pub mod executor;
pub mod parser;

// Re-export main types for convenience
pub use ast::{
    ApplyRule, ApplyToken, ComparisonOp, Direction, Filter, Options, Order, Query, Transformation,
    WildcardPattern,
};
pub use error::{FdqlError, FdqlResult};
pub use executor::{InMemoryRecordStore, LocalExecutor, RecordStore, ResultLimits};
pub use parser::compile;
