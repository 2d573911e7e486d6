//! Executor module for FDQL queries.
//!
//! This module provides a trait-based executor that can run compiled FDQL
//! queries against any record store implementing the RecordStore trait.

mod helpers;
mod local;

pub use local::LocalExecutor;

use serde_json::Value;
use std::collections::HashMap;

/// Trait for record stores that serve dataset snapshots to the executor.
///
/// The executor takes one immutable snapshot per query and never writes back.
/// Implementations are responsible for atomic publication of dataset
/// versions: concurrent queries against the same dataset id must each observe
/// a consistent snapshot; the executor performs no locking of its own.
pub trait RecordStore {
    /// Load all records of a dataset.
    ///
    /// # Arguments
    /// * `dataset_id` - Identifier of the dataset to load
    ///
    /// # Returns
    /// The dataset's records, or None when no record set is loaded under
    /// that id.
    fn load(&self, dataset_id: &str) -> Option<Vec<Value>>;

    /// Check if a dataset exists.
    fn dataset_exists(&self, dataset_id: &str) -> bool;

    /// List all dataset ids.
    fn list_datasets(&self) -> Vec<String> {
        vec![]
    }
}

/// Ceiling applied to query results.
#[derive(Debug, Clone)]
pub struct ResultLimits {
    /// Maximum number of rows a query may return (default: 5,000). The guard
    /// runs after projection and sorting, since aggregation can shrink the
    /// row count below the raw match count.
    pub max_results: usize,
}

impl Default for ResultLimits {
    fn default() -> Self {
        Self { max_results: 5_000 }
    }
}

/// In-memory record store for testing and embedding.
#[derive(Default)]
pub struct InMemoryRecordStore {
    datasets: HashMap<String, Vec<Value>>,
}

impl InMemoryRecordStore {
    /// Create a new empty in-memory record store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a dataset with its records.
    pub fn add_dataset(&mut self, id: &str, records: Vec<Value>) {
        self.datasets.insert(id.to_string(), records);
    }

    /// Remove a dataset. Returns true when it existed.
    pub fn remove_dataset(&mut self, id: &str) -> bool {
        self.datasets.remove(id).is_some()
    }
}

impl RecordStore for InMemoryRecordStore {
    fn load(&self, dataset_id: &str) -> Option<Vec<Value>> {
        self.datasets.get(dataset_id).cloned()
    }

    fn dataset_exists(&self, dataset_id: &str) -> bool {
        self.datasets.contains_key(dataset_id)
    }

    fn list_datasets(&self) -> Vec<String> {
        self.datasets.keys().cloned().collect()
    }
}
