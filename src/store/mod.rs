//! Storage backends for the knowledge base.
//!
//! The [`VectorStore`] trait is the seam between the knowledge-store facade
//! and whatever holds the records. A backend owns exactly one collection
//! and provides upsert-by-id, ranked text query, metadata-filtered reads and
//! deletes, and a record count.
//!
//! | Backend | Ranking |
//! |---------|---------|
//! | [`sqlite::SqliteStore`] | FTS5 `bm25` |
//! | [`memory::MemoryStore`] | distinct query-term overlap |

pub mod memory;
pub mod sqlite;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{StoreError, StoreResult};
use crate::models::{Metadata, Record};

/// Equality conjunction over metadata keys: every entry must match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: BTreeMap<String, Value>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter with a single `key == value` clause.
    pub fn by(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new().and(key, value)
    }

    pub fn and(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.clauses.insert(key.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn clauses(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.clauses.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Reject keys that are not plain identifiers and non-scalar values.
    pub fn validate(&self) -> StoreResult<()> {
        for (key, value) in &self.clauses {
            let plain = !key.is_empty()
                && key
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_');
            if !plain {
                return Err(StoreError::InvalidFilter(format!(
                    "metadata key '{}' must match [A-Za-z0-9_]+",
                    key
                )));
            }
            if !matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_)) {
                return Err(StoreError::InvalidFilter(format!(
                    "value for '{}' must be a string, number, or bool",
                    key
                )));
            }
        }
        Ok(())
    }

    /// Whether `metadata` satisfies every clause.
    pub fn matches(&self, metadata: &Metadata) -> bool {
        self.clauses
            .iter()
            .all(|(key, want)| metadata.get(key) == Some(want))
    }
}

/// Lowercased alphanumeric terms of `text`, in order of appearance.
pub fn query_terms(text: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    for term in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
    {
        if !terms.contains(&term) {
            terms.push(term);
        }
    }
    terms
}

/// A document store holding one collection.
///
/// Implementations must be `Send + Sync` to work with async runtimes.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Name of the collection this handle is bound to.
    fn collection(&self) -> &str;

    /// Insert records, replacing any with the same ID.
    async fn upsert(&self, records: &[Record]) -> StoreResult<()>;

    /// Up to `n` records relevant to `text`, best first.
    async fn query(&self, text: &str, n: usize, filter: Option<&Filter>)
        -> StoreResult<Vec<Record>>;

    /// Records matching `filter` (all records when `None`), oldest first.
    async fn get(&self, filter: Option<&Filter>, limit: Option<usize>) -> StoreResult<Vec<Record>>;

    /// Delete records by ID; returns how many existed.
    async fn delete_ids(&self, ids: &[String]) -> StoreResult<u64>;

    /// Delete records matching `filter` (all records when `None`).
    async fn delete_where(&self, filter: Option<&Filter>) -> StoreResult<u64>;

    /// Number of records in the collection.
    async fn count(&self) -> StoreResult<u64>;

    /// Release any held connections.
    async fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn meta(v: Value) -> Metadata {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_filter_matches_all_clauses() {
        let f = Filter::by("type", "skill").and("chunk_index", 0);
        assert!(f.matches(&meta(json!({"type": "skill", "chunk_index": 0, "x": 1}))));
        assert!(!f.matches(&meta(json!({"type": "skill", "chunk_index": 1}))));
        assert!(!f.matches(&meta(json!({"type": "session"}))));
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        assert!(Filter::new().matches(&meta(json!({}))));
    }

    #[test]
    fn test_filter_validation() {
        assert!(Filter::by("type", "skill").validate().is_ok());
        assert!(Filter::by("bad key", "x").validate().is_err());
        assert!(Filter::by("type'); --", "x").validate().is_err());
        assert!(Filter::by("tags", json!(["a"])).validate().is_err());
        assert!(Filter::by("none", Value::Null).validate().is_err());
    }

    #[test]
    fn test_query_terms() {
        assert_eq!(
            query_terms("How do I send SMS? send-sms, \"quoted\""),
            vec!["how", "do", "i", "send", "sms", "quoted"]
        );
        assert!(query_terms("  ?!  ").is_empty());
    }
}
