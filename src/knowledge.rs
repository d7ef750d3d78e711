//! Knowledge store facade.
//!
//! [`KnowledgeStore`] sits in front of a [`VectorStore`] backend. It derives
//! deterministic document IDs, drops blank chunks, batches writes, and
//! shapes query results into [`SearchHit`]s with a positional score.
//! Everything else is forwarded to the backend unchanged.
//!
//! # Document IDs
//!
//! When a caller does not supply an ID, one is derived from
//! `type:source:date:chunk_index:<first 200 chars of text>` and hashed with
//! SHA-256. Re-ingesting unchanged content with unchanged metadata yields
//! the same ID, so writes overwrite instead of duplicating.

use std::collections::BTreeMap;

use anyhow::Result;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::chunk::truncate_chars;
use crate::config::Config;
use crate::error::{StoreError, StoreResult};
use crate::models::{Chunk, CollectionStats, Metadata, Record, SearchHit};
use crate::store::sqlite::SqliteStore;
use crate::store::{Filter, VectorStore};

/// Characters of text that feed the document ID.
const ID_TEXT_PREFIX: usize = 200;

pub struct KnowledgeStore {
    backend: Box<dyn VectorStore>,
}

impl KnowledgeStore {
    /// Wrap an existing backend.
    pub fn new(backend: Box<dyn VectorStore>) -> Self {
        Self { backend }
    }

    /// Open the SQLite-backed collection named in `config`.
    pub async fn open(config: &Config) -> Result<Self> {
        let backend = SqliteStore::open(&config.store.path, &config.store.collection).await?;
        tracing::debug!(
            path = %config.store.path.display(),
            collection = %config.store.collection,
            "opened knowledge store"
        );
        Ok(Self::new(Box::new(backend)))
    }

    pub fn collection(&self) -> &str {
        self.backend.collection()
    }

    /// Store one document and return its ID.
    pub async fn add(&self, text: &str, metadata: Metadata, id: Option<&str>) -> StoreResult<String> {
        if text.trim().is_empty() {
            return Err(StoreError::EmptyText);
        }

        let id = match id {
            Some(id) => id.to_string(),
            None => document_id(text, &metadata),
        };
        self.backend
            .upsert(&[Record {
                id: id.clone(),
                text: text.to_string(),
                metadata,
            }])
            .await?;
        Ok(id)
    }

    /// Store chunks in batches of `batch_size`, skipping blank ones.
    ///
    /// Returns the IDs of the stored chunks in input order.
    pub async fn add_batch(&self, chunks: &[Chunk], batch_size: usize) -> StoreResult<Vec<String>> {
        let records: Vec<Record> = chunks
            .iter()
            .filter(|c| !c.text.trim().is_empty())
            .map(|c| Record {
                id: c
                    .id
                    .clone()
                    .unwrap_or_else(|| document_id(&c.text, &c.metadata)),
                text: c.text.clone(),
                metadata: c.metadata.clone(),
            })
            .collect();

        let skipped = chunks.len() - records.len();
        if skipped > 0 {
            tracing::debug!(skipped, "dropped blank chunks");
        }

        for (i, batch) in records.chunks(batch_size.max(1)).enumerate() {
            self.backend.upsert(batch).await?;
            tracing::debug!(batch = i + 1, records = batch.len(), "stored batch");
        }

        Ok(records.into_iter().map(|r| r.id).collect())
    }

    /// Up to `n` hits for `query`, best first.
    pub async fn search(
        &self,
        query: &str,
        n: usize,
        filter: Option<&Filter>,
    ) -> StoreResult<Vec<SearchHit>> {
        let records = self.backend.query(query, n, filter).await?;
        let total = records.len();

        Ok(records
            .into_iter()
            .enumerate()
            .map(|(rank, r)| SearchHit {
                id: r.id,
                text: r.text,
                metadata: r.metadata,
                score: 1.0 - rank as f64 / total as f64,
            })
            .collect())
    }

    /// Delete one document. Returns whether it existed.
    pub async fn delete(&self, id: &str) -> StoreResult<bool> {
        Ok(self.backend.delete_ids(&[id.to_string()]).await? > 0)
    }

    /// Delete every document matching `filter`.
    ///
    /// An empty filter is rejected; use [`KnowledgeStore::reset`] to clear
    /// the collection.
    pub async fn delete_by_filter(&self, filter: &Filter) -> StoreResult<u64> {
        if filter.is_empty() {
            return Err(StoreError::InvalidFilter(
                "refusing to delete with an empty filter".to_string(),
            ));
        }
        self.backend.delete_where(Some(filter)).await
    }

    /// Documents matching `filter`, oldest first.
    pub async fn get(&self, filter: Option<&Filter>, limit: Option<usize>) -> StoreResult<Vec<Record>> {
        self.backend.get(filter, limit).await
    }

    pub async fn count(&self) -> StoreResult<u64> {
        self.backend.count().await
    }

    /// Totals for the whole collection, grouped by `source` and `type`.
    pub async fn stats(&self) -> StoreResult<CollectionStats> {
        let records = self.backend.get(None, None).await?;
        let mut by_source: BTreeMap<String, u64> = BTreeMap::new();
        let mut by_type: BTreeMap<String, u64> = BTreeMap::new();

        for r in &records {
            *by_source.entry(meta_field(&r.metadata, "source")).or_default() += 1;
            *by_type.entry(meta_field(&r.metadata, "type")).or_default() += 1;
        }

        Ok(CollectionStats {
            collection: self.collection().to_string(),
            total: records.len() as u64,
            by_source,
            by_type,
        })
    }

    /// Delete every document in the collection. Returns how many were removed.
    pub async fn reset(&self) -> StoreResult<u64> {
        let removed = self.backend.delete_where(None).await?;
        tracing::info!(collection = %self.collection(), removed, "collection reset");
        Ok(removed)
    }

    pub async fn close(&self) {
        self.backend.close().await;
    }
}

fn meta_field(metadata: &Metadata, key: &str) -> String {
    metadata
        .get(key)
        .and_then(id_component)
        .unwrap_or_else(|| "unknown".to_string())
}

fn id_component(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Deterministic ID for a document: SHA-256 over its provenance and text prefix.
pub fn document_id(text: &str, metadata: &Metadata) -> String {
    let field = |key: &str, default: &str| {
        metadata
            .get(key)
            .and_then(id_component)
            .unwrap_or_else(|| default.to_string())
    };

    let content = format!(
        "{}:{}:{}:{}:{}",
        field("type", "unknown"),
        field("source", "unknown"),
        field("date", ""),
        field("chunk_index", "0"),
        truncate_chars(text, ID_TEXT_PREFIX)
    );

    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use serde_json::json;

    fn meta(v: Value) -> Metadata {
        v.as_object().cloned().unwrap()
    }

    fn memory_store() -> KnowledgeStore {
        KnowledgeStore::new(Box::new(MemoryStore::new("test_collection")))
    }

    #[test]
    fn test_document_id_is_stable() {
        let m = meta(json!({"type": "workspace", "source": "a.md", "chunk_index": 1}));
        assert_eq!(document_id("hello", &m), document_id("hello", &m));
        assert_eq!(document_id("hello", &m).len(), 64);
    }

    #[test]
    fn test_document_id_changes_with_text_and_position() {
        let m = meta(json!({"type": "workspace", "source": "a.md", "chunk_index": 1}));
        let base = document_id("hello", &m);
        assert_ne!(base, document_id("hello!", &m));

        let moved = meta(json!({"type": "workspace", "source": "a.md", "chunk_index": 2}));
        assert_ne!(base, document_id("hello", &moved));

        let dated = meta(json!({"type": "workspace", "source": "a.md", "chunk_index": 1, "date": "2026-01-01"}));
        assert_ne!(base, document_id("hello", &dated));
    }

    #[test]
    fn test_document_id_ignores_text_past_prefix() {
        let m = meta(json!({"type": "manual", "source": "x"}));
        let prefix = "a".repeat(200);
        assert_eq!(
            document_id(&format!("{}tail one", prefix), &m),
            document_id(&format!("{}tail two", prefix), &m)
        );
    }

    #[test]
    fn test_document_id_defaults_match_explicit_values() {
        let implicit = document_id("t", &Metadata::new());
        let explicit = document_id(
            "t",
            &meta(json!({"type": "unknown", "source": "unknown", "date": "", "chunk_index": 0})),
        );
        assert_eq!(implicit, explicit);
    }

    #[tokio::test]
    async fn test_add_is_idempotent() {
        let store = memory_store();
        let m = meta(json!({"type": "test", "source": "unit"}));
        let first = store.add("same text", m.clone(), None).await.unwrap();
        let second = store.add("same text", m, None).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_add_uses_explicit_id() {
        let store = memory_store();
        let id = store
            .add("text", Metadata::new(), Some("custom-id"))
            .await
            .unwrap();
        assert_eq!(id, "custom-id");
    }

    #[tokio::test]
    async fn test_add_rejects_blank_text() {
        let store = memory_store();
        let err = store.add("  \n", Metadata::new(), None).await.unwrap_err();
        assert!(matches!(err, StoreError::EmptyText));
    }

    #[tokio::test]
    async fn test_add_batch_skips_blank_and_batches() {
        let store = memory_store();
        let chunks: Vec<Chunk> = (0..5)
            .map(|i| Chunk::new(format!("chunk number {}", i), meta(json!({"chunk_index": i}))))
            .chain(std::iter::once(Chunk::new("   ", Metadata::new())))
            .collect();
        let ids = store.add_batch(&chunks, 2).await.unwrap();
        assert_eq!(ids.len(), 5);
        assert_eq!(store.count().await.unwrap(), 5);

        // zero batch size still stores
        let more = vec![Chunk::new("another", Metadata::new())];
        assert_eq!(store.add_batch(&more, 0).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_search_scores_decrease_from_one() {
        let store = memory_store();
        for (i, text) in ["deploy docker image", "deploy notes", "deploy"].iter().enumerate() {
            store
                .add(text, meta(json!({"type": "test", "chunk_index": i})), None)
                .await
                .unwrap();
        }
        let hits = store.search("deploy docker image", 10, None).await.unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].score, 1.0);
        assert!(hits.windows(2).all(|w| w[0].score > w[1].score));
    }

    #[tokio::test]
    async fn test_search_type_filter_never_leaks() {
        let store = memory_store();
        store
            .add("sms skill", meta(json!({"type": "skill", "source": "a"})), None)
            .await
            .unwrap();
        store
            .add("sms session", meta(json!({"type": "session", "source": "b"})), None)
            .await
            .unwrap();
        let hits = store
            .search("sms", 10, Some(&Filter::by("type", "skill")))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits.iter().all(|h| h.doc_type() == "skill"));
    }

    #[tokio::test]
    async fn test_search_no_match_is_ok_empty() {
        let store = memory_store();
        assert!(store.search("anything", 5, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_reports_existence() {
        let store = memory_store();
        let id = store.add("doc", Metadata::new(), None).await.unwrap();
        assert!(store.delete(&id).await.unwrap());
        assert!(!store.delete(&id).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_by_filter_requires_clauses() {
        let store = memory_store();
        store
            .add("a", meta(json!({"source": "s1"})), None)
            .await
            .unwrap();
        assert!(store.delete_by_filter(&Filter::new()).await.is_err());
        assert_eq!(
            store.delete_by_filter(&Filter::by("source", "s1")).await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_stats_and_reset() {
        let store = memory_store();
        store
            .add("one", meta(json!({"type": "skill", "source": "skill:a"})), None)
            .await
            .unwrap();
        store
            .add("two", meta(json!({"type": "skill", "source": "skill:b"})), None)
            .await
            .unwrap();
        store.add("three", Metadata::new(), None).await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.collection, "test_collection");
        assert_eq!(stats.total, 3);
        assert_eq!(stats.by_type["skill"], 2);
        assert_eq!(stats.by_type["unknown"], 1);
        assert_eq!(stats.by_source["skill:a"], 1);

        assert_eq!(store.reset().await.unwrap(), 3);
        assert_eq!(store.stats().await.unwrap().total, 0);
    }
}
