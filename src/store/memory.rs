//! In-memory [`VectorStore`] implementation for tests.
//!
//! Records live in a `Vec` behind `std::sync::RwLock`, in insertion order.
//! Queries rank records by how many distinct query terms they contain.

use std::collections::HashSet;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use crate::error::{StoreError, StoreResult};
use crate::models::Record;

use super::{query_terms, Filter, VectorStore};

pub struct MemoryStore {
    collection: String,
    records: RwLock<Vec<Record>>,
}

impl MemoryStore {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            records: RwLock::new(Vec::new()),
        }
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Vec<Record>>> {
        self.records
            .read()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Vec<Record>>> {
        self.records
            .write()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))
    }
}

fn passes(filter: Option<&Filter>, record: &Record) -> bool {
    filter.map_or(true, |f| f.matches(&record.metadata))
}

#[async_trait]
impl VectorStore for MemoryStore {
    fn collection(&self) -> &str {
        &self.collection
    }

    async fn upsert(&self, records: &[Record]) -> StoreResult<()> {
        let mut stored = self.write()?;
        for record in records {
            match stored.iter_mut().find(|r| r.id == record.id) {
                Some(existing) => *existing = record.clone(),
                None => stored.push(record.clone()),
            }
        }
        Ok(())
    }

    async fn query(
        &self,
        text: &str,
        n: usize,
        filter: Option<&Filter>,
    ) -> StoreResult<Vec<Record>> {
        if let Some(f) = filter {
            f.validate()?;
        }
        let terms = query_terms(text);
        if terms.is_empty() || n == 0 {
            return Ok(Vec::new());
        }

        let stored = self.read()?;
        let mut scored: Vec<(usize, &Record)> = stored
            .iter()
            .filter(|r| passes(filter, r))
            .filter_map(|r| {
                let words: HashSet<String> = query_terms(&r.text).into_iter().collect();
                let hits = terms.iter().filter(|t| words.contains(*t)).count();
                (hits > 0).then_some((hits, r))
            })
            .collect();

        // stable sort keeps insertion order among equal scores
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(scored.into_iter().take(n).map(|(_, r)| r.clone()).collect())
    }

    async fn get(&self, filter: Option<&Filter>, limit: Option<usize>) -> StoreResult<Vec<Record>> {
        if let Some(f) = filter {
            f.validate()?;
        }
        let stored = self.read()?;
        Ok(stored
            .iter()
            .filter(|r| passes(filter, r))
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn delete_ids(&self, ids: &[String]) -> StoreResult<u64> {
        let mut stored = self.write()?;
        let before = stored.len();
        stored.retain(|r| !ids.contains(&r.id));
        Ok((before - stored.len()) as u64)
    }

    async fn delete_where(&self, filter: Option<&Filter>) -> StoreResult<u64> {
        if let Some(f) = filter {
            f.validate()?;
        }
        let mut stored = self.write()?;
        let before = stored.len();
        stored.retain(|r| !passes(filter, r));
        Ok((before - stored.len()) as u64)
    }

    async fn count(&self) -> StoreResult<u64> {
        Ok(self.read()?.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: &str, text: &str, doc_type: &str) -> Record {
        Record {
            id: id.to_string(),
            text: text.to_string(),
            metadata: json!({"type": doc_type}).as_object().cloned().unwrap(),
        }
    }

    #[tokio::test]
    async fn test_upsert_replaces_by_id() {
        let store = MemoryStore::new("c");
        store.upsert(&[record("a", "one", "test")]).await.unwrap();
        store.upsert(&[record("a", "two", "test")]).await.unwrap();
        let all = store.get(None, None).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].text, "two");
    }

    #[tokio::test]
    async fn test_query_ranks_by_term_overlap() {
        let store = MemoryStore::new("c");
        store
            .upsert(&[
                record("a", "deploy notes", "workspace"),
                record("b", "deploy the docker image", "workspace"),
                record("c", "unrelated", "workspace"),
            ])
            .await
            .unwrap();
        let hits = store.query("docker deploy", 10, None).await.unwrap();
        let ids: Vec<&str> = hits.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn test_query_respects_filter_and_limit() {
        let store = MemoryStore::new("c");
        store
            .upsert(&[
                record("a", "sms tool", "skill"),
                record("b", "sms chat", "session"),
                record("c", "sms again", "skill"),
            ])
            .await
            .unwrap();
        let hits = store
            .query("sms", 1, Some(&Filter::by("type", "skill")))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "a");
    }

    #[tokio::test]
    async fn test_delete_ids_and_where() {
        let store = MemoryStore::new("c");
        store
            .upsert(&[
                record("a", "x", "skill"),
                record("b", "y", "session"),
                record("c", "z", "skill"),
            ])
            .await
            .unwrap();
        assert_eq!(store.delete_ids(&["a".to_string(), "nope".to_string()]).await.unwrap(), 1);
        assert_eq!(
            store.delete_where(Some(&Filter::by("type", "skill"))).await.unwrap(),
            1
        );
        assert_eq!(store.count().await.unwrap(), 1);
        assert_eq!(store.delete_where(None).await.unwrap(), 1);
        assert_eq!(store.count().await.unwrap(), 0);
    }
}
