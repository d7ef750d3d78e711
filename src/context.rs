//! Agent-facing retrieval helpers.
//!
//! These wrap [`KnowledgeStore::search`] for callers that must never fail
//! because of the knowledge base: store errors are logged and turned into
//! empty context (or an `error` field) instead of being returned.

use serde::Serialize;
use serde_json::Value;

use crate::format::{format_results, FormatStyle};
use crate::knowledge::KnowledgeStore;

/// One search hit flattened for programmatic use.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KnowledgeItem {
    pub text: String,
    #[serde(rename = "type")]
    pub doc_type: String,
    pub source: String,
    pub chunk_index: Value,
    pub date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KnowledgeResults {
    pub query: String,
    pub count: usize,
    pub items: Vec<KnowledgeItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Search and return structured results. A store failure is reported in
/// `error` with an empty item list.
pub async fn search_knowledge(store: &KnowledgeStore, query: &str, n: usize) -> KnowledgeResults {
    match store.search(query, n, None).await {
        Ok(hits) => {
            let items: Vec<KnowledgeItem> = hits
                .iter()
                .map(|hit| KnowledgeItem {
                    text: hit.text.clone(),
                    doc_type: hit.doc_type().to_string(),
                    source: hit.source().to_string(),
                    chunk_index: hit
                        .metadata
                        .get("chunk_index")
                        .cloned()
                        .unwrap_or_else(|| Value::from(0)),
                    date: hit.meta_str("date").unwrap_or_default().to_string(),
                })
                .collect();
            KnowledgeResults {
                query: query.to_string(),
                count: items.len(),
                items,
                error: None,
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "knowledge search failed");
            KnowledgeResults {
                query: query.to_string(),
                count: 0,
                items: Vec::new(),
                error: Some(e.to_string()),
            }
        }
    }
}

/// Retrieved context formatted in `style`, or `""` when the query is
/// shorter than `min_chars`, nothing matched, or the store failed.
pub async fn context_for(
    store: &KnowledgeStore,
    query: &str,
    n: usize,
    min_chars: usize,
    style: FormatStyle,
) -> String {
    if query.chars().count() < min_chars {
        return String::new();
    }

    match store.search(query, n, None).await {
        Ok(hits) => format_results(&hits, style),
        Err(e) => {
            tracing::warn!(error = %e, "context lookup failed");
            String::new()
        }
    }
}

/// AI-formatted context for `query`; see [`context_for`].
pub async fn get_context(store: &KnowledgeStore, query: &str, n: usize, min_chars: usize) -> String {
    context_for(store, query, n, min_chars, FormatStyle::AiContext).await
}

/// Text of the most recent `user` message. List content contributes its
/// `text` items joined with spaces.
pub fn extract_user_query(messages: &[Value]) -> String {
    for msg in messages.iter().rev() {
        if msg.get("role").and_then(Value::as_str) != Some("user") {
            continue;
        }
        return match msg.get("content") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Array(items)) => items
                .iter()
                .filter(|item| item.get("type").and_then(Value::as_str) == Some("text"))
                .map(|item| item.get("text").and_then(Value::as_str).unwrap_or_default())
                .collect::<Vec<_>>()
                .join(" "),
            _ => String::new(),
        };
    }
    String::new()
}

/// Prepend retrieved context to `message`.
///
/// The incoming message is treated as the newest user turn after
/// `history`. When nothing relevant is found the message is returned as-is.
pub async fn enhance_message(
    store: &KnowledgeStore,
    message: &str,
    history: &[Value],
    n: usize,
    min_chars: usize,
) -> String {
    let mut turns = history.to_vec();
    turns.push(serde_json::json!({"role": "user", "content": message}));
    let query = extract_user_query(&turns);

    let context = context_for(store, &query, n, min_chars, FormatStyle::Agent).await;
    if context.is_empty() {
        return message.to_string();
    }

    format!(
        "[RAG CONTEXT - Retrieved from knowledge base:]\n{}\n\n---\n\n[CURRENT USER MESSAGE:]\n{}",
        context, message
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Metadata;
    use crate::store::memory::MemoryStore;
    use serde_json::json;

    async fn seeded_store() -> KnowledgeStore {
        let store = KnowledgeStore::new(Box::new(MemoryStore::new("ctx")));
        let meta: Metadata = json!({"type": "skill", "source": "skill:sms", "chunk_index": 0})
            .as_object()
            .cloned()
            .unwrap();
        store
            .add("Send an SMS with the voip tool", meta, None)
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_search_knowledge_items() {
        let store = seeded_store().await;
        let results = search_knowledge(&store, "sms", 5).await;
        assert_eq!(results.count, 1);
        assert_eq!(results.items[0].doc_type, "skill");
        assert_eq!(results.items[0].source, "skill:sms");
        assert_eq!(results.items[0].chunk_index, json!(0));
        assert_eq!(results.items[0].date, "");
        assert!(results.error.is_none());

        let json = serde_json::to_value(&results).unwrap();
        assert_eq!(json["items"][0]["type"], "skill");
        assert!(json.get("error").is_none());
    }

    #[tokio::test]
    async fn test_search_knowledge_reports_store_errors() {
        struct Broken;

        #[async_trait::async_trait]
        impl crate::store::VectorStore for Broken {
            fn collection(&self) -> &str {
                "broken"
            }
            async fn upsert(&self, _: &[crate::models::Record]) -> crate::error::StoreResult<()> {
                Err(crate::error::StoreError::Backend("down".into()))
            }
            async fn query(
                &self,
                _: &str,
                _: usize,
                _: Option<&crate::store::Filter>,
            ) -> crate::error::StoreResult<Vec<crate::models::Record>> {
                Err(crate::error::StoreError::Backend("down".into()))
            }
            async fn get(
                &self,
                _: Option<&crate::store::Filter>,
                _: Option<usize>,
            ) -> crate::error::StoreResult<Vec<crate::models::Record>> {
                Err(crate::error::StoreError::Backend("down".into()))
            }
            async fn delete_ids(&self, _: &[String]) -> crate::error::StoreResult<u64> {
                Err(crate::error::StoreError::Backend("down".into()))
            }
            async fn delete_where(
                &self,
                _: Option<&crate::store::Filter>,
            ) -> crate::error::StoreResult<u64> {
                Err(crate::error::StoreError::Backend("down".into()))
            }
            async fn count(&self) -> crate::error::StoreResult<u64> {
                Err(crate::error::StoreError::Backend("down".into()))
            }
        }

        let store = KnowledgeStore::new(Box::new(Broken));
        let results = search_knowledge(&store, "anything", 5).await;
        assert_eq!(results.count, 0);
        assert!(results.error.unwrap().contains("down"));
        assert_eq!(get_context(&store, "anything", 5, 3).await, "");
        assert_eq!(enhance_message(&store, "anything", &[], 5, 3).await, "anything");
    }

    #[tokio::test]
    async fn test_get_context_min_length_and_no_match() {
        let store = seeded_store().await;
        assert_eq!(get_context(&store, "sm", 5, 3).await, "");
        assert_eq!(get_context(&store, "kubernetes", 5, 3).await, "");
        let ctx = get_context(&store, "sms", 5, 3).await;
        assert!(ctx.starts_with("Found 1 relevant items from knowledge base:"));
        assert!(ctx.contains("Skill Guide (skill:sms)"));
    }

    #[tokio::test]
    async fn test_min_length_counts_raw_query() {
        let store = seeded_store().await;
        assert_eq!(get_context(&store, "sms", 5, 5).await, "");
        let ctx = get_context(&store, "  sms", 5, 5).await;
        assert!(ctx.contains("Skill Guide (skill:sms)"));
    }

    #[test]
    fn test_extract_user_query() {
        let messages = vec![
            json!({"role": "user", "content": "first question"}),
            json!({"role": "assistant", "content": "answer"}),
            json!({"role": "user", "content": [
                {"type": "text", "text": "second"},
                {"type": "image", "url": "x"},
                {"type": "text", "text": "question"}
            ]}),
            json!({"role": "assistant", "content": "later"}),
        ];
        assert_eq!(extract_user_query(&messages), "second question");
        assert_eq!(extract_user_query(&[json!({"role": "assistant", "content": "x"})]), "");
    }

    #[tokio::test]
    async fn test_enhance_message_envelope() {
        let store = seeded_store().await;
        let enhanced = enhance_message(&store, "how do I send sms?", &[], 5, 3).await;
        assert!(enhanced.starts_with(
            "[RAG CONTEXT - Retrieved from knowledge base:]\nFound 1 relevant context items:\n"
        ));
        assert!(enhanced.contains("[Skill Reference 1: skill:sms]"));
        assert!(enhanced.ends_with("\n\n---\n\n[CURRENT USER MESSAGE:]\nhow do I send sms?"));
    }

    #[tokio::test]
    async fn test_enhance_message_uses_current_message_over_history() {
        let store = seeded_store().await;
        let history = vec![json!({"role": "user", "content": "unrelated weather"})];
        let enhanced = enhance_message(&store, "sms please", &history, 5, 3).await;
        assert!(enhanced.contains("[Skill Reference 1: skill:sms]"));

        let plain = enhance_message(&store, "weather today", &history, 5, 3).await;
        assert_eq!(plain, "weather today");
    }
}
