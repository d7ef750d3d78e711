//! Search result formatting.
//!
//! Results are labelled by their `type` metadata and truncated to a
//! per-style character budget. The four [`FormatStyle`]s serve different
//! readers: the `rag query` CLI, quick lookups, AI context blocks, and the
//! agent prompt envelope.

use serde_json::Value;

use crate::chunk::truncate_chars;
use crate::models::SearchHit;

/// Divider printed between results in the detailed CLI listing.
pub const RULE: &str = "================================================================================";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatStyle {
    /// Full listing for the CLI, with indexing and chunk info.
    Detailed,
    Quick,
    /// Context block handed to an AI as reference material.
    AiContext,
    /// Context prepended to an agent's incoming message.
    Agent,
}

impl FormatStyle {
    /// Maximum characters of body text shown per result.
    pub fn budget(self) -> usize {
        match self {
            FormatStyle::Detailed => 1000,
            FormatStyle::Quick => 600,
            FormatStyle::AiContext => 700,
            FormatStyle::Agent => 800,
        }
    }

    fn preamble(self, count: usize) -> Option<String> {
        match self {
            FormatStyle::Detailed => None,
            FormatStyle::Quick => Some(format!("Found {} relevant items:\n", count)),
            FormatStyle::AiContext => Some(format!(
                "Found {} relevant items from knowledge base:\n",
                count
            )),
            FormatStyle::Agent => Some(format!("Found {} relevant context items:\n", count)),
        }
    }

    /// Header line for the `index`-th (1-based) result.
    fn header(self, hit: &SearchHit, index: usize) -> String {
        let doc_type = hit.doc_type();
        let source = hit.source();

        match self {
            FormatStyle::Detailed => {
                let source = hit.meta_str("source").unwrap_or("?");
                match doc_type {
                    "session" => {
                        let chunk = hit
                            .metadata
                            .get("chunk_index")
                            .map(display_value)
                            .unwrap_or_else(|| "?".to_string());
                        format!("Session {} (chunk {})", source, chunk)
                    }
                    "workspace" => source.to_string(),
                    "skill" => format!("Skill: {}", hit.meta_str("skill_name").unwrap_or(source)),
                    "memory" => format!("Memory: {}", source),
                    other => format!("{}: {}", other, source),
                }
            }
            FormatStyle::Quick => match doc_type {
                "session" => format!("Session reference {}", index),
                "workspace" => format!("Code/Docs: {}", source),
                "skill" => format!("Skill: {}", source),
                _ => format!("Reference {}", index),
            },
            FormatStyle::AiContext => match doc_type {
                "session" => format!("Past Conversation ({})", source),
                "workspace" => format!("Code/Documentation ({})", source),
                "skill" => format!("Skill Guide ({})", source),
                other => format!("Reference ({})", other),
            },
            FormatStyle::Agent => match doc_type {
                "session" => format!("[Session Reference {}]", index),
                "workspace" => format!("[Code/Docs {}: {}]", index, source),
                "skill" => format!("[Skill Reference {}: {}]", index, source),
                _ => format!("[Reference {}]", index),
            },
        }
    }
}

/// `text` cut to `budget` characters, with `...` appended when cut.
pub fn truncate_body(text: &str, budget: usize) -> String {
    if text.chars().count() > budget {
        format!("{}...", truncate_chars(text, budget))
    } else {
        text.to_string()
    }
}

/// Format one result: header line, then the truncated body.
///
/// `index` is 1-based and only appears in styles that number their results.
pub fn format_result(hit: &SearchHit, index: usize, style: FormatStyle) -> String {
    let header = style.header(hit, index);
    let body = truncate_body(&hit.text, style.budget());

    if style == FormatStyle::Detailed {
        format!("{}{}\n{}", header, detail_info(hit), body)
    } else {
        format!("{}\n{}", header, body)
    }
}

/// Format a list of results. An empty list formats to an empty string.
pub fn format_results(hits: &[SearchHit], style: FormatStyle) -> String {
    if hits.is_empty() {
        return String::new();
    }

    let items = hits
        .iter()
        .enumerate()
        .map(|(i, hit)| format_result(hit, i + 1, style));

    match style {
        FormatStyle::Detailed => items.collect::<Vec<_>>().join(&format!("\n{}\n", RULE)),
        FormatStyle::Agent => {
            let mut parts: Vec<String> = style.preamble(hits.len()).into_iter().collect();
            parts.extend(items.map(|item| format!("{}\n", item)));
            parts.join("\n")
        }
        FormatStyle::Quick | FormatStyle::AiContext => {
            let mut parts: Vec<String> = style.preamble(hits.len()).into_iter().collect();
            parts.extend(items.map(|item| format!("\n{}\n", item)));
            parts.join("\n")
        }
    }
}

/// ` (indexed YYYY-MM-DD, chunk i/n)`, or empty when neither is known.
fn detail_info(hit: &SearchHit) -> String {
    let mut info = Vec::new();

    if let Some(ingested) = hit.meta_str("ingested_at") {
        info.push(format!("indexed {}", truncate_chars(ingested, 10)));
    }

    let index = hit.metadata.get("chunk_index").and_then(Value::as_u64);
    let total = hit.metadata.get("total_chunks").and_then(Value::as_u64);
    if let (Some(index), Some(total)) = (index, total) {
        info.push(format!("chunk {}/{}", index + 1, total));
    }

    if info.is_empty() {
        String::new()
    } else {
        format!(" ({})", info.join(", "))
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn hit(text: &str, meta: Value) -> SearchHit {
        SearchHit {
            id: "id".to_string(),
            text: text.to_string(),
            metadata: meta.as_object().cloned().unwrap(),
            score: 1.0,
        }
    }

    #[test]
    fn test_empty_results_format_to_empty_string() {
        for style in [
            FormatStyle::Detailed,
            FormatStyle::Quick,
            FormatStyle::AiContext,
            FormatStyle::Agent,
        ] {
            assert_eq!(format_results(&[], style), "");
        }
    }

    #[test]
    fn test_truncate_body() {
        assert_eq!(truncate_body("short", 10), "short");
        assert_eq!(truncate_body("abcdef", 3), "abc...");
        assert_eq!(truncate_body("héllo", 2), "hé...");
    }

    #[test]
    fn test_detailed_headers() {
        let session = hit(
            "body",
            json!({"type": "session", "source": "abc", "chunk_index": 1, "total_chunks": 3,
                   "ingested_at": "2026-02-10T10:00:00+00:00"}),
        );
        assert_eq!(
            format_result(&session, 1, FormatStyle::Detailed),
            "Session abc (chunk 1) (indexed 2026-02-10, chunk 2/3)\nbody"
        );

        let skill = hit("b", json!({"type": "skill", "source": "skill:sms", "skill_name": "sms"}));
        assert_eq!(format_result(&skill, 1, FormatStyle::Detailed), "Skill: sms\nb");

        let memory = hit("b", json!({"type": "memory", "source": "m"}));
        assert_eq!(format_result(&memory, 1, FormatStyle::Detailed), "Memory: m\nb");

        let other = hit("b", json!({"type": "manual"}));
        assert_eq!(format_result(&other, 1, FormatStyle::Detailed), "manual: ?\nb");
    }

    #[test]
    fn test_detailed_truncates_to_1000() {
        let long = "x".repeat(1500);
        let out = format_result(&hit(&long, json!({"type": "workspace", "source": "a.md"})), 1, FormatStyle::Detailed);
        assert_eq!(out, format!("a.md\n{}...", "x".repeat(1000)));
    }

    #[test]
    fn test_quick_style() {
        let hits = vec![
            hit("s", json!({"type": "session", "source": "k"})),
            hit("w", json!({"type": "workspace", "source": "a.md"})),
        ];
        assert_eq!(
            format_results(&hits, FormatStyle::Quick),
            "Found 2 relevant items:\n\n\nSession reference 1\ns\n\n\nCode/Docs: a.md\nw\n"
        );
    }

    #[test]
    fn test_ai_context_style() {
        let hits = vec![
            hit("g", json!({"type": "skill", "source": "skill:sms"})),
            hit("m", json!({"type": "manual", "source": "notes"})),
        ];
        let out = format_results(&hits, FormatStyle::AiContext);
        assert!(out.starts_with("Found 2 relevant items from knowledge base:\n"));
        assert!(out.contains("\nSkill Guide (skill:sms)\ng\n"));
        assert!(out.contains("\nReference (manual)\nm\n"));
    }

    #[test]
    fn test_agent_style_numbers_results() {
        let hits = vec![
            hit("s", json!({"type": "session"})),
            hit("w", json!({"type": "workspace", "source": "a.md"})),
            hit("k", json!({"type": "skill", "source": "skill:x"})),
            hit("o", json!({})),
        ];
        assert_eq!(
            format_results(&hits, FormatStyle::Agent),
            "Found 4 relevant context items:\n\n\
             [Session Reference 1]\ns\n\n\
             [Code/Docs 2: a.md]\nw\n\n\
             [Skill Reference 3: skill:x]\nk\n\n\
             [Reference 4]\no\n"
        );
    }

    #[test]
    fn test_agent_budget_is_800() {
        let long = "y".repeat(801);
        let out = format_result(&hit(&long, json!({})), 1, FormatStyle::Agent);
        assert!(out.ends_with(&format!("{}...", "y".repeat(800))));
    }
}
