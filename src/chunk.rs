//! Paragraph-boundary text chunker and message windowing.
//!
//! [`chunk_text`] splits document text into segments of at most `max_chars`
//! characters, breaking only on blank-line paragraph boundaries. A single
//! paragraph longer than the limit is kept whole.
//!
//! [`chunk_messages`] groups session messages into overlapping windows and
//! renders each window as role-labelled text.

use anyhow::{bail, Result};
use serde_json::Value;

use crate::models::{Chunk, Message};
use crate::tagger::{self, SessionWindow};

const PARAGRAPH_SEPARATOR: &str = "\n\n";

/// Tool-call arguments are cut to this many characters.
const TOOL_ARGS_MAX_CHARS: usize = 100;

/// Tool results and unstructured content are cut to this many characters.
const TOOL_RESULT_MAX_CHARS: usize = 500;

/// Split text into chunks on paragraph boundaries, respecting `max_chars`.
///
/// Text within the limit is returned unchanged as the only chunk. Longer
/// text is packed greedily paragraph by paragraph; every returned chunk is
/// trimmed and non-empty.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    if text.chars().count() <= max_chars {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current_buf = String::new();
    let mut current_len = 0usize;

    for para in text.split(PARAGRAPH_SEPARATOR) {
        let para_len = para.chars().count();

        // Each buffered paragraph carries its trailing separator
        if current_len + para_len + PARAGRAPH_SEPARATOR.len() <= max_chars {
            current_buf.push_str(para);
            current_buf.push_str(PARAGRAPH_SEPARATOR);
            current_len += para_len + PARAGRAPH_SEPARATOR.len();
        } else {
            flush(&mut chunks, &current_buf);
            current_buf.clear();
            current_buf.push_str(para);
            current_buf.push_str(PARAGRAPH_SEPARATOR);
            current_len = para_len + PARAGRAPH_SEPARATOR.len();
        }
    }

    flush(&mut chunks, &current_buf);
    chunks
}

fn flush(chunks: &mut Vec<String>, buf: &str) {
    let trimmed = buf.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

/// Group messages into overlapping windows and render each one.
///
/// Windows start every `window - overlap` messages, so consecutive windows
/// share `overlap` messages. Windows that render to blank text are dropped;
/// the survivors keep their window ordinal as `chunk_index`.
pub fn chunk_messages(
    messages: &[Message],
    window: usize,
    overlap: usize,
    session_key: &str,
) -> Result<Vec<Chunk>> {
    if window == 0 || window <= overlap {
        bail!(
            "message window ({}) must be greater than overlap ({})",
            window,
            overlap
        );
    }

    let step = window - overlap;
    let total_windows = messages.len().div_ceil(step);
    let mut chunks = Vec::new();

    for (ordinal, start) in (0..messages.len()).step_by(step).enumerate() {
        let end = (start + window).min(messages.len());
        let slice = &messages[start..end];

        let text = render_window(slice);
        if text.trim().is_empty() {
            continue;
        }

        let meta = tagger::session_metadata(&SessionWindow {
            messages: slice,
            session_key,
            chunk_index: ordinal,
            total_chunks: total_windows,
        });
        chunks.push(Chunk::new(text, meta));
    }

    Ok(chunks)
}

/// Render messages as `ROLE: content` blocks separated by blank lines.
pub fn render_window(messages: &[Message]) -> String {
    messages
        .iter()
        .filter_map(|msg| {
            let text = format_content(&msg.content);
            if text.trim().is_empty() {
                return None;
            }
            let role = msg.role.as_deref().unwrap_or("unknown").to_uppercase();
            Some(format!("{}: {}", role, text))
        })
        .collect::<Vec<_>>()
        .join(PARAGRAPH_SEPARATOR)
}

/// Render message content to plain text.
///
/// Structured content is a list of typed items: `text` is kept verbatim,
/// `thinking` is dropped, and tool calls and results become bracketed
/// one-liners.
pub fn format_content(content: &Value) -> String {
    match content {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Array(items) => items
            .iter()
            .filter_map(format_item)
            .collect::<Vec<_>>()
            .join("\n"),
        other => truncate_chars(&other.to_string(), TOOL_RESULT_MAX_CHARS).to_string(),
    }
}

fn format_item(item: &Value) -> Option<String> {
    let obj = item.as_object()?;
    match obj.get("type").and_then(Value::as_str).unwrap_or("") {
        "text" => Some(obj.get("text").map(value_text).unwrap_or_default()),
        "toolCall" => {
            let name = obj.get("name").and_then(Value::as_str).unwrap_or("unknown");
            let args = obj.get("arguments").map(value_text).unwrap_or_default();
            Some(format!(
                "[Tool: {}({})]",
                name,
                truncate_chars(&args, TOOL_ARGS_MAX_CHARS)
            ))
        }
        "toolResult" => {
            let raw = obj
                .get("text")
                .or_else(|| obj.get("result"))
                .map(value_text)
                .unwrap_or_default();
            let result = raw.trim();
            let shown = if result.chars().count() > TOOL_RESULT_MAX_CHARS {
                format!("{}...", truncate_chars(result, TOOL_RESULT_MAX_CHARS))
            } else {
                result.to_string()
            };
            Some(format!("[Tool Result: {}]", shown))
        }
        // thinking and unknown item types carry nothing worth indexing
        _ => None,
    }
}

/// String values as-is, everything else as compact JSON.
fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// The first `max` characters of `s`.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
