//! Session transcript parsing.
//!
//! A session log is line-delimited JSON. The first line is usually a
//! `{"type": "session", ...}` header; the remaining lines are events, of
//! which only `{"type": "message", "message": {"role", "content"}, ...}`
//! records are kept. Lines that fail to parse are skipped.

use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::models::Message;

/// One event line of a session log. Unknown fields are ignored.
#[derive(Debug, Deserialize)]
struct EventLine {
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    message: Option<Value>,
    #[serde(default)]
    timestamp: Option<Value>,
    #[serde(default)]
    id: Option<Value>,
    #[serde(default, rename = "sessionKey")]
    session_key: Option<Value>,
}

/// Aggregate facts about one session's messages.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub session_key: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub total_messages: usize,
    pub has_system: bool,
    pub has_user: bool,
    pub has_assistant: bool,
}

/// Read and parse a session log. An unreadable file yields no messages.
pub fn parse_session_file(path: &Path) -> Vec<Message> {
    match std::fs::read_to_string(path) {
        Ok(content) => parse_session_log(&content),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read session log");
            Vec::new()
        }
    }
}

/// Parse session log text into messages, in file order.
pub fn parse_session_log(content: &str) -> Vec<Message> {
    let mut messages = Vec::new();

    for (line_no, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let event: EventLine = match serde_json::from_str(line) {
            Ok(ev) => ev,
            Err(e) => {
                tracing::debug!(line = line_no + 1, error = %e, "skipping malformed session line");
                continue;
            }
        };

        if line_no == 0 && event.kind.as_deref() == Some("session") {
            continue;
        }

        if event.kind.as_deref() != Some("message") {
            continue;
        }

        let body = event.message.unwrap_or(Value::Null);
        messages.push(Message {
            role: body.get("role").and_then(Value::as_str).map(str::to_string),
            content: body.get("content").cloned().unwrap_or(Value::Null),
            timestamp: event.timestamp.as_ref().and_then(scalar_string),
            id: event.id.as_ref().and_then(scalar_string),
            session_key: event.session_key.as_ref().and_then(scalar_string),
        });
    }

    messages
}

/// Raw `message` objects of every message line, for use as chat history.
pub fn load_history(path: &Path) -> Vec<Value> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read session history");
            return Vec::new();
        }
    };

    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| serde_json::from_str::<EventLine>(line).ok())
        .filter(|ev| ev.kind.as_deref() == Some("message"))
        .filter_map(|ev| ev.message)
        .collect()
}

/// Session key for a log file: its name without the `.jsonl` extension.
pub fn session_key_from_path(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    name.strip_suffix(".jsonl").unwrap_or(&name).to_string()
}

/// Summarize a session. Returns `None` when there are no messages.
pub fn summarize(messages: &[Message], session_key: &str) -> Option<SessionSummary> {
    let first = messages.first()?;
    let last = messages.last()?;
    let has_role = |role: &str| messages.iter().any(|m| m.role.as_deref() == Some(role));

    Some(SessionSummary {
        session_key: session_key.to_string(),
        start_time: first.timestamp.clone(),
        end_time: last.timestamp.clone(),
        total_messages: messages.len(),
        has_system: has_role("system"),
        has_user: has_role("user"),
        has_assistant: has_role("assistant"),
    })
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
