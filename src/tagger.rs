//! Provenance metadata for stored chunks.
//!
//! Every chunk carries a `type` and `source`, plus position fields
//! (`chunk_index`, `total_chunks`) and timestamps appropriate to where it
//! came from.

use std::path::Path;

use chrono::Utc;
use serde_json::{json, Value};

use crate::models::{DocType, Message, Metadata};

/// Position of a chunk within the document it was cut from.
#[derive(Debug, Clone, Copy)]
pub struct ChunkPosition {
    pub index: usize,
    pub total: usize,
}

/// A window of session messages about to be stored as one chunk.
#[derive(Debug)]
pub struct SessionWindow<'a> {
    pub messages: &'a [Message],
    pub session_key: &'a str,
    pub chunk_index: usize,
    pub total_chunks: usize,
}

fn now_iso() -> String {
    Utc::now().to_rfc3339()
}

fn into_map(value: Value) -> Metadata {
    match value {
        Value::Object(map) => map,
        _ => Metadata::new(),
    }
}

/// Metadata for a chunk of a workspace file.
///
/// `source` is the path relative to the workspace root; `file_size` is the
/// file's length in characters.
pub fn workspace_metadata(
    relative_path: &str,
    file_path: &Path,
    file_chars: usize,
    pos: ChunkPosition,
) -> Metadata {
    let extension = file_path
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
        .unwrap_or_default();

    into_map(json!({
        "type": DocType::Workspace.as_str(),
        "source": relative_path,
        "file_path": file_path.display().to_string(),
        "file_size": file_chars,
        "chunk_index": pos.index,
        "total_chunks": pos.total,
        "file_extension": extension,
        "ingested_at": now_iso(),
    }))
}

/// Metadata for a chunk of a `SKILL.md` file.
pub fn skill_metadata(skill_name: &str, file_path: &Path, pos: ChunkPosition) -> Metadata {
    into_map(json!({
        "type": DocType::Skill.as_str(),
        "source": format!("skill:{}", skill_name),
        "skill_name": skill_name,
        "file_path": file_path.display().to_string(),
        "chunk_index": pos.index,
        "total_chunks": pos.total,
        "ingested_at": now_iso(),
    }))
}

/// Metadata for a rendered window of session messages.
///
/// `date` is the first message's timestamp (empty when unknown) so the
/// derived document ID stays stable across re-ingestion.
pub fn session_metadata(window: &SessionWindow<'_>) -> Metadata {
    let first = window.messages.first();
    let last = window.messages.last();

    let source = first
        .and_then(|m| m.session_key.as_deref())
        .unwrap_or(window.session_key);
    let start_time = first.and_then(|m| m.timestamp.clone()).unwrap_or_default();
    let end_time = last.and_then(|m| m.timestamp.clone()).unwrap_or_default();

    into_map(json!({
        "type": DocType::Session.as_str(),
        "source": source,
        "session_key": window.session_key,
        "chunk_index": window.chunk_index,
        "total_chunks": window.total_chunks,
        "chunk_start_time": start_time,
        "chunk_end_time": end_time,
        "message_count": window.messages.len(),
        "date": start_time,
        "ingested_at": now_iso(),
    }))
}

/// Metadata for a document added by hand.
pub fn manual_metadata(source: &str, doc_type: DocType) -> Metadata {
    into_map(json!({
        "type": doc_type.as_str(),
        "source": source,
        "added_at": now_iso(),
    }))
}
