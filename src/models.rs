//! Core data models used throughout the knowledge base.
//!
//! These types represent the chunks, messages, and search hits that flow
//! through the ingestion and retrieval pipeline.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Free-form provenance fields attached to a stored record.
pub type Metadata = serde_json::Map<String, Value>;

/// The kind of content a chunk was produced from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum DocType {
    Workspace,
    Skill,
    Session,
    Manual,
    Test,
}

impl DocType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocType::Workspace => "workspace",
            DocType::Skill => "skill",
            DocType::Session => "session",
            DocType::Manual => "manual",
            DocType::Test => "test",
        }
    }
}

impl fmt::Display for DocType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "workspace" => Ok(DocType::Workspace),
            "skill" => Ok(DocType::Skill),
            "session" => Ok(DocType::Session),
            "manual" => Ok(DocType::Manual),
            "test" => Ok(DocType::Test),
            other => anyhow::bail!(
                "Unknown document type: '{}'. Must be workspace, skill, session, manual, or test.",
                other
            ),
        }
    }
}

/// A bounded unit of text plus metadata, stored as one retrievable record.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub text: String,
    pub metadata: Metadata,
    /// Explicit ID; when `None` the store derives a content hash.
    pub id: Option<String>,
}

impl Chunk {
    pub fn new(text: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            text: text.into(),
            metadata,
            id: None,
        }
    }
}

/// One conversational message extracted from a session log.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub role: Option<String>,
    /// Either a plain string or a list of typed content items.
    pub content: Value,
    pub timestamp: Option<String>,
    pub id: Option<String>,
    pub session_key: Option<String>,
}

/// A record as held by a storage backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: String,
    pub text: String,
    pub metadata: Metadata,
}

/// A search result returned from the knowledge store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub id: String,
    pub text: String,
    pub metadata: Metadata,
    /// Positional approximation (`1 - rank/total`), not a calibrated similarity.
    pub score: f64,
}

impl SearchHit {
    /// Metadata string field, if present and a string.
    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }

    pub fn doc_type(&self) -> &str {
        self.meta_str("type").unwrap_or("unknown")
    }

    pub fn source(&self) -> &str {
        self.meta_str("source").unwrap_or("unknown")
    }
}

/// Collection-wide counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionStats {
    pub collection: String,
    pub total: u64,
    pub by_source: BTreeMap<String, u64>,
    pub by_type: BTreeMap<String, u64>,
}
