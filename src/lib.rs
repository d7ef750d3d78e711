//! # claw-rag
//!
//! A local knowledge base that gives an AI agent retrieval-augmented
//! context from its own workspace files, skill guides, and past chat
//! sessions.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │ Scan / Parse │──▶│ Chunk + Tag  │──▶│  Knowledge   │──▶ VectorStore
//! │ files, jsonl │   │              │   │    Store     │    (SQLite FTS5)
//! └──────────────┘   └──────────────┘   └──────┬───────┘
//!                                              │ search
//!                                              ▼
//!                                     ┌──────────────────┐
//!                                     │ Format / Context │
//!                                     └──────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! rag ingest workspace          # index workspace files
//! rag ingest skills             # index SKILL.md guides
//! rag ingest sessions           # index chat transcripts
//! rag query "send an sms" --type skill
//! rag agent "how did we deploy last time?" --session ./s.jsonl
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`error`] | Store error type |
//! | [`scan`] | Workspace, skill, and session file discovery |
//! | [`chunk`] | Paragraph chunking and message windowing |
//! | [`session`] | Session log parsing |
//! | [`tagger`] | Chunk provenance metadata |
//! | [`store`] | `VectorStore` trait with SQLite and in-memory backends |
//! | [`knowledge`] | Knowledge store facade and document IDs |
//! | [`format`] | Result formatting styles |
//! | [`context`] | Agent-facing context helpers |
//! | [`ingest`] | Ingestion pipelines |
//! | [`search`] | `rag query` command |
//! | [`manage`] | Stats, add, delete, reset |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod chunk;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod format;
pub mod ingest;
pub mod knowledge;
pub mod manage;
pub mod migrate;
pub mod models;
pub mod scan;
pub mod search;
pub mod session;
pub mod store;
pub mod tagger;
