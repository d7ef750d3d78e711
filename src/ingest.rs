//! Ingestion pipeline orchestration.
//!
//! Each pipeline runs source → chunking → tagging → storage:
//!
//! | Pipeline | Source | Chunking |
//! |----------|--------|----------|
//! | [`ingest_workspace`] | workspace files ([`scan::scan_workspace`]) | paragraphs, `chunking.workspace_max_chars` |
//! | [`ingest_skills`] | `SKILL.md` files in each skills dir | paragraphs, `chunking.skill_max_chars` |
//! | [`ingest_sessions`] | `*.jsonl` session logs | message windows |
//!
//! Per-file failures are logged and counted; the pipeline carries on. A
//! dry run does everything except write to the store.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::chunk::{chunk_messages, chunk_text};
use crate::config::Config;
use crate::knowledge::KnowledgeStore;
use crate::models::Chunk;
use crate::scan;
use crate::session;
use crate::tagger::{self, ChunkPosition};

/// What a pipeline run saw and stored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestReport {
    pub pipeline: &'static str,
    pub dry_run: bool,
    pub files_seen: usize,
    pub files_processed: usize,
    /// Files that were empty or produced no chunks.
    pub files_skipped: usize,
    /// Files that could not be read, parsed, or stored.
    pub files_failed: usize,
    /// Session messages parsed (sessions pipeline only).
    pub messages: usize,
    pub chunks: usize,
    /// Records in the collection after the run.
    pub collection_total: u64,
}

impl IngestReport {
    fn new(pipeline: &'static str, dry_run: bool) -> Self {
        Self {
            pipeline,
            dry_run,
            ..Self::default()
        }
    }

    pub fn print(&self) {
        if self.dry_run {
            println!("ingest {} (dry-run)", self.pipeline);
        } else {
            println!("ingest {}", self.pipeline);
        }
        println!("  files found: {}", self.files_seen);
        println!("  files processed: {}", self.files_processed);
        println!("  files skipped: {}", self.files_skipped);
        if self.files_failed > 0 {
            println!("  files failed: {}", self.files_failed);
        }
        if self.pipeline == "sessions" {
            println!("  messages: {}", self.messages);
        }
        if self.dry_run {
            println!("  estimated chunks: {}", self.chunks);
        } else {
            println!("  chunks written: {}", self.chunks);
        }
        println!("  collection total: {}", self.collection_total);
        println!("ok");
    }
}

/// Ingest text files from the workspace (or `root` when given).
pub async fn ingest_workspace(
    config: &Config,
    store: &KnowledgeStore,
    root: Option<&Path>,
    limit: Option<usize>,
    dry_run: bool,
) -> Result<IngestReport> {
    let root = root.unwrap_or(config.workspace.root.as_path());
    let mut files = scan::scan_workspace(root, &config.workspace)?;
    if let Some(lim) = limit {
        files.truncate(lim);
    }

    let mut report = IngestReport::new("workspace", dry_run);
    report.files_seen = files.len();

    for file in &files {
        let content = match std::fs::read_to_string(&file.path) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(path = %file.relative, error = %e, "failed to read file");
                report.files_failed += 1;
                continue;
            }
        };

        if content.trim().is_empty() {
            report.files_skipped += 1;
            continue;
        }

        let file_chars = content.chars().count();
        let pieces = chunk_text(&content, config.chunking.workspace_max_chars);
        let total = pieces.len();
        let chunks: Vec<Chunk> = pieces
            .into_iter()
            .enumerate()
            .map(|(index, text)| {
                let meta = tagger::workspace_metadata(
                    &file.relative,
                    &file.path,
                    file_chars,
                    ChunkPosition { index, total },
                );
                Chunk::new(text, meta)
            })
            .collect();

        store_file_chunks(store, &chunks, config.store.batch_size, &file.relative, &mut report)
            .await;
    }

    report.collection_total = store.count().await?;
    Ok(report)
}

/// Ingest `SKILL.md` files from the configured skills dirs (or `dir` when given).
pub async fn ingest_skills(
    config: &Config,
    store: &KnowledgeStore,
    dir: Option<&Path>,
    dry_run: bool,
) -> Result<IngestReport> {
    let dirs: Vec<PathBuf> = match dir {
        Some(d) => vec![d.to_path_buf()],
        None => config.skills.dirs.clone(),
    };

    let mut report = IngestReport::new("skills", dry_run);

    for dir in &dirs {
        let skill_files = scan::find_skill_files(dir)?;
        tracing::info!(dir = %dir.display(), skills = skill_files.len(), "scanning skills");
        report.files_seen += skill_files.len();

        for path in &skill_files {
            let name = scan::skill_name(path);
            let content = match std::fs::read_to_string(path) {
                Ok(c) => c,
                Err(e) => {
                    tracing::warn!(skill = %name, error = %e, "failed to read skill");
                    report.files_failed += 1;
                    continue;
                }
            };

            if content.trim().is_empty() {
                report.files_skipped += 1;
                continue;
            }

            let pieces = chunk_text(&content, config.chunking.skill_max_chars);
            let total = pieces.len();
            let chunks: Vec<Chunk> = pieces
                .into_iter()
                .enumerate()
                .map(|(index, text)| {
                    Chunk::new(
                        text,
                        tagger::skill_metadata(&name, path, ChunkPosition { index, total }),
                    )
                })
                .collect();

            store_file_chunks(store, &chunks, config.store.batch_size, &name, &mut report).await;
        }
    }

    report.collection_total = store.count().await?;
    Ok(report)
}

/// Ingest session logs from the sessions dir (or `dir` when given).
pub async fn ingest_sessions(
    config: &Config,
    store: &KnowledgeStore,
    dir: Option<&Path>,
    dry_run: bool,
) -> Result<IngestReport> {
    let dir = dir.unwrap_or(config.sessions.dir.as_path());
    let logs = scan::list_session_files(dir)?;

    let mut report = IngestReport::new("sessions", dry_run);
    report.files_seen = logs.len();

    for path in &logs {
        let key = session::session_key_from_path(path);
        let messages = session::parse_session_file(path);
        if messages.is_empty() {
            tracing::debug!(session = %key, "no messages");
            report.files_skipped += 1;
            continue;
        }
        report.messages += messages.len();

        if let Some(summary) = session::summarize(&messages, &key) {
            tracing::debug!(
                session = %summary.session_key,
                messages = summary.total_messages,
                start = ?summary.start_time,
                end = ?summary.end_time,
                has_user = summary.has_user,
                has_assistant = summary.has_assistant,
                "parsed session"
            );
        }

        let chunks = match chunk_messages(
            &messages,
            config.sessions.window,
            config.sessions.overlap,
            &key,
        ) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(session = %key, error = %e, "failed to chunk session");
                report.files_failed += 1;
                continue;
            }
        };

        store_file_chunks(store, &chunks, config.sessions.batch_size, &key, &mut report).await;
    }

    report.collection_total = store.count().await?;
    Ok(report)
}

/// Store one file's chunks and update the report. Store failures are
/// logged and counted against the file.
async fn store_file_chunks(
    store: &KnowledgeStore,
    chunks: &[Chunk],
    batch_size: usize,
    label: &str,
    report: &mut IngestReport,
) {
    if chunks.is_empty() {
        report.files_skipped += 1;
        return;
    }

    if report.dry_run {
        report.files_processed += 1;
        report.chunks += chunks.len();
        return;
    }

    match store.add_batch(chunks, batch_size).await {
        Ok(ids) => {
            tracing::info!(source = %label, chunks = ids.len(), "ingested");
            report.files_processed += 1;
            report.chunks += ids.len();
        }
        Err(e) => {
            tracing::warn!(source = %label, error = %e, "failed to store chunks");
            report.files_failed += 1;
        }
    }
}
