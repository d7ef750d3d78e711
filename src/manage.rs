//! Collection management commands: stats, manual add, delete, reset.
//!
//! Destructive commands count what they would remove and ask for
//! confirmation (via `dialoguer`) unless `--yes` was given.

use std::path::Path;

use anyhow::Result;
use dialoguer::Confirm;

use crate::knowledge::KnowledgeStore;
use crate::models::DocType;
use crate::store::Filter;
use crate::tagger;

/// Sources listed by `rag stats`.
const MAX_LISTED_SOURCES: usize = 15;

/// Which documents `rag delete` removes.
#[derive(Debug, Clone, PartialEq)]
pub enum DeleteTarget {
    Source(String),
    Type(String),
}

impl DeleteTarget {
    fn filter(&self) -> Filter {
        match self {
            DeleteTarget::Source(s) => Filter::by("source", s.as_str()),
            DeleteTarget::Type(t) => Filter::by("type", t.as_str()),
        }
    }

    fn describe(&self) -> String {
        match self {
            DeleteTarget::Source(s) => format!("source: {}", s),
            DeleteTarget::Type(t) => format!("type: {}", t),
        }
    }
}

/// Print collection totals and the per-source and per-type breakdowns.
pub async fn run_stats(store: &KnowledgeStore, storage: &Path) -> Result<()> {
    let stats = store.stats().await?;
    let db_size = std::fs::metadata(storage).map(|m| m.len()).unwrap_or(0);

    println!("Knowledge Base Stats");
    println!("====================");
    println!();
    println!("  Collection:  {}", stats.collection);
    println!("  Storage:     {}", storage.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!("  Documents:   {}", stats.total);

    if !stats.by_source.is_empty() {
        println!();
        println!("  By source:");
        for (source, count) in stats.by_source.iter().take(MAX_LISTED_SOURCES) {
            println!("    {:<40} {:>6}", source, count);
        }
        if stats.by_source.len() > MAX_LISTED_SOURCES {
            println!(
                "    ... and {} more",
                stats.by_source.len() - MAX_LISTED_SOURCES
            );
        }
    }

    if !stats.by_type.is_empty() {
        println!();
        println!("  By type:");
        for (doc_type, count) in &stats.by_type {
            println!("    {:<40} {:>6}", doc_type, count);
        }
    }

    println!();
    Ok(())
}

/// Add a document by hand and print its ID.
pub async fn run_add(store: &KnowledgeStore, text: &str, source: &str, doc_type: DocType) -> Result<String> {
    let metadata = tagger::manual_metadata(source, doc_type);
    let id = store.add(text, metadata, None).await?;

    println!("Document added: {}", id);
    println!("  Source: {}", source);
    println!("  Type:   {}", doc_type);
    println!("  Length: {} chars", text.chars().count());
    Ok(id)
}

/// Delete every document matching `target`. Returns how many were removed.
pub async fn run_delete(store: &KnowledgeStore, target: &DeleteTarget, assume_yes: bool) -> Result<u64> {
    let filter = target.filter();
    let count = store.get(Some(&filter), None).await?.len();

    if count == 0 {
        println!("No documents found with {}", target.describe());
        return Ok(0);
    }

    println!("Found {} documents with {}", count, target.describe());
    if !confirm("Delete them?", assume_yes)? {
        println!("Cancelled");
        return Ok(0);
    }

    let deleted = store.delete_by_filter(&filter).await?;
    println!("Deleted {} documents", deleted);
    Ok(deleted)
}

/// Delete every document in the collection after two confirmations.
pub async fn run_reset(store: &KnowledgeStore, assume_yes: bool) -> Result<u64> {
    println!(
        "WARNING: This will delete ALL documents from collection '{}'!",
        store.collection()
    );

    if !confirm("Continue?", assume_yes)? {
        println!("Cancelled");
        return Ok(0);
    }
    if !confirm("Are you REALLY sure? This cannot be undone", assume_yes)? {
        println!("Cancelled");
        return Ok(0);
    }

    let removed = store.reset().await?;
    println!("Collection reset: {} documents deleted", removed);
    Ok(removed)
}

fn confirm(prompt: &str, assume_yes: bool) -> Result<bool> {
    if assume_yes {
        return Ok(true);
    }
    Ok(Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()?)
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
