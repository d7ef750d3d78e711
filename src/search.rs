//! The `rag query` command: one-shot and interactive search.
//!
//! One-shot mode prints the detailed listing (or JSON with `--json`).
//! Interactive mode reads queries from stdin until `quit`, `exit`, `q`, or
//! end of input. A leading `type:<name>` token restricts a query to one
//! document type.

use std::io::{self, BufRead, Write};
use std::path::Path;

use anyhow::Result;

use crate::format::{format_result, FormatStyle, RULE};
use crate::knowledge::KnowledgeStore;
use crate::models::SearchHit;
use crate::store::Filter;

/// One parsed line of interactive input.
#[derive(Debug, Clone, PartialEq)]
pub enum InteractiveInput {
    Empty,
    Quit,
    Search {
        query: String,
        doc_type: Option<String>,
    },
}

/// Parse a line typed at the interactive prompt.
pub fn parse_interactive_input(line: &str) -> InteractiveInput {
    let line = line.trim();
    if line.is_empty() {
        return InteractiveInput::Empty;
    }
    if matches!(line.to_lowercase().as_str(), "quit" | "exit" | "q") {
        return InteractiveInput::Quit;
    }

    if let Some(rest) = line.strip_prefix("type:") {
        if let Some((doc_type, query)) = rest.split_once(char::is_whitespace) {
            let query = query.trim();
            if !query.is_empty() {
                return InteractiveInput::Search {
                    query: query.to_string(),
                    doc_type: Some(doc_type.to_string()),
                };
            }
        }
    }

    InteractiveInput::Search {
        query: line.to_string(),
        doc_type: None,
    }
}

fn type_filter(doc_type: Option<&str>) -> Option<Filter> {
    doc_type.map(|t| Filter::by("type", t))
}

fn print_hits(hits: &[SearchHit]) {
    println!("{}", RULE);
    for (i, hit) in hits.iter().enumerate() {
        println!("{}", format_result(hit, i + 1, FormatStyle::Detailed));
        println!("{}", RULE);
    }
}

/// Run a single query and print the results.
pub async fn run_query(
    store: &KnowledgeStore,
    query: &str,
    n: usize,
    doc_type: Option<&str>,
    json: bool,
) -> Result<Vec<SearchHit>> {
    let filter = type_filter(doc_type);
    let hits = store.search(query, n, filter.as_ref()).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&hits)?);
        return Ok(hits);
    }

    println!("Query: {}", query);
    if let Some(t) = doc_type {
        println!("Filter: type = {}", t);
    }
    println!();

    if hits.is_empty() {
        println!("No results found");
        return Ok(hits);
    }

    println!("Found {} results", hits.len());
    println!();
    print_hits(&hits);
    Ok(hits)
}

/// Read queries from stdin and print results until the user quits.
pub async fn run_interactive(store: &KnowledgeStore, storage: &Path, n: usize) -> Result<()> {
    println!("Knowledge Base Search - Interactive Mode");
    println!("Type 'quit' or 'exit' to stop");
    println!();
    println!("Collection: {}", store.collection());
    println!("  Total documents: {}", store.count().await?);
    println!("  Storage: {}", storage.display());

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("\nSearch query: ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            println!();
            break;
        };

        match parse_interactive_input(&line?) {
            InteractiveInput::Empty => continue,
            InteractiveInput::Quit => break,
            InteractiveInput::Search { query, doc_type } => {
                let filter = type_filter(doc_type.as_deref());
                match store.search(&query, n, filter.as_ref()).await {
                    Ok(hits) if hits.is_empty() => println!("No results found"),
                    Ok(hits) => {
                        println!("\n{} results:", hits.len());
                        print_hits(&hits);
                    }
                    Err(e) => println!("Error: {}", e),
                }
            }
        }
    }

    println!("Goodbye!");
    Ok(())
}
