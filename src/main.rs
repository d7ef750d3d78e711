//! # claw-rag CLI (`rag`)
//!
//! The `rag` binary ingests an agent's workspace files, skill guides, and
//! session transcripts into a local knowledge base and retrieves context
//! from it.
//!
//! ## Usage
//!
//! ```bash
//! rag --config ./config/rag.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `rag ingest workspace` | Index text files under the workspace root |
//! | `rag ingest skills` | Index `SKILL.md` files from the skills dirs |
//! | `rag ingest sessions` | Index session transcripts (`*.jsonl`) |
//! | `rag query "<query>"` | Search the knowledge base (interactive without a query) |
//! | `rag context "<query>"` | Print AI-formatted context, or nothing |
//! | `rag agent "<message>"` | Print the message with retrieved context prepended |
//! | `rag stats` | Show collection totals |
//! | `rag add --text .. --source ..` | Add a document by hand |
//! | `rag delete --by-source ..` | Delete documents by source or type |
//! | `rag reset` | Delete every document in the collection |

use std::path::PathBuf;

use clap::{ArgGroup, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use claw_rag::config;
use claw_rag::context;
use claw_rag::format::RULE;
use claw_rag::ingest;
use claw_rag::knowledge::KnowledgeStore;
use claw_rag::manage::{self, DeleteTarget};
use claw_rag::models::DocType;
use claw_rag::search;
use claw_rag::session;

/// Local knowledge base for AI agents.
///
/// Without `--config`, `./config/rag.toml` is used when it exists and
/// built-in defaults otherwise.
#[derive(Parser)]
#[command(
    name = "rag",
    about = "Local knowledge base for AI agents: ingest workspace files, skills, and sessions, then retrieve context",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Collection name, overriding `store.collection`.
    #[arg(long, global = true)]
    collection: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest documents into the knowledge base.
    Ingest {
        #[command(subcommand)]
        source: IngestSource,
    },

    /// Search the knowledge base.
    ///
    /// Without a query (or with `-i`), starts an interactive prompt where a
    /// leading `type:<name>` token filters by document type.
    Query {
        query: Option<String>,

        /// Number of results.
        #[arg(short = 'n', long = "num-results")]
        num_results: Option<usize>,

        /// Only return documents of this type (session, workspace, skill, ...).
        #[arg(long = "type")]
        doc_type: Option<String>,

        /// Print results as JSON.
        #[arg(long)]
        json: bool,

        #[arg(short, long)]
        interactive: bool,
    },

    /// Print AI-formatted context for a query. Prints nothing when there is none.
    Context {
        query: String,

        #[arg(short = 'n', long = "num-results")]
        num_results: Option<usize>,
    },

    /// Print a message with relevant context prepended, ready for an LLM.
    Agent {
        message: String,

        /// Session log whose messages are used as conversation history.
        #[arg(long)]
        session: Option<PathBuf>,
    },

    /// Show collection statistics.
    Stats,

    /// Add a document by hand.
    Add {
        #[arg(long)]
        text: String,

        #[arg(long)]
        source: String,

        #[arg(long = "type", value_enum, default_value_t = DocType::Manual)]
        doc_type: DocType,
    },

    /// Delete documents by source or by type.
    #[command(group(ArgGroup::new("target").required(true).args(["by_source", "by_type"])))]
    Delete {
        #[arg(long)]
        by_source: Option<String>,

        #[arg(long)]
        by_type: Option<String>,

        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },

    /// Delete every document in the collection.
    Reset {
        /// Skip both confirmation prompts.
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum IngestSource {
    /// Text files under the workspace root.
    Workspace {
        /// Workspace root, overriding `workspace.root`.
        #[arg(long)]
        path: Option<PathBuf>,

        /// Ingest at most this many files.
        #[arg(long)]
        limit: Option<usize>,

        #[arg(long)]
        dry_run: bool,
    },

    /// `SKILL.md` files from the skills directories.
    Skills {
        /// A single skills directory, overriding `skills.dirs`.
        #[arg(long)]
        path: Option<PathBuf>,

        #[arg(long)]
        dry_run: bool,
    },

    /// Session transcripts (`*.jsonl`).
    Sessions {
        /// Sessions directory, overriding `sessions.dir`.
        #[arg(long)]
        path: Option<PathBuf>,

        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut cfg = config::load_or_default(cli.config.as_deref())?;
    if let Some(collection) = cli.collection {
        cfg.store.collection = collection;
    }

    let store = KnowledgeStore::open(&cfg).await?;
    let result = run(cli.command, &cfg, &store).await;
    store.close().await;
    result
}

async fn run(command: Commands, cfg: &config::Config, store: &KnowledgeStore) -> anyhow::Result<()> {
    match command {
        Commands::Ingest { source } => {
            let report = match source {
                IngestSource::Workspace {
                    path,
                    limit,
                    dry_run,
                } => ingest::ingest_workspace(cfg, store, path.as_deref(), limit, dry_run).await?,
                IngestSource::Skills { path, dry_run } => {
                    ingest::ingest_skills(cfg, store, path.as_deref(), dry_run).await?
                }
                IngestSource::Sessions { path, dry_run } => {
                    ingest::ingest_sessions(cfg, store, path.as_deref(), dry_run).await?
                }
            };
            report.print();
        }
        Commands::Query {
            query,
            num_results,
            doc_type,
            json,
            interactive,
        } => {
            let n = num_results.unwrap_or(cfg.retrieval.n_results);
            match query {
                Some(q) if !interactive => {
                    search::run_query(store, &q, n, doc_type.as_deref(), json).await?;
                }
                _ => search::run_interactive(store, &cfg.store.path, n).await?,
            }
        }
        Commands::Context { query, num_results } => {
            let n = num_results.unwrap_or(cfg.retrieval.context_results);
            let ctx = context::get_context(store, &query, n, cfg.retrieval.min_query_chars).await;
            if !ctx.is_empty() {
                println!("{}", RULE);
                println!("RELEVANT CONTEXT FROM KNOWLEDGE BASE");
                println!();
                println!("{}", ctx);
                println!("{}", RULE);
            }
        }
        Commands::Agent { message, session } => {
            let history = session
                .as_deref()
                .map(session::load_history)
                .unwrap_or_default();
            let enhanced = context::enhance_message(
                store,
                &message,
                &history,
                cfg.retrieval.context_results,
                cfg.retrieval.min_query_chars,
            )
            .await;
            println!("{}", RULE);
            println!("ENHANCED MESSAGE (Ready for LLM):");
            println!("{}", RULE);
            println!("{}", enhanced);
            println!("{}", RULE);
        }
        Commands::Stats => {
            manage::run_stats(store, &cfg.store.path).await?;
        }
        Commands::Add {
            text,
            source,
            doc_type,
        } => {
            manage::run_add(store, &text, &source, doc_type).await?;
        }
        Commands::Delete {
            by_source,
            by_type,
            yes,
        } => {
            let target = match (by_source, by_type) {
                (Some(s), _) => DeleteTarget::Source(s),
                (None, Some(t)) => DeleteTarget::Type(t),
                (None, None) => anyhow::bail!("--by-source or --by-type is required"),
            };
            manage::run_delete(store, &target, yes).await?;
        }
        Commands::Reset { yes } => {
            manage::run_reset(store, yes).await?;
        }
    }

    Ok(())
}
