//! # docqa CLI
//!
//! Answers a question about a document. The first run against a document
//! builds an embedding index file; later runs reuse it.
//!
//! ## Usage
//!
//! ```bash
//! docqa [OPTIONS] [DOCUMENT] [QUESTION]...
//! docqa embed [TEXT]...
//! docqa inspect
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docqa <doc> <question>` | Load or build the index, then answer |
//! | `docqa embed <text>` | Embed a text and print its dimension |
//! | `docqa inspect` | Print a summary of the index file |
//!
//! Prints `Q: <question>` and `A: <answer>` on success. Any failure is
//! reported on stderr with exit code 1.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use docqa::ask::{self, AskOptions, DEFAULT_QUESTION};
use docqa::config;
use docqa::inspect;
use docqa::probe::{self, DEFAULT_PROBE_TEXT};

/// docqa: ask questions about a document with retrieval-augmented generation.
///
/// Requires an API key in `OPENAI_API_KEY` (or the variable named by
/// `api_key_env` in the config file).
#[derive(Parser)]
#[command(
    name = "docqa",
    version,
    about = "Ask questions about a document with retrieval-augmented generation"
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/docqa.toml` when it exists; built-in defaults
    /// are used otherwise.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Index file to load or create (overrides `[index].path`).
    #[arg(long, global = true)]
    index: Option<PathBuf>,

    /// Increase log verbosity (`-v` info, `-vv` debug). `RUST_LOG` takes precedence.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Document to index (PDF or plain text).
    #[arg(default_value = "./document.pdf")]
    document: PathBuf,

    /// Question about the document; words are joined with spaces.
    question: Vec<String>,

    /// Number of chunks handed to the answer model (overrides `[retrieval].top_k`).
    #[arg(long)]
    top_k: Option<usize>,

    /// Chunk size in characters used when building (overrides `[chunking].max_chars`).
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Rebuild the index from the document even if the index file exists.
    #[arg(long)]
    rebuild: bool,

    /// Print the retrieved chunks and their scores before the answer.
    #[arg(long)]
    show_context: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Embed a text and print the vector's dimension and first values.
    ///
    /// Useful for checking the credential, endpoint and model.
    Embed {
        /// Text to embed; words are joined with spaces.
        text: Vec<String>,
    },

    /// Print a summary of the index file.
    ///
    /// Validates the index and reports model, dimensions and chunk count.
    /// Does not need a credential.
    Inspect,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn join_words(words: &[String], default: &str) -> String {
    let joined = words.join(" ");
    if joined.trim().is_empty() {
        default.to_string()
    } else {
        joined
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut cfg = config::resolve_config(cli.config.as_deref())?;
    if let Some(path) = cli.index {
        cfg.index.path = path;
    }
    if let Some(k) = cli.top_k {
        cfg.retrieval.top_k = k;
    }
    if let Some(size) = cli.chunk_size {
        cfg.chunking.max_chars = size;
    }
    cfg.validate()?;

    match cli.command {
        Some(Commands::Embed { text }) => {
            let text = join_words(&text, DEFAULT_PROBE_TEXT);
            probe::run_embed(&cfg, &text).await?;
        }
        Some(Commands::Inspect) => {
            inspect::run_inspect(&cfg)?;
        }
        None => {
            let question = join_words(&cli.question, DEFAULT_QUESTION);
            let opts = AskOptions {
                document: &cli.document,
                question: &question,
                rebuild: cli.rebuild,
            };
            ask::run_ask(&cfg, &opts, cli.show_context).await?;
        }
    }

    Ok(())
}
