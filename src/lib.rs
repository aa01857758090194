//! # docqa
//!
//! Ask questions about a document with retrieval-augmented generation.
//!
//! docqa extracts a document's text, splits it into fixed-size chunks,
//! embeds every chunk through an OpenAI-compatible embeddings endpoint and
//! keeps the result in a JSON index file. Each question is embedded, the
//! closest chunks are found by cosine similarity, and a chat model answers
//! using only those chunks.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌─────────┐   ┌──────────────┐   ┌────────────┐
//! │ Document │──▶│  Chunk   │──▶│ Embed + Index │──▶│ JSON index │
//! │ PDF/text │   │ 900 chars│   │  (once)       │   │   file     │
//! └──────────┘   └─────────┘   └──────────────┘   └─────┬──────┘
//!                                                       │
//!        question ──▶ embed ──▶ top-K cosine ◀──────────┘
//!                                   │
//!                                   ▼
//!                          prompt ──▶ chat ──▶ answer
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! export OPENAI_API_KEY=...
//! docqa ./document.pdf What is this document about?
//! docqa --rebuild ./document.pdf Summarize section 2
//! docqa embed hello embeddings
//! docqa inspect
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and credential lookup |
//! | [`error`] | Error taxonomy |
//! | [`extract`] | Document text extraction |
//! | [`chunk`] | Fixed-window chunking |
//! | [`embedding`] | Embedding provider trait, OpenAI client, cosine similarity |
//! | [`index`] | Build, persist, load and validate the index |
//! | [`retrieve`] | Top-K ranking |
//! | [`answer`] | Prompt assembly and chat-completion client |
//! | [`ask`] | End-to-end pipeline |
//! | [`probe`] | `embed` subcommand |
//! | [`inspect`] | `inspect` subcommand |

pub mod answer;
pub mod ask;
pub mod chunk;
pub mod config;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod http;
pub mod index;
pub mod inspect;
pub mod probe;
pub mod retrieve;
