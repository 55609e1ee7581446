#![forbid(unsafe_code)]

//! Full-text search engine for the plenum search service.
//!
//! This crate turns the collection model into a Tantivy index and answers
//! ranked queries against it:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       plenum-fts                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  AnalyzerRegistry   named token pipelines (de, de_html,     │
//! │                     simple, keyword)                        │
//! │  IndexMapping       collection model → schema + field       │
//! │                     registry                                │
//! │  project()          row map → indexable document            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TextIndex          on-disk store: create/remove, writer,   │
//! │                     reader                                  │
//! │  Indexer            event stream → batched mutations        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  compile()          question → compound ranked query        │
//! │  Searcher           execution, dedup, matched words         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The index directory is disposable: it is removed and rebuilt from the
//! source of truth on every service start, and removed again on shutdown.

pub mod analyzer;
pub mod document;
pub mod error;
pub mod index;
pub mod indexer;
pub mod mapping;
pub mod query;
pub mod searcher;

pub use analyzer::{AnalyzerKind, AnalyzerRegistry};
pub use error::{Error, Result};
pub use index::TextIndex;
pub use indexer::Indexer;
pub use mapping::{IndexMapping, MappedField, ValueKind};
pub use searcher::{Answer, Searcher};
