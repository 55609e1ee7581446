#![forbid(unsafe_code)]

//! Shared domain types for the plenum search service.
//!
//! This crate holds everything the other crates agree on:
//!
//! - [`error`]: the base error type and `Result` alias
//! - [`fqid`]: fully qualified identifiers (`"<collection>/<id>"`)
//! - [`model`]: the collection model (per collection, per field: type,
//!   searchability, analyzer hint) and its YAML loader
//! - [`value`]: the tagged value enum for dynamically decoded source rows
//! - [`event`]: the add/change/remove events emitted by the synchronizer
//!
//! It has no opinion on the search engine or the database driver; those live
//! in `plenum-fts` and `plenum-sync`.

pub mod error;
pub mod event;
pub mod fqid;
pub mod model;
pub mod value;

pub use error::{Error, Result};
pub use event::Event;
pub use model::{AnalyzerHint, Collection, CollectionModel, FieldSpec, FieldType};
pub use value::{FieldValue, RowMap};
