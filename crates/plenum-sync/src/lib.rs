#![forbid(unsafe_code)]

//! Change-driven synchronization between the source store and the text
//! index.
//!
//! The source of truth is a PostgreSQL database: one table per collection
//! (suffixed `_t`) plus an append-only change-log table recording
//! `(fqid, operation, timestamp)` for every mutation. This crate walks that
//! log and emits [`plenum_core::Event`]s describing what the index has to do:
//!
//! - [`ChangeSynchronizer::fill`] streams every row of every source table —
//!   the initial build after startup;
//! - [`ChangeSynchronizer::update`] reads the change-log window since the
//!   last successful cycle, coalesced to the latest operation per fqid, and
//!   fetches the current row for everything that is not a delete.
//!
//! Events flow through a bounded channel so the consumer (the indexer) owns
//! its batch. Cycle state (`last`, `generation`) only advances through the
//! [`CycleToken`] handshake after the consumer has flushed successfully; a
//! failed or cancelled cycle is retried over the same window.

pub mod error;
pub mod row;
pub mod synchronizer;

pub use error::{Error, Result};
pub use synchronizer::{ChangeSynchronizer, CycleToken};
