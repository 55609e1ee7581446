//! Event-driven batched indexing.
//!
//! The indexer consumes the synchronizer's event stream and translates it
//! into idempotent index mutations:
//!
//! - `Added` — index the projected document,
//! - `Changed` — delete, then index (stale field shapes never linger),
//! - `Removed` — delete.
//!
//! Mutations collect into a batch that commits when it reaches the
//! configured size; [`flush`](Indexer::flush) commits the remainder at
//! stream end. A failed commit propagates so the cycle driver never advances
//! its state past it. Events for collections outside the model are dropped.

use std::sync::Arc;

use log::debug;
use plenum_core::{CollectionModel, Event};

use crate::document::project;
use crate::error::Result;
use crate::index::TextIndex;
use crate::searcher::Searcher;

/// Batched writer between the event stream and the index store.
pub struct Indexer {
    index: TextIndex,
    model: Arc<CollectionModel>,
    batch_size: usize,
    pending: usize,
}

impl Indexer {
    /// Wrap an index store.
    ///
    /// `batch_size` mutations are committed together; a size of 1 commits
    /// every event.
    pub fn new(index: TextIndex, model: Arc<CollectionModel>, batch_size: usize) -> Self {
        Self {
            index,
            model,
            batch_size: batch_size.max(1),
            pending: 0,
        }
    }

    /// Apply one event to the current batch.
    pub fn apply(&mut self, event: Event) -> Result<()> {
        let Some(declaration) = self.model.get(event.collection()) else {
            // Not a text-indexed collection.
            return Ok(());
        };

        let fqid = event.fqid();
        match &event {
            Event::Added { collection, id, row } => {
                let doc = project(self.index.mapping(), declaration, collection, *id, row);
                self.index.index_document(doc)?;
            }
            Event::Changed { collection, id, row } => {
                self.index.delete(&fqid);
                let doc = project(self.index.mapping(), declaration, collection, *id, row);
                self.index.index_document(doc)?;
            }
            Event::Removed { .. } => {
                self.index.delete(&fqid);
            }
        }

        self.pending += 1;
        if self.pending >= self.batch_size {
            self.commit()?;
        }
        Ok(())
    }

    /// Commit any unfinished batch. Call at stream end.
    pub fn flush(&mut self) -> Result<()> {
        if self.pending > 0 {
            self.commit()?;
        }
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.index.commit()?;
        debug!("committed batch of {} mutations", self.pending);
        self.pending = 0;
        Ok(())
    }

    /// A read handle over the wrapped index.
    pub fn searcher(&self) -> Searcher {
        self.index.searcher()
    }

    /// Number of mutations waiting in the current batch.
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Tear down the wrapped index (close and remove the directory).
    pub fn close(self) -> Result<()> {
        self.index.close()
    }
}

impl std::fmt::Debug for Indexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Indexer")
            .field("batch_size", &self.batch_size)
            .field("pending", &self.pending)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
