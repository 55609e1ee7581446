//! The on-disk index store.
//!
//! The index directory is owned exclusively by this process and is
//! disposable: `create` removes any previous tree before building a fresh
//! index, and `close` removes the tree again on shutdown. Durable recovery
//! is replaced by a full rebuild from the source of truth.
//!
//! Writes go through a single [`tantivy::IndexWriter`]; `commit` makes a
//! batch of mutations visible atomically and reloads the shared reader, so
//! concurrent searches observe either the pre- or the post-batch state.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info};
use plenum_core::CollectionModel;
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};

use crate::analyzer::AnalyzerRegistry;
use crate::error::Result;
use crate::mapping::IndexMapping;
use crate::searcher::Searcher;

/// Index writer buffer size (50MB).
const WRITER_BUFFER_SIZE: usize = 50_000_000;

/// An open text index with exclusive write access.
pub struct TextIndex {
    index: Index,
    writer: IndexWriter,
    reader: IndexReader,
    mapping: Arc<IndexMapping>,
    analyzers: Arc<AnalyzerRegistry>,
    location: Option<PathBuf>,
}

impl TextIndex {
    /// Create a fresh on-disk index for the given model.
    ///
    /// Any preexisting tree at `path` is removed first; failure to remove it
    /// is fatal.
    pub fn create(path: &Path, model: &CollectionModel) -> Result<Self> {
        if path.exists() {
            info!("removing old index at {path:?}");
            std::fs::remove_dir_all(path)?;
        }
        std::fs::create_dir_all(path)?;

        let mapping = IndexMapping::build(model);
        let index = Index::create_in_dir(path, mapping.schema().clone())?;
        Self::open(index, mapping, Some(path.to_path_buf()))
    }

    /// Create an in-memory index (for tests).
    pub fn create_in_ram(model: &CollectionModel) -> Result<Self> {
        let mapping = IndexMapping::build(model);
        let index = Index::create_in_ram(mapping.schema().clone());
        Self::open(index, mapping, None)
    }

    fn open(index: Index, mapping: IndexMapping, location: Option<PathBuf>) -> Result<Self> {
        let analyzers = AnalyzerRegistry::new();
        analyzers.register(&index);

        let writer: IndexWriter = index.writer(WRITER_BUFFER_SIZE)?;
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;

        Ok(Self {
            index,
            writer,
            reader,
            mapping: Arc::new(mapping),
            analyzers: Arc::new(analyzers),
            location,
        })
    }

    /// Stage a document. Not visible until the next [`commit`](Self::commit).
    pub fn index_document(&self, doc: TantivyDocument) -> Result<()> {
        self.writer.add_document(doc)?;
        Ok(())
    }

    /// Stage the removal of a document by FQID.
    pub fn delete(&self, fqid: &str) {
        self.writer
            .delete_term(Term::from_field_text(self.mapping.fqid, fqid));
    }

    /// Commit all staged mutations and make them visible to searches.
    pub fn commit(&mut self) -> Result<()> {
        self.writer.commit()?;
        self.reader.reload()?;
        Ok(())
    }

    /// The field mapping of this index.
    pub fn mapping(&self) -> &IndexMapping {
        &self.mapping
    }

    /// Number of live documents.
    pub fn num_docs(&self) -> u64 {
        self.reader.searcher().num_docs()
    }

    /// A cloneable read handle for concurrent searches.
    ///
    /// Readers observe committed state only; the writer stays here.
    pub fn searcher(&self) -> Searcher {
        Searcher::new(
            self.index.clone(),
            self.reader.clone(),
            Arc::clone(&self.mapping),
            Arc::clone(&self.analyzers),
        )
    }

    /// Tear the index down: release the writer and remove the directory.
    pub fn close(self) -> Result<()> {
        let TextIndex {
            writer, location, ..
        } = self;
        drop(writer);
        if let Some(path) = location {
            debug!("removing index directory {path:?}");
            std::fs::remove_dir_all(&path)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for TextIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextIndex")
            .field("location", &self.location)
            .field("mapping", &self.mapping)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
