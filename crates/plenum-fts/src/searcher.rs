//! Search execution.
//!
//! A [`Searcher`] is a cheap, cloneable read handle over the index. It may be
//! shared with the HTTP surface while the driver keeps writing; every search
//! sees the state of the last committed batch.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use log::debug;
use serde::Serialize;
use tantivy::collector::TopDocs;
use tantivy::schema::Value;
use tantivy::{Index, IndexReader, TantivyDocument};

use crate::analyzer::{AnalyzerKind, AnalyzerRegistry};
use crate::error::Result;
use crate::mapping::{IndexMapping, ValueKind, TYPE_FIELD};
use crate::query::{self, TermMatcher, RESULT_LIMIT};

/// One search hit: relevance score plus the terms that matched per field.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Answer {
    /// Raw relevance score.
    pub score: f32,
    /// Field name to matched terms.
    pub matched_words: BTreeMap<String, Vec<String>>,
}

/// Read handle over the text index.
#[derive(Clone)]
pub struct Searcher {
    index: Index,
    reader: IndexReader,
    mapping: Arc<IndexMapping>,
    analyzers: Arc<AnalyzerRegistry>,
}

impl Searcher {
    pub(crate) fn new(
        index: Index,
        reader: IndexReader,
        mapping: Arc<IndexMapping>,
        analyzers: Arc<AnalyzerRegistry>,
    ) -> Self {
        Self {
            index,
            reader,
            mapping,
            analyzers,
        }
    }

    /// Execute a search.
    ///
    /// `collections` restricts hits to the given collection names;
    /// `meeting_id > 0` additionally scopes hits to one meeting. The first
    /// occurrence of an FQID wins; later duplicates are dropped.
    pub fn search(
        &self,
        question: &str,
        collections: &[String],
        meeting_id: i32,
    ) -> Result<BTreeMap<String, Answer>> {
        if question.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        let compiled = query::compile(
            &self.index,
            &self.mapping,
            &self.analyzers,
            question,
            collections,
            meeting_id,
        );

        let searcher = self.reader.searcher();
        let top_docs = searcher.search(&compiled.query, &TopDocs::with_limit(RESULT_LIMIT))?;
        debug!("question {question:?} produced {} hits", top_docs.len());

        let mut answers = BTreeMap::new();
        let mut duplicates = 0usize;

        for (score, address) in top_docs {
            let doc: TantivyDocument = searcher.doc(address)?;
            let Some(fqid) = doc
                .get_first(self.mapping.fqid)
                .and_then(|value| value.as_str())
                .map(str::to_string)
            else {
                continue;
            };

            if answers.contains_key(&fqid) {
                duplicates += 1;
                continue;
            }

            let matched_words = self.matched_words(&doc, &compiled.matcher);
            answers.insert(
                fqid,
                Answer {
                    score,
                    matched_words,
                },
            );
        }

        if duplicates > 0 {
            debug!("dropped {duplicates} duplicate hits");
        }

        Ok(answers)
    }

    /// Rebuild which terms of a hit matched, per field.
    ///
    /// Stored text values are re-analyzed with their field's pipeline and
    /// intersected with the compiled question; keyword fields report their
    /// stored value when a scope or filter term selected it.
    fn matched_words(
        &self,
        doc: &TantivyDocument,
        matcher: &TermMatcher,
    ) -> BTreeMap<String, Vec<String>> {
        let mut matched = BTreeMap::new();

        if let Some(collection) = doc
            .get_first(self.mapping.doc_type)
            .and_then(|value| value.as_str())
        {
            if matcher.matches_keyword(collection) {
                matched.insert(TYPE_FIELD.to_string(), vec![collection.to_string()]);
            }
        }

        for (name, mapped) in self.mapping.fields() {
            if mapped.kind != ValueKind::Text {
                continue;
            }

            let mut words: BTreeSet<String> = BTreeSet::new();
            for value in doc.get_all(mapped.field) {
                let Some(text) = value.as_str() else {
                    continue;
                };
                match mapped.analyzer {
                    AnalyzerKind::Keyword => {
                        if matcher.matches_keyword(text) {
                            words.insert(text.to_string());
                        }
                    }
                    kind => {
                        for term in self.analyzers.analyze(kind, text) {
                            if matcher.matches_term(kind, &term) {
                                words.insert(term);
                            }
                        }
                    }
                }
            }

            if !words.is_empty() {
                matched.insert(name.clone(), words.into_iter().collect());
            }
        }

        matched
    }
}

impl std::fmt::Debug for Searcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Searcher")
            .field("mapping", &self.mapping)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use plenum_core::value::{FieldValue, RowMap};
    use plenum_core::CollectionModel;

    use crate::document::project;
    use crate::index::TextIndex;

    fn indexed() -> TextIndex {
        let model = CollectionModel::from_yaml(
            r#"
topic:
  title:
    type: string
"#,
        )
        .unwrap();
        let mut index = TextIndex::create_in_ram(&model).unwrap();

        let mut row = RowMap::new();
        row.insert("title".into(), FieldValue::from("Ergebnisprotokoll"));
        let doc = project(index.mapping(), model.get("topic").unwrap(), "topic", 1, &row);
        index.index_document(doc).unwrap();
        index.commit().unwrap();
        index
    }

    #[test]
    fn test_empty_question_empty_answer() {
        let index = indexed();
        let answers = index.searcher().search("  ", &[], 0).unwrap();
        assert!(answers.is_empty());
    }

    #[test]
    fn test_substring_match_via_wildcard() {
        let index = indexed();
        let answers = index.searcher().search("protokoll", &[], 0).unwrap();
        assert!(answers.contains_key("topic/1"));
        let answer = &answers["topic/1"];
        assert!(answer.score > 0.0);
        assert!(answer.matched_words.contains_key("title"));
    }

    #[test]
    fn test_unmatched_question() {
        let index = indexed();
        let answers = index.searcher().search("zzzzzz", &[], 0).unwrap();
        assert!(answers.is_empty());
    }

    #[test]
    fn test_meeting_scope_without_scope_fields() {
        // The model has no meeting_id/owner_id fields; a meeting scope can
        // select nothing.
        let index = indexed();
        let answers = index.searcher().search("protokoll", &[], 7).unwrap();
        assert!(answers.is_empty());
    }

    #[test]
    fn test_answer_serialization_shape() {
        let index = indexed();
        let answers = index.searcher().search("protokoll", &[], 0).unwrap();
        let json = serde_json::to_string(&answers).unwrap();
        assert!(json.contains("\"Score\""));
        assert!(json.contains("\"MatchedWords\""));
    }
}
