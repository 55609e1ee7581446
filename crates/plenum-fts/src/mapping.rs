//! Index mapping: collection model → Tantivy schema.
//!
//! Tantivy has one flat schema per index, so the mappings of all collections
//! are merged into a single field registry. Per searchable field the rules
//! are:
//!
//! | source type | mapping | sidecar |
//! |---|---|---|
//! | `string`, `text` | text, language analyzer | `_<f>_original`, simple |
//! | `HTMLStrict`, `HTMLPermissive` | text, HTML analyzer | — |
//! | `generic-relation` | keyword, not in all-field | — |
//! | `relation`, `relation-list` | i64, not in all-field | — |
//! | `number`, `number[]` | i64, in all-field | — |
//! | explicit `analyzer: html` | text, HTML analyzer | — |
//! | explicit `analyzer: simple` | text, simple analyzer | — |
//! | anything else | logged as unsupported, omitted | — |
//!
//! Two bookkeeping fields always exist: `_fqid` (the document key) and
//! `_bleve_type` (the collection name; the name is part of the client
//! contract). Both use the keyword pipeline and stay out of the all-field
//! set.
//!
//! When two collections declare the same field name with different mappings
//! the first declaration wins and the conflict is logged; identical
//! declarations share the field.

use std::collections::BTreeMap;

use log::{debug, warn};
use plenum_core::model::{AnalyzerHint, CollectionModel, FieldSpec, FieldType};
use tantivy::schema::{
    Field, IndexRecordOption, Schema, TextFieldIndexing, TextOptions, INDEXED, STORED, STRING,
};

use crate::analyzer::AnalyzerKind;

/// Name of the document key field.
pub const FQID_FIELD: &str = "_fqid";
/// Name of the document type field. Part of the client contract.
pub const TYPE_FIELD: &str = "_bleve_type";

/// Value shape of a mapped field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Analyzed or keyword text.
    Text,
    /// 64-bit integers, possibly multi-valued.
    Numeric,
}

/// One field of the merged index schema.
#[derive(Debug, Clone)]
pub struct MappedField {
    /// Tantivy field handle.
    pub field: Field,
    /// Pipeline the field is analyzed with (text fields only).
    pub analyzer: AnalyzerKind,
    /// Whether the field participates in free-text matching.
    pub include_in_all: bool,
    /// Value shape.
    pub kind: ValueKind,
}

/// How a declared field maps into the schema.
struct FieldPlan {
    analyzer: AnalyzerKind,
    kind: ValueKind,
    include_in_all: bool,
    sidecar: bool,
}

impl FieldPlan {
    fn text(analyzer: AnalyzerKind) -> Self {
        Self {
            analyzer,
            kind: ValueKind::Text,
            include_in_all: true,
            sidecar: false,
        }
    }

    fn for_spec(name: &str, spec: &FieldSpec) -> Option<Self> {
        if let Some(hint) = &spec.analyzer {
            return match hint {
                AnalyzerHint::Html => Some(Self::text(AnalyzerKind::LanguageHtml)),
                AnalyzerHint::Simple => Some(Self::text(AnalyzerKind::Simple)),
                AnalyzerHint::Other(other) => {
                    warn!("unsupported analyzer {other:?} on field {name}, field dropped");
                    None
                }
            };
        }

        match &spec.field_type {
            FieldType::String | FieldType::Text => Some(Self {
                sidecar: true,
                ..Self::text(AnalyzerKind::Language)
            }),
            FieldType::HtmlStrict | FieldType::HtmlPermissive => {
                Some(Self::text(AnalyzerKind::LanguageHtml))
            }
            FieldType::GenericRelation => Some(Self {
                include_in_all: false,
                ..Self::text(AnalyzerKind::Keyword)
            }),
            FieldType::Relation | FieldType::RelationList => Some(Self {
                analyzer: AnalyzerKind::Keyword,
                kind: ValueKind::Numeric,
                include_in_all: false,
                sidecar: false,
            }),
            FieldType::Number | FieldType::NumberList => Some(Self {
                analyzer: AnalyzerKind::Keyword,
                kind: ValueKind::Numeric,
                include_in_all: true,
                sidecar: false,
            }),
            FieldType::JsonIntStringMap => {
                warn!("unsupported type \"json-int-string-map\" on field {name}, field dropped");
                None
            }
            FieldType::Other(other) => {
                warn!("unsupported type {other:?} on field {name}, field dropped");
                None
            }
        }
    }
}

/// The merged schema plus its field registry.
pub struct IndexMapping {
    schema: Schema,
    /// Document key field.
    pub fqid: Field,
    /// Document type field.
    pub doc_type: Field,
    fields: BTreeMap<String, MappedField>,
}

impl IndexMapping {
    /// Compile the collection model into a schema.
    pub fn build(model: &CollectionModel) -> Self {
        let mut builder = Schema::builder();

        let fqid = builder.add_text_field(FQID_FIELD, STRING | STORED);
        let doc_type = builder.add_text_field(TYPE_FIELD, STRING | STORED);

        // Plan all fields first so collisions across collections resolve
        // deterministically (collections iterate in name order).
        let mut planned: BTreeMap<String, FieldPlan> = BTreeMap::new();
        for (collection, decl) in model.iter() {
            for (name, spec) in &decl.fields {
                if !spec.searchable {
                    continue;
                }
                let Some(plan) = FieldPlan::for_spec(name, spec) else {
                    continue;
                };
                match planned.get(name) {
                    None => {
                        planned.insert(name.clone(), plan);
                    }
                    Some(existing)
                        if existing.analyzer == plan.analyzer
                            && existing.kind == plan.kind
                            && existing.include_in_all == plan.include_in_all =>
                    {
                        // Identical declaration, share the field.
                    }
                    Some(_) => {
                        warn!(
                            "field {name} of collection {collection} conflicts with an \
                             earlier declaration, keeping the first mapping"
                        );
                    }
                }
            }
        }

        let mut fields = BTreeMap::new();
        for (name, plan) in &planned {
            let field = match plan.kind {
                ValueKind::Text => builder.add_text_field(name, text_options(plan.analyzer)),
                ValueKind::Numeric => builder.add_i64_field(name, INDEXED | STORED),
            };
            fields.insert(
                name.clone(),
                MappedField {
                    field,
                    analyzer: plan.analyzer,
                    include_in_all: plan.include_in_all,
                    kind: plan.kind,
                },
            );
            if plan.sidecar {
                let sidecar_name = original_field(name);
                let field = builder
                    .add_text_field(&sidecar_name, text_options(AnalyzerKind::Simple));
                fields.insert(
                    sidecar_name,
                    MappedField {
                        field,
                        analyzer: AnalyzerKind::Simple,
                        include_in_all: true,
                        kind: ValueKind::Text,
                    },
                );
            }
        }

        debug!("index mapping holds {} fields", fields.len());

        Self {
            schema: builder.build(),
            fqid,
            doc_type,
            fields,
        }
    }

    /// The built Tantivy schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Look up a mapped field by name.
    pub fn get(&self, name: &str) -> Option<&MappedField> {
        self.fields.get(name)
    }

    /// Iterate over all mapped fields in name order.
    pub fn fields(&self) -> impl Iterator<Item = (&String, &MappedField)> {
        self.fields.iter()
    }

    /// Text fields participating in free-text matching, with their names.
    ///
    /// This is the "all-field" set handed to the query compiler. Numeric
    /// fields stay out; they are reachable through the explicit scope
    /// queries only.
    pub fn query_text_fields(&self) -> impl Iterator<Item = (&String, &MappedField)> {
        self.fields
            .iter()
            .filter(|(_, mf)| mf.kind == ValueKind::Text && mf.include_in_all)
    }

    /// Field handles of the all-field set.
    pub fn query_fields(&self) -> Vec<Field> {
        self.query_text_fields().map(|(_, mf)| mf.field).collect()
    }
}

impl std::fmt::Debug for IndexMapping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexMapping")
            .field("fields", &self.fields.len())
            .finish()
    }
}

/// Name of the unstemmed sidecar for a field.
pub fn original_field(name: &str) -> String {
    format!("_{name}_original")
}

fn text_options(analyzer: AnalyzerKind) -> TextOptions {
    TextOptions::default()
        .set_indexing_options(
            TextFieldIndexing::default()
                .set_tokenizer(analyzer.name())
                .set_index_option(IndexRecordOption::WithFreqsAndPositions),
        )
        .set_stored()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use plenum_core::model::CollectionModel;

    fn model(yaml: &str) -> CollectionModel {
        CollectionModel::from_yaml(yaml).unwrap()
    }

    #[test]
    fn test_string_field_gets_sidecar() {
        let mapping = IndexMapping::build(&model(
            r#"
topic:
  title:
    type: string
"#,
        ));

        let title = mapping.get("title").unwrap();
        assert_eq!(title.analyzer, AnalyzerKind::Language);
        assert!(title.include_in_all);
        assert_eq!(title.kind, ValueKind::Text);

        let original = mapping.get("_title_original").unwrap();
        assert_eq!(original.analyzer, AnalyzerKind::Simple);
    }

    #[test]
    fn test_html_field_no_sidecar() {
        let mapping = IndexMapping::build(&model(
            r#"
topic:
  text:
    type: HTMLPermissive
"#,
        ));

        assert_eq!(
            mapping.get("text").unwrap().analyzer,
            AnalyzerKind::LanguageHtml
        );
        assert!(mapping.get("_text_original").is_none());
    }

    #[test]
    fn test_generic_relation_is_keyword_out_of_all() {
        let mapping = IndexMapping::build(&model(
            r#"
mediafile:
  owner_id:
    type: generic-relation
"#,
        ));

        let owner = mapping.get("owner_id").unwrap();
        assert_eq!(owner.analyzer, AnalyzerKind::Keyword);
        assert!(!owner.include_in_all);
    }

    #[test]
    fn test_relation_numeric_out_of_all() {
        let mapping = IndexMapping::build(&model(
            r#"
topic:
  meeting_id:
    type: relation
  tag_ids:
    type: relation-list
"#,
        ));

        for name in ["meeting_id", "tag_ids"] {
            let mf = mapping.get(name).unwrap();
            assert_eq!(mf.kind, ValueKind::Numeric);
            assert!(!mf.include_in_all);
        }
    }

    #[test]
    fn test_number_numeric_in_all_flag() {
        let mapping = IndexMapping::build(&model(
            r#"
mediafile:
  meeting_ids:
    type: number[]
"#,
        ));

        let mf = mapping.get("meeting_ids").unwrap();
        assert_eq!(mf.kind, ValueKind::Numeric);
        assert!(mf.include_in_all);
        // Still not part of the free-text field set.
        assert!(!mapping.query_fields().contains(&mf.field));
    }

    #[test]
    fn test_analyzer_override() {
        let mapping = IndexMapping::build(&model(
            r#"
user:
  username:
    type: string
    analyzer: simple
  about_me:
    type: string
    analyzer: html
"#,
        ));

        assert_eq!(
            mapping.get("username").unwrap().analyzer,
            AnalyzerKind::Simple
        );
        assert_eq!(
            mapping.get("about_me").unwrap().analyzer,
            AnalyzerKind::LanguageHtml
        );
        // Overrides never create sidecars.
        assert!(mapping.get("_username_original").is_none());
    }

    #[test]
    fn test_unknown_type_dropped() {
        let mapping = IndexMapping::build(&model(
            r#"
poll:
  votes:
    type: decimal-map
  title:
    type: string
"#,
        ));

        assert!(mapping.get("votes").is_none());
        assert!(mapping.get("title").is_some());
    }

    #[test]
    fn test_json_int_string_map_dropped_without_override() {
        let mapping = IndexMapping::build(&model(
            r#"
user:
  comments:
    type: json-int-string-map
  notes:
    type: json-int-string-map
    analyzer: simple
"#,
        ));

        assert!(mapping.get("comments").is_none());
        assert_eq!(mapping.get("notes").unwrap().analyzer, AnalyzerKind::Simple);
    }

    #[test]
    fn test_non_searchable_skipped() {
        let mapping = IndexMapping::build(&model(
            r#"
topic:
  title:
    type: string
  sequential_number:
    type: number
    searchable: false
"#,
        ));

        assert!(mapping.get("sequential_number").is_none());
    }

    #[test]
    fn test_conflicting_declaration_first_wins() {
        // Collections iterate in name order: "agenda" before "motion".
        let mapping = IndexMapping::build(&model(
            r#"
motion:
  title:
    type: HTMLPermissive
agenda:
  title:
    type: string
"#,
        ));

        let title = mapping.get("title").unwrap();
        assert_eq!(title.analyzer, AnalyzerKind::Language);
        assert!(mapping.get("_title_original").is_some());
    }

    #[test]
    fn test_bookkeeping_fields_exist() {
        let mapping = IndexMapping::build(&model("topic:\n  title:\n    type: string\n"));
        assert!(mapping.schema().get_field(FQID_FIELD).is_ok());
        assert!(mapping.schema().get_field(TYPE_FIELD).is_ok());
    }

    #[test]
    fn test_query_fields_cover_sidecars() {
        let mapping = IndexMapping::build(&model(
            r#"
topic:
  title:
    type: string
  text:
    type: HTMLPermissive
"#,
        ));

        // title, _title_original, text
        assert_eq!(mapping.query_fields().len(), 3);
    }
}
