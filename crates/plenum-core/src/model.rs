//! The collection model.
//!
//! The model describes, for each collection, which fields exist and how they
//! are indexed: a source type, a searchable flag, and an optional analyzer
//! override. It is loaded once at startup from a YAML file and shared
//! immutably afterwards.
//!
//! # File format
//!
//! ```yaml
//! meeting:
//!   welcome_text:
//!     type: HTMLPermissive
//! topic:
//!   title:
//!     type: string
//!   text:
//!     type: HTMLPermissive
//! ```
//!
//! Fields are searchable unless they carry `searchable: false`.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Source type of a declared field.
///
/// The strings in the model file are the source store's own type vocabulary;
/// unknown strings are preserved so the mapping builder can report them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    /// Short plain text.
    #[serde(rename = "string")]
    String,
    /// Long plain text.
    #[serde(rename = "text")]
    Text,
    /// HTML with a strict tag whitelist.
    #[serde(rename = "HTMLStrict")]
    HtmlStrict,
    /// HTML with a permissive tag whitelist.
    #[serde(rename = "HTMLPermissive")]
    HtmlPermissive,
    /// Single numeric foreign key.
    #[serde(rename = "relation")]
    Relation,
    /// List of numeric foreign keys.
    #[serde(rename = "relation-list")]
    RelationList,
    /// FQID-valued reference ("meeting/1").
    #[serde(rename = "generic-relation")]
    GenericRelation,
    /// Single number.
    #[serde(rename = "number")]
    Number,
    /// List of numbers.
    #[serde(rename = "number[]")]
    NumberList,
    /// JSON object mapping integer keys to strings.
    #[serde(rename = "json-int-string-map")]
    JsonIntStringMap,
    /// Anything else. Reported as unsupported by the mapping builder.
    #[serde(untagged)]
    Other(String),
}

/// Explicit analyzer override for a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalyzerHint {
    /// Force the HTML-aware pipeline.
    #[serde(rename = "html")]
    Html,
    /// Force the simple pipeline (lowercase only, no stemming).
    #[serde(rename = "simple")]
    Simple,
    /// Anything else. Reported as unsupported by the mapping builder.
    #[serde(untagged)]
    Other(String),
}

/// Declaration of a single field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Source type.
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Whether the field participates in the text index.
    #[serde(default = "default_searchable")]
    pub searchable: bool,
    /// Optional analyzer override.
    #[serde(default)]
    pub analyzer: Option<AnalyzerHint>,
}

fn default_searchable() -> bool {
    true
}

/// A single collection: field name to declaration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Collection {
    /// Declared fields.
    pub fields: BTreeMap<String, FieldSpec>,
}

/// The full collection model: collection name to declaration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectionModel {
    collections: BTreeMap<String, Collection>,
}

impl CollectionModel {
    /// Load the model from a YAML file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::ModelIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Parse the model from YAML text.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Look up a collection by name.
    pub fn get(&self, name: &str) -> Option<&Collection> {
        self.collections.get(name)
    }

    /// Whether the model declares the given collection.
    pub fn contains(&self, name: &str) -> bool {
        self.collections.contains_key(name)
    }

    /// Iterate over collections in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Collection)> {
        self.collections.iter()
    }

    /// Number of declared collections.
    pub fn len(&self) -> usize {
        self.collections.len()
    }

    /// Whether the model is empty.
    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    /// Insert a collection. Used by tests and programmatic model setup.
    pub fn insert(&mut self, name: impl Into<String>, collection: Collection) {
        self.collections.insert(name.into(), collection);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
meeting:
  welcome_text:
    type: HTMLPermissive
topic:
  title:
    type: string
  text:
    type: HTMLPermissive
  sequential_number:
    type: number
    searchable: false
"#;

    #[test]
    fn test_parse_sample() {
        let model = CollectionModel::from_yaml(SAMPLE).unwrap();
        assert_eq!(model.len(), 2);
        assert!(model.contains("meeting"));
        assert!(model.contains("topic"));
        assert!(!model.contains("motion"));
    }

    #[test]
    fn test_field_types() {
        let model = CollectionModel::from_yaml(SAMPLE).unwrap();
        let topic = model.get("topic").unwrap();

        assert_eq!(topic.fields["title"].field_type, FieldType::String);
        assert_eq!(topic.fields["text"].field_type, FieldType::HtmlPermissive);
        assert_eq!(
            topic.fields["sequential_number"].field_type,
            FieldType::Number
        );
    }

    #[test]
    fn test_searchable_defaults_to_true() {
        let model = CollectionModel::from_yaml(SAMPLE).unwrap();
        let topic = model.get("topic").unwrap();

        assert!(topic.fields["title"].searchable);
        assert!(!topic.fields["sequential_number"].searchable);
    }

    #[test]
    fn test_analyzer_hint() {
        let yaml = r#"
user:
  username:
    type: string
    analyzer: simple
"#;
        let model = CollectionModel::from_yaml(yaml).unwrap();
        let user = model.get("user").unwrap();
        assert_eq!(user.fields["username"].analyzer, Some(AnalyzerHint::Simple));
    }

    #[test]
    fn test_unknown_type_preserved() {
        let yaml = r#"
poll:
  votes:
    type: decimal-map
"#;
        let model = CollectionModel::from_yaml(yaml).unwrap();
        let poll = model.get("poll").unwrap();
        assert_eq!(
            poll.fields["votes"].field_type,
            FieldType::Other("decimal-map".to_string())
        );
    }

    #[test]
    fn test_invalid_yaml_is_error() {
        assert!(CollectionModel::from_yaml("meeting: [not, a, mapping]").is_err());
    }
}
