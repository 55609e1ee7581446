//! Document projection: source row → indexable document.
//!
//! The projector performs a typed read per declared searchable field. A value
//! that is absent, SQL NULL, or of the wrong runtime tag drops the field; the
//! rest of the document is unaffected. `string`/`text` fields additionally
//! feed their unchanged value into the `_<field>_original` sidecar.

use log::debug;
use plenum_core::model::{Collection, FieldType};
use plenum_core::value::{FieldValue, RowMap};
use plenum_core::{fqid, FieldSpec};
use tantivy::TantivyDocument;

use crate::mapping::{original_field, IndexMapping, MappedField, ValueKind};

/// Project a source row into a Tantivy document.
///
/// The document always carries its FQID and collection name; everything else
/// follows the per-field rules of the mapping.
pub fn project(
    mapping: &IndexMapping,
    declaration: &Collection,
    collection: &str,
    id: i32,
    row: &RowMap,
) -> TantivyDocument {
    let mut doc = TantivyDocument::new();
    doc.add_text(mapping.fqid, fqid::join(collection, id));
    doc.add_text(mapping.doc_type, collection);

    for (name, spec) in &declaration.fields {
        if !spec.searchable {
            continue;
        }
        let Some(mapped) = mapping.get(name) else {
            // Dropped at mapping time (unsupported type or collision).
            continue;
        };
        let Some(value) = row.get(name) else {
            continue;
        };
        if value.is_null() {
            continue;
        }
        project_field(&mut doc, name, spec, mapped, value, collection);
    }

    // Sidecar copies for plain string/text fields.
    for (name, spec) in &declaration.fields {
        if !spec.searchable
            || !matches!(spec.field_type, FieldType::String | FieldType::Text)
            || spec.analyzer.is_some()
        {
            continue;
        }
        let Some(original) = mapping.get(&original_field(name)) else {
            continue;
        };
        if let Some(text) = row.get(name).and_then(FieldValue::as_str) {
            doc.add_text(original.field, text);
        }
    }

    doc
}

fn project_field(
    doc: &mut TantivyDocument,
    name: &str,
    spec: &FieldSpec,
    mapped: &MappedField,
    value: &FieldValue,
    collection: &str,
) {
    match &spec.field_type {
        FieldType::String
        | FieldType::Text
        | FieldType::HtmlStrict
        | FieldType::HtmlPermissive
        | FieldType::GenericRelation => {
            if let Some(text) = value.as_str() {
                doc.add_text(mapped.field, text);
            } else {
                drop_field(collection, name, value);
            }
        }
        FieldType::Relation | FieldType::Number => match (mapped.kind, value.as_i64()) {
            (ValueKind::Numeric, Some(number)) => doc.add_i64(mapped.field, number),
            (ValueKind::Text, Some(number)) => doc.add_text(mapped.field, number.to_string()),
            (_, None) => drop_field(collection, name, value),
        },
        FieldType::RelationList | FieldType::NumberList => {
            if let FieldValue::IntArray(numbers) = value {
                for number in numbers {
                    match mapped.kind {
                        ValueKind::Numeric => doc.add_i64(mapped.field, *number),
                        ValueKind::Text => doc.add_text(mapped.field, number.to_string()),
                    }
                }
            } else {
                drop_field(collection, name, value);
            }
        }
        FieldType::JsonIntStringMap => {
            // Only mapped when an explicit analyzer override is present.
            if let Some(values) = json_int_string_values(value) {
                for text in values {
                    doc.add_text(mapped.field, text);
                }
            } else {
                drop_field(collection, name, value);
            }
        }
        FieldType::Other(_) => {
            // Unsupported types never survive the mapping; if an override
            // forced one in, store whatever text it carries.
            if let Some(text) = value.as_str() {
                doc.add_text(mapped.field, text);
            }
        }
    }
}

fn drop_field(collection: &str, name: &str, value: &FieldValue) {
    debug!("dropping field {collection}.{name}: unexpected value tag {value:?}");
}

/// Normalize a `json-int-string-map` value to an ordered sequence.
///
/// JSON objects are ordered by their integer keys; string arrays pass
/// through unchanged.
fn json_int_string_values(value: &FieldValue) -> Option<Vec<String>> {
    match value {
        FieldValue::StringArray(values) => Some(values.clone()),
        FieldValue::Json(serde_json::Value::Object(map)) => {
            let mut entries: Vec<(i64, String)> = map
                .iter()
                .filter_map(|(key, value)| {
                    let key: i64 = key.parse().ok()?;
                    Some((key, value.as_str()?.to_string()))
                })
                .collect();
            entries.sort_by_key(|(key, _)| *key);
            Some(entries.into_iter().map(|(_, value)| value).collect())
        }
        _ => None,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use plenum_core::model::CollectionModel;
    use plenum_core::value::FieldValue;
    use tantivy::schema::Value;

    fn setup(yaml: &str) -> (IndexMapping, CollectionModel) {
        let model = CollectionModel::from_yaml(yaml).unwrap();
        let mapping = IndexMapping::build(&model);
        (mapping, model)
    }

    fn texts(doc: &TantivyDocument, mapping: &IndexMapping, name: &str) -> Vec<String> {
        let field = mapping.get(name).unwrap().field;
        doc.get_all(field)
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect()
    }

    const TOPIC: &str = r#"
topic:
  title:
    type: string
  text:
    type: HTMLPermissive
  meeting_id:
    type: relation
  tag_ids:
    type: relation-list
"#;

    #[test]
    fn test_project_text_and_sidecar() {
        let (mapping, model) = setup(TOPIC);
        let mut row = RowMap::new();
        row.insert("title".into(), FieldValue::from("test"));

        let doc = project(&mapping, model.get("topic").unwrap(), "topic", 2, &row);

        assert_eq!(texts(&doc, &mapping, "title"), vec!["test"]);
        assert_eq!(texts(&doc, &mapping, "_title_original"), vec!["test"]);
    }

    #[test]
    fn test_project_carries_identity() {
        let (mapping, model) = setup(TOPIC);
        let doc = project(
            &mapping,
            model.get("topic").unwrap(),
            "topic",
            2,
            &RowMap::new(),
        );

        let fqid = doc.get_first(mapping.fqid).and_then(|v| v.as_str());
        assert_eq!(fqid, Some("topic/2"));
        let doc_type = doc.get_first(mapping.doc_type).and_then(|v| v.as_str());
        assert_eq!(doc_type, Some("topic"));
    }

    #[test]
    fn test_project_html_without_sidecar() {
        let (mapping, model) = setup(TOPIC);
        let mut row = RowMap::new();
        row.insert("text".into(), FieldValue::from("<p>test west</p>"));

        let doc = project(&mapping, model.get("topic").unwrap(), "topic", 2, &row);

        // Stored verbatim; stripping happens at analysis time.
        assert_eq!(texts(&doc, &mapping, "text"), vec!["<p>test west</p>"]);
        assert!(mapping.get("_text_original").is_none());
    }

    #[test]
    fn test_project_drops_wrong_tag() {
        let (mapping, model) = setup(TOPIC);
        let mut row = RowMap::new();
        row.insert("title".into(), FieldValue::Int(7));
        row.insert("meeting_id".into(), FieldValue::from("not a number"));

        let doc = project(&mapping, model.get("topic").unwrap(), "topic", 2, &row);

        assert!(texts(&doc, &mapping, "title").is_empty());
        let meeting_id = mapping.get("meeting_id").unwrap().field;
        assert!(doc.get_first(meeting_id).is_none());
    }

    #[test]
    fn test_project_drops_null_and_absent() {
        let (mapping, model) = setup(TOPIC);
        let mut row = RowMap::new();
        row.insert("title".into(), FieldValue::Null);

        let doc = project(&mapping, model.get("topic").unwrap(), "topic", 2, &row);
        assert!(texts(&doc, &mapping, "title").is_empty());
        assert!(texts(&doc, &mapping, "_title_original").is_empty());
    }

    #[test]
    fn test_project_numbers() {
        let (mapping, model) = setup(TOPIC);
        let mut row = RowMap::new();
        row.insert("meeting_id".into(), FieldValue::Int(5));
        row.insert("tag_ids".into(), FieldValue::IntArray(vec![1, 2, 3]));

        let doc = project(&mapping, model.get("topic").unwrap(), "topic", 2, &row);

        let meeting_id = mapping.get("meeting_id").unwrap().field;
        assert_eq!(doc.get_first(meeting_id).and_then(|v| v.as_i64()), Some(5));
        let tag_ids = mapping.get("tag_ids").unwrap().field;
        let tags: Vec<i64> = doc.get_all(tag_ids).filter_map(|v| v.as_i64()).collect();
        assert_eq!(tags, vec![1, 2, 3]);
    }

    #[test]
    fn test_json_int_string_map_ordering() {
        let value = FieldValue::Json(serde_json::json!({
            "10": "zehn",
            "2": "zwei",
            "1": "eins"
        }));
        assert_eq!(
            json_int_string_values(&value).unwrap(),
            vec!["eins", "zwei", "zehn"]
        );

        let value = FieldValue::StringArray(vec!["a".into(), "b".into()]);
        assert_eq!(json_int_string_values(&value).unwrap(), vec!["a", "b"]);

        assert!(json_int_string_values(&FieldValue::Int(1)).is_none());
    }

    #[test]
    fn test_non_searchable_ignored() {
        let (mapping, model) = setup(
            r#"
topic:
  title:
    type: string
  internal:
    type: string
    searchable: false
"#,
        );
        let mut row = RowMap::new();
        row.insert("internal".into(), FieldValue::from("hidden"));

        let doc = project(&mapping, model.get("topic").unwrap(), "topic", 1, &row);
        assert!(mapping.get("internal").is_none());
        assert_eq!(doc.get_first(mapping.fqid).and_then(|v| v.as_str()), Some("topic/1"));
    }
}
