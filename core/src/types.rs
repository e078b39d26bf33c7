//! Document and result types shared by the bridge, the store, and the client.
//!
//! # Design
//! `TodoDocument` wraps a raw JSON object rather than a fixed struct: the
//! application owns the schema, and the bridge must carry fields it has never
//! heard of. Only `_id` and `_rev` have meaning on this side of the boundary.
//! Result types mirror the shapes a CouchDB-style store returns so they can be
//! forwarded to the application and sent over the wire unchanged.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key of the identifier field on every document.
pub const ID_FIELD: &str = "_id";

/// Key of the revision token maintained by the store.
pub const REV_FIELD: &str = "_rev";

/// A single todo document: a JSON object keyed by `_id`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TodoDocument(Map<String, Value>);

impl TodoDocument {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// The document identifier, if present as a non-empty string.
    pub fn id(&self) -> Option<&str> {
        self.0
            .get(ID_FIELD)
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
    }

    /// The store revision token, if the document carries one.
    pub fn rev(&self) -> Option<&str> {
        self.0.get(REV_FIELD).and_then(Value::as_str)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.0
    }

    pub fn set_id(&mut self, id: &str) {
        self.0.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
    }

    /// Set or clear the revision token.
    pub fn set_rev(&mut self, rev: Option<&str>) {
        match rev {
            Some(rev) => {
                self.0.insert(REV_FIELD.to_string(), Value::String(rev.to_string()));
            }
            None => {
                self.0.remove(REV_FIELD);
            }
        }
    }

    /// Copy `existing` and overwrite it with every field of `self`.
    ///
    /// Fields of `existing` that `self` does not mention survive unchanged.
    /// With no existing document the result is `self` as-is.
    pub fn merged_onto(self, existing: Option<TodoDocument>) -> TodoDocument {
        let Some(existing) = existing else {
            return self;
        };
        let mut merged = existing.0;
        for (key, value) in self.0 {
            merged.insert(key, value);
        }
        TodoDocument(merged)
    }

    /// Drop store metadata, keeping only `_id` and application fields.
    pub fn into_body(mut self) -> TodoDocument {
        self.0.remove(REV_FIELD);
        self
    }
}

impl From<Map<String, Value>> for TodoDocument {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// Result of a successful single-document write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PutResult {
    pub ok: bool,
    pub id: String,
    pub rev: String,
}

/// Result of an upsert. `updated` is false when the diff asked for no change,
/// in which case `rev` is the unchanged current revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertResult {
    pub updated: bool,
    pub id: String,
    pub rev: String,
}

/// Revision summary attached to each listing row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowValue {
    pub rev: String,
}

/// One row of an all-documents listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllDocsRow {
    pub id: String,
    pub key: String,
    pub value: RowValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<TodoDocument>,
}

/// Listing of every stored document, sorted by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllDocsResponse {
    pub total_rows: usize,
    pub offset: usize,
    pub rows: Vec<AllDocsRow>,
}

impl AllDocsResponse {
    /// Project the listing down to document bodies, discarding row and
    /// revision metadata. Rows listed without bodies are skipped.
    pub fn into_bodies(self) -> Vec<TodoDocument> {
        self.rows
            .into_iter()
            .filter_map(|row| row.doc)
            .map(TodoDocument::into_body)
            .collect()
    }
}

/// Startup parameters handed to the embedded application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitFlags {
    pub cuid: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> TodoDocument {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn id_requires_non_empty_string() {
        assert_eq!(doc(json!({"_id": "a"})).id(), Some("a"));
        assert_eq!(doc(json!({"_id": ""})).id(), None);
        assert_eq!(doc(json!({"_id": 7})).id(), None);
        assert_eq!(doc(json!({"title": "x"})).id(), None);
    }

    #[test]
    fn merge_overwrites_present_fields_and_keeps_absent_ones() {
        let existing = doc(json!({"_id": "a", "title": "x", "done": false}));
        let incoming = doc(json!({"_id": "a", "done": true}));
        let merged = incoming.merged_onto(Some(existing));
        assert_eq!(merged, doc(json!({"_id": "a", "title": "x", "done": true})));
    }

    #[test]
    fn merge_is_shallow() {
        let existing = doc(json!({"_id": "a", "meta": {"x": 1, "y": 2}}));
        let incoming = doc(json!({"meta": {"x": 3}}));
        let merged = incoming.merged_onto(Some(existing));
        assert_eq!(merged.get("meta"), Some(&json!({"x": 3})));
    }

    #[test]
    fn merge_without_existing_returns_incoming() {
        let incoming = doc(json!({"_id": "a", "title": "x"}));
        assert_eq!(incoming.clone().merged_onto(None), incoming);
    }

    #[test]
    fn set_rev_inserts_and_clears() {
        let mut d = doc(json!({"_id": "a"}));
        d.set_rev(Some("1-abc"));
        assert_eq!(d.rev(), Some("1-abc"));
        d.set_rev(None);
        assert!(d.rev().is_none());
    }

    #[test]
    fn into_bodies_strips_revisions_and_skips_bare_rows() {
        let listing: AllDocsResponse = serde_json::from_value(json!({
            "total_rows": 2,
            "offset": 0,
            "rows": [
                {"id": "a", "key": "a", "value": {"rev": "1-x"},
                 "doc": {"_id": "a", "_rev": "1-x", "title": "t"}},
                {"id": "b", "key": "b", "value": {"rev": "1-y"}}
            ]
        }))
        .unwrap();
        let bodies = listing.into_bodies();
        assert_eq!(bodies, vec![doc(json!({"_id": "a", "title": "t"}))]);
    }

    #[test]
    fn row_without_doc_omits_field_when_serialized() {
        let row = AllDocsRow {
            id: "a".to_string(),
            key: "a".to_string(),
            value: RowValue { rev: "1-x".to_string() },
            doc: None,
        };
        let json = serde_json::to_value(&row).unwrap();
        assert!(json.get("doc").is_none());
    }
}
