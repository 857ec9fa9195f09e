use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::TypeError;
use crate::identity::Uid;
use crate::path::DocumentPath;
use crate::timestamp::Timestamp;

/// Open field mapping that forms a document body.
pub type Fields = serde_json::Map<String, Value>;

/// Derived field carrying the document id on read.
pub const ID_FIELD: &str = "id";
/// Provenance field holding the creating subject.
pub const CREATED_BY_FIELD: &str = "createdBy";
/// Provenance field holding the creation time in epoch milliseconds.
pub const CREATED_AT_FIELD: &str = "createdAt";

/// A document as read from the store.
///
/// The body never holds [`ID_FIELD`]; the id lives in the path and is merged
/// back by [`Document::to_value`] and [`Document::decode`].
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    path: DocumentPath,
    fields: Fields,
}

impl Document {
    /// Wrap a body read from `path`. A stray `id` key in the body is dropped.
    pub fn new(path: DocumentPath, mut fields: Fields) -> Self {
        fields.remove(ID_FIELD);
        Self { path, fields }
    }

    pub fn path(&self) -> &DocumentPath {
        &self.path
    }

    pub fn id(&self) -> &str {
        self.path.id()
    }

    pub fn collection(&self) -> &str {
        self.path.collection()
    }

    /// The stored body, without the derived id.
    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Provenance stamped on creation, if any.
    pub fn provenance(&self) -> Option<Provenance> {
        let created_by = self.fields.get(CREATED_BY_FIELD)?.as_str()?;
        let created_at = self.fields.get(CREATED_AT_FIELD)?.as_i64()?;
        Some(Provenance {
            created_by: Uid::new(created_by),
            created_at: Timestamp::from_millis(created_at),
        })
    }

    /// The body with `id` merged in, as a JSON object.
    pub fn to_value(&self) -> Value {
        let mut merged = self.fields.clone();
        merged.insert(ID_FIELD.into(), Value::String(self.path.id().to_string()));
        Value::Object(merged)
    }

    /// Decode the body (with `id` merged in) into a caller-chosen type.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, TypeError> {
        Ok(serde_json::from_value(self.to_value())?)
    }
}

impl Serialize for Document {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

/// Creation metadata written by trusted contexts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Provenance {
    pub created_by: Uid,
    pub created_at: Timestamp,
}

impl Provenance {
    /// Provenance for `uid` at the current wall-clock time.
    pub fn now(uid: Uid) -> Self {
        Self {
            created_by: uid,
            created_at: Timestamp::now(),
        }
    }

    /// Stamp both provenance fields into `fields`, overwriting caller values.
    pub fn stamp(&self, fields: &mut Fields) {
        fields.insert(
            CREATED_BY_FIELD.into(),
            Value::String(self.created_by.as_str().to_string()),
        );
        fields.insert(
            CREATED_AT_FIELD.into(),
            Value::from(self.created_at.as_millis()),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    fn fields(v: Value) -> Fields {
        match v {
            Value::Object(m) => m,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn id_is_stripped_from_body_and_merged_on_read() {
        let path = DocumentPath::new("notes", "n1").unwrap();
        let doc = Document::new(path, fields(json!({"id": "bogus", "title": "hi"})));
        assert!(doc.get("id").is_none());
        assert_eq!(doc.to_value(), json!({"id": "n1", "title": "hi"}));
    }

    #[test]
    fn decode_into_typed_struct() {
        #[derive(Deserialize)]
        struct Note {
            id: String,
            title: String,
        }
        let path = DocumentPath::new("notes", "n2").unwrap();
        let doc = Document::new(path, fields(json!({"title": "typed"})));
        let note: Note = doc.decode().unwrap();
        assert_eq!(note.id, "n2");
        assert_eq!(note.title, "typed");
    }

    #[test]
    fn decode_type_mismatch_is_serialization_error() {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Strict {
            count: u32,
        }
        let path = DocumentPath::new("notes", "n3").unwrap();
        let doc = Document::new(path, fields(json!({"count": "many"})));
        assert!(matches!(
            doc.decode::<Strict>(),
            Err(TypeError::Serialization(_))
        ));
    }

    #[test]
    fn provenance_stamp_and_read_back() {
        let prov = Provenance {
            created_by: Uid::new("u1"),
            created_at: Timestamp::from_millis(42),
        };
        let mut body = fields(json!({"createdBy": "forged", "x": 1}));
        prov.stamp(&mut body);
        let doc = Document::new(DocumentPath::new("c", "d").unwrap(), body);
        assert_eq!(doc.provenance(), Some(prov));
        assert_eq!(doc.get("x"), Some(&json!(1)));
    }

    #[test]
    fn serialize_includes_id() {
        let doc = Document::new(
            DocumentPath::new("c", "d").unwrap(),
            fields(json!({"a": true})),
        );
        assert_eq!(serde_json::to_value(&doc).unwrap(), json!({"a": true, "id": "d"}));
    }
}
