use serde::Serialize;
use serde_json::Value;

use crate::document::{Fields, ID_FIELD};
use crate::error::TypeError;

/// Atomic array mutation applied to a single field at write time.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldTransform {
    /// Append each value not already present.
    ArrayUnion(Vec<Value>),
    /// Remove every occurrence of each value.
    ArrayRemove(Vec<Value>),
}

impl FieldTransform {
    /// Apply the transform to the current value of a field.
    ///
    /// A missing or non-array current value is treated as an empty array.
    pub fn apply(&self, current: Option<&Value>) -> Value {
        let mut items = match current {
            Some(Value::Array(items)) => items.clone(),
            _ => Vec::new(),
        };
        match self {
            Self::ArrayUnion(values) => {
                for v in values {
                    if !items.contains(v) {
                        items.push(v.clone());
                    }
                }
            }
            Self::ArrayRemove(values) => items.retain(|item| !values.contains(item)),
        }
        Value::Array(items)
    }
}

/// Payload of a create-or-update.
///
/// Plain fields replace top-level keys; transforms run afterwards against
/// whatever value the field then holds.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WriteData {
    fields: Fields,
    transforms: Vec<(String, FieldTransform)>,
}

impl WriteData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a field map. Any `id` key is dropped.
    pub fn from_fields(mut fields: Fields) -> Self {
        fields.remove(ID_FIELD);
        Self {
            fields,
            transforms: Vec::new(),
        }
    }

    /// Build from any value that serializes to a JSON object.
    pub fn from_serialize<T: Serialize + ?Sized>(data: &T) -> Result<Self, TypeError> {
        match serde_json::to_value(data)? {
            Value::Object(fields) => Ok(Self::from_fields(fields)),
            other => Err(TypeError::NotAnObject(json_kind(&other))),
        }
    }

    /// Set a single top-level field.
    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        let field = field.into();
        if field != ID_FIELD {
            self.fields.insert(field, value.into());
        }
        self
    }

    pub fn array_union(mut self, field: impl Into<String>, values: Vec<Value>) -> Self {
        self.transforms
            .push((field.into(), FieldTransform::ArrayUnion(values)));
        self
    }

    pub fn array_remove(mut self, field: impl Into<String>, values: Vec<Value>) -> Self {
        self.transforms
            .push((field.into(), FieldTransform::ArrayRemove(values)));
        self
    }

    /// Drop a field and any transforms targeting it.
    pub fn without(mut self, field: &str) -> Self {
        self.fields.remove(field);
        self.transforms.retain(|(name, _)| name != field);
        self
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn transforms(&self) -> &[(String, FieldTransform)] {
        &self.transforms
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.transforms.is_empty()
    }

    /// Partially merge this payload into an existing body.
    pub fn merge_into(&self, target: &mut Fields) {
        for (k, v) in &self.fields {
            target.insert(k.clone(), v.clone());
        }
        for (field, transform) in &self.transforms {
            if field == ID_FIELD {
                continue;
            }
            let next = transform.apply(target.get(field));
            target.insert(field.clone(), next);
        }
    }

    /// The full body written on the create branch.
    pub fn to_body(&self) -> Fields {
        let mut body = Fields::new();
        self.merge_into(&mut body);
        body
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn obj(v: Value) -> Fields {
        match v {
            Value::Object(m) => m,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn from_serialize_rejects_non_objects() {
        assert_eq!(
            WriteData::from_serialize(&vec![1, 2]),
            Err(TypeError::NotAnObject("array"))
        );
        assert_eq!(
            WriteData::from_serialize(&"text"),
            Err(TypeError::NotAnObject("string"))
        );
    }

    #[test]
    fn id_never_enters_the_payload() {
        let data = WriteData::from_serialize(&json!({"id": "x", "a": 1})).unwrap();
        assert!(!data.fields().contains_key("id"));
        let data = WriteData::new().set("id", "y");
        assert!(data.is_empty());
    }

    #[test]
    fn without_drops_field_and_its_transforms() {
        let data = WriteData::new()
            .set("a", 1)
            .set("b", 2)
            .array_union("a", vec![json!(3)])
            .array_union("c", vec![json!(4)])
            .without("a");
        assert_eq!(Value::Object(data.to_body()), json!({"b": 2, "c": [4]}));
    }

    #[test]
    fn merge_keeps_untouched_fields() {
        let mut body = obj(json!({"a": 1, "b": 2}));
        WriteData::new().set("b", 3).set("c", 4).merge_into(&mut body);
        assert_eq!(Value::Object(body), json!({"a": 1, "b": 3, "c": 4}));
    }

    #[test]
    fn array_union_skips_existing_values() {
        let mut body = obj(json!({"tags": ["a", "b"]}));
        WriteData::new()
            .array_union("tags", vec![json!("b"), json!("c")])
            .merge_into(&mut body);
        assert_eq!(body["tags"], json!(["a", "b", "c"]));
    }

    #[test]
    fn array_remove_drops_all_occurrences() {
        let mut body = obj(json!({"tags": ["a", "b", "a"]}));
        WriteData::new()
            .array_remove("tags", vec![json!("a")])
            .merge_into(&mut body);
        assert_eq!(body["tags"], json!(["b"]));
    }

    #[test]
    fn transforms_on_create_start_from_empty() {
        let body = WriteData::new()
            .array_union("tags", vec![json!(1), json!(1)])
            .array_remove("other", vec![json!(2)])
            .to_body();
        assert_eq!(body["tags"], json!([1]));
        assert_eq!(body["other"], json!([]));
    }

    proptest! {
        #[test]
        fn merge_is_union_with_later_precedence(
            first in prop::collection::btree_map("[a-e]", 0i64..100, 0..5),
            second in prop::collection::btree_map("[a-e]", 0i64..100, 0..5),
        ) {
            let to_fields = |m: &std::collections::BTreeMap<String, i64>| {
                m.iter().map(|(k, v)| (k.clone(), json!(v))).collect::<Fields>()
            };
            let mut body = WriteData::from_fields(to_fields(&first)).to_body();
            WriteData::from_fields(to_fields(&second)).merge_into(&mut body);

            for (k, v) in &second {
                prop_assert_eq!(&body[k], &json!(v));
            }
            for (k, v) in &first {
                if !second.contains_key(k) {
                    prop_assert_eq!(&body[k], &json!(v));
                }
            }
            let mut keys: Vec<&String> = first.keys().chain(second.keys()).collect();
            keys.sort();
            keys.dedup();
            prop_assert_eq!(body.len(), keys.len());
        }
    }
}
