use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of a privileged create-or-update.
///
/// Every field is optional on the wire so that missing ones are reported
/// as [`crate::ServerError::BadRequest`] rather than a decoding failure.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbUpdateRequest {
    pub collection_id: Option<String>,
    pub id: Option<String>,
    pub data: Option<Value>,
    pub id_token: Option<String>,
}

/// Body of a privileged delete.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbDeleteRequest {
    pub collection_id: Option<String>,
    pub id: Option<String>,
    pub id_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wire_names_are_camel_case() {
        let req: DbUpdateRequest = serde_json::from_value(json!({
            "collectionId": "notes",
            "data": {"title": "t"},
            "idToken": "abc",
        }))
        .unwrap();
        assert_eq!(req.collection_id.as_deref(), Some("notes"));
        assert_eq!(req.id, None);
        assert_eq!(req.id_token.as_deref(), Some("abc"));
    }

    #[test]
    fn empty_body_decodes() {
        let req: DbDeleteRequest = serde_json::from_value(json!({})).unwrap();
        assert_eq!(req, DbDeleteRequest::default());
    }
}
