use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::Json;
use serde_json::{json, Value};

use docbase_types::Document;

use crate::error::ServerResult;
use crate::request::{DbDeleteRequest, DbUpdateRequest};
use crate::server::Server;

/// Health check handler.
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "name": "docbase-server",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn get_handler(
    State(server): State<Arc<Server>>,
    Path((collection, id)): Path<(String, String)>,
) -> ServerResult<Json<Document>> {
    Ok(Json(server.db_get(&collection, &id).await?))
}

/// `POST /v1/db/update`. The token may travel in the body or as a bearer
/// `Authorization` header; the body wins.
pub async fn update_handler(
    State(server): State<Arc<Server>>,
    headers: HeaderMap,
    Json(mut request): Json<DbUpdateRequest>,
) -> ServerResult<Json<Document>> {
    if request.id_token.is_none() {
        request.id_token = bearer_token(&headers);
    }
    Ok(Json(server.db_update(request).await?))
}

pub async fn delete_handler(
    State(server): State<Arc<Server>>,
    headers: HeaderMap,
    Json(mut request): Json<DbDeleteRequest>,
) -> ServerResult<StatusCode> {
    if request.id_token.is_none() {
        request.id_token = bearer_token(&headers);
    }
    server.db_delete(request).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|t| t.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers).as_deref(), Some("abc.def"));
    }
}
