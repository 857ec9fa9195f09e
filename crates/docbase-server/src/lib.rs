//! Server facade for docbase.
//!
//! Runs in a trusted context holding service-account credentials. Every
//! privileged write verifies the caller's id token, runs the collection's
//! hooks, and stamps provenance on creation. The same operations are
//! exposed over HTTP by [`router::build_router`].

pub mod config;
pub mod error;
pub mod handler;
pub mod hooks;
pub mod request;
pub mod router;
pub mod server;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use hooks::{CollectionHooks, DatabaseConfig, HookContext, HookResult, NoOpHooks};
pub use request::{DbDeleteRequest, DbUpdateRequest};
pub use server::Server;

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use axum::Router;
    use serde_json::{json, Value};
    use tower::util::ServiceExt;

    use docbase_identity::{IdentityGateway, LocalIdentityService, ServiceAccount};
    use docbase_store::InMemoryDocumentStore;

    use super::*;

    async fn app() -> (Router, String) {
        let sa = ServiceAccount::generate("proj", "svc@proj");
        let identity = LocalIdentityService::for_service_account(&sa).unwrap();
        identity.sign_up("a@b.io", "secret1").await.unwrap();
        let token = identity.get_id_token(true).await.unwrap().unwrap();

        let store = Arc::new(InMemoryDocumentStore::new());
        let server =
            Server::from_config(ServerConfig::new(sa), store, DatabaseConfig::new()).unwrap();
        (Arc::new(server).router(), token.as_str().to_string())
    }

    fn post(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_endpoint() {
        let (app, _) = app().await;
        let response = app.oneshot(get("/v1/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn missing_document_is_404() {
        let (app, _) = app().await;
        let response = app.oneshot(get("/v1/db/notes/ghost")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["error"], "not-found");
    }

    #[tokio::test]
    async fn anonymous_update_is_403() {
        let (app, _) = app().await;
        let response = app
            .oneshot(post("/v1/db/update", json!({"collectionId": "notes", "data": {"x": 1}})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn forged_token_is_401() {
        let (app, _) = app().await;
        let response = app
            .oneshot(post(
                "/v1/db/update",
                json!({"collectionId": "notes", "data": {"x": 1}, "idToken": "00.00"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn missing_data_is_400() {
        let (app, token) = app().await;
        let response = app
            .oneshot(post("/v1/db/update", json!({"collectionId": "notes", "idToken": token})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn update_get_delete_round_trip() {
        let (app, token) = app().await;

        let response = app
            .clone()
            .oneshot(post(
                "/v1/db/update",
                json!({
                    "collectionId": "notes",
                    "id": "n1",
                    "data": {"title": "t"},
                    "idToken": token
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let created = json_body(response).await;
        assert_eq!(created["id"], "n1");
        assert_eq!(created["title"], "t");
        assert!(created["createdBy"].is_string());

        let response = app.clone().oneshot(get("/v1/db/notes/n1")).await.unwrap();
        assert_eq!(json_body(response).await, created);

        let mut delete = post("/v1/db/delete", json!({"collectionId": "notes", "id": "n1"}));
        delete.headers_mut().insert(
            header::AUTHORIZATION,
            format!("Bearer {token}").parse().unwrap(),
        );
        let response = app.clone().oneshot(delete).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app.oneshot(get("/v1/db/notes/n1")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn client_session_authorizes_server_writes() {
        use docbase_client::{Client, ClientConfig, SessionState};

        let sa = ServiceAccount::generate("proj", "svc@proj");
        let identity = Arc::new(LocalIdentityService::for_service_account(&sa).unwrap());
        let store = Arc::new(InMemoryDocumentStore::new());
        let client = Client::new(ClientConfig::emulated("proj"), identity, store.clone());
        let server =
            Server::from_config(ServerConfig::new(sa), store, DatabaseConfig::new()).unwrap();

        assert_eq!(client.authenticate().await.unwrap(), SessionState::Anonymous);
        let session = client.sign_up("a@b.io", "secret1").await.unwrap();
        let state = client.authenticate().await.unwrap();
        let token = state.token().unwrap().as_str().to_string();

        let mut watch = client.watch_item::<Value>("notes", "n1");
        assert_eq!(watch.next_change().await, Some(Ok(None)));

        let doc = server
            .db_update(DbUpdateRequest {
                collection_id: Some("notes".into()),
                id: Some("n1".into()),
                data: Some(json!({"title": "from server"})),
                id_token: Some(token),
            })
            .await
            .unwrap();
        assert_eq!(doc.provenance().unwrap().created_by, session.uid);

        let seen = watch.next_change().await.unwrap().unwrap().unwrap();
        assert_eq!(seen["title"], "from server");
        assert_eq!(seen["createdBy"], session.uid.as_str());

        client.delete_item("notes", "n1").await.unwrap();
        assert!(matches!(server.db_get("notes", "n1").await, Err(ServerError::NotFound(_))));
        assert_eq!(client.get_item::<Value>("notes", "n1").await.unwrap(), None);
    }
}
