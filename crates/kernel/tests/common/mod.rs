#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Common test utilities for integration tests.
//!
//! Every [`TestApp`] runs the real router and services on its own
//! in-memory content store, so tests are isolated and need no database.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, header};
use axum::response::Response;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use bulletin_kernel::AppState;
use bulletin_kernel::content::MemoryContentStore;
use bulletin_kernel::routes;

pub const SITE_URL: &str = "http://bulletin.test";

/// Test application wrapper using the real kernel routes and state.
pub struct TestApp {
    router: Router,
    pub state: AppState,
}

impl TestApp {
    pub fn new() -> Self {
        let state = AppState::with_store(Arc::new(MemoryContentStore::new()), SITE_URL);
        let router = routes::router().with_state(state.clone());
        Self { router, state }
    }

    /// Send a request to the app.
    pub async fn request(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request")
    }

    pub async fn get(&self, uri: &str) -> Response {
        self.request(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn delete(&self, uri: &str) -> Response {
        self.request(Request::delete(uri).body(Body::empty()).unwrap())
            .await
    }

    /// Send a JSON body with the given method.
    pub async fn send_json(&self, method: &str, uri: &str, body: Value) -> Response {
        self.request(
            Request::builder()
                .method(method)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    /// Create a document through the API and return its id.
    pub async fn create_document(&self, kind: &str, title: &str) -> String {
        let response = self
            .send_json(
                "POST",
                "/api/documents",
                serde_json::json!({ "kind": kind, "title": title }),
            )
            .await;
        assert_eq!(response.status(), axum::http::StatusCode::CREATED);
        response_json(response).await["id"]
            .as_str()
            .expect("document id")
            .to_string()
    }

    /// Add a block through the API and return its JSON.
    pub async fn add_block(&self, document_id: &str, block_type: &str) -> Value {
        let response = self
            .send_json(
                "POST",
                &format!("/api/documents/{document_id}/blocks"),
                serde_json::json!({ "type": block_type }),
            )
            .await;
        assert_eq!(response.status(), axum::http::StatusCode::CREATED);
        response_json(response).await
    }
}

pub async fn response_json(response: Response) -> Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap_or_else(|_| {
        let text = String::from_utf8_lossy(&body);
        panic!("Failed to parse JSON: {text}");
    })
}

pub async fn response_text(response: Response) -> String {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8_lossy(&body).into_owned()
}
