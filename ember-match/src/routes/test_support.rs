use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use tower::ServiceExt;
use uuid::Uuid;

use ember_shared::middleware::{sign_claims, DEFAULT_JWT_SECRET};
use ember_shared::types::auth::Claims;

use crate::config::AppConfig;
use crate::events::testing::RecordingSink;
use crate::store::memory::MemoryDatabase;
use crate::store::{Database, ProfileRepository};
use crate::{router, AppState};

/// Router wired to the in-memory store and a recording event sink.
pub struct TestApp {
    pub router: Router,
    pub db: Arc<MemoryDatabase>,
    pub sink: Arc<RecordingSink>,
}

impl TestApp {
    pub fn new() -> Self {
        let db = Arc::new(MemoryDatabase::new());
        let sink = Arc::new(RecordingSink::default());
        let state = Arc::new(AppState {
            db: db.clone(),
            config: AppConfig::default(),
            events: sink.clone(),
            metrics: None,
        });
        Self { router: router(state), db, sink }
    }

    pub fn user(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.db.transaction(|conn| conn.register_user(id)).unwrap();
        id
    }

    pub async fn raw(&self, req: Request<Body>) -> Response {
        self.router.clone().oneshot(req).await.unwrap()
    }

    pub async fn send(&self, req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = self.raw(req).await;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, body)
    }
}

fn bearer(user: Uuid) -> String {
    let token = sign_claims(&Claims::new(user, 3600), DEFAULT_JWT_SECRET).unwrap();
    format!("Bearer {token}")
}

pub fn get(uri: &str, user: Option<Uuid>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(user) = user {
        builder = builder.header(header::AUTHORIZATION, bearer(user));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn send_json(method: &str, uri: &str, user: Uuid, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, bearer(user))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}
