//! Shared harness for the router tests: an in-memory database, the fixture
//! delegate, and temporary upload/export directories.

#![allow(dead_code)]

use std::sync::Arc;

use api_lib::{
    adapters::fixture_llm::FixtureAiDelegate,
    config::Config,
    web::{build_router, AppState},
};
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use contract_core::ports::AiDelegate;
use contract_core::testing::InMemoryDatabase;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

pub struct TestApp {
    pub router: Router,
    pub db: Arc<InMemoryDatabase>,
    pub upload_dir: TempDir,
    pub export_dir: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        Self::build(Arc::new(FixtureAiDelegate), |_| {})
    }

    /// Serves AI requests from `delegate` instead of the fixtures.
    pub fn with_delegate(delegate: Arc<dyn AiDelegate>) -> Self {
        Self::build(delegate, |_| {})
    }

    pub fn build(delegate: Arc<dyn AiDelegate>, configure: impl FnOnce(&mut Config)) -> Self {
        let upload_dir = tempfile::tempdir().unwrap();
        let export_dir = tempfile::tempdir().unwrap();
        let mut config = Config::for_tests(
            upload_dir.path().to_path_buf(),
            export_dir.path().to_path_buf(),
        );
        configure(&mut config);
        let db = Arc::new(InMemoryDatabase::new());
        let state = Arc::new(AppState::new(Arc::new(config), db.clone(), delegate));
        let router = build_router(state).unwrap();
        Self {
            router,
            db,
            upload_dir,
            export_dir,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Sends a JSON request, with a bearer token when one is given.
    pub async fn json(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = self.send(request).await;
        let status = response.status();
        (status, body_json(response).await)
    }

    /// Registers a fresh user and returns their token and id.
    pub async fn register(&self, email: &str) -> (String, String) {
        let (status, body) = self
            .json(
                Method::POST,
                "/auth/register",
                None,
                Some(json!({"name": "Test User", "email": email, "password": "s3cret-pass"})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        (
            body["token"].as_str().unwrap().to_string(),
            body["user"]["id"].as_str().unwrap().to_string(),
        )
    }

    /// Creates a valid contract and returns its JSON.
    pub async fn create_contract(&self, token: &str) -> Value {
        let (status, body) = self
            .json(Method::POST, "/contracts", Some(token), Some(contract_body()))
            .await;
        assert_eq!(status, StatusCode::CREATED, "create failed: {body}");
        body
    }
}

pub fn contract_body() -> Value {
    json!({
        "title": "Service Agreement",
        "content": "This Agreement is made between ABC Corporation and XYZ Inc.",
        "contract_type": "SERVICE",
        "party_1_name": "ABC Corporation",
        "party_1_role": "Service Provider",
        "party_1_address": "123 Business St",
        "party_2_name": "XYZ Inc.",
        "party_2_role": "Client",
        "contract_purpose": "Professional consulting services",
        "scope_of_work": "Design and delivery of a web application",
        "contract_duration": "12 months",
        "start_date": "2025-03-01",
        "payment_type": "FIXED",
        "payment_amount": 10000,
        "currency": "USD",
        "payment_schedule": "MONTHLY"
    })
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_json(response: Response) -> Value {
    let bytes = body_bytes(response).await;
    if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    }
}
