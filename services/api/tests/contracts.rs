//! Router tests for contract CRUD, drafting, risk analysis and PDF export.

mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use api_lib::adapters::fixture_llm::FixtureAiDelegate;
use common::{body_bytes, body_json, contract_body, TestApp};
use contract_core::testing::ScriptedDelegate;
use serde_json::json;
use std::sync::Arc;

#[tokio::test]
async fn create_fetch_and_list_contracts() {
    let app = TestApp::new();
    let (token, user_id) = app.register("ana@example.com").await;

    let created = app.create_contract(&token).await;
    assert_eq!(created["status"], "DRAFT");
    assert_eq!(created["user_id"], user_id.as_str());
    assert_eq!(created["payment_amount"], "10000");
    assert_eq!(created["start_date"], "2025-03-01");
    assert_eq!(created["signed"], false);

    let id = created["id"].as_str().unwrap();
    let (status, fetched) = app
        .json(Method::GET, &format!("/contracts/{id}"), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);

    let (status, listed) = app.json(Method::GET, "/contracts", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn create_rejects_missing_required_fields() {
    let app = TestApp::new();
    let (token, _) = app.register("ana@example.com").await;

    let mut body = contract_body();
    body["title"] = json!("");
    body["payment_amount"] = json!("ten thousand");

    let (status, response) = app
        .json(Method::POST, "/contracts", Some(&token), Some(body))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let fields: Vec<&str> = response["errors"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|e| e["field"].as_str())
        .collect();
    assert!(fields.contains(&"title"));
    assert!(fields.contains(&"payment_amount"));
    assert_eq!(app.db.contract_count(), 0);
}

#[tokio::test]
async fn update_changes_only_supplied_fields() {
    let app = TestApp::new();
    let (token, _) = app.register("ana@example.com").await;
    let created = app.create_contract(&token).await;
    let id = created["id"].as_str().unwrap();

    let (status, updated) = app
        .json(
            Method::PUT,
            &format!("/contracts/{id}"),
            Some(&token),
            Some(json!({"status": "SIGNED", "signed": true, "signedAt": "2025-04-01T12:00:00Z"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "SIGNED");
    assert_eq!(updated["signed"], true);
    assert_eq!(updated["title"], created["title"]);
    assert_eq!(updated["content"], created["content"]);
    assert_eq!(updated["created_at"], created["created_at"]);

    let (status, body) = app
        .json(
            Method::PUT,
            &format!("/contracts/{id}"),
            Some(&token),
            Some(json!({"status": "ARCHIVED"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], "status");
}

#[tokio::test]
async fn other_users_contracts_look_missing() {
    let app = TestApp::new();
    let (owner, _) = app.register("owner@example.com").await;
    let (intruder, _) = app.register("intruder@example.com").await;
    let created = app.create_contract(&owner).await;
    let uri = format!("/contracts/{}", created["id"].as_str().unwrap());

    let (status, body) = app.json(Method::GET, &uri, Some(&intruder), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["message"].as_str().unwrap().contains("not found"));

    let (status, _) = app
        .json(Method::PUT, &uri, Some(&intruder), Some(json!({"title": "Mine now"})))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.json(Method::DELETE, &uri, Some(&intruder), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, listed) = app.json(Method::GET, "/contracts", Some(&intruder), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed, json!([]));

    assert_eq!(app.db.contract_count(), 1);
}

#[tokio::test]
async fn delete_removes_the_contract() {
    let app = TestApp::new();
    let (token, _) = app.register("ana@example.com").await;
    let created = app.create_contract(&token).await;
    let uri = format!("/contracts/{}", created["id"].as_str().unwrap());

    let (status, _) = app.json(Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.json(Method::GET, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn generate_is_public_and_persists_nothing() {
    let app = TestApp::new();

    let (status, body) = app
        .json(
            Method::POST,
            "/contracts/generate",
            None,
            Some(json!({"party_1_name": "Acme", "party_2_name": "Bob"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["content"].as_str().is_some_and(|c| !c.is_empty()));
    assert_eq!(body["message"], "Contract generated successfully");
    assert_eq!(app.db.contract_count(), 0);

    let (status, body) = app
        .json(
            Method::POST,
            "/contracts/generate",
            None,
            Some(json!({"payment_amount": "lots"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], "payment_amount");
}

#[tokio::test]
async fn analysis_returns_the_report_and_logs_a_consultation() {
    let app = TestApp::new();
    let (token, _) = app.register("ana@example.com").await;
    let created = app.create_contract(&token).await;
    let id = created["id"].as_str().unwrap();

    let (status, body) = app
        .json(Method::GET, &format!("/contracts/analyze/{id}"), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["contractId"], id);
    assert_eq!(body["contractTitle"], "Service Agreement");
    assert_eq!(body["analysis"]["overallRiskAssessment"], "Medium");
    assert!(body["analysis"]["identifiedRisks"].as_array().is_some_and(|r| !r.is_empty()));

    let (status, consultations) = app
        .json(Method::GET, "/consultations", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        consultations[0]["query"],
        format!("Risk analysis for contract {id}")
    );
}

#[tokio::test]
async fn analysis_of_empty_content_reports_it() {
    let app = TestApp::new();
    let (token, _) = app.register("ana@example.com").await;
    let created = app.create_contract(&token).await;
    let id = created["id"].as_str().unwrap();

    let (status, _) = app
        .json(
            Method::PUT,
            &format!("/contracts/{id}"),
            Some(&token),
            Some(json!({"content": ""})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .json(Method::GET, &format!("/contracts/analyze/{id}"), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["analysis"]["overallRiskAssessment"], "Unknown");
    assert_eq!(
        body["analysis"]["missingClauses"],
        json!(["Cannot analyze empty contract"])
    );
}

#[tokio::test]
async fn export_streams_a_pdf_attachment() {
    let app = TestApp::new();
    let (token, _) = app.register("ana@example.com").await;
    let created = app.create_contract(&token).await;
    let id = created["id"].as_str().unwrap();

    let request = Request::builder()
        .method(Method::GET)
        .uri(format!("/contracts/export/{id}/pdf"))
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        format!("attachment; filename=\"contract_{id}.pdf\"").as_str()
    );
    let bytes = body_bytes(response).await;
    assert!(bytes.starts_with(b"%PDF"));
    assert!(app
        .export_dir
        .path()
        .join(format!("contract_{id}.pdf"))
        .exists());
}

#[tokio::test]
async fn ai_failures_return_500_with_message_and_cause() {
    let app = TestApp::with_delegate(Arc::new(ScriptedDelegate::failing(
        "upstream quota exceeded",
    )));

    let (status, body) = app
        .json(
            Method::POST,
            "/contracts/generate",
            None,
            Some(json!({"party_1_name": "Acme"})),
        )
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Error generating contract");
    assert!(body["error"]
        .as_str()
        .is_some_and(|e| e.contains("upstream quota exceeded")));

    let (token, _) = app.register("ana@example.com").await;
    let created = app.create_contract(&token).await;
    let id = created["id"].as_str().unwrap();
    let (status, body) = app
        .json(Method::GET, &format!("/contracts/analyze/{id}"), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Error analyzing contract with AI");
    assert!(body["error"].is_string());

    let (_, consultations) = app
        .json(Method::GET, "/consultations", Some(&token), None)
        .await;
    assert_eq!(consultations, json!([]));
}

#[tokio::test]
async fn unexpected_failures_hide_their_detail() {
    let blocker = tempfile::NamedTempFile::new().unwrap();
    let export_path = blocker.path().to_path_buf();
    let app = TestApp::build(Arc::new(FixtureAiDelegate), |config| {
        config.export_dir = export_path;
    });
    let (token, _) = app.register("ana@example.com").await;
    let created = app.create_contract(&token).await;
    let id = created["id"].as_str().unwrap();

    let request = Request::builder()
        .method(Method::GET)
        .uri(format!("/contracts/export/{id}/pdf"))
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_json(response).await;
    assert_eq!(body, json!({"message": "Error exporting contract to PDF"}));
}

#[tokio::test]
async fn malformed_ids_get_a_json_not_found() {
    let app = TestApp::new();
    let (token, _) = app.register("ana@example.com").await;

    for (method, uri) in [
        (Method::GET, "/contracts/not-a-uuid"),
        (Method::DELETE, "/contracts/42"),
        (Method::GET, "/contracts/analyze/abc"),
        (Method::GET, "/contracts/export/abc/pdf"),
    ] {
        let (status, body) = app.json(method, uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        assert_eq!(body["message"], "Contract not found", "{uri}");
    }
}
