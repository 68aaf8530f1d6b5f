// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use consent_ledger::types::ChainId;
use consent_node::config::NodeConfig;
use consent_node::engine::{Engine, ResolvePolicy};
use consent_node::server::build_router;
use serde_json::{json, Value};
use tower::util::ServiceExt;

fn setup(auth: Option<&str>) -> (Arc<Engine>, Router) {
    let cfg = NodeConfig {
        node_id: Some("node-test".into()),
        ..Default::default()
    };
    let engine = Arc::new(Engine::new(&cfg).unwrap());
    let app = build_router(engine.clone(), auth.map(String::from));
    (engine, app)
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

#[tokio::test]
async fn test_identity() {
    let (_, app) = setup(None);
    let (status, body) = call(&app, "GET", "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["node"], "node-test");
}

#[tokio::test]
async fn test_submit_and_resolve_consents() {
    let (_, app) = setup(None);

    let (status, body) = call(
        &app,
        "POST",
        "/chains/U1/consents",
        Some(json!({
            "consent": {"action": "first-name-read", "consent": true}
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["block"]["index"], 1);

    let (status, body) = call(&app, "GET", "/chains/U1/consents", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["length"], 2);
    assert_eq!(body["latest"][0]["action"], "first-name-read");
    assert_eq!(body["latest"][0]["consent"], true);
    assert_eq!(body["latest"][0]["type"], "created");
    assert_eq!(body["history"][0]["changes"].as_array().unwrap().len(), 1);
    assert_eq!(body["defaults"].as_array().unwrap().len(), 5);

    let (status, body) = call(&app, "GET", "/chains/U1/blocks?detail=true", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["length"], 2);
    assert!(body["blocks"][0]["previous_hash"].is_null());
    assert_eq!(body["blocks"][1]["previous_hash"], body["blocks"][0]["hash"]);

    let (_, summary) = call(&app, "GET", "/chains/U1/blocks", None).await;
    assert_eq!(summary["blocks"][1]["consents"], 1);
}

#[tokio::test]
async fn test_submission_missing_part_rejected() {
    let (engine, app) = setup(None);
    let (status, _) = call(&app, "POST", "/chains", Some(json!({"id": "U1"}))).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = call(
        &app,
        "POST",
        "/chains/U1/consents",
        Some(json!({
            "consent": {
                "action": "first-name-write",
                "consent": true,
                "subsystems": [{"data_id": "X1"}, {"data_id": "X2"}]
            },
            "parts": [{"id": "X1", "data": "Alice"}]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("X2"));

    let id = ChainId::new("U1").unwrap();
    let ledger = engine.ledger(&id, ResolvePolicy::LocalOnly).await.unwrap();
    assert_eq!(ledger.len(), 1);
}

#[tokio::test]
async fn test_verify_consents_with_originals() {
    let (_, app) = setup(None);
    let (status, _) = call(
        &app,
        "POST",
        "/chains/U1/consents",
        Some(json!({
            "consent": {
                "action": "email-read",
                "consent": true,
                "subsystems": [{"data_id": "X1"}]
            },
            "parts": [{"id": "X1", "encoding": "hex", "data": "616c696365"}]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = call(
        &app,
        "POST",
        "/chains/U1/consents/verify",
        Some(json!({"originals": {"X1": "alice"}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["integrity"]["status"], "verified");
    assert_eq!(body["latest"][0]["subsystems"][0]["media_type"], "text/plain");

    let (_, body) = call(
        &app,
        "POST",
        "/chains/U1/consents/verify",
        Some(json!({"originals": {"X1": "mallory"}})),
    )
    .await;
    assert_eq!(body["integrity"]["status"], "outdated");

    let (_, body) = call(&app, "GET", "/chains/U1/consents", None).await;
    assert_eq!(body["integrity"]["status"], "unknown");
}

#[tokio::test]
async fn test_block_lookup() {
    let (_, app) = setup(None);
    let (_, created) = call(
        &app,
        "POST",
        "/chains/U1/consents",
        Some(json!({"consent": {"action": "email-write", "consent": false}})),
    )
    .await;
    let block_id = created["block"]["id"].as_str().unwrap().to_string();

    let (status, body) = call(&app, "GET", &format!("/blocks/{block_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["chain_id"], "U1");

    let (status, body) = call(&app, "GET", "/chains/U1/blocks/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["block"]["id"], block_id.as_str());

    let (status, _) = call(&app, "GET", "/chains/U1/blocks/7", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = call(&app, "GET", "/chains/U1/blocks/not-a-ref", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_errors() {
    let (_, app) = setup(None);
    let (status, body) = call(&app, "GET", "/chains/missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());

    let (status, _) = call(&app, "GET", "/chains/bad%20id", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    call(&app, "POST", "/chains", Some(json!({"id": "U1"}))).await;
    let (status, _) = call(&app, "POST", "/chains", Some(json!({"id": "U1"}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_node_registration() {
    let (_, app) = setup(None);
    let (status, body) = call(
        &app,
        "POST",
        "/nodes",
        Some(json!({"nodes": ["127.0.0.1:5001", "http://127.0.0.1:5001/"]})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["total"], 1);
    assert_eq!(body["nodes"][0]["url"], "http://127.0.0.1:5001");
    assert_eq!(body["nodes"][0]["resolved"], false);

    let (status, _) = call(&app, "POST", "/nodes", Some(json!({"nodes": []}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_auth_guard() {
    let (_, app) = setup(Some("s3cret"));
    let (status, _) = call(&app, "GET", "/chains", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = Request::builder()
        .uri("/chains")
        .header(header::AUTHORIZATION, "Bearer s3cret")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_generated_node_ids_are_distinct() {
    let a = Engine::new(&NodeConfig::default()).unwrap();
    let b = Engine::new(&NodeConfig::default()).unwrap();
    assert_ne!(a.node_id(), b.node_id());
    assert_eq!(a.node_id().len(), 36);

    let app = build_router(Arc::new(a), None);
    let (_, body) = call(&app, "GET", "/", None).await;
    assert_eq!(body["node"].as_str().unwrap().len(), 36);
}
