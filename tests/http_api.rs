//! HTTP API Integration Tests
//!
//! These tests drive the router end to end with in-memory stores.

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use keyman::config::Config;
use keyman::http::{AUTHENTICATED_USER_HEADER, AppState, build_router};
use keyman::storage::Stores;
use serde_json::{Value, json};
use std::sync::Arc;

fn server_with(config: Config) -> TestServer {
    let app = build_router(AppState::new(Arc::new(config), Stores::in_memory()));
    TestServer::new(app).expect("Failed to create test server")
}

fn server() -> TestServer {
    server_with(Config::for_tenant("carbon.super").unwrap())
}

fn caller_header() -> HeaderName {
    HeaderName::from_static(AUTHENTICATED_USER_HEADER)
}

fn as_user(name: &'static str) -> HeaderValue {
    HeaderValue::from_static(name)
}

fn registration(name: &str) -> Value {
    json!({
        "client_name": name,
        "grant_types": ["authorization_code"],
        "redirect_uris": ["https://app.example.com/callback"]
    })
}

#[tokio::test]
async fn test_application_lifecycle() {
    let server = server();

    let response = server
        .post("/api/applications")
        .add_header(caller_header(), as_user("alice"))
        .json(&registration("Reporting App"))
        .await;
    response.assert_status(StatusCode::CREATED);
    let created: Value = response.json();
    let client_id = created["client_id"].as_str().unwrap().to_string();
    assert_eq!(created["client_name"], "Reporting App");
    assert!(created["client_secret"].as_str().is_some());
    assert_eq!(
        created["redirect_uris"],
        json!(["https://app.example.com/callback"])
    );

    let response = server
        .get(&format!("/api/applications/{client_id}"))
        .add_header(caller_header(), as_user("alice"))
        .await;
    response.assert_status_ok();

    let response = server
        .put(&format!("/api/applications/{client_id}"))
        .add_header(caller_header(), as_user("alice"))
        .json(&json!({"grant_types": ["authorization_code", "refresh_token"]}))
        .await;
    response.assert_status_ok();
    let updated: Value = response.json();
    assert_eq!(
        updated["grant_types"],
        json!(["authorization_code refresh_token"])
    );
    assert_eq!(updated["redirect_uris"], created["redirect_uris"]);

    let response = server
        .delete(&format!("/api/applications/{client_id}"))
        .add_header(caller_header(), as_user("alice"))
        .await;
    response.assert_status(StatusCode::NO_CONTENT);

    let response = server
        .get(&format!("/api/applications/{client_id}"))
        .add_header(caller_header(), as_user("alice"))
        .await;
    response.assert_status_not_found();
    let body: Value = response.json();
    assert_eq!(body["error"], "not_found_application");
}

#[tokio::test]
async fn test_missing_caller_is_unauthorized() {
    let server = server();

    let response = server
        .post("/api/applications")
        .json(&registration("Reporting App"))
        .await;
    response.assert_status_unauthorized();
    let body: Value = response.json();
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn test_other_user_is_forbidden() {
    let server = server();

    let created: Value = server
        .post("/api/applications")
        .add_header(caller_header(), as_user("alice"))
        .json(&registration("Reporting App"))
        .await
        .json();
    let client_id = created["client_id"].as_str().unwrap();

    let response = server
        .get(&format!("/api/applications/{client_id}"))
        .add_header(caller_header(), as_user("mallory"))
        .await;
    response.assert_status_forbidden();
    let body: Value = response.json();
    assert_eq!(body["error"], "forbidden_unauthorized_user");
}

#[tokio::test]
async fn test_client_errors_map_to_status() {
    let server = server();

    let response = server
        .post("/api/applications")
        .add_header(caller_header(), as_user("alice"))
        .json(&json!({"client_name": "Reporting App", "grant_types": ["implicit"]}))
        .await;
    response.assert_status_bad_request();
    let body: Value = response.json();
    assert_eq!(body["error"], "redirect_uri_required");

    let response = server
        .post("/api/applications")
        .add_header(caller_header(), as_user("alice"))
        .json(&registration("Reporting App!"))
        .await;
    response.assert_status_bad_request();
    let body: Value = response.json();
    assert_eq!(body["error"], "invalid_client_name");

    server
        .post("/api/applications")
        .add_header(caller_header(), as_user("alice"))
        .json(&registration("Reporting App"))
        .await
        .assert_status(StatusCode::CREATED);
    let response = server
        .post("/api/applications")
        .add_header(caller_header(), as_user("alice"))
        .json(&registration("Reporting App"))
        .await;
    response.assert_status(StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["error"], "conflict_existing_application");
}

#[tokio::test]
async fn test_scope_sync_and_lookup() {
    let server = server();

    let response = server
        .post("/api/scopes/sync")
        .add_header(caller_header(), as_user("publisher"))
        .json(&json!({
            "new_scopes": [
                {"key": "orders:read", "display_name": "Read Orders", "roles": ["clerk"]},
                {"key": "orders:write", "display_name": "Write Orders"}
            ]
        }))
        .await;
    response.assert_status(StatusCode::NO_CONTENT);

    let response = server
        .get("/api/scopes")
        .add_header(caller_header(), as_user("publisher"))
        .await;
    response.assert_status_ok();
    let scopes: Value = response.json();
    assert_eq!(scopes["orders:read"]["display_name"], "Read Orders");
    assert_eq!(scopes["orders:read"]["roles"], json!(["clerk"]));
    assert!(scopes.get("orders:write").is_some());

    let response = server
        .get("/api/scopes/orders:write")
        .add_header(caller_header(), as_user("publisher"))
        .await;
    response.assert_status_ok();

    let response = server
        .get("/api/scopes/orders:delete")
        .add_header(caller_header(), as_user("publisher"))
        .await;
    response.assert_status_not_found();
    let body: Value = response.json();
    assert_eq!(body["error"], "scope_not_found");
}

#[tokio::test]
async fn test_disabled_route_groups() {
    let mut config = Config::for_tenant("carbon.super").unwrap();
    config.enable_scope_api = "false".to_string().try_into().unwrap();
    let server = server_with(config);

    server
        .get("/api/scopes")
        .add_header(caller_header(), as_user("publisher"))
        .await
        .assert_status_not_found();
    server
        .post("/api/applications")
        .add_header(caller_header(), as_user("alice"))
        .json(&registration("Reporting App"))
        .await
        .assert_status(StatusCode::CREATED);
}
