//! Remote Registry Integration Tests
//!
//! These tests point the reqwest-backed registries at a throwaway axum
//! server that records each request and replays canned responses.

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use keyman::errors::StorageError;
use keyman::scopes::types::*;
use keyman::storage::traits::{RoleRegistry, ScopeRegistry, ScopeResourceContainer};
use keyman::storage::{
    RemoteApiResourceContainer, RemoteClient, RemoteRoleRegistry, RemoteScopeRegistry,
};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
struct Recorded {
    method: Method,
    path: String,
    query: Option<String>,
    authorization: Option<String>,
    body: Option<Value>,
}

#[derive(Default)]
struct MockIdentityServer {
    responses: Mutex<HashMap<(Method, String), (StatusCode, Value)>>,
    requests: Mutex<Vec<Recorded>>,
}

impl MockIdentityServer {
    fn respond(&self, method: Method, path: &str, status: StatusCode, body: Value) {
        self.responses
            .lock()
            .unwrap()
            .insert((method, path.to_string()), (status, body));
    }

    fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    fn last(&self) -> Recorded {
        self.requests().last().cloned().unwrap()
    }
}

async fn record(
    State(mock): State<Arc<MockIdentityServer>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    mock.requests.lock().unwrap().push(Recorded {
        method: method.clone(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        authorization: headers
            .get("authorization")
            .and_then(|h| h.to_str().ok())
            .map(str::to_string),
        body: serde_json::from_slice(&body).ok(),
    });

    let canned = mock
        .responses
        .lock()
        .unwrap()
        .get(&(method, uri.path().to_string()))
        .cloned();
    match canned {
        Some((status, Value::Null)) => status.into_response(),
        Some((status, body)) => (status, axum::Json(body)).into_response(),
        None => (StatusCode::NOT_FOUND, "no such resource").into_response(),
    }
}

async fn start() -> (Arc<MockIdentityServer>, String, RemoteClient) {
    let mock = Arc::new(MockIdentityServer::default());
    let app = Router::new().fallback(record).with_state(mock.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = RemoteClient::new(reqwest::Client::new(), "admin", "secret");
    (mock, format!("http://{address}"), client)
}

#[tokio::test]
async fn test_legacy_scope_registry() {
    let (mock, base, client) = start().await;
    let registry = RemoteScopeRegistry::new(client, &format!("{base}/scopes/"));

    mock.respond(
        Method::HEAD,
        "/scopes/name/orders:read",
        StatusCode::OK,
        Value::Null,
    );
    assert!(registry.exists("orders:read").await.unwrap());
    assert!(!registry.exists("orders:write").await.unwrap());
    // admin:secret
    assert_eq!(
        mock.last().authorization.as_deref(),
        Some("Basic YWRtaW46c2VjcmV0")
    );

    mock.respond(
        Method::GET,
        "/scopes/name/orders:read",
        StatusCode::OK,
        json!({"name": "orders:read", "displayName": "Read Orders", "bindings": ["clerk"]}),
    );
    let scope = registry.get("orders:read").await.unwrap().unwrap();
    assert_eq!(scope.display_name, "Read Orders");
    assert_eq!(scope.bindings, vec!["clerk"]);
    assert!(registry.get("orders:write").await.unwrap().is_none());

    mock.respond(Method::POST, "/scopes", StatusCode::CONFLICT, json!({}));
    let err = registry
        .create(&LegacyScope {
            name: "orders:read".to_string(),
            display_name: "Read Orders".to_string(),
            description: String::new(),
            bindings: vec![],
        })
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::AlreadyExists(_)));
    let body = mock.last().body.unwrap();
    assert_eq!(body["displayName"], "Read Orders");
    assert!(body.get("bindings").is_none());

    mock.respond(
        Method::DELETE,
        "/scopes/name/orders:read",
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({"description": "boom"}),
    );
    let err = registry.delete("orders:read").await.unwrap_err();
    match err {
        StorageError::UnexpectedStatus { status, body, .. } => {
            assert_eq!(status, 500);
            assert!(body.contains("boom"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_api_resource_container() {
    let (mock, base, client) = start().await;
    let container = RemoteApiResourceContainer::new(client, &format!("{base}/api-resources"));

    mock.respond(
        Method::GET,
        "/api-resources",
        StatusCode::OK,
        json!({"apiResources": [{"id": "res-1", "identifier": DEFAULT_OAUTH_2_RESOURCE_IDENTIFIER}]}),
    );
    let id = container
        .find_by_identifier(DEFAULT_OAUTH_2_RESOURCE_IDENTIFIER)
        .await
        .unwrap();
    assert_eq!(id.as_deref(), Some("res-1"));
    let query = mock.last().query.unwrap();
    assert!(query.starts_with("filter=identifier"));
    assert!(query.contains(DEFAULT_OAUTH_2_RESOURCE_IDENTIFIER));

    mock.respond(
        Method::GET,
        "/api-resources/res-1/scopes",
        StatusCode::OK,
        json!([{"name": "Read Orders", "displayName": "Read Orders"}]),
    );
    assert_eq!(
        container.list_scope_names("res-1").await.unwrap(),
        vec!["Read Orders"]
    );

    mock.respond(
        Method::PATCH,
        "/api-resources/res-1",
        StatusCode::NO_CONTENT,
        Value::Null,
    );
    container
        .patch_add_scopes(
            "res-1",
            &[ResourceScope {
                name: "orders:write".to_string(),
                display_name: "Write Orders".to_string(),
                description: String::new(),
            }],
        )
        .await
        .unwrap();
    let body = mock.last().body.unwrap();
    assert_eq!(body["addedScopes"][0]["name"], "orders:write");
    assert_eq!(body["addedScopes"][0]["displayName"], "Write Orders");

    mock.respond(
        Method::POST,
        "/api-resources",
        StatusCode::CREATED,
        json!({"id": "res-2"}),
    );
    let created = container
        .create(&ApiResource::default_resource(vec![]))
        .await
        .unwrap();
    assert_eq!(created, "res-2");
    let body = mock.last().body.unwrap();
    assert_eq!(body["identifier"], DEFAULT_OAUTH_2_RESOURCE_IDENTIFIER);
    assert_eq!(body["requiresAuthorization"], true);

    mock.respond(
        Method::DELETE,
        "/api-resources/res-1/scopes/orders:read",
        StatusCode::NO_CONTENT,
        Value::Null,
    );
    container.delete_scope("res-1", "orders:read").await.unwrap();
    let err = container
        .delete_scope("res-1", "orders:missing")
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound(_)));
}

#[tokio::test]
async fn test_missing_container_is_none() {
    let (mock, base, client) = start().await;
    let container = RemoteApiResourceContainer::new(client, &format!("{base}/api-resources"));

    mock.respond(
        Method::GET,
        "/api-resources",
        StatusCode::OK,
        json!({"apiResources": []}),
    );
    assert!(
        container
            .find_by_identifier(DEFAULT_OAUTH_2_RESOURCE_IDENTIFIER)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_scim_role_registry() {
    let (mock, base, client) = start().await;
    let roles = RemoteRoleRegistry::new(client, &format!("{base}/scim2/v2/Roles"));

    mock.respond(
        Method::GET,
        "/scim2/v2/Roles",
        StatusCode::OK,
        json!({"totalResults": 1, "Resources": [{"id": "role-1", "displayName": "clerk"}]}),
    );
    assert_eq!(
        roles.find_by_display_name("clerk").await.unwrap().as_deref(),
        Some("role-1")
    );
    assert!(mock.last().query.unwrap().contains("displayName"));

    mock.respond(
        Method::GET,
        "/scim2/v2/Roles/role-1",
        StatusCode::OK,
        json!({
            "id": "role-1",
            "displayName": "clerk",
            "permissions": [{"value": "orders:read", "display": "Read Orders"}]
        }),
    );
    let role = roles.get("role-1").await.unwrap().unwrap();
    assert_eq!(role.permissions.len(), 1);
    assert!(roles.get("role-2").await.unwrap().is_none());

    mock.respond(
        Method::PATCH,
        "/scim2/v2/Roles/role-1",
        StatusCode::OK,
        json!({}),
    );
    let permissions = vec![
        RolePermission {
            value: "orders:read".to_string(),
            display: "Read Orders".to_string(),
        },
        RolePermission {
            value: "orders:write".to_string(),
            display: "Write Orders".to_string(),
        },
    ];
    roles.patch_permissions("role-1", &permissions).await.unwrap();
    let body = mock.last().body.unwrap();
    assert_eq!(body["Operations"][0]["op"], "replace");
    assert_eq!(body["Operations"][0]["path"], "permissions");
    assert_eq!(body["Operations"][0]["value"][1]["value"], "orders:write");

    mock.respond(
        Method::POST,
        "/scim2/v2/Roles",
        StatusCode::CREATED,
        json!({"id": "role-3", "displayName": "auditor"}),
    );
    let id = roles
        .create(&Role {
            id: String::new(),
            display_name: "auditor".to_string(),
            permissions: vec![permissions[0].clone()],
        })
        .await
        .unwrap();
    assert_eq!(id, "role-3");
    let body = mock.last().body.unwrap();
    assert_eq!(body["displayName"], "auditor");
    assert_eq!(
        body["schemas"][0],
        "urn:ietf:params:scim:schemas:extension:2.0:Role"
    );
    assert_eq!(body["permissions"][0]["value"], "orders:read");
}
