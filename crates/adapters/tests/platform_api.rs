//! End-to-end tests for the platform API against the in-memory backend.

use axum::body::{to_bytes, Body};
use axum::http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use dockyard_adapters::platform_api::{PlatformApi, StaticAuthorizer};
use dockyard_adapters::ACCEPT_HEADER;
use dockyard_backend::MemoryBackend;
use dockyard_protocol::{Backend, User};

struct TestServer {
    router: Router,
    token: String,
}

async fn test_server() -> TestServer {
    let backend = Arc::new(MemoryBackend::new());
    let operator = User::new("1", "ops@example.com");
    let token = backend.create_access_token(&operator).await.unwrap().token;
    let authorizer = StaticAuthorizer::new(operator, "ops", "secret");

    let api = PlatformApi::new(backend, Arc::new(authorizer));
    TestServer {
        router: api.router().unwrap(),
        token,
    }
}

impl TestServer {
    async fn call(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let authorization = format!("Bearer {}", self.token);
        self.send(method, uri, Some(&authorization), body).await
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        authorization: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder()
            .method(method)
            .uri(uri)
            .header(ACCEPT, ACCEPT_HEADER)
            .header(CONTENT_TYPE, "application/json");
        if let Some(authorization) = authorization {
            request = request.header(AUTHORIZATION, authorization);
        }
        let body = match body {
            Some(body) => Body::from(body.to_string()),
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }
}

#[tokio::test]
async fn test_app_lifecycle() {
    let server = test_server().await;

    let (status, body) = server
        .call(Method::POST, "/apps", Some(json!({"name": "acme-inc"})))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["name"], "acme-inc");

    let (status, body) = server.call(Method::GET, "/apps", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, body) = server.call(Method::DELETE, "/apps/acme-inc", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_null());

    let (status, body) = server.call(Method::DELETE, "/apps/acme-inc", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["id"], "not_found");
}

#[tokio::test]
async fn test_organization_apps_alias() {
    let server = test_server().await;
    let (status, _) = server
        .call(Method::POST, "/organizations/apps", Some(json!({"name": "acme-inc"})))
        .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_validation_failure_is_redacted() {
    let server = test_server().await;
    server
        .call(Method::POST, "/apps", Some(json!({"name": "acme-inc"})))
        .await;

    let (status, body) = server
        .call(Method::POST, "/apps", Some(json!({"name": "acme-inc"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({"id": "bad_request", "message": "Request invalid, validate usage and try again"})
    );
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let server = test_server().await;
    let (status, body) = server
        .call(Method::POST, "/apps", Some(json!({"nom": "acme-inc"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("missing field"));
}

#[tokio::test]
async fn test_deploy_config_and_rollback() {
    let server = test_server().await;

    let (status, body) = server
        .call(
            Method::POST,
            "/deploys",
            Some(json!({"image": "remind101/acme-inc:latest"})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["app"], "acme-inc");
    assert_eq!(body["release"]["version"], 1);

    let (status, body) = server
        .call(
            Method::PATCH,
            "/apps/acme-inc/config-vars",
            Some(json!({"FOO": "bar", "BAZ": null})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"FOO": "bar"}));

    let (_, body) = server
        .call(Method::GET, "/apps/acme-inc/config-vars", None)
        .await;
    assert_eq!(body, json!({"FOO": "bar"}));

    let (status, body) = server
        .call(Method::GET, "/apps/acme-inc/releases/v2", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["version"], 2);

    let (status, body) = server
        .call(
            Method::POST,
            "/apps/acme-inc/releases",
            Some(json!({"release": "v1"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["version"], 3);

    let (_, body) = server.call(Method::GET, "/apps/acme-inc/releases", None).await;
    assert_eq!(body.as_array().unwrap().len(), 3);

    let (_, body) = server
        .call(Method::GET, "/apps/acme-inc/config-vars", None)
        .await;
    assert_eq!(body, json!({}));
}

#[tokio::test]
async fn test_unknown_release_version() {
    let server = test_server().await;
    server
        .call(Method::POST, "/deploys", Some(json!({"image": "acme-inc"})))
        .await;

    let (status, _) = server
        .call(Method::GET, "/apps/acme-inc/releases/banana", None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = server
        .call(
            Method::POST,
            "/apps/acme-inc/releases",
            Some(json!({"release": "banana"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["id"], "bad_request");
}

#[tokio::test]
async fn test_scale_and_dynos() {
    let server = test_server().await;
    server
        .call(Method::POST, "/deploys", Some(json!({"image": "acme-inc"})))
        .await;

    let (status, body) = server
        .call(
            Method::PATCH,
            "/apps/acme-inc/formation",
            Some(json!({"updates": [{"process": "web", "quantity": 2, "size": "2X"}]})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([{"type": "web", "quantity": 2, "size": "2X"}]));

    let (status, body) = server.call(Method::GET, "/apps/acme-inc/dynos", None).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["web.1", "web.2"]);
}

#[tokio::test]
async fn test_rejected_scale_leaves_formation_untouched() {
    let server = test_server().await;
    server
        .call(Method::POST, "/deploys", Some(json!({"image": "acme-inc"})))
        .await;

    for updates in [
        json!([{"process": "web", "quantity": 5}, {"process": "", "quantity": 1}]),
        json!([{"process": "web", "quantity": 4294967295u32}]),
    ] {
        let (status, body) = server
            .call(
                Method::PATCH,
                "/apps/acme-inc/formation",
                Some(json!({ "updates": updates })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["id"], "bad_request");
    }

    let (_, body) = server.call(Method::GET, "/apps/acme-inc/dynos", None).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_every_route_but_credentials_requires_a_token() {
    let server = test_server().await;
    let api = PlatformApi::new(
        Arc::new(MemoryBackend::new()),
        Arc::new(StaticAuthorizer::new(User::new("1", "ops"), "ops", "secret")),
    );
    let table = api.route_table().unwrap();

    for route in table.routes() {
        let uri = route
            .path
            .replace("{app}", "acme-inc")
            .replace("{version}", "1");
        let (status, body) = server
            .send(route.method.clone(), &uri, None, Some(json!({})))
            .await;

        if route.path == "/oauth/authorizations" {
            assert!(!route.authenticated);
        } else {
            assert!(route.authenticated, "{route} is not authenticated");
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{route}");
            assert_eq!(body["id"], "unauthorized");
        }
    }

    let (status, _) = server
        .send(Method::GET, "/apps", Some("Bearer not-a-token"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_basic_auth_with_token_password() {
    let server = test_server().await;
    let authorization = format!("Basic {}", STANDARD.encode(format!(":{}", server.token)));
    let (status, _) = server
        .send(Method::GET, "/apps", Some(&authorization), None)
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_credential_issuance() {
    let server = test_server().await;

    let authorization = format!("Basic {}", STANDARD.encode("ops:secret"));
    let (status, body) = server
        .send(Method::POST, "/oauth/authorizations", Some(&authorization), None)
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let token = body["access_token"]["token"].as_str().unwrap().to_string();

    let (status, _) = server
        .send(Method::GET, "/apps", Some(&format!("Bearer {token}")), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let authorization = format!("Basic {}", STANDARD.encode("ops:wrong"));
    let (status, body) = server
        .send(Method::POST, "/oauth/authorizations", Some(&authorization), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["id"], "unauthorized");
}

#[tokio::test]
async fn test_unsupported_api_version() {
    let server = test_server().await;
    let request = Request::builder()
        .method(Method::GET)
        .uri("/apps")
        .header(ACCEPT, "application/vnd.heroku+json; version=2")
        .header(AUTHORIZATION, format!("Bearer {}", server.token))
        .body(Body::empty())
        .unwrap();

    let response = server.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_ACCEPTABLE);
}
