//! Route table.
//!
//! Routes are registered once at startup as `(method, path, operation)`
//! triples and then frozen into an axum [`Router`]. Every operation runs
//! under the configured deadline and every failure goes through the
//! [`ErrorRenderer`], so each request ends in exactly one response.

use anyhow::{bail, Result};
use async_trait::async_trait;
use axum::body::{to_bytes, Bytes};
use axum::extract::{RawPathParams, Request};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::Response;
use axum::routing::{MethodFilter, MethodRouter};
use axum::Router;
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use dockyard_protocol::User;

use super::auth::Authenticate;
use super::codec::{decode, DecodeError};
use super::error::{ApiError, ErrorRenderer, ErrorResource, Failure};

/// Default deadline for a single operation
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default cap on request body size (1MB)
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// Per-request resource limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Deadline for the operation, backend call included
    pub request_timeout: Duration,
    /// Largest accepted request body in bytes
    pub body_limit: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }
}

/// Request-scoped state handed to an operation.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    actor: Option<User>,
}

impl RequestContext {
    /// Attach the authenticated caller
    pub fn with_actor(mut self, actor: User) -> Self {
        self.actor = Some(actor);
        self
    }

    /// The authenticated caller.
    ///
    /// Fails with `unauthorized` when the operation was reached without
    /// going through [`Authenticate`].
    pub fn actor(&self) -> Result<&User, ApiError> {
        self.actor
            .as_ref()
            .ok_or_else(|| ErrorResource::unauthorized().into())
    }
}

/// The parts of an HTTP request an operation gets to see.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub params: HashMap<String, String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ApiRequest {
    /// A path parameter captured by the route pattern
    pub fn param(&self, name: &str) -> Result<&str, ApiError> {
        self.params
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| ErrorResource::not_found().into())
    }

    /// Decode the JSON body
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, DecodeError> {
        decode(&self.body)
    }
}

/// A platform API operation.
#[async_trait]
pub trait Operation: Send + Sync + 'static {
    async fn serve(&self, ctx: RequestContext, req: ApiRequest) -> Result<Response, Failure>;
}

/// A registered route, as listed by [`RouteTable::routes`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteInfo {
    pub method: Method,
    pub path: String,
    pub authenticated: bool,
}

impl fmt::Display for RouteInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let auth = if self.authenticated { "" } else { " (unauthenticated)" };
        write!(f, "{:<7} {}{}", self.method.as_str(), self.path, auth)
    }
}

/// Builder for the platform API router.
pub struct RouteTable {
    renderer: ErrorRenderer,
    limits: Limits,
    routes: BTreeMap<String, MethodRouter>,
    registered: Vec<RouteInfo>,
}

impl RouteTable {
    pub fn new(renderer: ErrorRenderer, limits: Limits) -> Self {
        Self {
            renderer,
            limits,
            routes: BTreeMap::new(),
            registered: Vec::new(),
        }
    }

    /// Register an authenticated operation.
    ///
    /// Path parameters use the `{name}` form, e.g. `/apps/{app}`.
    pub fn handle<O: Operation>(
        &mut self,
        method: Method,
        path: &str,
        operation: Authenticate<O>,
    ) -> Result<&mut Self> {
        self.register(method, path, Arc::new(operation), true)
    }

    /// Register an operation that runs without credentials. Reserved for the
    /// credential issuance endpoint.
    pub fn handle_unauthenticated<O: Operation>(
        &mut self,
        method: Method,
        path: &str,
        operation: O,
    ) -> Result<&mut Self> {
        self.register(method, path, Arc::new(operation), false)
    }

    fn register(
        &mut self,
        method: Method,
        path: &str,
        operation: Arc<dyn Operation>,
        authenticated: bool,
    ) -> Result<&mut Self> {
        let Some(filter) = method_filter(&method) else {
            bail!("Unsupported method {} for route {}", method, path);
        };
        if self
            .registered
            .iter()
            .any(|r| r.method == method && r.path == path)
        {
            bail!("Route {} {} registered twice", method, path);
        }

        let renderer = self.renderer.clone();
        let limits = self.limits;
        let handler = move |params: RawPathParams, request: Request| {
            let operation = operation.clone();
            let renderer = renderer.clone();
            let params = params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            async move { dispatch(operation, renderer, limits, params, request).await }
        };

        let pattern = axum_path(path);
        let method_router = self.routes.remove(&pattern).unwrap_or_else(MethodRouter::new);
        self.routes.insert(pattern, method_router.on(filter, handler));
        self.registered.push(RouteInfo {
            method,
            path: path.to_string(),
            authenticated,
        });
        Ok(self)
    }

    /// Every registered route, in registration order
    pub fn routes(&self) -> &[RouteInfo] {
        &self.registered
    }

    /// Freeze the table into a router
    pub fn into_router(self) -> Router {
        self.routes
            .into_iter()
            .fold(Router::new(), |router, (path, method_router)| {
                router.route(&path, method_router)
            })
    }
}

/// Run one operation to completion and render its outcome
async fn dispatch(
    operation: Arc<dyn Operation>,
    renderer: ErrorRenderer,
    limits: Limits,
    params: HashMap<String, String>,
    request: Request,
) -> Response {
    let (parts, body) = request.into_parts();
    let body = match to_bytes(body, limits.body_limit).await {
        Ok(body) => body,
        Err(err) => {
            let err = DecodeError::Body {
                reason: err.to_string(),
            };
            return renderer.render_failure(err.into());
        }
    };

    debug!(method = %parts.method, path = %parts.uri.path(), "dispatching");
    let req = ApiRequest {
        method: parts.method,
        params,
        headers: parts.headers,
        body,
    };

    let served = tokio::time::timeout(
        limits.request_timeout,
        operation.serve(RequestContext::default(), req),
    )
    .await;

    match served {
        Ok(Ok(response)) => response,
        Ok(Err(failure)) => renderer.render_failure(failure),
        Err(_) => {
            warn!(
                timeout_ms = limits.request_timeout.as_millis() as u64,
                "operation timed out"
            );
            renderer.render(
                ErrorResource::request_timeout().into(),
                StatusCode::SERVICE_UNAVAILABLE,
            )
        }
    }
}

fn method_filter(method: &Method) -> Option<MethodFilter> {
    let filter = match *method {
        Method::GET => MethodFilter::GET,
        Method::POST => MethodFilter::POST,
        Method::PUT => MethodFilter::PUT,
        Method::PATCH => MethodFilter::PATCH,
        Method::DELETE => MethodFilter::DELETE,
        Method::HEAD => MethodFilter::HEAD,
        Method::OPTIONS => MethodFilter::OPTIONS,
        _ => return None,
    };
    Some(filter)
}

/// `/apps/{app}/releases` becomes `/apps/:app/releases`
fn axum_path(path: &str) -> String {
    path.split('/')
        .map(|segment| match segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            Some(name) => format!(":{name}"),
            None => segment.to_string(),
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform_api::auth::{authenticate, Authenticator};
    use crate::platform_api::codec::encode;
    use axum::body::{to_bytes, Body};
    use axum::http::Request as HttpRequest;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    struct Echo;

    #[async_trait]
    impl Operation for Echo {
        async fn serve(&self, ctx: RequestContext, req: ApiRequest) -> Result<Response, Failure> {
            let actor = ctx.actor().map(|u| u.name.clone()).ok();
            Ok(encode(
                StatusCode::OK,
                &serde_json::json!({ "app": req.params.get("app"), "actor": actor }),
            ))
        }
    }

    struct Slow;

    #[async_trait]
    impl Operation for Slow {
        async fn serve(&self, _ctx: RequestContext, _req: ApiRequest) -> Result<Response, Failure> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(encode(StatusCode::OK, &()))
        }
    }

    struct Counting(Arc<AtomicUsize>);

    #[async_trait]
    impl Operation for Counting {
        async fn serve(&self, _ctx: RequestContext, _req: ApiRequest) -> Result<Response, Failure> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(encode(StatusCode::OK, &()))
        }
    }

    struct Everyone;

    #[async_trait]
    impl Authenticator for Everyone {
        async fn authenticate(&self, _headers: &HeaderMap) -> Result<User, ApiError> {
            Ok(User::new("1", "ops"))
        }
    }

    struct NoOne;

    #[async_trait]
    impl Authenticator for NoOne {
        async fn authenticate(&self, _headers: &HeaderMap) -> Result<User, ApiError> {
            Err(ErrorResource::unauthorized().into())
        }
    }

    async fn call(router: Router, method: Method, uri: &str) -> (StatusCode, serde_json::Value) {
        let request = HttpRequest::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_axum_path() {
        assert_eq!(axum_path("/apps"), "/apps");
        assert_eq!(axum_path("/apps/{app}/releases/{version}"), "/apps/:app/releases/:version");
    }

    #[tokio::test]
    async fn test_params_and_actor_reach_operation() {
        let mut table = RouteTable::new(ErrorRenderer::default(), Limits::default());
        table
            .handle(Method::GET, "/apps/{app}", authenticate(Arc::new(Everyone), Echo))
            .unwrap();

        let (status, body) = call(table.into_router(), Method::GET, "/apps/acme-inc").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["app"], "acme-inc");
        assert_eq!(body["actor"], "ops");
    }

    #[tokio::test]
    async fn test_methods_share_a_path() {
        let mut table = RouteTable::new(ErrorRenderer::default(), Limits::default());
        table
            .handle(Method::GET, "/apps", authenticate(Arc::new(Everyone), Echo))
            .unwrap()
            .handle_unauthenticated(Method::POST, "/apps", Echo)
            .unwrap();
        assert_eq!(table.routes().len(), 2);
        assert!(!table.routes()[1].authenticated);

        let router = table.into_router();
        let (_, body) = call(router.clone(), Method::GET, "/apps").await;
        assert_eq!(body["actor"], "ops");
        let (_, body) = call(router, Method::POST, "/apps").await;
        assert!(body["actor"].is_null());
    }

    #[test]
    fn test_duplicate_route_is_rejected() {
        let mut table = RouteTable::new(ErrorRenderer::default(), Limits::default());
        table.handle_unauthenticated(Method::GET, "/apps", Echo).unwrap();
        assert!(table.handle_unauthenticated(Method::GET, "/apps", Echo).is_err());
        assert!(table
            .handle_unauthenticated(Method::CONNECT, "/tunnel", Echo)
            .is_err());
    }

    #[tokio::test]
    async fn test_failed_authentication_never_runs_operation() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut table = RouteTable::new(ErrorRenderer::default(), Limits::default());
        table
            .handle(
                Method::GET,
                "/apps",
                authenticate(Arc::new(NoOne), Counting(calls.clone())),
            )
            .unwrap();

        let (status, body) = call(table.into_router(), Method::GET, "/apps").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["id"], "unauthorized");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_deadline_renders_timeout() {
        let limits = Limits {
            request_timeout: Duration::from_millis(20),
            ..Limits::default()
        };
        let mut table = RouteTable::new(ErrorRenderer::default(), limits);
        table.handle_unauthenticated(Method::GET, "/slow", Slow).unwrap();

        let (status, body) = call(table.into_router(), Method::GET, "/slow").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["id"], "request_timeout");
    }

    #[tokio::test]
    async fn test_oversized_body_is_bad_request() {
        let limits = Limits {
            body_limit: 4,
            ..Limits::default()
        };
        let mut table = RouteTable::new(ErrorRenderer::default(), limits);
        table.handle_unauthenticated(Method::POST, "/apps", Echo).unwrap();

        let request = HttpRequest::builder()
            .method(Method::POST)
            .uri("/apps")
            .body(Body::from(r#"{"name":"acme-inc"}"#))
            .unwrap();
        let response = table.into_router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
