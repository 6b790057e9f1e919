//! Platform API front door.
//!
//! Serves the subset of the Heroku platform API that `hk` style clients
//! use, translating each call into a [`Backend`] operation. See
//! <https://devcenter.heroku.com/articles/platform-api-reference>.

pub mod apps;
pub mod auth;
pub mod authorizations;
pub mod codec;
pub mod configs;
pub mod deploys;
pub mod error;
pub mod processes;
pub mod releases;
pub mod routes;

use anyhow::Result;
use axum::extract::{Request, State};
use axum::http::header::ACCEPT;
use axum::http::{HeaderMap, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::Router;
use std::sync::Arc;

use dockyard_protocol::{Backend, API_VERSION};

pub use auth::{
    authenticate, Authenticate, Authenticator, Authorizer, StaticAuthorizer, TokenAuthenticator,
};
pub use codec::{decode, encode, no_content, DecodeError};
pub use error::{ApiError, ErrorLog, ErrorRenderer, ErrorResource, Failure, TracingErrorLog};
pub use routes::{ApiRequest, Limits, Operation, RequestContext, RouteInfo, RouteTable};

/// The Accept header that selects the API version. See
/// <https://devcenter.heroku.com/articles/platform-api-reference#clients>
pub const ACCEPT_HEADER: &str = "application/vnd.heroku+json; version=3";

const VENDOR_MEDIA_TYPE: &str = "application/vnd.heroku+json";

/// Everything the platform API needs to serve requests
#[derive(Clone)]
pub struct PlatformApi {
    pub backend: Arc<dyn Backend>,
    pub authorizer: Arc<dyn Authorizer>,
    pub renderer: ErrorRenderer,
    pub limits: Limits,
}

impl PlatformApi {
    pub fn new(backend: Arc<dyn Backend>, authorizer: Arc<dyn Authorizer>) -> Self {
        Self {
            backend,
            authorizer,
            renderer: ErrorRenderer::default(),
            limits: Limits::default(),
        }
    }

    pub fn with_renderer(mut self, renderer: ErrorRenderer) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Build the route table.
    pub fn route_table(&self) -> Result<RouteTable> {
        use apps::{DeleteApp, GetApps, PostApps};
        use authorizations::PostAuthorizations;
        use configs::{GetConfigs, PatchConfigs};
        use deploys::PostDeploys;
        use processes::{GetProcesses, PatchFormation};
        use releases::{GetRelease, GetReleases, PostReleases};

        let e = &self.backend;
        let auth: Arc<dyn Authenticator> = Arc::new(TokenAuthenticator::new(e.clone()));
        let mut r = RouteTable::new(self.renderer.clone(), self.limits);

        // Apps
        r.handle(
            Method::GET,
            "/apps",
            authenticate(auth.clone(), GetApps { backend: e.clone() }),
        )?; // hk apps
        r.handle(
            Method::DELETE,
            "/apps/{app}",
            authenticate(auth.clone(), DeleteApp { backend: e.clone() }),
        )?; // hk destroy
        r.handle(
            Method::POST,
            "/apps",
            authenticate(auth.clone(), PostApps { backend: e.clone() }),
        )?; // hk create
        r.handle(
            Method::POST,
            "/organizations/apps",
            authenticate(auth.clone(), PostApps { backend: e.clone() }),
        )?; // hk create

        // Deploys
        r.handle(
            Method::POST,
            "/deploys",
            authenticate(auth.clone(), PostDeploys { backend: e.clone() }),
        )?;

        // Releases
        r.handle(
            Method::GET,
            "/apps/{app}/releases",
            authenticate(auth.clone(), GetReleases { backend: e.clone() }),
        )?; // hk releases
        r.handle(
            Method::GET,
            "/apps/{app}/releases/{version}",
            authenticate(auth.clone(), GetRelease { backend: e.clone() }),
        )?; // hk release-info
        r.handle(
            Method::POST,
            "/apps/{app}/releases",
            authenticate(auth.clone(), PostReleases { backend: e.clone() }),
        )?; // hk rollback

        // Configs
        r.handle(
            Method::GET,
            "/apps/{app}/config-vars",
            authenticate(auth.clone(), GetConfigs { backend: e.clone() }),
        )?; // hk env, hk get
        r.handle(
            Method::PATCH,
            "/apps/{app}/config-vars",
            authenticate(auth.clone(), PatchConfigs { backend: e.clone() }),
        )?; // hk set

        // Processes
        r.handle(
            Method::GET,
            "/apps/{app}/dynos",
            authenticate(auth.clone(), GetProcesses { backend: e.clone() }),
        )?; // hk dynos

        // Formations
        r.handle(
            Method::PATCH,
            "/apps/{app}/formation",
            authenticate(auth.clone(), PatchFormation { backend: e.clone() }),
        )?; // hk scale

        // OAuth
        r.handle_unauthenticated(
            Method::POST,
            "/oauth/authorizations",
            PostAuthorizations {
                backend: e.clone(),
                authorizer: self.authorizer.clone(),
            },
        )?;

        Ok(r)
    }

    /// Build the router, with API version negotiation in front of every route.
    pub fn router(&self) -> Result<Router> {
        let router = self
            .route_table()?
            .into_router()
            .layer(middleware::from_fn_with_state(
                self.renderer.clone(),
                negotiate_version,
            ));
        Ok(router)
    }
}

/// Reject requests that ask for a platform API version other than ours.
async fn negotiate_version(
    State(renderer): State<ErrorRenderer>,
    request: Request,
    next: Next,
) -> Response {
    if !accepts_version(request.headers()) {
        return renderer.render(
            ErrorResource::not_acceptable().into(),
            StatusCode::NOT_ACCEPTABLE,
        );
    }
    next.run(request).await
}

/// Whether the Accept header is compatible with [`ACCEPT_HEADER`].
///
/// Requests without the vendor media type, or without a version parameter,
/// are served with the current version.
pub fn accepts_version(headers: &HeaderMap) -> bool {
    let Some(accept) = headers.get(ACCEPT).and_then(|v| v.to_str().ok()) else {
        return true;
    };

    for media_range in accept.split(',') {
        let mut parts = media_range.split(';').map(str::trim);
        if !parts
            .next()
            .is_some_and(|t| t.eq_ignore_ascii_case(VENDOR_MEDIA_TYPE))
        {
            continue;
        }
        let version = parts.find_map(|p| p.strip_prefix("version="));
        return match version {
            Some(v) => v.trim() == API_VERSION.to_string(),
            None => true,
        };
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn accept(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_version_negotiation() {
        assert!(accepts_version(&HeaderMap::new()));
        assert!(accepts_version(&accept(ACCEPT_HEADER)));
        assert!(accepts_version(&accept("*/*")));
        assert!(accepts_version(&accept("application/json")));
        assert!(accepts_version(&accept("application/vnd.heroku+json")));
        assert!(!accepts_version(&accept("application/vnd.heroku+json; version=2")));
        assert!(!accepts_version(&accept(
            "application/json, application/vnd.heroku+json; version=4"
        )));
    }
}
