//! Authentication.
//!
//! [`Authenticate`] decorates an [`Operation`] with a credential check. The
//! route table only accepts decorated operations for regular routes, so an
//! operation cannot be registered without it by accident.

use async_trait::async_trait;
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::response::Response;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::sync::Arc;
use tracing::debug;

use dockyard_protocol::{Backend, User};

use super::error::{ApiError, ErrorResource, Failure};
use super::routes::{ApiRequest, Operation, RequestContext};

/// Header carrying a one-time password during credential issuance
pub const TWO_FACTOR_HEADER: &str = "Heroku-Two-Factor-Code";

/// Resolves the caller of a request.
#[async_trait]
pub trait Authenticator: Send + Sync + 'static {
    async fn authenticate(&self, headers: &HeaderMap) -> Result<User, ApiError>;
}

/// Checks username/password pairs when issuing credentials.
#[async_trait]
pub trait Authorizer: Send + Sync + 'static {
    async fn authorize(
        &self,
        username: &str,
        password: &str,
        two_factor_code: Option<&str>,
    ) -> Result<User, ApiError>;
}

/// Credentials found in an `Authorization` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    Bearer(String),
    Basic { username: String, password: String },
}

impl Credentials {
    /// Parse `Bearer <token>` or `Basic <base64(user:pass)>`
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
        let (scheme, rest) = value.split_once(' ')?;
        let rest = rest.trim();

        if scheme.eq_ignore_ascii_case("bearer") {
            return (!rest.is_empty()).then(|| Credentials::Bearer(rest.to_string()));
        }
        if scheme.eq_ignore_ascii_case("basic") {
            let decoded = STANDARD.decode(rest).ok()?;
            let decoded = String::from_utf8(decoded).ok()?;
            let (username, password) = decoded.split_once(':')?;
            return Some(Credentials::Basic {
                username: username.to_string(),
                password: password.to_string(),
            });
        }
        None
    }

    /// The API token, for clients that send it as a Basic password
    pub fn token(&self) -> Option<&str> {
        let token = match self {
            Credentials::Bearer(token) => token.as_str(),
            Credentials::Basic { username, password } if password.is_empty() => username.as_str(),
            Credentials::Basic { password, .. } => password.as_str(),
        };
        (!token.is_empty()).then_some(token)
    }
}

/// Authenticates API tokens against the backend
pub struct TokenAuthenticator {
    backend: Arc<dyn Backend>,
}

impl TokenAuthenticator {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Authenticator for TokenAuthenticator {
    async fn authenticate(&self, headers: &HeaderMap) -> Result<User, ApiError> {
        let credentials = Credentials::from_headers(headers).ok_or_else(ErrorResource::unauthorized)?;
        let token = credentials.token().ok_or_else(ErrorResource::unauthorized)?;

        match self.backend.find_access_token(token).await? {
            Some(token) => Ok(token.user),
            None => Err(ErrorResource::unauthorized().into()),
        }
    }
}

/// An operation that only runs once its caller is authenticated
pub struct Authenticate<O> {
    authenticator: Arc<dyn Authenticator>,
    inner: O,
}

/// Wrap `operation` with a credential check
pub fn authenticate<O: Operation>(
    authenticator: Arc<dyn Authenticator>,
    operation: O,
) -> Authenticate<O> {
    Authenticate {
        authenticator,
        inner: operation,
    }
}

#[async_trait]
impl<O: Operation> Operation for Authenticate<O> {
    async fn serve(&self, ctx: RequestContext, req: ApiRequest) -> Result<Response, Failure> {
        let actor = self.authenticator.authenticate(&req.headers).await?;
        debug!(user = %actor.name, "authenticated");
        self.inner.serve(ctx.with_actor(actor), req).await
    }
}

/// A single fixed account, for development servers
pub struct StaticAuthorizer {
    user: User,
    username: String,
    password: String,
    two_factor_code: Option<String>,
}

impl StaticAuthorizer {
    pub fn new(user: User, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user,
            username: username.into(),
            password: password.into(),
            two_factor_code: None,
        }
    }

    /// Also require a one-time code
    pub fn with_two_factor_code(mut self, code: impl Into<String>) -> Self {
        self.two_factor_code = Some(code.into());
        self
    }
}

#[async_trait]
impl Authorizer for StaticAuthorizer {
    async fn authorize(
        &self,
        username: &str,
        password: &str,
        two_factor_code: Option<&str>,
    ) -> Result<User, ApiError> {
        if self.password.is_empty() || username != self.username || password != self.password {
            return Err(ErrorResource::unauthorized().into());
        }
        if let Some(expected) = &self.two_factor_code {
            if two_factor_code != Some(expected.as_str()) {
                return Err(ErrorResource::two_factor().into());
            }
        }
        Ok(self.user.clone())
    }
}
