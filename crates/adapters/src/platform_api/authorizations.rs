//! Credential issuance: `POST /oauth/authorizations`.
//!
//! This is the one route that runs without an API token. The caller proves
//! who they are with a username and password instead.

use async_trait::async_trait;
use axum::http::StatusCode;
use axum::response::Response;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use dockyard_protocol::Backend;

use super::auth::{Authorizer, Credentials, TWO_FACTOR_HEADER};
use super::codec::encode;
use super::error::{ErrorResource, Failure};
use super::routes::{ApiRequest, Operation, RequestContext};

#[derive(Debug, Serialize)]
struct AuthorizationToken {
    token: String,
    expires_in: Option<u64>,
}

#[derive(Debug, Serialize)]
struct Authorization {
    access_token: AuthorizationToken,
}

pub struct PostAuthorizations {
    pub backend: Arc<dyn Backend>,
    pub authorizer: Arc<dyn Authorizer>,
}

#[async_trait]
impl Operation for PostAuthorizations {
    async fn serve(&self, _ctx: RequestContext, req: ApiRequest) -> Result<Response, Failure> {
        let Some(Credentials::Basic { username, password }) = Credentials::from_headers(&req.headers)
        else {
            return Err(ErrorResource::unauthorized().into());
        };
        let two_factor_code = req
            .headers
            .get(TWO_FACTOR_HEADER)
            .and_then(|v| v.to_str().ok());

        let user = self
            .authorizer
            .authorize(&username, &password, two_factor_code)
            .await?;
        let token = self.backend.create_access_token(&user).await?;
        info!(user = %user.name, "access token issued");

        let authorization = Authorization {
            access_token: AuthorizationToken {
                token: token.token,
                expires_in: token.expires_in,
            },
        };
        Ok(encode(StatusCode::CREATED, &authorization))
    }
}
