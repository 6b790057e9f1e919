//! App operations: `hk apps`, `hk create`, `hk destroy`.

use async_trait::async_trait;
use axum::http::StatusCode;
use axum::response::Response;
use serde::Deserialize;
use std::sync::Arc;

use dockyard_protocol::Backend;

use super::codec::{encode, no_content};
use super::error::Failure;
use super::routes::{ApiRequest, Operation, RequestContext};

pub struct GetApps {
    pub backend: Arc<dyn Backend>,
}

#[async_trait]
impl Operation for GetApps {
    async fn serve(&self, _ctx: RequestContext, _req: ApiRequest) -> Result<Response, Failure> {
        let apps = self.backend.apps().await?;
        Ok(encode(StatusCode::OK, &apps))
    }
}

#[derive(Debug, Deserialize)]
struct PostAppsForm {
    name: String,
}

pub struct PostApps {
    pub backend: Arc<dyn Backend>,
}

#[async_trait]
impl Operation for PostApps {
    async fn serve(&self, ctx: RequestContext, req: ApiRequest) -> Result<Response, Failure> {
        let form: PostAppsForm = req.decode()?;
        let app = self.backend.create_app(ctx.actor()?, &form.name).await?;
        Ok(encode(StatusCode::CREATED, &app))
    }
}

pub struct DeleteApp {
    pub backend: Arc<dyn Backend>,
}

#[async_trait]
impl Operation for DeleteApp {
    async fn serve(&self, ctx: RequestContext, req: ApiRequest) -> Result<Response, Failure> {
        let name = req.param("app")?;
        self.backend.destroy_app(ctx.actor()?, name).await?;
        Ok(no_content())
    }
}
