//! Config vars: `hk env`, `hk get`, `hk set`, `hk unset`.

use async_trait::async_trait;
use axum::http::StatusCode;
use axum::response::Response;
use std::sync::Arc;

use dockyard_protocol::{Backend, ConfigPatch};

use super::codec::encode;
use super::error::Failure;
use super::routes::{ApiRequest, Operation, RequestContext};

pub struct GetConfigs {
    pub backend: Arc<dyn Backend>,
}

#[async_trait]
impl Operation for GetConfigs {
    async fn serve(&self, _ctx: RequestContext, req: ApiRequest) -> Result<Response, Failure> {
        let config = self.backend.config(req.param("app")?).await?;
        Ok(encode(StatusCode::OK, &config))
    }
}

pub struct PatchConfigs {
    pub backend: Arc<dyn Backend>,
}

#[async_trait]
impl Operation for PatchConfigs {
    async fn serve(&self, ctx: RequestContext, req: ApiRequest) -> Result<Response, Failure> {
        let patch: ConfigPatch = req.decode()?;
        let config = self
            .backend
            .update_config(ctx.actor()?, req.param("app")?, patch)
            .await?;
        Ok(encode(StatusCode::OK, &config))
    }
}
