//! Dynos and formations: `hk dynos`, `hk scale`.

use async_trait::async_trait;
use axum::http::StatusCode;
use axum::response::Response;
use serde::Deserialize;
use std::sync::Arc;

use dockyard_protocol::{Backend, FormationUpdate};

use super::codec::encode;
use super::error::Failure;
use super::routes::{ApiRequest, Operation, RequestContext};

pub struct GetProcesses {
    pub backend: Arc<dyn Backend>,
}

#[async_trait]
impl Operation for GetProcesses {
    async fn serve(&self, _ctx: RequestContext, req: ApiRequest) -> Result<Response, Failure> {
        let dynos = self.backend.dynos(req.param("app")?).await?;
        Ok(encode(StatusCode::OK, &dynos))
    }
}

#[derive(Debug, Deserialize)]
struct PatchFormationForm {
    updates: Vec<FormationUpdate>,
}

pub struct PatchFormation {
    pub backend: Arc<dyn Backend>,
}

#[async_trait]
impl Operation for PatchFormation {
    async fn serve(&self, ctx: RequestContext, req: ApiRequest) -> Result<Response, Failure> {
        let form: PatchFormationForm = req.decode()?;
        let formation = self
            .backend
            .scale(ctx.actor()?, req.param("app")?, form.updates)
            .await?;
        Ok(encode(StatusCode::OK, &formation))
    }
}
