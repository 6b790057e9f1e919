//! Image deploys.

use async_trait::async_trait;
use axum::http::StatusCode;
use axum::response::Response;
use serde::Deserialize;
use std::sync::Arc;

use dockyard_protocol::Backend;

use super::codec::encode;
use super::error::Failure;
use super::routes::{ApiRequest, Operation, RequestContext};

#[derive(Debug, Deserialize)]
struct PostDeploysForm {
    image: String,
}

pub struct PostDeploys {
    pub backend: Arc<dyn Backend>,
}

#[async_trait]
impl Operation for PostDeploys {
    async fn serve(&self, ctx: RequestContext, req: ApiRequest) -> Result<Response, Failure> {
        let form: PostDeploysForm = req.decode()?;
        let deploy = self.backend.deploy(ctx.actor()?, &form.image).await?;
        Ok(encode(StatusCode::CREATED, &deploy))
    }
}
