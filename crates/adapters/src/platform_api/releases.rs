//! Release operations: `hk releases`, `hk release-info`, `hk rollback`.

use async_trait::async_trait;
use axum::http::StatusCode;
use axum::response::Response;
use serde::Deserialize;
use std::sync::Arc;

use dockyard_protocol::{Backend, Version};

use super::codec::encode;
use super::error::{ErrorResource, Failure};
use super::routes::{ApiRequest, Operation, RequestContext};

pub struct GetReleases {
    pub backend: Arc<dyn Backend>,
}

#[async_trait]
impl Operation for GetReleases {
    async fn serve(&self, _ctx: RequestContext, req: ApiRequest) -> Result<Response, Failure> {
        let releases = self.backend.releases(req.param("app")?).await?;
        Ok(encode(StatusCode::OK, &releases))
    }
}

pub struct GetRelease {
    pub backend: Arc<dyn Backend>,
}

#[async_trait]
impl Operation for GetRelease {
    async fn serve(&self, _ctx: RequestContext, req: ApiRequest) -> Result<Response, Failure> {
        // A version that does not parse cannot name an existing release.
        let version: Version = req
            .param("version")?
            .parse()
            .map_err(|_| ErrorResource::not_found())?;
        let release = self.backend.release(req.param("app")?, version).await?;
        Ok(encode(StatusCode::OK, &release))
    }
}

#[derive(Debug, Deserialize)]
struct PostReleasesForm {
    release: String,
}

pub struct PostReleases {
    pub backend: Arc<dyn Backend>,
}

#[async_trait]
impl Operation for PostReleases {
    async fn serve(&self, ctx: RequestContext, req: ApiRequest) -> Result<Response, Failure> {
        let form: PostReleasesForm = req.decode()?;
        let version: Version = form.release.parse()?;
        let release = self
            .backend
            .rollback(ctx.actor()?, req.param("app")?, version)
            .await?;
        Ok(encode(StatusCode::OK, &release))
    }
}
