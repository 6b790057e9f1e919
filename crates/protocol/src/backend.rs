//! Backend contract.
//!
//! Front doors never touch persistence or orchestration directly. Every
//! operation they expose is a call through this trait.

use async_trait::async_trait;

use crate::errors::BackendError;
use crate::resources::{
    AccessToken, App, ConfigPatch, ConfigVars, Deploy, Dyno, Formation, FormationUpdate, Release,
    User, Version,
};

/// Result type for backend operations
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Operations the front doors call into.
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    /// List every app
    async fn apps(&self) -> BackendResult<Vec<App>>;

    /// Find an app by name
    async fn app(&self, name: &str) -> BackendResult<App>;

    /// Create a new app
    async fn create_app(&self, actor: &User, name: &str) -> BackendResult<App>;

    /// Destroy an app and everything it owns
    async fn destroy_app(&self, actor: &User, name: &str) -> BackendResult<()>;

    /// List an app's releases, oldest first
    async fn releases(&self, app: &str) -> BackendResult<Vec<Release>>;

    /// Find a single release
    async fn release(&self, app: &str, version: Version) -> BackendResult<Release>;

    /// Create a new release that reuses the slug and config of `version`
    async fn rollback(&self, actor: &User, app: &str, version: Version) -> BackendResult<Release>;

    /// Current config of an app
    async fn config(&self, app: &str) -> BackendResult<ConfigVars>;

    /// Apply a config change and release it
    async fn update_config(
        &self,
        actor: &User,
        app: &str,
        patch: ConfigPatch,
    ) -> BackendResult<ConfigVars>;

    /// Processes currently running for an app
    async fn dynos(&self, app: &str) -> BackendResult<Vec<Dyno>>;

    /// Change process quantities and sizes
    async fn scale(
        &self,
        actor: &User,
        app: &str,
        updates: Vec<FormationUpdate>,
    ) -> BackendResult<Vec<Formation>>;

    /// Deploy a container image
    async fn deploy(&self, actor: &User, image: &str) -> BackendResult<Deploy>;

    /// Issue a new access token for `user`
    async fn create_access_token(&self, user: &User) -> BackendResult<AccessToken>;

    /// Resolve a token presented by a caller
    async fn find_access_token(&self, token: &str) -> BackendResult<Option<AccessToken>>;
}
