//! HTTP server.
//!
//! Mounts both front doors on one listener: the platform API at the root
//! and the slash command endpoint at [`SLASH_PATH`].

use anyhow::{Context, Result};
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;

use crate::platform_api::{Limits, PlatformApi};
use crate::slash::{self, CommandHandler};

/// Where slash commands are served
pub const SLASH_PATH: &str = "/slack";

/// Configuration for the HTTP server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on
    pub listen_addr: SocketAddr,
    /// Deadline for one API operation or one slash command
    pub request_timeout: Duration,
    /// Largest accepted API request body in bytes
    pub body_limit: usize,
    /// Token the chat platform signs slash commands with
    pub slash_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let limits = Limits::default();
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            request_timeout: limits.request_timeout,
            body_limit: limits.body_limit,
            slash_token: None,
        }
    }
}

impl ServerConfig {
    /// Per-request limits for the platform API
    pub fn limits(&self) -> Limits {
        Limits {
            request_timeout: self.request_timeout,
            body_limit: self.body_limit,
        }
    }
}

/// Serves the platform API and slash commands.
pub struct HttpServer {
    config: ServerConfig,
    router: Router,
}

impl HttpServer {
    /// Creates a new [`HttpServer`] from the given configuration and front doors.
    pub fn new(config: ServerConfig, api: PlatformApi, commands: CommandHandler) -> Result<Self> {
        let api = api.with_limits(config.limits()).router()?;
        let commands = slash::router(
            commands.with_timeout(config.request_timeout),
            config.slash_token.clone(),
            reqwest::Client::new(),
        );

        let router = Router::new().nest(SLASH_PATH, commands).merge(api);
        Ok(Self { config, router })
    }

    /// Access the configuration associated with this server.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The complete router, for driving the server without a socket
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve until `shutdown` resolves.
    pub async fn run(self, shutdown: impl Future<Output = ()> + Send + 'static) -> Result<()> {
        let listener = TcpListener::bind(self.config.listen_addr)
            .await
            .with_context(|| format!("Failed to bind {}", self.config.listen_addr))?;
        info!("Listening on {}", self.config.listen_addr);

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await
            .context("HTTP server failed")?;

        info!("HTTP server stopped");
        Ok(())
    }
}
