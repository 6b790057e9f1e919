//! Protocol adapters (platform API, slash commands)
//!
//! This crate is the front door of Dockyard. It accepts platform API calls
//! and chat slash commands, turns them into backend calls, and renders the
//! results back into protocol-correct responses.

pub mod http_server;
pub mod platform_api;
pub mod slash;

pub use http_server::{HttpServer, ServerConfig, SLASH_PATH};
pub use platform_api::{PlatformApi, ACCEPT_HEADER};
pub use slash::{CommandHandler, DispatchContext, Dispatcher};
