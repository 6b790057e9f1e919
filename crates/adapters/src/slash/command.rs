//! Slash command adapter.
//!
//! Turns the free text of a slash command into an argument vector, runs it
//! through the shared command line [`Dispatcher`], and replies with the
//! captured output as a single fixed-width block.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use dockyard_protocol::User;

use super::responder::{Reply, Responder, ResponderError};

/// Delimiter that makes the chat client render a code block
pub const FENCE: &str = "```";

/// Default deadline for one dispatcher run
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Slash command failures
#[derive(Error, Debug)]
pub enum SlashError {
    #[error("Invalid command text: {source}")]
    Parse {
        #[from]
        source: shell_words::ParseError,
    },

    #[error("Command failed: {source}")]
    Dispatch { source: anyhow::Error },

    #[error("Command timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error(transparent)]
    Respond(#[from] ResponderError),
}

/// The payload of a slash command invocation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Command {
    pub token: String,
    pub team_id: String,
    pub channel_id: String,
    pub user_id: String,
    pub user_name: String,
    pub command: String,
    pub text: String,
    pub response_url: String,
}

impl Command {
    /// The chat user who ran the command
    pub fn actor(&self) -> User {
        User::new(self.user_id.clone(), self.user_name.clone())
    }
}

/// What a dispatcher knows about the invocation it is running
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchContext {
    pub actor: User,
}

/// The shared command line dispatcher.
///
/// `args[0]` is the program name slot and is always empty when called from
/// chat.
#[async_trait]
pub trait Dispatcher: Send + Sync + 'static {
    async fn run(
        &self,
        ctx: &DispatchContext,
        out: &mut (dyn Write + Send),
        args: Vec<String>,
    ) -> anyhow::Result<()>;
}

/// Split chat text into an argument vector using shell quoting rules.
///
/// The result always starts with an empty program name slot.
pub fn parse(text: &str) -> Result<Vec<String>, SlashError> {
    let words = shell_words::split(text)?;
    let mut args = Vec::with_capacity(words.len() + 1);
    args.push(String::new());
    args.extend(words);
    Ok(args)
}

/// Run `args` through the dispatcher and capture everything it writes.
pub async fn invoke(
    dispatcher: &dyn Dispatcher,
    ctx: &DispatchContext,
    args: Vec<String>,
) -> Result<String, SlashError> {
    let mut buffer: Vec<u8> = Vec::new();
    dispatcher
        .run(ctx, &mut buffer, args)
        .await
        .map_err(|source| SlashError::Dispatch { source })?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// Wrap output in a fixed-width block
pub fn fenced(output: &str) -> String {
    format!("{FENCE}{output}{FENCE}")
}

/// Serves slash commands with a [`Dispatcher`]
#[derive(Clone)]
pub struct CommandHandler {
    dispatcher: Arc<dyn Dispatcher>,
    timeout: Duration,
}

impl CommandHandler {
    pub fn new(dispatcher: Arc<dyn Dispatcher>) -> Self {
        Self {
            dispatcher,
            timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Parse, dispatch, and reply exactly once. Any failure means no reply.
    pub async fn serve_command(
        &self,
        responder: &dyn Responder,
        command: &Command,
    ) -> Result<(), SlashError> {
        let args = parse(&command.text)?;
        debug!(command = %command.command, args = ?args, "dispatching slash command");

        let ctx = DispatchContext {
            actor: command.actor(),
        };
        let output = tokio::time::timeout(self.timeout, invoke(self.dispatcher.as_ref(), &ctx, args))
            .await
            .map_err(|_| SlashError::Timeout {
                timeout_ms: self.timeout.as_millis() as u64,
            })??;

        responder.respond(Reply::say(fenced(&output))).await?;
        info!(command = %command.command, user = %command.user_name, "slash command served");
        Ok(())
    }
}
