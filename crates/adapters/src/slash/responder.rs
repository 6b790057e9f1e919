//! Chat replies.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Who gets to see a reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    /// Everyone in the channel
    InChannel,
    /// Only the user who ran the command
    Ephemeral,
}

/// A single chat message sent in answer to a slash command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub response_type: ResponseType,
    pub text: String,
}

impl Reply {
    /// A reply posted to the whole channel
    pub fn say(text: impl Into<String>) -> Self {
        Self {
            response_type: ResponseType::InChannel,
            text: text.into(),
        }
    }
}

/// Reply delivery failures
#[derive(Error, Debug)]
pub enum ResponderError {
    #[error("Failed to deliver reply: {source}")]
    Transport {
        #[from]
        source: reqwest::Error,
    },

    #[error("Reply rejected with status {status}")]
    Rejected { status: u16 },
}

/// Delivers replies for one slash command invocation.
#[async_trait]
pub trait Responder: Send + Sync {
    async fn respond(&self, reply: Reply) -> Result<(), ResponderError>;
}

/// Posts replies to the `response_url` the chat platform handed us
#[derive(Debug, Clone)]
pub struct ResponseUrlResponder {
    client: reqwest::Client,
    url: String,
}

impl ResponseUrlResponder {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl Responder for ResponseUrlResponder {
    async fn respond(&self, reply: Reply) -> Result<(), ResponderError> {
        let response = self.client.post(&self.url).json(&reply).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResponderError::Rejected {
                status: status.as_u16(),
            });
        }
        debug!(bytes = reply.text.len(), "reply delivered");
        Ok(())
    }
}
