//! Slash command HTTP endpoint.
//!
//! The chat platform POSTs a form encoded [`Command`]. The reply is posted
//! back to the command's `response_url`; the HTTP response itself only
//! reports whether that worked.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Form, Router};
use std::sync::Arc;
use tracing::{error, warn};

use super::command::{Command, CommandHandler};
use super::responder::ResponseUrlResponder;

#[derive(Clone)]
struct SlashState {
    handler: CommandHandler,
    verification_token: Option<Arc<str>>,
    client: reqwest::Client,
}

/// Router serving slash commands at `/`
pub fn router(
    handler: CommandHandler,
    verification_token: Option<String>,
    client: reqwest::Client,
) -> Router {
    let state = SlashState {
        handler,
        verification_token: verification_token.map(Arc::from),
        client,
    };

    Router::new()
        .route("/", post(serve_slash_command))
        .with_state(state)
}

async fn serve_slash_command(
    State(state): State<SlashState>,
    Form(command): Form<Command>,
) -> Response {
    if let Some(expected) = &state.verification_token {
        if command.token != **expected {
            warn!(team = %command.team_id, "slash command with invalid token");
            return (StatusCode::UNAUTHORIZED, "invalid token").into_response();
        }
    }

    let responder = ResponseUrlResponder::new(state.client.clone(), command.response_url.clone());
    match state.handler.serve_command(&responder, &command).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => {
            error!(
                command = %command.command,
                user = %command.user_name,
                error = %err,
                "slash command failed"
            );
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        }
    }
}
