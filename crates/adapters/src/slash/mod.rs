//! Slash command front door.
//!
//! Exposes the command line over chat slash commands: `/dockyard apps`
//! runs the same code as `dockyard apps` and replies with its output.

pub mod command;
pub mod responder;
pub mod server;

pub use command::{
    fenced, invoke, parse, Command, CommandHandler, DispatchContext, Dispatcher, SlashError, FENCE,
};
pub use responder::{Reply, Responder, ResponderError, ResponseType, ResponseUrlResponder};
pub use server::router;
