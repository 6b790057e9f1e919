//! Dockyard command line
//!
//! The command grammar and its implementations, shared by the `dockyard`
//! binary and the slash command adapter.

pub mod commands;
pub mod dispatcher;

pub use dispatcher::CommandLine;
