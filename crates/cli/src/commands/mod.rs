//! CLI command modules
//!
//! The grammar here is shared by the terminal and by chat: a slash command's
//! text is parsed with exactly these definitions.

pub mod apps;
pub mod config;
pub mod processes;
pub mod releases;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "dockyard")]
#[command(about = "Dockyard - deploy and operate container apps")]
#[command(version = "0.1.0")]
pub struct CommandLineArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List apps
    Apps,
    /// Create an app
    Create {
        /// Name of the new app
        name: String,
    },
    /// Destroy an app
    Destroy {
        /// App to destroy
        app: String,
    },
    /// List releases
    Releases(AppArg),
    /// Show a single release
    ReleaseInfo {
        #[command(flatten)]
        app: AppArg,
        /// Release version, e.g. v3
        version: String,
    },
    /// Roll back to an earlier release
    Rollback {
        #[command(flatten)]
        app: AppArg,
        /// Release version to roll back to
        version: String,
    },
    /// Show all config vars
    Env(AppArg),
    /// Show one config var
    Get {
        #[command(flatten)]
        app: AppArg,
        /// Config var name
        name: String,
    },
    /// Set config vars
    Set {
        #[command(flatten)]
        app: AppArg,
        /// NAME=value pairs
        #[arg(required = true)]
        vars: Vec<String>,
    },
    /// Unset config vars
    Unset {
        #[command(flatten)]
        app: AppArg,
        /// Names to remove
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// List running processes
    Dynos(AppArg),
    /// Change process quantities, e.g. web=2 worker=1:2X
    Scale {
        #[command(flatten)]
        app: AppArg,
        /// TYPE=QUANTITY[:SIZE] changes
        #[arg(required = true)]
        changes: Vec<String>,
    },
    /// Deploy a container image
    Deploy {
        /// Image to deploy, e.g. remind101/acme-inc:latest
        image: String,
    },
}

#[derive(Args, Debug)]
pub struct AppArg {
    /// App to operate on
    #[arg(short, long)]
    pub app: String,
}
