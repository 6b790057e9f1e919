//! Command line dispatcher
//!
//! Runs one argument vector against the backend. Both the terminal and the
//! slash command adapter go through [`CommandLine`], so chat users get the
//! exact same commands and output.

use anyhow::Result;
use async_trait::async_trait;
use clap::error::ErrorKind;
use clap::Parser;
use std::io::Write;
use std::sync::Arc;
use tracing::debug;

use dockyard_adapters::{DispatchContext, Dispatcher};
use dockyard_protocol::Backend;

use crate::commands::{apps, config, processes, releases, Command, CommandLineArgs};

/// The shared command line
#[derive(Clone)]
pub struct CommandLine {
    backend: Arc<dyn Backend>,
}

impl CommandLine {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Dispatcher for CommandLine {
    async fn run(
        &self,
        ctx: &DispatchContext,
        out: &mut (dyn Write + Send),
        args: Vec<String>,
    ) -> Result<()> {
        let parsed = match CommandLineArgs::try_parse_from(&args) {
            Ok(parsed) => parsed,
            Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
                write!(out, "{}", err.render())?;
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };
        debug!(command = ?parsed.command, user = %ctx.actor.name, "running command");

        let backend = self.backend.as_ref();
        let actor = &ctx.actor;
        match parsed.command {
            Command::Apps => apps::execute_apps(backend, out).await,
            Command::Create { name } => apps::execute_create(backend, actor, out, &name).await,
            Command::Destroy { app } => apps::execute_destroy(backend, actor, out, &app).await,
            Command::Releases(args) => releases::execute_releases(backend, out, &args.app).await,
            Command::ReleaseInfo { app, version } => {
                releases::execute_release_info(backend, out, &app.app, &version).await
            }
            Command::Rollback { app, version } => {
                releases::execute_rollback(backend, actor, out, &app.app, &version).await
            }
            Command::Env(args) => config::execute_env(backend, out, &args.app).await,
            Command::Get { app, name } => config::execute_get(backend, out, &app.app, &name).await,
            Command::Set { app, vars } => {
                config::execute_set(backend, actor, out, &app.app, &vars).await
            }
            Command::Unset { app, names } => {
                config::execute_unset(backend, actor, out, &app.app, &names).await
            }
            Command::Dynos(args) => processes::execute_dynos(backend, out, &args.app).await,
            Command::Scale { app, changes } => {
                processes::execute_scale(backend, actor, out, &app.app, &changes).await
            }
            Command::Deploy { image } => {
                releases::execute_deploy(backend, actor, out, &image).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dockyard_backend::MemoryBackend;
    use dockyard_protocol::User;

    fn context() -> DispatchContext {
        DispatchContext {
            actor: User::new("U1", "ops"),
        }
    }

    async fn run(cli: &CommandLine, args: &[&str]) -> Result<String> {
        let mut out = Vec::new();
        let args = args.iter().map(|a| a.to_string()).collect();
        cli.run(&context(), &mut out, args).await?;
        Ok(String::from_utf8(out)?)
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let cli = CommandLine::new(Arc::new(MemoryBackend::new()));

        assert_eq!(run(&cli, &["", "create", "acme-inc"]).await.unwrap(), "Created acme-inc.\n");
        let output = run(&cli, &["", "apps"]).await.unwrap();
        assert!(output.starts_with("acme-inc"));
    }

    #[tokio::test]
    async fn test_config_round() {
        let cli = CommandLine::new(Arc::new(MemoryBackend::new()));
        run(&cli, &["", "deploy", "remind101/acme-inc:latest"]).await.unwrap();

        let output = run(&cli, &["", "set", "-a", "acme-inc", "FOO=bar", "A=1"])
            .await
            .unwrap();
        assert_eq!(output, "Set A, FOO on acme-inc.\n");

        assert_eq!(run(&cli, &["", "env", "-a", "acme-inc"]).await.unwrap(), "A=1\nFOO=bar\n");
        assert_eq!(run(&cli, &["", "get", "-a", "acme-inc", "FOO"]).await.unwrap(), "bar\n");

        run(&cli, &["", "unset", "-a", "acme-inc", "FOO"]).await.unwrap();
        assert!(run(&cli, &["", "get", "-a", "acme-inc", "FOO"]).await.is_err());
    }

    #[tokio::test]
    async fn test_releases_and_rollback() {
        let cli = CommandLine::new(Arc::new(MemoryBackend::new()));
        let output = run(&cli, &["", "deploy", "acme-inc"]).await.unwrap();
        assert_eq!(output, "Deployed acme-inc to acme-inc as v1.\n");
        run(&cli, &["", "set", "-a", "acme-inc", "FOO=bar"]).await.unwrap();

        let output = run(&cli, &["", "rollback", "-a", "acme-inc", "v1"]).await.unwrap();
        assert_eq!(output, "Rolled back acme-inc to v1 as v3.\n");

        let output = run(&cli, &["", "releases", "-a", "acme-inc"]).await.unwrap();
        assert_eq!(output.lines().count(), 3);
        assert!(output.starts_with("v3"));

        let output = run(&cli, &["", "release-info", "-a", "acme-inc", "2"]).await.unwrap();
        assert!(output.contains("Set FOO config vars"));
    }

    #[tokio::test]
    async fn test_scale_and_dynos() {
        let cli = CommandLine::new(Arc::new(MemoryBackend::new()));
        run(&cli, &["", "deploy", "acme-inc"]).await.unwrap();

        let output = run(&cli, &["", "scale", "-a", "acme-inc", "web=2", "worker=1:2X"])
            .await
            .unwrap();
        assert_eq!(output, "Scaled acme-inc to web=2:1X, worker=1:2X.\n");

        let output = run(&cli, &["", "dynos", "-a", "acme-inc"]).await.unwrap();
        assert_eq!(output.lines().count(), 3);
    }

    #[tokio::test]
    async fn test_help_succeeds_and_usage_errors_fail() {
        let cli = CommandLine::new(Arc::new(MemoryBackend::new()));

        let output = run(&cli, &["", "--help"]).await.unwrap();
        assert!(output.contains("Deploy a container image"));

        assert!(run(&cli, &["", "launch-missiles"]).await.is_err());
        assert!(run(&cli, &["", "releases"]).await.is_err());
        assert!(run(&cli, &[""]).await.is_err());
    }
}
