use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rand::RngCore;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use dockyard_adapters::platform_api::{PlatformApi, StaticAuthorizer};
use dockyard_adapters::{CommandHandler, HttpServer, ServerConfig, SLASH_PATH};
use dockyard_backend::MemoryBackend;
use dockyard_cli::CommandLine;
use dockyard_protocol::{Backend, User};

#[derive(Parser)]
#[command(name = "dockyard")]
#[command(about = "Dockyard - platform API and slash command front door")]
#[command(version = "0.1.0")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the API and slash command server
    Serve(ServeArgs),
    /// Print the platform API route table
    Routes,
}

#[derive(Args)]
pub struct ServeArgs {
    /// Address to bind
    #[arg(long, default_value = "127.0.0.1", env = "DOCKYARD_HOST")]
    pub host: IpAddr,
    /// Port to listen on
    #[arg(short, long, default_value = "8080", env = "DOCKYARD_PORT")]
    pub port: u16,
    /// Operator username for credential issuance
    #[arg(long, default_value = "admin", env = "DOCKYARD_USERNAME")]
    pub username: String,
    /// Operator password for credential issuance
    #[arg(long, env = "DOCKYARD_PASSWORD")]
    pub password: String,
    /// Verification token slash commands must carry
    #[arg(long, env = "DOCKYARD_SLASH_TOKEN")]
    pub slash_token: Option<String>,
    /// Per-request deadline in seconds
    #[arg(long, default_value = "30", env = "DOCKYARD_REQUEST_TIMEOUT")]
    pub request_timeout: u64,
    /// Largest accepted request body in bytes
    #[arg(long, default_value = "1048576", env = "DOCKYARD_BODY_LIMIT")]
    pub body_limit: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => execute_serve(args).await,
        Commands::Routes => {
            let api = platform_api(Arc::new(MemoryBackend::new()), "admin", &random_secret());
            for route in api.route_table()?.routes() {
                println!("{}", route);
            }
            Ok(())
        }
    }
}

async fn execute_serve(args: ServeArgs) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("dockyard=debug,info")),
        )
        .init();

    let backend = Arc::new(MemoryBackend::new());
    let operator = operator();
    let token = backend
        .create_access_token(&operator)
        .await
        .context("Failed to issue operator token")?;

    let config = ServerConfig {
        listen_addr: SocketAddr::new(args.host, args.port),
        request_timeout: Duration::from_secs(args.request_timeout),
        body_limit: args.body_limit,
        slash_token: args.slash_token,
    };

    let api = platform_api(backend.clone(), &args.username, &args.password);
    let commands = CommandHandler::new(Arc::new(CommandLine::new(backend)));
    let server = HttpServer::new(config, api, commands).context("Failed to build routes")?;

    println!("🚢 Dockyard listening on http://{}", server.config().listen_addr);
    println!("💬 Slash commands at {}", SLASH_PATH);
    println!("🔑 Operator token: {}", token.token);
    println!();
    info!(user = %operator.name, "development backend ready");

    server.run(wait_for_shutdown()).await?;
    println!("✅ Shutdown complete");
    Ok(())
}

fn operator() -> User {
    User::new("1", "operator@dockyard.local")
}

fn platform_api(backend: Arc<dyn Backend>, username: &str, password: &str) -> PlatformApi {
    let authorizer = StaticAuthorizer::new(operator(), username, password);
    PlatformApi::new(backend, Arc::new(authorizer))
}

fn random_secret() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    println!("\n🛑 Shutting down...");
}
