//! mockcb — callback client for a mock/proxy server.
//!
//! Connects to the server's callback WebSocket, prints the assigned client
//! id, and answers intercepted requests until interrupted.

mod commands;
mod config;

use clap::{Parser, Subcommand};
use tracing::error;

/// mockcb — mock server callback client
#[derive(Parser)]
#[command(name = "mockcb", version = "0.1.0", about = "Callback client for a mock/proxy server")]
struct Cli {
    /// Server host (overrides config)
    #[arg(long, global = true)]
    host: Option<String>,

    /// Server port (overrides config)
    #[arg(short, long, global = true)]
    port: Option<u16>,

    /// Context path the server is mounted under (overrides config)
    #[arg(long = "context-path", global = true)]
    context_path: Option<String>,

    /// Connect over TLS without verifying the server certificate
    #[arg(long, global = true)]
    secure: bool,

    /// Config file path
    #[arg(long = "config", global = true)]
    config: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Answer every intercepted request with its own path
    Respond,

    /// Rewrite the Host header of intercepted requests for forwarding
    Forward {
        /// Destination in host[:port] format
        #[arg(long)]
        target: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing.
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("mockcb=debug,mockcb_cli=debug,mockcb_client=debug,mockcb_core=debug")
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter("mockcb=info,mockcb_cli=info,mockcb_client=info")
            .with_target(false)
            .init();
    }

    // Load config file.
    let config_path = cli.config.clone().unwrap_or_else(config::Config::default_path);
    let cfg = match config::Config::load(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("mockcb: {e:#}");
            std::process::exit(1);
        }
    };

    // CLI flags override config.
    let mut server = cfg.server;
    if let Some(host) = cli.host {
        server.host = host;
    }
    if let Some(port) = cli.port {
        server.port = port;
    }
    if let Some(context_path) = cli.context_path {
        server.context_path = context_path;
    }
    server.secure |= cli.secure;

    let result = match cli.command {
        Command::Respond => commands::respond::run(&server).await,
        Command::Forward { target } => commands::forward::run(&server, &target).await,
    };

    if let Err(e) = result {
        error!("{:#}", e);
        eprintln!("mockcb: {e:#}");
        std::process::exit(1);
    }
}
