//! CLI subcommand implementations.

pub mod forward;
pub mod respond;

use anyhow::{Context, Result};
use mockcb_client::CallbackClient;
use tracing::{info, warn};

use crate::config::ServerConfig;

/// Open the callback connection described by `server`.
pub async fn connect(server: &ServerConfig) -> Result<CallbackClient> {
    let endpoint = server.endpoint();
    CallbackClient::open(&endpoint, &server.context_path, server.secure)
        .await
        .with_context(|| format!("failed to connect to {endpoint}"))
}

/// Print the registration id, then serve callbacks until Ctrl-C.
///
/// Fails if the server closes the connection first.
pub async fn serve(client: CallbackClient) -> Result<()> {
    let id = client
        .identifier()
        .await
        .context("failed to register with the server")?;
    println!("registered as {id}");
    info!(client_id = %id, url = %client.url(), "serving callbacks");

    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for Ctrl-C")?;
        }
        _ = client.closed() => {
            warn!(url = %client.url(), "callback websocket closed by server");
            anyhow::bail!("connection closed by server");
        }
    }

    info!("shutting down");
    client.close().await.context("failed to close connection")?;
    Ok(())
}
