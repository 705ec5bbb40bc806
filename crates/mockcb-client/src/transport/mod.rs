//! Transport layer for the callback channel.
//!
//! Builds the callback URL from an endpoint and context path and opens the
//! WebSocket, over TLS when encryption is requested.

pub mod tls;
pub mod websocket;

pub use websocket::{connect, Handshake, WsSink, WsSource};

/// Path the server accepts callback WebSocket upgrades on.
pub const CALLBACK_WEBSOCKET_PATH: &str = "/_mockserver_callback_websocket";

/// Normalize a context path: leading `/`, no trailing `/`, empty when unset.
pub fn normalize_context_path(context_path: &str) -> String {
    let trimmed = context_path.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

/// Build the callback WebSocket URL for `endpoint` (`host:port`).
pub fn callback_url(endpoint: &str, context_path: &str, secure: bool) -> String {
    let scheme = if secure { "wss" } else { "ws" };
    format!(
        "{scheme}://{endpoint}{}{CALLBACK_WEBSOCKET_PATH}",
        normalize_context_path(context_path)
    )
}
