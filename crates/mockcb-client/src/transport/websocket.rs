//! WebSocket handshake for the callback channel.
//!
//! Text frames only; message and frame size limits are disabled. The
//! handshake response may carry the client registration id, and a
//! `501 Not Implemented` refusal carries the server's reason as its body.

use futures_util::stream::{SplitSink, SplitStream};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async_tls_with_config, MaybeTlsStream, WebSocketStream};

use mockcb_core::{
    CallbackError, CbResult, CLIENT_REGISTRATION_ID_HEADER, CONFIGURATION_CONFLICT_MARKER,
};

use super::tls;

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
pub type WsSink = SplitSink<WsStream, Message>;
pub type WsSource = SplitStream<WsStream>;

/// What the server answered to the upgrade request.
pub enum Handshake {
    /// The connection was upgraded.
    Upgraded {
        stream: WsStream,
        /// Value of the registration id response header, if the server sent one.
        registration_id: Option<String>,
    },
    /// The server cannot host callbacks and explained why.
    Refused { reason: String },
}

/// Open the WebSocket at `url`, negotiating trust-all TLS when `secure`.
pub async fn connect(url: &str, secure: bool) -> CbResult<Handshake> {
    let connector = if secure {
        Some(tls::insecure_connector()?)
    } else {
        None
    };

    let mut config = WebSocketConfig::default();
    config.max_message_size = None;
    config.max_frame_size = None;

    match connect_async_tls_with_config(url, Some(config), false, connector).await {
        Ok((stream, response)) => {
            let registration_id = response
                .headers()
                .get(CLIENT_REGISTRATION_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .filter(|v| !v.is_empty())
                .map(str::to_string);
            Ok(Handshake::Upgraded {
                stream,
                registration_id,
            })
        }
        Err(WsError::Http(response)) => {
            let body = response
                .body()
                .as_deref()
                .map(|b| String::from_utf8_lossy(b).into_owned())
                .unwrap_or_default();
            handshake_rejection(response.status().as_u16(), &body)
        }
        Err(e) => Err(CallbackError::Connection(format!(
            "WebSocket connect error: {e}"
        ))),
    }
}

/// Classify a non-101 handshake response.
///
/// The server answers `501` with a configuration-conflict explanation when it
/// cannot host callbacks; that is a refusal to register, not a transport
/// failure. Anything else fails the connection.
pub(crate) fn handshake_rejection(status: u16, body: &str) -> CbResult<Handshake> {
    let body = body.trim();
    if status == 501 && body.contains(CONFIGURATION_CONFLICT_MARKER) {
        Ok(Handshake::Refused {
            reason: body.to_string(),
        })
    } else if body.is_empty() {
        Err(CallbackError::Connection(format!(
            "handshake rejected with status {status}"
        )))
    } else {
        Err(CallbackError::Connection(format!(
            "handshake rejected with status {status}: {body}"
        )))
    }
}
