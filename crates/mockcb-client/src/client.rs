//! The callback client.
//!
//! `CallbackClient` owns the WebSocket to the mock server, the registration
//! cell and the callback registry. A reader task feeds every inbound text
//! frame through the router, one frame at a time, and sends the reply.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::{debug, error, info, warn};

use mockcb_core::{CallbackError, CbResult};

use crate::registration::Registration;
use crate::registry::{CallbackKind, CallbackRegistry, ForwardCallback, ResponseCallback};
use crate::router::{Outcome, Router};
use crate::transport::{self, Handshake, WsSink, WsSource};

/// State shared between the client handle and its reader task.
struct Shared {
    /// `None` once the connection has been closed.
    sink: Mutex<Option<WsSink>>,
    registry: Arc<CallbackRegistry>,
    registration: Arc<Registration>,
    router: Router,
    open: watch::Sender<bool>,
}

impl Shared {
    async fn handle_text_frame(&self, text: &str) -> CbResult<()> {
        match self.router.route(text)? {
            Outcome::Reply(reply) => {
                let mut sink = self.sink.lock().await;
                let sink = sink
                    .as_mut()
                    .ok_or_else(|| CallbackError::Protocol("connection is closed".into()))?;
                sink.send(Message::Text(reply.into()))
                    .await
                    .map_err(|e| CallbackError::Protocol(format!("failed to send reply: {e}")))
            }
            Outcome::Registered | Outcome::IdentityIgnored | Outcome::Dropped => Ok(()),
        }
    }

    async fn send_pong(&self, payload: Vec<u8>) {
        let mut sink = self.sink.lock().await;
        if let Some(sink) = sink.as_mut() {
            if let Err(e) = sink.send(Message::Pong(payload.into())).await {
                debug!("failed to answer ping: {}", e);
            }
        }
    }

    fn new(sink: Option<WsSink>) -> Self {
        let registry = Arc::new(CallbackRegistry::new());
        let registration = Arc::new(Registration::new());
        let (open, _) = watch::channel(sink.is_some());
        Self {
            sink: Mutex::new(sink),
            router: Router::new(registry.clone(), registration.clone()),
            registry,
            registration,
            open,
        }
    }

    fn mark_closed(&self) {
        self.open.send_replace(false);
        if self
            .registration
            .fail("connection closed before a client id was received")
        {
            warn!("connection closed before registration completed");
        }
    }
}

/// Client end of the mock server's callback channel.
pub struct CallbackClient {
    shared: Arc<Shared>,
    reader_handle: Mutex<Option<JoinHandle<()>>>,
    url: String,
    remote_endpoint: String,
    secure: bool,
}

impl CallbackClient {
    /// Connect to the callback endpoint of the server at `endpoint` (`host:port`).
    ///
    /// The returned client is already reading; the registration id arrives
    /// asynchronously and is available through [`identifier`](Self::identifier).
    ///
    /// If the server refuses callbacks at the handshake the client is returned
    /// already closed, and `identifier()` reports the server's reason.
    pub async fn open(endpoint: &str, context_path: &str, secure: bool) -> CbResult<Self> {
        if endpoint.trim().is_empty() {
            return Err(CallbackError::Connection("empty endpoint".into()));
        }

        let url = transport::callback_url(endpoint, context_path, secure);
        let (shared, reader_handle) = match transport::connect(&url, secure).await? {
            Handshake::Upgraded {
                stream,
                registration_id,
            } => {
                info!(url = %url, secure, "callback websocket connected");
                let (sink, source) = stream.split();
                let shared = Arc::new(Shared::new(Some(sink)));
                if let Some(id) = registration_id {
                    debug!("client registration id received in handshake");
                    shared.registration.resolve(id);
                }

                let reader_handle = {
                    let shared = shared.clone();
                    tokio::spawn(async move {
                        Self::read_loop(shared, source).await;
                    })
                };
                (shared, Some(reader_handle))
            }
            Handshake::Refused { reason } => {
                warn!(url = %url, "server refused callback websocket: {}", reason);
                let shared = Arc::new(Shared::new(None));
                shared.registration.fail(reason);
                (shared, None)
            }
        };

        Ok(Self {
            shared,
            reader_handle: Mutex::new(reader_handle),
            url,
            remote_endpoint: endpoint.to_string(),
            secure,
        })
    }

    /// Wait for the server-issued client identifier.
    ///
    /// Returns immediately once known. Fails with
    /// [`CallbackError::Registration`] if the connection ended first or the
    /// server refused callbacks.
    pub async fn identifier(&self) -> CbResult<String> {
        self.shared.registration.identifier().await
    }

    /// Bind the callback that answers intercepted requests.
    pub fn bind_response_callback(
        &self,
        callback: impl ResponseCallback + 'static,
    ) -> CbResult<()> {
        self.shared.registry.bind_response(Arc::new(callback))
    }

    /// Bind the callback that rewrites intercepted requests for forwarding.
    pub fn bind_forward_callback(&self, callback: impl ForwardCallback + 'static) -> CbResult<()> {
        self.shared.registry.bind_forward(Arc::new(callback))
    }

    pub fn callback_kind(&self) -> Option<CallbackKind> {
        self.shared.registry.kind()
    }

    /// Handle one inbound text frame and send its reply, if any.
    ///
    /// This is the per-frame entry point the reader task uses. Errors are
    /// scoped to the frame and leave the connection open.
    pub async fn handle_text_frame(&self, text: &str) -> CbResult<()> {
        self.shared.handle_text_frame(text).await
    }

    /// Close the connection. Calling this more than once is a no-op.
    pub async fn close(&self) -> CbResult<()> {
        let sink = self.shared.sink.lock().await.take();
        let was_open = *self.shared.open.borrow();
        self.shared.mark_closed();
        if let Some(handle) = self.reader_handle.lock().await.take() {
            handle.abort();
        }

        let Some(mut sink) = sink else {
            return Ok(());
        };
        if !was_open {
            debug!("peer already closed the callback websocket");
            return Ok(());
        }

        let result = match sink.send(Message::Close(None)).await {
            Ok(()) => sink.close().await,
            Err(e) => Err(e),
        };
        match result {
            Ok(()) | Err(WsError::ConnectionClosed) | Err(WsError::AlreadyClosed) => {
                info!(url = %self.url, "callback websocket closed");
                Ok(())
            }
            Err(e) => Err(CallbackError::Connection(format!(
                "error while closing callback websocket: {e}"
            ))),
        }
    }

    pub fn is_open(&self) -> bool {
        *self.shared.open.borrow()
    }

    /// Resolve once the connection is closed, by either side.
    pub async fn closed(&self) {
        let mut open = self.shared.open.subscribe();
        let _ = open.wait_for(|open| !*open).await;
    }

    pub fn is_secure(&self) -> bool {
        self.secure
    }

    pub fn remote_endpoint(&self) -> &str {
        &self.remote_endpoint
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Read inbound frames in arrival order until the connection ends.
    async fn read_loop(shared: Arc<Shared>, mut source: WsSource) {
        while let Some(msg) = source.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    if let Err(e) = shared.handle_text_frame(text.as_str()).await {
                        warn!("failed to handle inbound frame: {}", e);
                    }
                }
                Ok(Message::Ping(payload)) => {
                    shared.send_pong(payload.to_vec()).await;
                }
                Ok(Message::Close(frame)) => {
                    // The close reply is flushed by the next read, which then ends the stream.
                    debug!(?frame, "WebSocket close frame received");
                }
                Ok(_) => continue,
                Err(e) => {
                    error!("WebSocket read error: {}", e);
                    break;
                }
            }
        }

        shared.mark_closed();
        if let Some(mut sink) = shared.sink.lock().await.take() {
            let _ = sink.close().await;
        }
        debug!("callback reader loop ended");
    }
}

impl Drop for CallbackClient {
    fn drop(&mut self) {
        if let Some(handle) = self.reader_handle.get_mut().take() {
            handle.abort();
        }
    }
}
