//! mockcb-client: callback WebSocket client for a mock/proxy server.
//!
//! Connects to the server's callback endpoint, waits for the server-issued
//! client id, and answers intercepted requests with a bound response or
//! forward callback. Each reply carries the correlation id of the request
//! that triggered it.
//!
//! # Quick Start
//!
//! ```no_run
//! use mockcb_client::CallbackClient;
//! use mockcb_core::{HttpRequest, HttpResponse};
//!
//! # async fn example() -> mockcb_core::CbResult<()> {
//! let client = CallbackClient::open("localhost:1080", "", false).await?;
//! println!("registered as {}", client.identifier().await?);
//!
//! client.bind_response_callback(|request: HttpRequest| {
//!     HttpResponse::ok().with_body(request.path.unwrap_or_default())
//! })?;
//!
//! // ... later
//! client.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod registration;
pub mod registry;
pub mod router;
pub mod transport;

// Re-export primary public types.
pub use client::CallbackClient;
pub use registration::Registration;
pub use registry::{
    BoxError, CallbackBinding, CallbackKind, CallbackRegistry, ForwardCallback, ResponseCallback,
};
pub use router::{Outcome, Router};

// Re-export mockcb-core error types for convenience.
pub use mockcb_core::{CallbackError, CbResult};
