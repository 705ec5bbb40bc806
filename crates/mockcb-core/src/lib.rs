//! mockcb-core: Shared protocol library for the mockcb callback client.
//!
//! Provides the HTTP-like wire model exchanged with the mock server, the JSON
//! envelope codec that wraps every WebSocket text frame, and the error type
//! shared by the client and CLI crates.

pub mod codec;
pub mod error;
pub mod messages;

// Re-export commonly used items at crate root.
pub use codec::{decode, encode};
pub use error::{CallbackError, CbResult};
pub use messages::{
    ClientId, Headers, HttpRequest, HttpResponse, WireMessage, CLIENT_REGISTRATION_ID_HEADER,
    CONFIGURATION_CONFLICT_MARKER, CORRELATION_ID_HEADER,
};
