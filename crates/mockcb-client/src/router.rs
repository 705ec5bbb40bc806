//! Correlation router: classifies inbound frames and dispatches requests.
//!
//! The router is transport-agnostic. It turns the text of one inbound frame
//! into an [`Outcome`]; the connection decides how to send replies.

use std::sync::Arc;

use tracing::{debug, warn};

use mockcb_core::codec::{decode, encode};
use mockcb_core::{CallbackError, CbResult, Headers, HttpRequest, WireMessage, CORRELATION_ID_HEADER};

use crate::registration::Registration;
use crate::registry::{CallbackBinding, CallbackRegistry};

/// What handling one inbound frame produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Text of the single outbound frame to send.
    Reply(String),
    /// The identity message settled the registration cell.
    Registered,
    /// A repeated identity message; the cell was already settled.
    IdentityIgnored,
    /// A request arrived with no callback bound.
    Dropped,
}

/// Routes inbound frames to the bound callback or the registration cell.
#[derive(Debug, Clone)]
pub struct Router {
    registry: Arc<CallbackRegistry>,
    registration: Arc<Registration>,
}

impl Router {
    pub fn new(registry: Arc<CallbackRegistry>, registration: Arc<Registration>) -> Self {
        Self {
            registry,
            registration,
        }
    }

    /// Handle the text of one inbound frame.
    ///
    /// Every failure is a [`CallbackError::Protocol`] scoped to this frame;
    /// neither the binding nor the registration cell is modified by it.
    pub fn route(&self, text: &str) -> CbResult<Outcome> {
        let message = decode(text).map_err(|e| {
            CallbackError::Protocol(format!("failed to decode inbound message: {e}"))
        })?;

        match message {
            WireMessage::Request(request) => self.dispatch(request),
            WireMessage::ClientId(id) => {
                if self.registration.resolve(id.client_id) {
                    debug!("client registration id received");
                    Ok(Outcome::Registered)
                } else {
                    debug!("registration already settled, ignoring identity message");
                    Ok(Outcome::IdentityIgnored)
                }
            }
            other => Err(CallbackError::Protocol(format!(
                "unsupported message: {}",
                other.kind()
            ))),
        }
    }

    fn dispatch(&self, request: HttpRequest) -> CbResult<Outcome> {
        let correlation_id = request.correlation_id().map(str::to_string);
        if correlation_id.is_none() {
            warn!("inbound request has no {CORRELATION_ID_HEADER} header");
        }

        let reply = match self.registry.current() {
            CallbackBinding::Unbound => {
                debug!(path = ?request.path, "no callback bound, dropping request");
                return Ok(Outcome::Dropped);
            }
            CallbackBinding::Response(callback) => {
                let mut response = callback.handle(request).map_err(|e| {
                    CallbackError::Protocol(format!("response callback failed: {e}"))
                })?;
                stamp(&mut response.headers, correlation_id.as_deref());
                WireMessage::Response(response)
            }
            CallbackBinding::Forward(callback) => {
                let mut forwarded = callback.handle(request).map_err(|e| {
                    CallbackError::Protocol(format!("forward callback failed: {e}"))
                })?;
                stamp(&mut forwarded.headers, correlation_id.as_deref());
                WireMessage::Request(forwarded)
            }
        };

        let text = encode(&reply).map_err(|e| {
            CallbackError::Protocol(format!("failed to encode {}: {e}", reply.kind()))
        })?;
        debug!(correlation_id = ?correlation_id, kind = reply.kind(), "dispatched request");
        Ok(Outcome::Reply(text))
    }
}

/// Copy the inbound correlation id onto an outbound message.
///
/// Without an inbound id, any id the callback set is removed so the server
/// never matches the reply against an unrelated exchange.
fn stamp(headers: &mut Headers, correlation_id: Option<&str>) {
    match correlation_id {
        Some(id) => headers.set(CORRELATION_ID_HEADER, id),
        None => headers.remove(CORRELATION_ID_HEADER),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{BoxError, ResponseCallback};
    use mockcb_core::{ClientId, HttpResponse};

    fn router() -> (Router, Arc<CallbackRegistry>, Arc<Registration>) {
        let registry = Arc::new(CallbackRegistry::new());
        let registration = Arc::new(Registration::new());
        (
            Router::new(registry.clone(), registration.clone()),
            registry,
            registration,
        )
    }

    fn request_frame(path: &str, correlation_id: Option<&str>) -> String {
        let mut request = HttpRequest::new().with_method("GET").with_path(path);
        if let Some(id) = correlation_id {
            request = request.with_header(CORRELATION_ID_HEADER, id);
        }
        encode(&WireMessage::Request(request)).unwrap()
    }

    fn reply(outcome: Outcome) -> WireMessage {
        match outcome {
            Outcome::Reply(text) => decode(&text).unwrap(),
            other => panic!("expected reply, got {other:?}"),
        }
    }

    struct Failing;

    impl ResponseCallback for Failing {
        fn handle(&self, _request: HttpRequest) -> Result<HttpResponse, BoxError> {
            Err("backend unavailable".into())
        }
    }

    #[test]
    fn response_callback_reply_carries_correlation_id() {
        let (router, registry, _) = router();
        registry
            .bind_response(Arc::new(|req: HttpRequest| {
                HttpResponse::ok().with_body(req.path.unwrap_or_default())
            }))
            .unwrap();

        match reply(router.route(&request_frame("/x", Some("Q1"))).unwrap()) {
            WireMessage::Response(response) => {
                assert_eq!(response.body_text(), Some("/x"));
                assert_eq!(response.correlation_id(), Some("Q1"));
                assert_eq!(response.status_code, Some(200));
            }
            other => panic!("expected response, got {other:?}"),
        }
    }

    #[test]
    fn callback_cannot_override_correlation_id() {
        let (router, registry, _) = router();
        registry
            .bind_response(Arc::new(|_req: HttpRequest| {
                HttpResponse::ok().with_header("websocketcorrelationid", "forged")
            }))
            .unwrap();

        match reply(router.route(&request_frame("/x", Some("Q7"))).unwrap()) {
            WireMessage::Response(response) => {
                assert_eq!(response.headers.get(CORRELATION_ID_HEADER).unwrap(), ["Q7"]);
                assert_eq!(response.headers.len(), 1);
            }
            other => panic!("expected response, got {other:?}"),
        }
    }

    #[test]
    fn forward_callback_reply_is_rewritten_request() {
        let (router, registry, _) = router();
        registry
            .bind_forward(Arc::new(|req: HttpRequest| {
                req.with_header("Host", "upstream:8080").with_path("/v2/x")
            }))
            .unwrap();

        match reply(router.route(&request_frame("/x", Some("F1"))).unwrap()) {
            WireMessage::Request(forwarded) => {
                assert_eq!(forwarded.path.as_deref(), Some("/v2/x"));
                assert_eq!(forwarded.first_header("host"), Some("upstream:8080"));
                assert_eq!(forwarded.correlation_id(), Some("F1"));
            }
            other => panic!("expected request, got {other:?}"),
        }
    }

    #[test]
    fn request_without_binding_is_dropped() {
        let (router, _, registration) = router();
        assert_eq!(
            router.route(&request_frame("/x", Some("Q1"))).unwrap(),
            Outcome::Dropped
        );
        assert!(!registration.is_settled());
    }

    #[test]
    fn missing_correlation_id_strips_header() {
        let (router, registry, _) = router();
        registry
            .bind_response(Arc::new(|_req: HttpRequest| {
                HttpResponse::ok().with_header(CORRELATION_ID_HEADER, "stale")
            }))
            .unwrap();

        match reply(router.route(&request_frame("/x", None)).unwrap()) {
            WireMessage::Response(response) => assert_eq!(response.correlation_id(), None),
            other => panic!("expected response, got {other:?}"),
        }
    }

    #[test]
    fn identity_message_settles_registration_once() {
        let (router, _, registration) = router();
        let frame = |id: &str| {
            encode(&WireMessage::ClientId(ClientId {
                client_id: id.into(),
            }))
            .unwrap()
        };

        assert_eq!(router.route(&frame("abc123")).unwrap(), Outcome::Registered);
        assert_eq!(
            router.route(&frame("other")).unwrap(),
            Outcome::IdentityIgnored
        );
        assert_eq!(registration.try_identifier().unwrap().unwrap(), "abc123");
    }

    #[test]
    fn unsupported_message_leaves_state_unchanged() {
        let (router, registry, registration) = router();
        registry
            .bind_response(Arc::new(|_req: HttpRequest| HttpResponse::ok()))
            .unwrap();

        let response_frame = encode(&WireMessage::Response(HttpResponse::ok())).unwrap();
        let unknown_frame = r#"{"type":"org.mockserver.model.Expectation","value":"{}"}"#;

        for frame in [response_frame.as_str(), unknown_frame] {
            match router.route(frame) {
                Err(CallbackError::Protocol(msg)) => assert!(msg.starts_with("unsupported message")),
                other => panic!("expected protocol error, got {other:?}"),
            }
        }
        assert_eq!(registry.kind(), Some(crate::registry::CallbackKind::Response));
        assert!(!registration.is_settled());
    }

    #[test]
    fn callback_failure_is_protocol_error() {
        let (router, registry, registration) = router();
        registry.bind_response(Arc::new(Failing)).unwrap();

        match router.route(&request_frame("/x", Some("Q1"))) {
            Err(CallbackError::Protocol(msg)) => {
                assert!(msg.contains("backend unavailable"), "{msg}")
            }
            other => panic!("expected protocol error, got {other:?}"),
        }
        assert_eq!(registry.kind(), Some(crate::registry::CallbackKind::Response));
        assert!(!registration.is_settled());
    }

    #[test]
    fn malformed_frame_is_protocol_error() {
        let (router, _, registration) = router();
        assert!(matches!(
            router.route("{not json"),
            Err(CallbackError::Protocol(_))
        ));
        assert!(!registration.is_settled());
    }
}
