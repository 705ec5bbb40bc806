//! JSON envelope codec for callback text frames.
//!
//! Wire format: `{"type": "<type name>", "value": "<json document as a string>"}`

use serde::{Deserialize, Serialize};

use crate::error::CbResult;
use crate::messages::{ClientId, HttpRequest, HttpResponse, WireMessage};

/// Envelope type names understood by the server.
pub const TYPE_HTTP_REQUEST: &str = "org.mockserver.model.HttpRequest";
pub const TYPE_HTTP_RESPONSE: &str = "org.mockserver.model.HttpResponse";
pub const TYPE_CLIENT_ID: &str = "org.mockserver.serialization.model.WebSocketClientIdDTO";

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    type_name: String,
    #[serde(default)]
    value: String,
}

/// Serialize a message into the text of one WebSocket frame.
pub fn encode(message: &WireMessage) -> CbResult<String> {
    let (type_name, value) = match message {
        WireMessage::Request(request) => (TYPE_HTTP_REQUEST, serde_json::to_string(request)?),
        WireMessage::Response(response) => {
            (TYPE_HTTP_RESPONSE, serde_json::to_string(response)?)
        }
        WireMessage::ClientId(id) => (TYPE_CLIENT_ID, serde_json::to_string(id)?),
        WireMessage::Unsupported { type_name } => (type_name.as_str(), String::new()),
    };

    let envelope = Envelope {
        type_name: type_name.to_string(),
        value,
    };
    Ok(serde_json::to_string(&envelope)?)
}

/// Deserialize the text of one WebSocket frame.
///
/// Unknown envelope types decode to [`WireMessage::Unsupported`]; malformed
/// JSON is an error.
pub fn decode(text: &str) -> CbResult<WireMessage> {
    let envelope: Envelope = serde_json::from_str(text)?;

    let message = match envelope.type_name.as_str() {
        TYPE_HTTP_REQUEST => WireMessage::Request(serde_json::from_str::<HttpRequest>(&envelope.value)?),
        TYPE_HTTP_RESPONSE => {
            WireMessage::Response(serde_json::from_str::<HttpResponse>(&envelope.value)?)
        }
        TYPE_CLIENT_ID => WireMessage::ClientId(serde_json::from_str::<ClientId>(&envelope.value)?),
        _ => WireMessage::Unsupported {
            type_name: envelope.type_name,
        },
    };
    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CallbackError;
    use crate::messages::CORRELATION_ID_HEADER;

    #[test]
    fn request_keeps_headers_through_the_envelope() {
        let request = HttpRequest::new()
            .with_method("POST")
            .with_path("/orders")
            .with_header(CORRELATION_ID_HEADER, "Q1")
            .with_header("X-Trace", "t-9")
            .with_body("{}");

        let text = encode(&WireMessage::Request(request.clone())).unwrap();
        match decode(&text).unwrap() {
            WireMessage::Request(decoded) => {
                assert_eq!(decoded, request);
                assert_eq!(decoded.correlation_id(), Some("Q1"));
                assert_eq!(decoded.first_header("x-trace"), Some("t-9"));
            }
            other => panic!("expected request, got {other:?}"),
        }
    }

    #[test]
    fn value_is_a_nested_json_string() {
        let text = encode(&WireMessage::ClientId(ClientId {
            client_id: "abc123".into(),
        }))
        .unwrap();
        let raw: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(raw["type"], TYPE_CLIENT_ID);
        assert_eq!(raw["value"], r#"{"clientId":"abc123"}"#);
    }

    #[test]
    fn decodes_server_identity_frame() {
        let text = r#"{"type":"org.mockserver.serialization.model.WebSocketClientIdDTO","value":"{\"clientId\":\"abc123\"}"}"#;
        assert_eq!(
            decode(text).unwrap(),
            WireMessage::ClientId(ClientId {
                client_id: "abc123".into()
            })
        );
    }

    #[test]
    fn unknown_type_is_unsupported() {
        let text = r#"{"type":"org.mockserver.model.Expectation","value":"{}"}"#;
        assert_eq!(
            decode(text).unwrap(),
            WireMessage::Unsupported {
                type_name: "org.mockserver.model.Expectation".into()
            }
        );
    }

    #[test]
    fn malformed_frame_is_codec_error() {
        assert!(matches!(decode("not json"), Err(CallbackError::Codec(_))));
        let bad_value = r#"{"type":"org.mockserver.model.HttpRequest","value":"{broken"}"#;
        assert!(matches!(decode(bad_value), Err(CallbackError::Codec(_))));
    }
}
