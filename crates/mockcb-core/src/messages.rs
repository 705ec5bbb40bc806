//! Wire model for the callback channel.
//!
//! These types mirror the JSON documents the mock server puts inside the
//! `value` of each envelope. Fields this client does not interpret are kept in
//! `extra` so a forwarded request round-trips without loss.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Header carrying the correlation identifier on every request/response pair.
pub const CORRELATION_ID_HEADER: &str = "WebSocketCorrelationId";

/// Handshake response header carrying the server-assigned client identifier.
pub const CLIENT_REGISTRATION_ID_HEADER: &str = "X-CLIENT-REGISTRATION-ID";

/// Text the server uses when callbacks are unavailable in its deployment.
pub const CONFIGURATION_CONFLICT_MARKER: &str =
    "ExpectationResponseCallback and ExpectationForwardCallback is not supported";

/// Multi-valued, case-insensitive header map.
///
/// Serialized as a JSON object of `name -> [values]`. The list form
/// `[{"name": .., "values": [..]}]` is also accepted on input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Headers(BTreeMap<String, Vec<String>>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// All values for `name`, matched case-insensitively.
    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.0
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_slice())
    }

    /// First value for `name`, matched case-insensitively.
    pub fn first(&self, name: &str) -> Option<&str> {
        self.get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Replace every header named `name` (any case) with a single value.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.remove(name);
        self.0.insert(name.to_string(), vec![value.into()]);
    }

    /// Append a value, keeping the existing spelling of the name if present.
    pub fn append(&mut self, name: &str, value: impl Into<String>) {
        let key = self
            .0
            .keys()
            .find(|k| k.eq_ignore_ascii_case(name))
            .cloned()
            .unwrap_or_else(|| name.to_string());
        self.0.entry(key).or_default().push(value.into());
    }

    pub fn remove(&mut self, name: &str) {
        self.0.retain(|k, _| !k.eq_ignore_ascii_case(name));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

#[derive(Deserialize)]
struct HeaderEntry {
    name: String,
    #[serde(default)]
    values: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum HeadersRepr {
    Map(BTreeMap<String, Vec<String>>),
    List(Vec<HeaderEntry>),
}

impl<'de> Deserialize<'de> for Headers {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match HeadersRepr::deserialize(deserializer)? {
            HeadersRepr::Map(map) => Headers(map),
            HeadersRepr::List(entries) => {
                let mut headers = Headers::new();
                for entry in entries {
                    for value in entry.values {
                        headers.append(&entry.name, value);
                    }
                }
                headers
            }
        })
    }
}

/// Read a body as text: either a bare JSON string or `{"string": ..}`.
fn body_as_text(body: &Option<Value>) -> Option<&str> {
    match body.as_ref()? {
        Value::String(s) => Some(s),
        Value::Object(obj) => obj.get("string").and_then(Value::as_str),
        _ => None,
    }
}

/// An intercepted request, as delivered to callbacks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Headers::is_empty")]
    pub query_string_parameters: Headers,
    #[serde(default, skip_serializing_if = "Headers::is_empty")]
    pub headers: Headers,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub cookies: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep_alive: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secure: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl HttpRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Set a header, replacing any existing header of the same name.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.set(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(Value::String(body.into()));
        self
    }

    pub fn first_header(&self, name: &str) -> Option<&str> {
        self.headers.first(name)
    }

    pub fn body_text(&self) -> Option<&str> {
        body_as_text(&self.body)
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.first_header(CORRELATION_ID_HEADER)
    }
}

/// A response produced by a response callback.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason_phrase: Option<String>,
    #[serde(default, skip_serializing_if = "Headers::is_empty")]
    pub headers: Headers,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub cookies: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl HttpResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ok() -> Self {
        Self::new().with_status(200)
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status_code = Some(status);
        self
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.set(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(Value::String(body.into()));
        self
    }

    pub fn first_header(&self, name: &str) -> Option<&str> {
        self.headers.first(name)
    }

    pub fn body_text(&self) -> Option<&str> {
        body_as_text(&self.body)
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.first_header(CORRELATION_ID_HEADER)
    }
}

/// One-time identity payload delivered after the handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientId {
    pub client_id: String,
}

/// A decoded text frame.
#[derive(Debug, Clone, PartialEq)]
pub enum WireMessage {
    Request(HttpRequest),
    Response(HttpResponse),
    ClientId(ClientId),
    /// An envelope whose type this client does not handle.
    Unsupported { type_name: String },
}

impl WireMessage {
    /// Short name for logs.
    pub fn kind(&self) -> &str {
        match self {
            Self::Request(_) => "request",
            Self::Response(_) => "response",
            Self::ClientId(_) => "client-id",
            Self::Unsupported { type_name } => type_name,
        }
    }
}
