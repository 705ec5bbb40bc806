//! `mockcb respond` — answer every intercepted request with its own path.

use anyhow::Result;
use mockcb_core::{HttpRequest, HttpResponse};
use tracing::debug;

use crate::config::ServerConfig;

/// Response for an intercepted request: `200` with the request path as body.
pub fn echo_path(request: HttpRequest) -> HttpResponse {
    let path = request.path.unwrap_or_default();
    debug!(path = %path, "answering request");
    HttpResponse::ok().with_body(path)
}

pub async fn run(server: &ServerConfig) -> Result<()> {
    let client = super::connect(server).await?;
    client.bind_response_callback(echo_path)?;
    super::serve(client).await
}
