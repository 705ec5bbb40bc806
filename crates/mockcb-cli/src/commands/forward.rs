//! `mockcb forward --target host[:port]` — send intercepted requests elsewhere.
//!
//! Rewrites the `Host` header of every intercepted request; the server then
//! forwards the rewritten request.

use anyhow::Result;
use mockcb_core::HttpRequest;
use tracing::debug;

use crate::config::{parse_target, ServerConfig};

/// Build the forward callback for `host`.
pub fn rewrite_host(host: String) -> impl Fn(HttpRequest) -> HttpRequest + Send + Sync {
    move |request: HttpRequest| {
        debug!(path = ?request.path, host = %host, "forwarding request");
        request.with_header("Host", host.as_str())
    }
}

pub async fn run(server: &ServerConfig, target: &str) -> Result<()> {
    let host = parse_target(target)?;
    let client = super::connect(server).await?;
    client.bind_forward_callback(rewrite_host(host))?;
    super::serve(client).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_host_header() {
        let callback = rewrite_host("backend:9000".into());
        let out = callback(
            HttpRequest::new()
                .with_path("/a")
                .with_header("host", "mock:1080"),
        );
        assert_eq!(out.headers.get("Host").unwrap(), ["backend:9000"]);
        assert_eq!(out.path.as_deref(), Some("/a"));
    }
}
