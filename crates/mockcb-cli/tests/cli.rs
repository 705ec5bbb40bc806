use assert_cmd::Command;
use std::io::Write;

#[test]
fn help_lists_subcommands() {
    let output = Command::cargo_bin("mockcb")
        .unwrap()
        .arg("--help")
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("respond"));
    assert!(stdout.contains("forward"));
}

#[test]
fn forward_requires_target() {
    Command::cargo_bin("mockcb")
        .unwrap()
        .arg("forward")
        .assert()
        .failure();
}

#[test]
fn unreachable_server_fails() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let dir = tempfile::tempdir().unwrap();
    let output = Command::cargo_bin("mockcb")
        .unwrap()
        .args(["--config", dir.path().join("none.toml").to_str().unwrap()])
        .args(["--host", "127.0.0.1", "--port", &port.to_string(), "respond"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("failed to connect"));
}

#[test]
fn malformed_config_is_reported() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[server\nport =").unwrap();

    let output = Command::cargo_bin("mockcb")
        .unwrap()
        .args(["--config", file.path().to_str().unwrap(), "respond"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("failed to parse config"));
}

#[test]
fn server_hangup_ends_serve_with_error() {
    use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
    use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};

    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = std::thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut ws = tokio_tungstenite::tungstenite::accept_hdr(
            stream,
            |_req: &Request, mut resp: Response| -> Result<Response, ErrorResponse> {
                resp.headers_mut().insert(
                    HeaderName::from_static("x-client-registration-id"),
                    HeaderValue::from_static("cli-1"),
                );
                Ok(resp)
            },
        )
        .unwrap();
        ws.close(None).unwrap();
        while ws.read().is_ok() {}
    });

    let dir = tempfile::tempdir().unwrap();
    let output = Command::cargo_bin("mockcb")
        .unwrap()
        .args(["--config", dir.path().join("none.toml").to_str().unwrap()])
        .args(["--host", "127.0.0.1", "--port", &port.to_string(), "respond"])
        .timeout(std::time::Duration::from_secs(10))
        .output()
        .unwrap();
    server.join().unwrap();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("registered as cli-1"));
    assert!(String::from_utf8_lossy(&output.stderr).contains("connection closed by server"));
}
