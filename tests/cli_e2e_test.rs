//! End-to-end CLI integration tests for playback.
//!
//! Uses `assert_cmd` to invoke the compiled binary. Network-facing
//! subcommands are pointed at a closed local port so they exercise the
//! failure path without a running playground.

use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::path::PathBuf;
use std::thread::JoinHandle;

use assert_cmd::Command;
use predicates::prelude::*;

/// Root of the fixtures directory.
fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn playback_cmd() -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("playback").expect("playback binary should be built");
    cmd.env_remove("PLAYGROUND_ENDPOINT")
        .env_remove("PLAYGROUND_TIMEOUT_SECS")
        .env_remove("RUST_LOG")
        // Suppress colored output in tests.
        .env("NO_COLOR", "1");
    cmd
}

/// An endpoint nothing listens on.
const DEAD_ENDPOINT: &str = "http://127.0.0.1:9";

/// Serve one HTTP request with a fixed JSON body; returns the endpoint URL.
fn serve_once(body: &'static str) -> (String, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind local port");
    let endpoint = format!("http://{}", listener.local_addr().expect("local addr"));
    let handle = std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept connection");
        let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));
        let mut line = String::new();
        while reader.read_line(&mut line).expect("read request") > 0 && line != "\r\n" {
            line.clear();
        }
        write!(
            stream,
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
        .expect("write response");
    });
    (endpoint, handle)
}

#[test]
fn normalize_fixture_as_json() {
    let output = playback_cmd()
        .args(["--json", "normalize"])
        .arg(fixtures_dir().join("memory_chats.json"))
        .output()
        .expect("run playback");
    assert!(output.status.success());

    let messages: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    let messages = messages.as_array().expect("array of messages");
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[1]["role"], "agent");
    assert_eq!(messages[1]["tool_calls"][0]["tool_name"], "get_stock_price");
}

#[test]
fn normalize_fixture_as_text() {
    playback_cmd()
        .arg("normalize")
        .arg(fixtures_dir().join("runs_root.json"))
        .assert()
        .success()
        .stdout(predicate::str::contains("shape: runs (2 runs)"))
        .stdout(predicate::str::contains("And this picture?"))
        .stdout(predicate::str::contains("get_weather"));
}

#[test]
fn normalize_reads_stdin() {
    playback_cmd()
        .args(["--json", "normalize", "-"])
        .write_stdin(r#"{"runs": [{"message": {"content": "piped"}}]}"#)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"piped\""));
}

#[test]
fn normalize_empty_session_fails_with_notice() {
    playback_cmd()
        .arg("normalize")
        .arg(fixtures_dir().join("empty_session.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("No messages found in this session"));
}

#[test]
fn normalize_missing_file_fails() {
    playback_cmd()
        .args(["normalize", "/definitely/not/here.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("reading session record"));
}

#[test]
fn normalize_damaged_record_fails() {
    let mut record = tempfile::NamedTempFile::new().expect("create temp file");
    record
        .write_all(br#"{"runs": [{"message": {"content": "cut off"#)
        .expect("write damaged record");

    playback_cmd()
        .arg("normalize")
        .arg(record.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("parsing session record"));
}

#[test]
fn normalize_record_with_broken_run_fails() {
    let mut record = tempfile::NamedTempFile::new().expect("create temp file");
    record
        .write_all(br#"{"runs": [null, {"message": {"content": "x"}}]}"#)
        .expect("write record");

    playback_cmd()
        .arg("normalize")
        .arg(record.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("parsing session record"));
}

#[test]
fn sessions_empty_list_prints_info_notice() {
    let (endpoint, server) = serve_once("[]");
    playback_cmd()
        .args(["--endpoint", &endpoint, "--timeout-secs", "5"])
        .args(["--json", "sessions", "agent-7"])
        .env_remove("HTTP_PROXY")
        .env_remove("http_proxy")
        .env_remove("ALL_PROXY")
        .env_remove("all_proxy")
        .assert()
        .success()
        .stdout(predicate::str::contains("[]"))
        .stderr(predicate::str::contains("info: No sessions found for agent agent-7"));
    server.join().expect("server thread");
}

#[test]
fn session_against_dead_endpoint_reports_load_error() {
    playback_cmd()
        .args(["--endpoint", DEAD_ENDPOINT, "--timeout-secs", "2"])
        .args(["session", "agent", "s1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error loading session messages"));
}

#[test]
fn sessions_against_dead_endpoint_reports_load_error() {
    playback_cmd()
        .args(["--endpoint", DEAD_ENDPOINT, "--timeout-secs", "2"])
        .args(["sessions", "agent"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error loading sessions"));
}

#[test]
fn completions_generate_for_bash() {
    playback_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("playback"));
}
