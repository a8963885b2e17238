//! CLI integration tests for the `onomast` binary.
//!
//! These tests run the compiled binary via `std::process::Command`. Runs
//! that reach the network point `--base-url` at a local [`wiremock`]
//! server; the binary is driven from a blocking task so the mock keeps
//! serving on the test runtime.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Build a `Command` pointing at the compiled `onomast` binary.
fn onomast_bin() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_onomast"));
    // Suppress tracing output so assertions only match program output.
    cmd.env("RUST_LOG", "off");
    cmd.env_remove("GEMINI_API_KEY");
    cmd.env_remove("OPENAI_API_KEY");
    cmd
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn completion(content: &str) -> serde_json::Value {
    serde_json::json!({
        "id": "chatcmpl-cli",
        "object": "chat.completion",
        "model": "gemini-2.5-flash",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    })
}

fn read_rows(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::Reader::from_path(path).expect("output csv");
    let headers = reader.headers().unwrap().iter().map(String::from).collect();
    let rows = reader
        .records()
        .map(|r| r.unwrap().iter().map(String::from).collect())
        .collect();
    (headers, rows)
}

// ── 1. Version and help ─────────────────────────────────────────────────

#[test]
fn version_output() {
    let output = onomast_bin().arg("--version").output().expect("failed to run onomast");
    assert!(output.status.success());
    assert!(stdout(&output).contains("onomast"));
}

#[test]
fn help_lists_subcommands() {
    let output = onomast_bin().arg("--help").output().expect("failed to run onomast");
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("enrich"), "got: {text}");
    assert!(text.contains("tiers"), "got: {text}");
}

#[test]
fn unknown_subcommand_fails() {
    let output = onomast_bin().arg("translate").output().expect("failed to run onomast");
    assert!(!output.status.success());
}

// ── 2. Tiers ────────────────────────────────────────────────────────────

#[test]
fn tiers_shows_presets() {
    let output = onomast_bin().arg("tiers").output().expect("failed to run onomast");
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("gemini-2.5-flash"));
    assert!(text.contains("1000"));
    assert!(text.contains("openai"));
}

#[test]
fn tiers_unknown_provider_fails() {
    let output = onomast_bin()
        .args(["tiers", "--provider", "mistral"])
        .output()
        .expect("failed to run onomast");
    assert!(!output.status.success());
    assert!(stderr(&output).contains("mistral"));
}

// ── 3. Enrich: configuration errors ─────────────────────────────────────

#[test]
fn missing_api_key_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("names.csv");
    fs::write(&input, "Nombre\nAna\n").unwrap();

    let output = onomast_bin()
        .arg("enrich")
        .arg("--input")
        .arg(&input)
        .output()
        .expect("failed to run onomast");
    assert!(!output.status.success());
    assert!(stderr(&output).contains("GEMINI_API_KEY"), "got: {}", stderr(&output));
    assert!(!dir.path().join("names_enriched.csv").exists());
}

#[test]
fn zero_rpm_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("names.csv");
    fs::write(&input, "Nombre\nAna\n").unwrap();

    let output = onomast_bin()
        .env("GEMINI_API_KEY", "test-key")
        .arg("enrich")
        .arg("--input")
        .arg(&input)
        .args(["--rpm", "0"])
        .output()
        .expect("failed to run onomast");
    assert!(!output.status.success());
    assert!(stderr(&output).contains("greater than zero"));
}

#[test]
fn missing_name_column_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("names.csv");
    fs::write(&input, "Name\nAna\n").unwrap();

    let output = onomast_bin()
        .env("GEMINI_API_KEY", "test-key")
        .arg("enrich")
        .arg("--input")
        .arg(&input)
        .output()
        .expect("failed to run onomast");
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Nombre"));
}

// ── 4. Enrich: runs ─────────────────────────────────────────────────────

#[test]
fn empty_input_writes_header_only() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("empty.csv");
    fs::write(&input, "Nombre,Frecuencia\n").unwrap();

    let output = onomast_bin()
        .env("GEMINI_API_KEY", "test-key")
        .arg("enrich")
        .arg("--input")
        .arg(&input)
        .output()
        .expect("failed to run onomast");
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let (headers, rows) = read_rows(&dir.path().join("empty_enriched.csv"));
    assert_eq!(headers.len(), 7);
    assert_eq!(headers[2], "Family_Origin");
    assert!(rows.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn enrich_writes_ordered_rows() {
    let server = MockServer::start().await;
    for (marker, content) in [
        ("Clasifica el nombre", r#"{"origin": "Vasco"}"#),
        ("Escribe una descripci", "Nombre **antiguo** del norte."),
        (
            "Valora lo dif",
            r#"{"spanish": "fácil", "foreign": "difícil", "explanation": "La tx."}"#,
        ),
    ] {
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_string_contains(marker))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(content)))
            .mount(&server)
            .await;
    }

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("names.csv");
    let out = dir.path().join("out.csv");
    fs::write(&input, "Nombre,Frecuencia\nAitor,10\nIker,20\nAne,30\nUnai,40\n").unwrap();

    let mut cmd = onomast_bin();
    cmd.env("GEMINI_API_KEY", "test-key")
        .arg("enrich")
        .arg("--input")
        .arg(&input)
        .arg("--output")
        .arg(&out)
        .args(["--num", "3", "--rpm", "6000", "--max-concurrent", "2", "--retries", "0"])
        .arg("--base-url")
        .arg(server.uri());
    let output = tokio::task::spawn_blocking(move || cmd.output())
        .await
        .unwrap()
        .expect("failed to run onomast");
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("Effective RPM"));

    let (headers, rows) = read_rows(&out);
    assert_eq!(headers[..2], ["Nombre", "Frecuencia"]);
    assert_eq!(rows.len(), 3);
    let names: Vec<&str> = rows.iter().map(|r| r[0].as_str()).collect();
    assert_eq!(names, ["Aitor", "Iker", "Ane"]);
    for row in &rows {
        assert_eq!(row[2], "Vasco");
        assert_eq!(row[3], "Nombre antiguo del norte.");
        assert_eq!(row[4], "fácil");
        assert_eq!(row[5], "difícil");
        assert_eq!(row[6], "La tx.");
    }
    assert_eq!(server.received_requests().await.unwrap().len(), 9);
}
