//! Runs the built binary and checks its exit status and console output.

use std::fs;
use std::path::Path;
use std::process::Output;

use tempfile::tempdir;
use tokio::process::Command;

async fn run_binary(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_botdb-init"))
        .args(args)
        .current_dir(dir)
        .env_remove("MONGODB_URI")
        .env_remove("MONGODB_DATABASE")
        .env_remove("RUST_LOG")
        .output()
        .await
        .unwrap()
}

#[tokio::test]
async fn missing_uri_exits_non_zero() {
    // Empty working directory: no .env to pick a URI up from.
    let td = tempdir().unwrap();
    let out = run_binary(td.path(), &[]).await;

    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("MongoDB initialization error"), "{stderr}");
    assert!(stderr.contains("MONGODB_URI"), "{stderr}");
    // Logs go to stderr only.
    assert!(out.stdout.is_empty());
}

#[tokio::test]
async fn unreachable_host_exits_non_zero() {
    let td = tempdir().unwrap();
    fs::write(
        td.path().join("config.yaml"),
        "mongodb:\n  uri: \"mongodb://192.0.2.1:27017/?directConnection=true\"\n  connect_timeout_ms: 500\n  server_selection_timeout_ms: 500\n",
    )
    .unwrap();
    let out = run_binary(td.path(), &["--config", "config.yaml"]).await;

    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("connection failed"), "{stderr}");
}

#[tokio::test]
async fn rust_log_is_read_from_dotenv() {
    let td = tempdir().unwrap();
    fs::write(td.path().join(".env"), "RUST_LOG=error\n").unwrap();
    let out = run_binary(td.path(), &[]).await;

    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("MongoDB initialization error"), "{stderr}");
    // The info-level progress line is filtered out by the .env level.
    assert!(!stderr.contains("initializing MongoDB"), "{stderr}");
}
