use std::io::Write;
use std::net::TcpListener;
use std::path::Path;
use std::process::Output;
use std::time::Duration;

use reqwest::Client;
use tempfile::{NamedTempFile, TempDir};
use tokio::process::Command;
use tokio::time::{sleep, timeout};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Find an available port
fn get_available_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

fn write_config(content: &str) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(content.as_bytes()).unwrap();
    temp_file.flush().unwrap();
    temp_file
}

fn bot_command(args: &[&str], config_path: &Path) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_video-conv-bot"));
    command
        .args(args)
        .arg("--config")
        .arg(config_path)
        .env("RUST_LOG", "error") // Quiet logs during tests
        .kill_on_drop(true);
    command
}

async fn run_to_exit(args: &[&str], config_path: &Path) -> Output {
    timeout(
        Duration::from_secs(30),
        bot_command(args, config_path).output(),
    )
    .await
    .expect("bot did not exit")
    .expect("Failed to run bot")
}

/// Wait for the metrics server to answer
async fn wait_for_health(port: u16, max_attempts: u32) -> bool {
    let client = Client::new();
    for _ in 0..max_attempts {
        if client
            .get(format!("http://127.0.0.1:{}/health", port))
            .send()
            .await
            .is_ok()
        {
            return true;
        }
        sleep(Duration::from_millis(50)).await;
    }
    false
}

#[tokio::test]
async fn test_missing_config_fails() {
    let dir = TempDir::new().unwrap();
    let output = run_to_exit(&["run"], &dir.path().join("missing.toml")).await;

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Configuration file not found"), "{stderr}");
}

#[tokio::test]
async fn test_empty_token_fails_validation() {
    let storage = TempDir::new().unwrap();
    let config = write_config(&format!(
        r#"
[telegram]
token = ""

[convert]
storage_path = {:?}
"#,
        storage.path()
    ));

    let output = run_to_exit(&["check"], config.path()).await;

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("telegram.token cannot be empty"), "{stderr}");
}

#[tokio::test]
async fn test_check_prints_sanitized_config() {
    let storage = TempDir::new().unwrap();
    let config = write_config(&format!(
        r#"
[telegram]
token = "123:SECRET"

[convert]
storage_path = {:?}
max_concurrent = 2
"#,
        storage.path()
    ));

    let output = run_to_exit(&["check"], config.path()).await;

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("SECRET"));
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["telegram"]["token_configured"], true);
    assert_eq!(json["convert"]["max_concurrent"], 2);
}

#[cfg(unix)]
#[tokio::test]
async fn test_bot_starts_and_stops_on_sigterm() {
    let telegram = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/bot123:ABC/getMe"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "ok": true,
            "result": {"id": 1, "is_bot": true, "first_name": "Converter", "username": "conv_bot"}
        })))
        .mount(&telegram)
        .await;
    Mock::given(method("POST"))
        .and(path("/bot123:ABC/getUpdates"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(200))
                .set_body_json(serde_json::json!({"ok": true, "result": []})),
        )
        .mount(&telegram)
        .await;

    let storage = TempDir::new().unwrap();
    let port = get_available_port();
    let config = write_config(&format!(
        r#"
[telegram]
token = "123:ABC"
update_timeout_secs = 1
api_url = "{}"

[convert]
storage_path = {:?}

[transcoder]
ffmpeg_path = "true"

[metrics]
enabled = true
host = "127.0.0.1"
port = {}
"#,
        telegram.uri(),
        storage.path().join("work"),
        port
    ));

    let mut bot = bot_command(&["run"], config.path()).spawn().unwrap();

    assert!(wait_for_health(port, 100).await, "Bot did not start in time");
    assert!(storage.path().join("work").is_dir());

    let body = Client::new()
        .get(format!("http://127.0.0.1:{}/metrics", port))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("# TYPE"));

    let pid = bot.id().expect("bot is running").to_string();
    let killed = Command::new("kill")
        .args(["-TERM", &pid])
        .status()
        .await
        .unwrap();
    assert!(killed.success());

    let status = timeout(Duration::from_secs(10), bot.wait())
        .await
        .expect("bot did not stop after SIGTERM")
        .unwrap();
    assert!(status.success());
}
