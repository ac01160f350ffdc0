use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Run the binary with an isolated working directory and config
fn ollacord(workdir: &Path, args: &[&str]) -> Output {
    let config_dir = workdir.join("config");
    Command::new(env!("CARGO_BIN_EXE_ollacord"))
        .arg("--config-dir")
        .arg(&config_dir)
        .args(args)
        .current_dir(workdir)
        .env_remove("DISCORD_TOKEN")
        .env_remove("OLLACORD__DISCORD__TOKEN")
        .env_remove("OLLAMA_HOST")
        .env_remove("RUST_LOG")
        .env("OLLACORD__LOGGING__DIR", workdir.join("logs"))
        .output()
        .expect("Failed to run ollacord")
}

#[test]
fn test_run_without_token_fails_before_connecting() {
    let temp_dir = TempDir::new().unwrap();
    let output = ollacord(temp_dir.path(), &["run"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Discord token is not set"), "stderr: {}", stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("ollacord is running"));
}

#[test]
fn test_onboard_writes_default_config() {
    let temp_dir = TempDir::new().unwrap();
    let output = ollacord(temp_dir.path(), &["onboard"]);
    assert!(output.status.success());

    let content = std::fs::read_to_string(temp_dir.path().join("config/config.json")).unwrap();
    let config: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(config["provider"]["model"], "qwen2.5:1.5b");
    assert_eq!(config["relay"]["history_limit"], 8);
    assert_eq!(config["relay"]["chunk_size"], 2000);

    // A second onboard leaves the file alone
    std::fs::write(
        temp_dir.path().join("config/config.json"),
        r#"{"provider":{"model":"mistral"}}"#,
    )
    .unwrap();
    let output = ollacord(temp_dir.path(), &["onboard"]);
    assert!(output.status.success());
    let content = std::fs::read_to_string(temp_dir.path().join("config/config.json")).unwrap();
    assert!(content.contains("mistral"));
}

#[test]
fn test_status_redacts_token() {
    let temp_dir = TempDir::new().unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_ollacord"))
        .arg("--config-dir")
        .arg(temp_dir.path().join("config"))
        .arg("status")
        .current_dir(temp_dir.path())
        .env("DISCORD_TOKEN", "super-secret-token")
        .env("OLLACORD__LOGGING__DIR", temp_dir.path().join("logs"))
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("qwen2.5:1.5b"));
    assert!(stdout.contains("configured"));
    assert!(!stdout.contains("super-secret-token"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::create_dir_all(temp_dir.path().join("config")).unwrap();
    std::fs::write(
        temp_dir.path().join("config/config.json"),
        r#"{"relay":{"chunk_size":5000}}"#,
    )
    .unwrap();

    let output = ollacord(temp_dir.path(), &["status"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("chunk_size"), "stderr: {}", stderr);
}
