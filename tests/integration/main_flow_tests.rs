use serial_test::serial;
use std::process::Command;

const BINARY: &str = env!("CARGO_BIN_EXE_arena-rating");

/// Test that the worker exits with error code when database connection fails
#[test]
#[serial]
fn test_application_exits_on_connection_failure() {
    let output = Command::new(BINARY)
        .env(
            "CONNECTION_STRING",
            "host=invalid_host port=5432 user=postgres password=wrong dbname=nonexistent"
        )
        .env("RUST_LOG", "error")
        .output()
        .expect("Failed to execute worker");

    // Should exit with error code
    assert!(!output.status.success(), "Process should fail with invalid connection");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Failed to connect to database"),
        "Should log connection error. Got: {}",
        stderr
    );
    assert!(
        stderr.contains("Application cannot start without a valid database connection"),
        "Should log clear message about needing database connection"
    );
    assert!(output.stdout.is_empty(), "No report should be printed");
}

/// Test that the worker refuses to start without CONNECTION_STRING
#[test]
#[serial]
fn test_application_exits_on_missing_connection_string() {
    // Create a temporary directory without .env file
    let temp_dir = std::env::temp_dir().join("arena_rating_test");
    std::fs::create_dir_all(&temp_dir).ok();

    // Run without CONNECTION_STRING and from a directory without .env
    let output = Command::new(BINARY)
        .current_dir(&temp_dir)
        .env_clear()
        .env("PATH", std::env::var("PATH").unwrap_or_default())
        .output()
        .expect("Failed to execute worker");

    std::fs::remove_dir_all(&temp_dir).ok();

    assert!(!output.status.success(), "Process should fail without CONNECTION_STRING");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("CONNECTION_STRING"),
        "Should report missing CONNECTION_STRING. Got: {}",
        stderr
    );
}

/// Test that invalid numeric settings are rejected before connecting
#[test]
#[serial]
fn test_application_rejects_invalid_arguments() {
    let output = Command::new(BINARY)
        .env("CONNECTION_STRING", "host=invalid_host")
        .args(["--playstyle-k", "two"])
        .output()
        .expect("Failed to execute worker");

    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--playstyle-k"), "Got: {}", stderr);
    assert!(!stderr.contains("Failed to connect to database"));
}
