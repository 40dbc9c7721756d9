use std::process::Command;

fn blogdesk(data_dir: &std::path::Path) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_blogdesk"));
    command
        .env("BLOGDESK_DATA_DIR", data_dir)
        .env("BLOGDESK_SESSION_KEY", "binary test secret")
        .env("BLOGDESK_API_URL", "http://127.0.0.1:1")
        .env_remove("BLOGDESK_LOG");
    command
}

#[test]
fn test_version_flag() {
    let dir = tempfile::tempdir().unwrap();
    let output = blogdesk(dir.path())
        .arg("--version")
        .output()
        .expect("Failed to execute binary");

    assert!(output.status.success(), "Version flag should exit with code 0");

    let stdout = String::from_utf8_lossy(&output.stdout);
    let version = stdout.trim().strip_prefix("blogdesk ").unwrap_or("");
    assert_eq!(
        version,
        env!("CARGO_PKG_VERSION"),
        "Binary version should match CARGO_PKG_VERSION"
    );
}

#[test]
fn test_unknown_command_exits_with_usage() {
    let dir = tempfile::tempdir().unwrap();
    let output = blogdesk(dir.path())
        .arg("publish")
        .output()
        .expect("Failed to execute binary");

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unknown command 'publish'"));
    assert!(stderr.contains("Usage: blogdesk"));
}

#[test]
fn test_status_without_session() {
    let dir = tempfile::tempdir().unwrap();
    let output = blogdesk(dir.path())
        .arg("status")
        .output()
        .expect("Failed to execute binary");

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Not signed in"));
}

#[test]
fn test_login_status_logout_round_trip() {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

    let dir = tempfile::tempdir().unwrap();
    let payload = serde_json::json!({
        "user_id": "42",
        "exp": chrono::Utc::now().timestamp() + 3600,
    });
    let token = format!("h.{}.s", URL_SAFE_NO_PAD.encode(payload.to_string()));

    let login = blogdesk(dir.path())
        .args(["login", &token, "--refresh", "r", "--username", "ada"])
        .output()
        .expect("Failed to execute binary");
    assert!(login.status.success());
    assert!(String::from_utf8_lossy(&login.stdout).contains("Signed in as 42"));
    assert!(dir.path().join("blogdesk.session.v1").exists());

    let status = blogdesk(dir.path())
        .arg("status")
        .output()
        .expect("Failed to execute binary");
    let stdout = String::from_utf8_lossy(&status.stdout);
    assert!(stdout.contains("Signed in as 42"));
    assert!(stdout.contains("user:    ada"));

    let logout = blogdesk(dir.path())
        .arg("logout")
        .output()
        .expect("Failed to execute binary");
    assert!(logout.status.success());
    assert!(!dir.path().join("blogdesk.session.v1").exists());
}
