/// `envgate validate` flags, run through the real binary
use super::common::{spawn_backend, Behavior};
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const SECRET: &str = "a-very-long-secret-key-for-signing-tokens";

fn envgate(dir: &Path) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_envgate"));
    command
        .current_dir(dir)
        .env("XDG_CONFIG_HOME", dir)
        .env_remove("RUST_LOG");
    command
}

fn validate_with(env_file_contents: &str, extra: &[&str]) -> Output {
    let dir = TempDir::new().unwrap();
    let env_file = dir.path().join("backend.env");
    fs::write(&env_file, env_file_contents).unwrap();

    envgate(dir.path())
        .args(["validate", "--profile", "backend", "--env-file"])
        .arg(&env_file)
        .args(extra)
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_quiet_valid_prints_nothing() {
    let output = validate_with(
        &format!("SECRET_KEY={}\nCORS_ORIGINS=*\n", SECRET),
        &["--quiet"],
    );

    assert!(output.status.success());
    assert_eq!(stdout(&output), "");
}

#[test]
fn test_quiet_invalid_prints_only_errors() {
    let output = validate_with("CORS_ORIGINS=*\n", &["-q"]);

    assert!(!output.status.success());
    assert_eq!(stdout(&output), "");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("SECRET_KEY"), "stderr: {}", stderr);
}

#[test]
fn test_fix_suggests_secret_and_origins() {
    let output = validate_with("DATABASE_URL=sqlite:///./app.db\n", &["--fix"]);
    let text = stdout(&output);

    assert!(!output.status.success());
    assert!(text.contains("Suggested fixes:"), "{}", text);
    assert!(text.contains("Set SECRET_KEY="), "{}", text);
    assert!(
        text.contains("Set CORS_ORIGINS=http://localhost:5173,http://localhost:3000"),
        "{}",
        text
    );
}

#[test]
fn test_fix_with_nothing_to_fix() {
    let output = validate_with(&format!("SECRET_KEY={}\nCORS_ORIGINS=*\n", SECRET), &["--fix"]);

    assert!(output.status.success());
    assert!(stdout(&output).contains("No common problems to fix"));
}

#[test]
fn test_platform_hints_on_platform() {
    let output = validate_with(
        &format!(
            "SECRET_KEY={}\nCORS_ORIGINS=*\nRAILWAY_ENVIRONMENT=production\n",
            SECRET
        ),
        &[],
    );
    let text = stdout(&output);

    assert!(output.status.success());
    assert!(text.contains("Deployment platform:"), "{}", text);
    assert!(text.contains("Configuration has warnings but is usable"), "{}", text);
}

#[test]
fn test_no_platform_hints_elsewhere() {
    let output = validate_with(&format!("SECRET_KEY={}\nCORS_ORIGINS=*\n", SECRET), &[]);
    assert!(!stdout(&output).contains("Deployment platform:"));
}

async fn check_cors(allowed: &'static str, sent_as: &str) -> Output {
    let base = spawn_backend(Behavior::Cors(allowed)).await;
    let sent_as = sent_as.to_string();

    // the binary blocks, the test server must keep running
    tokio::task::spawn_blocking(move || {
        let dir = TempDir::new().unwrap();
        let env_file = dir.path().join("backend.env");
        fs::write(&env_file, format!("CORS_ORIGINS={}\n", allowed)).unwrap();

        envgate(dir.path())
            .env("ENVGATE_ORIGIN", sent_as)
            .args(["validate", "--env-file"])
            .arg(&env_file)
            .arg("--check-cors")
            .arg(format!("{}/health", base))
            .output()
            .unwrap()
    })
    .await
    .unwrap()
}

#[tokio::test]
async fn test_check_cors_allowed_origin() {
    let output = check_cors("https://frontend.example.app", "https://frontend.example.app").await;
    let text = stdout(&output);

    assert!(output.status.success(), "{}", text);
    assert!(text.contains("ok   Access-Control-Allow-Origin: https://frontend.example.app"));
    assert!(text.contains("Configured CORS origins: https://frontend.example.app"));
    assert!(text.contains("is allowed"));
}

#[tokio::test]
async fn test_check_cors_rejected_origin() {
    let output = check_cors("https://frontend.example.app", "https://other.example.app").await;
    let text = stdout(&output);

    assert!(!output.status.success());
    // the backend names its own origin, which is not ours
    assert!(text.contains("Access-Control-Allow-Origin: https://frontend.example.app"), "{}", text);
    assert!(text.contains("Origin https://other.example.app is NOT allowed"), "{}", text);
}
