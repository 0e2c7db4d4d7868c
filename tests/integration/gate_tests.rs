/// Build gate behaviour and the audit artifact it leaves behind
use envgate::config::{EnvSnapshot, Profile};
use envgate::gate::{BuildGate, GateError, AUDIT_FILE_NAME};
use envgate::EnvgateError;
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

const SECRET: &str = "a-very-long-secret-key-for-signing-tokens";

fn read_audit(dir: &Path) -> Value {
    let content = fs::read_to_string(dir.join(AUDIT_FILE_NAME)).unwrap();
    serde_json::from_str(&content).unwrap()
}

#[test]
fn test_missing_required_setting_fails_and_writes_audit() {
    let dir = TempDir::new().unwrap();
    let snapshot = EnvSnapshot::from_pairs([("CORS_ORIGINS", "*")]);

    let err = BuildGate::new(Profile::Backend, dir.path())
        .run(&snapshot)
        .unwrap_err();

    match err {
        GateError::RequiredSettings(failures) => {
            assert_eq!(failures.len(), 1);
            assert!(matches!(
                &failures[0],
                EnvgateError::MissingRequiredSetting { name, .. } if name == "SECRET_KEY"
            ));
        }
        other => panic!("unexpected error: {}", other),
    }

    let audit = read_audit(dir.path());
    assert_eq!(audit["status"], "invalid");
    assert_eq!(audit["profile"], "backend");
    assert_eq!(audit["items"][0]["name"], "SECRET_KEY");
    assert_eq!(audit["items"][0]["status"], "missing");
    assert_eq!(audit["items"].as_array().unwrap().len(), 4);
    assert!(chrono::DateTime::parse_from_rfc3339(audit["timestamp"].as_str().unwrap()).is_ok());
}

#[test]
fn test_every_failing_item_is_listed() {
    let dir = TempDir::new().unwrap();
    let snapshot = EnvSnapshot::from_pairs([("SECRET_KEY", "short"), ("CORS_ORIGINS", "")]);

    let err = BuildGate::new(Profile::Backend, dir.path())
        .run(&snapshot)
        .unwrap_err();
    let text = err.to_string();

    assert!(text.contains("SECRET_KEY"), "{}", text);
    assert!(text.contains("CORS_ORIGINS"), "{}", text);
}

#[test]
fn test_optional_failures_do_not_abort() {
    let dir = TempDir::new().unwrap();
    let snapshot = EnvSnapshot::from_pairs([
        ("SECRET_KEY", SECRET),
        ("CORS_ORIGINS", "https://frontend.example.app"),
        ("DATABASE_URL", "mongodb://nope"),
    ]);

    let outcome = BuildGate::new(Profile::Backend, dir.path())
        .run(&snapshot)
        .unwrap();

    assert_eq!(
        outcome.report.effective_value("DATABASE_URL"),
        Some("sqlite:///./recipes.db")
    );
    let audit = read_audit(dir.path());
    assert_eq!(audit["status"], "warning");
    assert_eq!(audit["items"][2]["status"], "invalid");
}

#[test]
fn test_audit_is_overwritten_and_masks_secrets() {
    let dir = TempDir::new().unwrap();
    let gate = BuildGate::new(Profile::Backend, dir.path());

    assert!(gate.run(&EnvSnapshot::new()).is_err());
    assert_eq!(read_audit(dir.path())["status"], "invalid");

    let snapshot = EnvSnapshot::from_pairs([
        ("SECRET_KEY", SECRET),
        ("CORS_ORIGINS", "*"),
        ("DATABASE_URL", "postgresql://app:hunter2@db/recipes"),
        ("RAILWAY_STATIC_URL", "https://backend.example.app"),
    ]);
    gate.run(&snapshot).unwrap();

    let raw = fs::read_to_string(dir.path().join(AUDIT_FILE_NAME)).unwrap();
    let audit: Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(audit["status"], "valid");
    assert!(!raw.contains(SECRET));
    assert!(!raw.contains("hunter2"));
}

#[test]
fn test_out_dir_is_created() {
    let dir = TempDir::new().unwrap();
    let nested = dir.path().join("build").join("dist");
    let snapshot = EnvSnapshot::from_pairs([("VITE_API_URL", "https://backend.example.app")]);

    let outcome = BuildGate::new(Profile::Frontend, &nested).run(&snapshot).unwrap();

    assert_eq!(outcome.audit_path, nested.join(AUDIT_FILE_NAME));
    assert!(outcome.audit_path.is_file());
}

#[test]
fn test_cli_gate_exits_non_zero() {
    let dir = TempDir::new().unwrap();
    let env_file = dir.path().join("frontend.env");
    fs::write(&env_file, "VITE_HEALTH_PATH=/health\n").unwrap();
    let out_dir = dir.path().join("dist");

    let output = Command::new(env!("CARGO_BIN_EXE_envgate"))
        .current_dir(dir.path())
        .args(["gate", "--profile", "frontend", "--env-file"])
        .arg(&env_file)
        .arg("--out-dir")
        .arg(&out_dir)
        .output()
        .unwrap();

    assert!(!output.status.success(), "gate should fail without VITE_API_URL");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("VITE_API_URL"), "stderr: {}", stderr);
    assert_eq!(read_audit(&out_dir)["status"], "invalid");
}

#[test]
fn test_cli_gate_passes_with_valid_env() {
    let dir = TempDir::new().unwrap();
    let env_file = dir.path().join("frontend.env");
    fs::write(&env_file, "VITE_API_URL=https://backend.example.app\n").unwrap();

    let status = Command::new(env!("CARGO_BIN_EXE_envgate"))
        .current_dir(dir.path())
        .args(["gate", "--profile", "frontend", "--env-file"])
        .arg(&env_file)
        .arg("--out-dir")
        .arg(dir.path().join("dist"))
        .status()
        .unwrap();

    assert!(status.success());
}
