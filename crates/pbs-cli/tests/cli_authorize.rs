#![allow(deprecated)] // cargo_bin is deprecated but still supported by assert_cmd

use assert_cmd::Command;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use predicates::prelude::*;
use rusqlite::{params, Connection};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

const ENV_VARS: &[&str] = &[
    "PBS_AUTH_ADD_FAILURE_STAGE_CONTEXT",
    "PBS_AUTH_SQLITE_PATH",
    "PBS_AUTH_STORE_URL",
    "PBS_AUTH_ORIGIN_TABLE",
    "PBS_AUTH_SITES_TABLE",
    "PBS_AUTH_STORE_TIMEOUT",
];

fn pbs() -> Command {
    let mut cmd = Command::cargo_bin("pbs-auth").expect("pbs-auth binary");
    for var in ENV_VARS {
        cmd.env_remove(var);
    }
    cmd
}

fn seeded_db(dir: &Path) -> PathBuf {
    let db = dir.join("auth.db");
    pbs()
        .args(["db", "init", "--db"])
        .arg(&db)
        .assert()
        .success();

    let conn = Connection::open(&db).unwrap();
    conn.execute(
        "INSERT INTO ReportingOriginAuth (AccountId, ReportingOriginUrl) VALUES (?1, ?2)",
        params!["arn:aws:iam::123456789012:role/demo", "my-reported-origin.com"],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO AdtechSitesAuth (AccountId, AdtechSites) VALUES (?1, ?2)",
        params!["adtech@google.com", r#"["https://domain.com"]"#],
    )
    .unwrap();
    db
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

#[test]
fn lambda_authorized_from_event_file() {
    let dir = tempdir().unwrap();
    let db = seeded_db(dir.path());
    let event = dir.path().join("event.json");
    fs::write(
        &event,
        r#"{
            "requestContext": {"identity": {"userArn": "arn:aws:sts::123456789012:assumed-role/demo/s"}},
            "headers": {"x-gscp-claimed-identity": "my-reported-origin.com"}
        }"#,
    )
    .unwrap();

    let output = pbs()
        .args(["authorize", "--kind", "lambda", "--db"])
        .arg(&db)
        .arg("--event")
        .arg(&event)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(0));
    let response = stdout_json(&output);
    assert_eq!(response["statusCode"], 200);
    assert_eq!(
        response["body"],
        r#"{"authorized_domain": "my-reported-origin.com"}"#
    );
}

#[test]
fn cloud_function_forbidden_from_stdin() {
    let dir = tempdir().unwrap();
    let db = seeded_db(dir.path());
    let claims = STANDARD.encode(r#"{"email":"adtech@google.com"}"#);
    let event = serde_json::json!({
        "headers": {
            "Authorization": format!("Bearer h.{}.s", claims),
            "x-gscp-claimed-identity": "https://other.com",
            "x-gscp-enable-per-site-enrollment": "true"
        }
    });

    let output = pbs()
        .args(["authorize", "--kind", "cloud-function", "--stage-context", "--db"])
        .arg(&db)
        .write_stdin(event.to_string())
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let response = stdout_json(&output);
    assert_eq!(response["status_code"], 403);
    assert_eq!(response["body"], "\"authorization forbidden\"");
    assert_eq!(response["failure_stage"], "site_check");
}

#[test]
fn missing_store_is_config_error() {
    pbs()
        .args(["authorize", "--kind", "lambda"])
        .write_stdin("{}")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("lookup store"));
}

#[test]
fn invalid_event_is_config_error() {
    let dir = tempdir().unwrap();
    let db = seeded_db(dir.path());
    pbs()
        .args(["authorize", "--kind", "lambda", "--db"])
        .arg(&db)
        .write_stdin("not json")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("not valid JSON"));
}

#[test]
fn store_from_env_and_tables_from_flags() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("custom.db");
    pbs()
        .args([
            "db",
            "init",
            "--origin-table",
            "Origins",
            "--sites-table",
            "Sites",
            "--db",
        ])
        .arg(&db)
        .assert()
        .success();
    let conn = Connection::open(&db).unwrap();
    conn.execute(
        "INSERT INTO Origins (AccountId, ReportingOriginUrl) VALUES (?1, ?2)",
        params!["arn:aws:iam::123456789012:role/demo", "my-reported-origin.com"],
    )
    .unwrap();
    drop(conn);

    let event = r#"{
        "requestContext": {"identity": {"userArn": "arn:aws:iam::123456789012:role/demo"}},
        "headers": {"x-gscp-claimed-identity": "my-reported-origin.com"}
    }"#;

    let output = pbs()
        .env("PBS_AUTH_SQLITE_PATH", &db)
        .args([
            "authorize",
            "--kind",
            "lambda",
            "--origin-table",
            "Origins",
            "--sites-table",
            "Sites",
        ])
        .write_stdin(event)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(stdout_json(&output)["statusCode"], 200);

    // Default table names do not exist in this database.
    let output = pbs()
        .env("PBS_AUTH_SQLITE_PATH", &db)
        .args(["authorize", "--kind", "lambda", "--stage-context"])
        .write_stdin(event)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(stdout_json(&output)["statusCode"], 500);
}

#[test]
fn stage_context_from_env() {
    let dir = tempdir().unwrap();
    let db = seeded_db(dir.path());
    let output = pbs()
        .env("PBS_AUTH_ADD_FAILURE_STAGE_CONTEXT", "1")
        .args(["authorize", "--kind", "lambda", "--db"])
        .arg(&db)
        .write_stdin(r#"{"headers": {"x-gscp-claimed-identity": "my-reported-origin.com"}}"#)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert_eq!(stdout_json(&output)["failureStage"], "context");
}

#[test]
fn zero_store_timeout_is_rejected() {
    pbs()
        .env("PBS_AUTH_STORE_TIMEOUT", "0")
        .args(["authorize", "--kind", "lambda"])
        .write_stdin("{}")
        .assert()
        .code(2);
}
