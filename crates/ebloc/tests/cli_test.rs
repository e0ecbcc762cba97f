#![allow(clippy::unwrap_used)]
// End-to-end tests for the `ebloc` binary.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use assert_cmd::assert::OutputAssertExt;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// The binary with every `EBLOC_*` override cleared.
fn ebloc() -> Command {
    let mut cmd = Command::cargo_bin("ebloc").unwrap();
    for var in [
        "EBLOC_PROFILE",
        "EBLOC_CONFIG",
        "EBLOC_BASE_URL",
        "EBLOC_OUTPUT",
        "EBLOC_INSECURE",
        "EBLOC_TIMEOUT",
        "EBLOC_PASSWORD",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

fn write_config(dir: &Path, base_url: &str) -> PathBuf {
    let path = dir.join("config.toml");
    std::fs::write(
        &path,
        format!(
            r#"
default_profile = "flat"

[defaults]
timeout = 5

[profiles.flat]
username = "ion.popescu"
association_id = "4242"
apartment_id = "17"
password = "s3cret"
base_url = "{base_url}"
meter_month = "2024-12"
"#
        ),
    )
    .unwrap();
    path
}

async fn mock_portal(login_body: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/index.php"))
        .respond_with(ResponseTemplate::new(200).set_body_string(login_body.to_owned()))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/ajax/AjaxGetHomeApInfo.php"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "1": {"cod_client": "A-17", "ap": "12", "datorie": "12345", "contoare_citite": "0"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/ajax/AjaxGetIndexContoare.php"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "2": {"index_vechi": "1234567", "index_nou": ""}
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/ajax/AjaxGetPlatiChitanteToti.php"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "1": {"numar": "501", "data": "2024-11-03", "suma": "25000"},
            "2": {"numar": "502", "data": "2024-12-02", "suma": "18050"}
        })))
        .mount(&server)
        .await;
    server
}

// ── Static commands ─────────────────────────────────────────────────

#[test]
fn help_lists_commands() {
    ebloc()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("watch"))
        .stdout(predicate::str::contains("login"));
}

#[test]
fn version_flag() {
    ebloc()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("ebloc "));
}

#[test]
fn completions_for_bash() {
    ebloc()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("_ebloc"));
}

#[test]
fn missing_subcommand_is_a_usage_error() {
    ebloc().assert().failure().code(2);
}

// ── Configuration ───────────────────────────────────────────────────

#[test]
fn status_without_config_explains_how_to_create_one() {
    let dir = tempfile::tempdir().unwrap();
    ebloc()
        .arg("--config")
        .arg(dir.path().join("absent.toml"))
        .arg("status")
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("ebloc config init"));
}

#[test]
fn unknown_profile_is_a_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "http://127.0.0.1:1/");
    ebloc()
        .arg("--config")
        .arg(&config)
        .args(["--profile", "other", "status"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("flat"));
}

#[test]
fn config_show_masks_credentials() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "http://127.0.0.1:1/");
    ebloc()
        .arg("--config")
        .arg(&config)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ion********"))
        .stdout(predicate::str::contains("s3cret").not());
}

// ── Portal commands ─────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn status_json_against_mock_portal() {
    let server = mock_portal("<title>Acces online proprietari</title>").await;
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), &server.uri());

    let output = tokio::task::spawn_blocking(move || {
        ebloc()
            .arg("--config")
            .arg(&config)
            .args(["status", "-o", "json"])
            .output()
            .unwrap()
    })
    .await
    .unwrap();

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["profile"], "flat");
    assert_eq!(report["account"]["client_code"], "A-17");
    assert_eq!(report["account"]["balance"], "123.45 RON");
    assert_eq!(report["account"]["meters_submitted"], "Nu");
    assert_eq!(report["meter"]["old_index"], "1234 mc");
    assert_eq!(report["meter"]["new_index"], "Necunoscut");
    assert_eq!(report["receipts"]["count"], 2);
    assert_eq!(report["receipts"]["receipts"][1]["amount"], "180.50 RON");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn status_plain_prints_headline_values() {
    let server = mock_portal("<title>Acces online proprietari</title>").await;
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), &server.uri());

    let output = tokio::task::spawn_blocking(move || {
        ebloc()
            .arg("--config")
            .arg(&config)
            .args(["status", "-o", "plain"])
            .output()
            .unwrap()
    })
    .await
    .unwrap();

    output.assert().success().stdout("A-17\n1234 mc\n2\n");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn login_with_rejected_credentials_exits_with_auth_code() {
    let server = mock_portal("<html>Utilizator sau parola gresita</html>").await;
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), &server.uri());

    let output = tokio::task::spawn_blocking(move || {
        ebloc().arg("--config").arg(&config).arg("login").output().unwrap()
    })
    .await
    .unwrap();

    output
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("Authentication failed"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn login_success_masks_username() {
    let server = mock_portal("<title>Acces online proprietari</title>").await;
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), &server.uri());

    let output = tokio::task::spawn_blocking(move || {
        ebloc().arg("--config").arg(&config).arg("login").output().unwrap()
    })
    .await
    .unwrap();

    output
        .assert()
        .success()
        .stderr(predicate::str::contains("ion********"))
        .stderr(predicate::str::contains("ion.popescu").not());
}
