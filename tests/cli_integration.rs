//! Command-line tests for the `sahayi` binary

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;
use common::CONTACT_TOOL;

const MINIMAL_CONFIG: &str = "provider:\n  type: gemini\n";

fn sahayi(config_path: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("sahayi").unwrap();
    cmd.arg("--config")
        .arg(config_path)
        .env("NO_COLOR", "1")
        .env("SAHAYI_GEMINI_API_KEY", "test-key")
        .env("SAHAYI_SEARCH_API_KEY", "test-key")
        .env("SAHAYI_TOOLBOX_TOKEN", "test-token");
    cmd
}

#[test]
fn test_help_lists_commands() {
    Command::cargo_bin("sahayi")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("chat"))
        .stdout(predicate::str::contains("lookup"))
        .stdout(predicate::str::contains("locate"))
        .stdout(predicate::str::contains("classify"));
}

#[test]
fn test_classify_medical_message() {
    let (_dir, config_path) = common::temp_config_file(MINIMAL_CONFIG);
    sahayi(&config_path)
        .args(["classify", "--message", "I have chest pain"])
        .assert()
        .success()
        .stdout(predicate::str::contains("medical"))
        .stdout(predicate::str::contains("nearest_medical_locator"));
}

#[test]
fn test_classify_police_message() {
    let (_dir, config_path) = common::temp_config_file(MINIMAL_CONFIG);
    sahayi(&config_path)
        .args(["classify", "--message", "Someone is following me"])
        .assert()
        .success()
        .stdout(predicate::str::contains("police"))
        .stdout(predicate::str::contains("nearest_police_locator"));
}

#[test]
fn test_classify_general_message() {
    let (_dir, config_path) = common::temp_config_file(MINIMAL_CONFIG);
    sahayi(&config_path)
        .args(["classify", "--message", "Please remind me to pay my bills"])
        .assert()
        .success()
        .stdout(predicate::str::contains("general"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let (_dir, config_path) =
        common::temp_config_file("provider:\n  type: gemini\nagent:\n  max_turns: 0\n");
    sahayi(&config_path)
        .args(["classify", "--message", "hello"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("max_turns must be greater than 0"));
}

#[test]
fn test_unknown_provider_is_rejected() {
    let (_dir, config_path) = common::temp_config_file("provider:\n  type: openai\n");
    sahayi(&config_path)
        .args(["classify", "--message", "hello"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid provider type: openai"));
}

#[test]
fn test_locate_requires_service() {
    let (_dir, config_path) = common::temp_config_file(MINIMAL_CONFIG);
    sahayi(&config_path)
        .args(["locate", "--location", "12 Elm St"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--service"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_lookup_prints_profile_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/api/tool/{}/invoke", CONTACT_TOOL)))
        .and(body_json(json!({"name": "John Smith"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"result": common::john_smith_rows()})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let config = format!("{}toolbox:\n  url: {}\n", MINIMAL_CONFIG, server.uri());
    let (_dir, config_path) = common::temp_config_file(&config);
    let output = sahayi(&config_path)
        .args(["lookup", "--name", "John Smith", "--json"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let profile: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(profile["home_address"], "12 Elm St");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_lookup_unknown_name() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/api/tool/{}/invoke", CONTACT_TOOL)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": "[]"})))
        .mount(&server)
        .await;

    let config = format!("{}toolbox:\n  url: {}\n", MINIMAL_CONFIG, server.uri());
    let (_dir, config_path) = common::temp_config_file(&config);
    sahayi(&config_path)
        .args(["lookup", "--name", "Nobody Known"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Nobody Known is not in the system."));
}
