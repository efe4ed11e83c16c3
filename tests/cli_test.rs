//! Integration tests for the command-line interface

use assert_cmd::Command;
use assert_cmd::assert::{Assert, OutputAssertExt};
use predicates::prelude::*;
use serde_json::json;
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn write_config(dir: &Path, index_url: &str) -> std::path::PathBuf {
    let config_path = dir.join("element-templates.toml");
    let config = format!(
        r#"
user_path = "{}"
fetch_timeout_secs = 5

[[endpoints]]
execution_platform = "Camunda Cloud"
file_name = ".camunda-connectors.json"
url = "{}"
"#,
        dir.join("user").display(),
        index_url
    );
    std::fs::write(&config_path, config).unwrap();
    config_path
}

/// Run the binary off the runtime threads so the mock server keeps serving
async fn run(args: Vec<String>) -> Assert {
    let output = tokio::task::spawn_blocking(move || {
        Command::cargo_bin("element-template-updater")
            .unwrap()
            .args(args)
            .output()
            .unwrap()
    })
    .await
    .unwrap();
    output.assert()
}

#[test]
fn test_help_lists_subcommands() {
    Command::cargo_bin("element-template-updater")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("update"))
        .stdout(predicate::str::contains("list"));
}

#[test]
fn test_missing_config_fails() {
    let temp_dir = TempDir::new().unwrap();

    Command::cargo_bin("element-template-updater")
        .unwrap()
        .arg("--config")
        .arg(temp_dir.path().join("nope.toml"))
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load configuration"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_update_then_list() {
    let server = MockServer::start().await;
    let uri = server.uri();
    Mock::given(method("GET"))
        .and(path("/index.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "foo": [{ "version": 1, "ref": format!("{uri}/foo-1.json") }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/foo-1.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "foo", "version": 1 })))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let config_path = write_config(temp_dir.path(), &format!("{uri}/index.json"));
    let config_arg = config_path.display().to_string();

    run(vec![
        "--config".into(),
        config_arg.clone(),
        "update".into(),
        "--platform".into(),
        "Camunda Cloud".into(),
        "--platform-version".into(),
        "8.8".into(),
    ])
    .await
    .success()
    .stdout(predicate::str::contains("New templates available."));

    run(vec!["--config".into(), config_arg, "list".into()])
        .await
        .success()
        .stdout(predicate::str::contains(format!("foo@1 <- {uri}/foo-1.json")));

    assert!(
        temp_dir
            .path()
            .join("user/resources/element-templates/.camunda-connectors.json")
            .exists()
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_update_prints_warnings() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/index.json"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let index_url = format!("{}/index.json", server.uri());
    let config_path = write_config(temp_dir.path(), &index_url);

    run(vec![
        "--config".into(),
        config_path.display().to_string(),
        "update".into(),
        "--platform".into(),
        "Camunda Cloud".into(),
        "--platform-version".into(),
        "8.8".into(),
    ])
    .await
    .success()
    .stdout(predicate::str::contains("No new templates."))
    .stdout(predicate::str::contains(format!(
        "Failed to fetch templates from {index_url} (HTTP 500)"
    )));
}
