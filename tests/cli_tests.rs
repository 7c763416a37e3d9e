//! Integration tests for the CLI

use assert_cmd::Command;
use mockito::Server;
use predicates::prelude::*;
use serde_json::json;
use std::io::Write;

#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("repo-health").unwrap();
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("owner/name"));
}

#[test]
fn test_cli_fetch_help() {
    let mut cmd = Command::cargo_bin("repo-health").unwrap();
    cmd.arg("fetch").arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("print it as JSON"));
}

#[test]
fn test_cli_score_help() {
    let mut cmd = Command::cargo_bin("repo-health").unwrap();
    cmd.arg("score").arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("compute health metrics"));
}

#[test]
fn test_cli_rejects_malformed_slug() {
    let mut cmd = Command::cargo_bin("repo-health").unwrap();
    cmd.args(["--repo", "not-a-slug", "--token", "t", "fetch"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("owner/name"));
}

#[test]
fn test_cli_rejects_missing_config_file() {
    let mut cmd = Command::cargo_bin("repo-health").unwrap();
    cmd.args([
        "--repo",
        "acme/widget",
        "--token",
        "t",
        "--config",
        "/nonexistent/config.toml",
        "fetch",
    ]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("failed to read config"));
}

#[test]
fn test_cli_fetch_against_mock_endpoint() {
    let mut server = Server::new();
    let _mock = server
        .mock("POST", "/")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({ "data": {
                "issues": {
                    "issues": {
                        "totalCount": 1,
                        "pageInfo": { "hasNextPage": false, "endCursor": null },
                        "nodes": [{
                            "state": "OPEN",
                            "createdAt": "2024-02-01T00:00:00Z",
                            "closedAt": null,
                            "updatedAt": "2024-02-01T00:00:00Z"
                        }]
                    }
                }
            } })
            .to_string(),
        )
        .create();

    let mut config = tempfile::NamedTempFile::new().unwrap();
    writeln!(config, "endpoint = \"{}\"", server.url()).unwrap();

    let mut cmd = Command::cargo_bin("repo-health").unwrap();
    cmd.args([
        "--repo",
        "acme/widget",
        "--token",
        "t",
        "--config",
        config.path().to_str().unwrap(),
        "--fragment",
        "issues",
        "fetch",
    ]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"state\": \"OPEN\""));
}

#[test]
#[ignore] // Requires network access and a real GITHUB_TOKEN
fn test_cli_score_live() {
    let mut cmd = Command::cargo_bin("repo-health").unwrap();
    cmd.args(["--repo", "rust-lang/rust", "score", "--metric", "identity"]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("name_with_owner"));
}
