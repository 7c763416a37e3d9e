//! Integration tests for the acquisition pipeline against a mock endpoint

use mockito::{Matcher, Server, ServerGuard};
use repo_health_metrics::{
    get_metric, get_metrics, CancelToken, ExecutorConfig, MetricsError, RepositoryQuery, LIBRARY,
};
use serde_json::json;

fn test_config(server: &ServerGuard) -> ExecutorConfig {
    ExecutorConfig {
        endpoint: server.url(),
        page_size: 3,
        max_retries: 1,
        retry_delay_ms: 10,
        rate_limit_grace_secs: 0,
        ..Default::default()
    }
}

fn commits_page(nodes: Vec<serde_json::Value>, cursor: Option<&str>) -> serde_json::Value {
    json!({
        "defaultBranchRef": { "target": { "history": {
            "totalCount": 6,
            "pageInfo": { "hasNextPage": cursor.is_some(), "endCursor": cursor },
            "nodes": nodes
        } } }
    })
}

fn issues_page(nodes: Vec<serde_json::Value>) -> serde_json::Value {
    json!({
        "issues": {
            "totalCount": nodes.len(),
            "pageInfo": { "hasNextPage": false, "endCursor": null },
            "nodes": nodes
        }
    })
}

fn commit_node(index: u32) -> serde_json::Value {
    json!({
        "committedDate": format!("2024-01-0{}T00:00:00Z", index),
        "additions": 10,
        "deletions": 2,
        "author": { "email": "dev@example.com", "user": { "login": "alice" } }
    })
}

fn issue_node(index: u32) -> serde_json::Value {
    json!({
        "state": "OPEN",
        "createdAt": format!("2024-02-0{}T00:00:00Z", index),
        "closedAt": null,
        "updatedAt": format!("2024-02-0{}T00:00:00Z", index)
    })
}

/// Two pages of three commits each plus one page of five issues: six commits
/// in original order, five issues, and exactly two requests.
#[tokio::test]
async fn test_end_to_end_commits_and_issues() {
    let mut server = Server::new_async().await;

    let first_round = server
        .mock("POST", "/")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({ "data": {
                "commits": commits_page(vec![commit_node(1), commit_node(2), commit_node(3)], Some("c1")),
                "issues": issues_page((1..=5).map(issue_node).collect())
            } })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let second_round = server
        .mock("POST", "/")
        .match_body(Matcher::Regex("after".to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({ "data": {
                "commits": commits_page(vec![commit_node(4), commit_node(5), commit_node(6)], None)
            } })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let record = RepositoryQuery::new("acme", "widget")
        .select("commits")
        .unwrap()
        .select("issues")
        .unwrap()
        .execute("token", &test_config(&server))
        .await
        .unwrap();

    first_round.assert_async().await;
    second_round.assert_async().await;

    let commits = record.fragment("commits").unwrap();
    assert_eq!(commits.len(), 6);
    let dates: Vec<&str> = commits
        .iter()
        .map(|c| c["committedDate"].as_str().unwrap())
        .collect();
    let mut sorted = dates.clone();
    sorted.sort_unstable();
    assert_eq!(dates, sorted, "API order must be preserved");

    assert_eq!(record.fragment("issues").unwrap().len(), 5);

    let outcome = get_metric("commit_count", &record).unwrap();
    assert_eq!(outcome.value(), Some(&json!(6)));

    // Pure metrics: two runs over the same record agree.
    assert_eq!(get_metrics(&record), get_metrics(&record));
}

/// select_all produces a record with a key for every library fragment
#[tokio::test]
async fn test_select_all_covers_every_fragment() {
    let mut server = Server::new_async().await;

    let response = server
        .mock("POST", "/")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({ "data": {
                "overview": {
                    "name": "widget", "nameWithOwner": "acme/widget",
                    "owner": { "login": "acme" }, "isArchived": false, "isFork": false,
                    "stargazerCount": 3, "forkCount": 1, "createdAt": "2020-01-01T00:00:00Z",
                    "pushedAt": "2024-01-01T00:00:00Z", "licenseInfo": null,
                    "isSecurityPolicyEnabled": false, "hasIssuesEnabled": true
                },
                "funding_links": { "fundingLinks": [] },
                "community": {
                    "contributing_md": null, "contributing_txt": null, "contributing_raw": null,
                    "feature_requests": { "totalCount": 0 },
                    "closed_feature_requests": { "totalCount": 0 }
                },
                "pull_requests": { "pullRequests": {
                    "totalCount": 0,
                    "pageInfo": { "hasNextPage": false, "endCursor": null }, "nodes": []
                } },
                "issues": issues_page(vec![]),
                "releases": { "releases": {
                    "totalCount": 0,
                    "pageInfo": { "hasNextPage": false, "endCursor": null }, "nodes": []
                } },
                "commits": { "defaultBranchRef": null },
                "manifests": { "dependencyGraphManifests": {
                    "totalCount": 0,
                    "pageInfo": { "hasNextPage": false, "endCursor": null }, "nodes": []
                } }
            } })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let record = RepositoryQuery::new("acme", "widget")
        .select_all()
        .execute("token", &test_config(&server))
        .await
        .unwrap();

    response.assert_async().await;
    for fragment in LIBRARY {
        assert!(
            record.contains(fragment.name),
            "record misses fragment '{}'",
            fragment.name
        );
    }
    // Repository without a default branch yields an empty commit history.
    assert!(record.fragment("commits").unwrap().is_empty());
}

/// A fatal error on a later page discards everything, including the fragment
/// that already completed.
#[tokio::test]
async fn test_fatal_abort_discards_partial_results() {
    let mut server = Server::new_async().await;

    let _first_round = server
        .mock("POST", "/")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({ "data": {
                "commits": commits_page(vec![commit_node(1)], Some("c1")),
                "issues": issues_page(vec![issue_node(1)])
            } })
            .to_string(),
        )
        .create_async()
        .await;

    let denied = server
        .mock("POST", "/")
        .match_body(Matcher::Regex("after".to_string()))
        .with_status(401)
        .expect(1)
        .create_async()
        .await;

    let result = RepositoryQuery::new("acme", "widget")
        .select("commits")
        .unwrap()
        .select("issues")
        .unwrap()
        .execute("token", &test_config(&server))
        .await;

    denied.assert_async().await;
    assert!(matches!(result, Err(MetricsError::Authentication(_))));
}

/// GraphQL-level errors abort immediately without retrying
#[tokio::test]
async fn test_graphql_errors_are_fatal() {
    let mut server = Server::new_async().await;

    let rejected = server
        .mock("POST", "/")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "errors": [{ "message": "Parse error on line 1" }] }).to_string())
        .expect(1)
        .create_async()
        .await;

    let result = RepositoryQuery::new("acme", "widget")
        .select("issues")
        .unwrap()
        .execute("token", &test_config(&server))
        .await;

    rejected.assert_async().await;
    match result {
        Err(MetricsError::Schema(message)) => assert!(message.contains("Parse error")),
        other => panic!("expected schema error, got {:?}", other.map(|_| ())),
    }
}

/// Server errors retry with back-off, then escalate to a network error
#[tokio::test]
async fn test_transient_errors_retry_then_escalate() {
    let mut server = Server::new_async().await;

    let flaky = server
        .mock("POST", "/")
        .with_status(502)
        .expect(2) // initial attempt + one retry
        .create_async()
        .await;

    let result = RepositoryQuery::new("acme", "widget")
        .select("issues")
        .unwrap()
        .execute("token", &test_config(&server))
        .await;

    flaky.assert_async().await;
    assert!(matches!(result, Err(MetricsError::Network(_))));
}

/// A cursor loop that never terminates trips the round cap
#[tokio::test]
async fn test_pagination_round_cap() {
    let mut server = Server::new_async().await;

    let endless = server
        .mock("POST", "/")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({ "data": {
                "issues": {
                    "issues": {
                        "totalCount": 1000,
                        "pageInfo": { "hasNextPage": true, "endCursor": "same-cursor" },
                        "nodes": [issue_node(1)]
                    }
                }
            } })
            .to_string(),
        )
        .expect(3)
        .create_async()
        .await;

    let config = ExecutorConfig {
        max_rounds: 3,
        ..test_config(&server)
    };
    let result = RepositoryQuery::new("acme", "widget")
        .select("issues")
        .unwrap()
        .execute("token", &config)
        .await;

    endless.assert_async().await;
    assert!(matches!(
        result,
        Err(MetricsError::PaginationLimitExceeded { rounds: 3 })
    ));
}

/// Cancellation aborts before the next round issues any request
#[tokio::test]
async fn test_cancellation_before_first_round() {
    let mut server = Server::new_async().await;

    let untouched = server.mock("POST", "/").expect(0).create_async().await;

    let cancel = CancelToken::new();
    cancel.cancel();
    let result = RepositoryQuery::new("acme", "widget")
        .select("issues")
        .unwrap()
        .execute_with_cancel("token", &test_config(&server), &cancel)
        .await;

    untouched.assert_async().await;
    assert!(matches!(result, Err(MetricsError::Cancelled)));
}

/// A low remaining budget suspends the flow until the advertised reset time
/// before the next request goes out.
#[tokio::test]
async fn test_rate_limit_suspends_until_reset() {
    let mut server = Server::new_async().await;
    let reset_at = (chrono::Utc::now() + chrono::Duration::seconds(2)).to_rfc3339();

    let first_round = server
        .mock("POST", "/")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({ "data": {
                "issues": {
                    "issues": {
                        "totalCount": 2,
                        "pageInfo": { "hasNextPage": true, "endCursor": "c1" },
                        "nodes": [issue_node(1)]
                    }
                },
                "rateLimit": {
                    "cost": 1, "limit": 5000, "remaining": 10,
                    "resetAt": reset_at, "nodeCount": 1, "used": 4990
                }
            } })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let second_round = server
        .mock("POST", "/")
        .match_body(Matcher::Regex("after".to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({ "data": {
                "issues": {
                    "issues": {
                        "totalCount": 2,
                        "pageInfo": { "hasNextPage": false, "endCursor": null },
                        "nodes": [issue_node(2)]
                    }
                },
                "rateLimit": {
                    "cost": 1, "limit": 5000, "remaining": 4999,
                    "resetAt": reset_at, "nodeCount": 1, "used": 1
                }
            } })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let config = ExecutorConfig {
        rate_limit: true,
        rate_limit_floor: 100,
        ..test_config(&server)
    };

    let started = std::time::Instant::now();
    let record = RepositoryQuery::new("acme", "widget")
        .select("issues")
        .unwrap()
        .execute("token", &config)
        .await
        .unwrap();
    let elapsed = started.elapsed();

    first_round.assert_async().await;
    second_round.assert_async().await;

    assert!(
        elapsed >= std::time::Duration::from_millis(1500),
        "executor must wait out the reset window, waited {:?}",
        elapsed
    );
    assert_eq!(record.fragment("issues").unwrap().len(), 2);

    // Costs sum across rounds; remaining reflects the latest response.
    let rate = record.rate_limit.unwrap();
    assert_eq!(rate.cost, 2);
    assert_eq!(rate.remaining, 4999);
}
