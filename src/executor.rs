//! Round-based paginated execution against the GraphQL endpoint
//!
//! One logical round per iteration: a single composite request fetches the
//! next page for every fragment that still has pages. Rounds are strictly
//! sequential because each depends on the cursors returned by the last.

use crate::assembler;
use crate::config::ExecutorConfig;
use crate::error::{MetricsError, Result};
use crate::query::{FragmentDescriptor, QueryDocument};
use crate::types::{CancelToken, CanonicalRecord, Page, RateLimitInfo};
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
// The hawkgirl preview unlocks dependencyGraphManifests.
const GITHUB_ACCEPT: &str = "application/vnd.github.hawkgirl-preview+json";

/// Pagination state carried per fragment across rounds
struct FragmentState {
    fragment: &'static FragmentDescriptor,
    cursor: Option<String>,
    exhausted: bool,
    pages: Vec<Page>,
}

/// Execute a query document to exhaustion and assemble the canonical record.
///
/// All-or-nothing: any fatal error or cancellation discards partial pages.
pub async fn execute_document(
    document: &QueryDocument,
    token: &str,
    config: &ExecutorConfig,
    cancel: Option<&CancelToken>,
) -> Result<CanonicalRecord> {
    config.validate().map_err(MetricsError::InvalidConfig)?;
    let client = build_client(token, config)?;

    let mut states: Vec<FragmentState> = document
        .fragments()
        .iter()
        .map(|&fragment| FragmentState {
            fragment,
            cursor: None,
            exhausted: false,
            pages: Vec::new(),
        })
        .collect();

    let mut rate_limit_total: Option<RateLimitInfo> = None;
    let mut pending_reset: Option<DateTime<Utc>> = None;
    let mut round: u32 = 0;

    loop {
        if states.iter().all(|state| state.exhausted) {
            break;
        }
        if let Some(token) = cancel {
            if token.is_cancelled() {
                return Err(MetricsError::Cancelled);
            }
        }
        if round >= config.max_rounds {
            return Err(MetricsError::PaginationLimitExceeded {
                rounds: config.max_rounds,
            });
        }
        round += 1;

        // Suspend before the next request when the previous round reported a
        // low budget.
        if let Some(reset) = pending_reset.take() {
            let wait = wait_duration(reset, Utc::now(), config.rate_limit_grace_secs);
            info!("rate-limit budget low, waiting {}s for reset", wait.as_secs());
            sleep_cancellable(wait, cancel).await?;
        }

        let rendered: Vec<String> = states
            .iter()
            .filter(|state| !state.exhausted)
            .map(|state| {
                state
                    .fragment
                    .render(config.page_size, state.cursor.as_deref())
            })
            .collect();
        let query = QueryDocument::render(&rendered, config.rate_limit);
        let body = json!({ "query": query, "variables": document.variables() });

        let data = send_round(&client, config, &body, cancel).await?;

        if config.rate_limit {
            if let Some(info) = parse_rate_limit(&data) {
                match rate_limit_total.as_mut() {
                    Some(total) => total.absorb(&info),
                    None => rate_limit_total = Some(info.clone()),
                }
                if info.remaining < config.rate_limit_floor {
                    debug!(
                        "rate-limit budget low ({} of {} remaining)",
                        info.remaining, info.limit
                    );
                    pending_reset = Some(info.reset_at);
                }
            }
        }

        for state in states.iter_mut().filter(|state| !state.exhausted) {
            let page = assembler::extract_page(state.fragment, &data)?;
            if state.fragment.paginated && page.has_more {
                state.cursor = page.next_cursor.clone();
                // A connection claiming more pages without a cursor cannot advance.
                if state.cursor.is_none() {
                    state.exhausted = true;
                }
            } else {
                state.exhausted = true;
            }
            state.pages.push(page);
        }

        let pending = states.iter().filter(|state| !state.exhausted).count();
        if config.verbose {
            info!(
                "round {} complete, {} fragment(s) still paginating",
                round, pending
            );
        } else {
            debug!(
                "round {} complete, {} fragment(s) still paginating",
                round, pending
            );
        }
    }

    let streams = states
        .into_iter()
        .map(|state| (state.fragment.name.to_string(), state.pages))
        .collect();
    let mut record = assembler::assemble(streams);
    record.rate_limit = rate_limit_total;
    Ok(record)
}

/// Build the HTTP client with bearer auth and the GitHub preview media type
fn build_client(token: &str, config: &ExecutorConfig) -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_ACCEPT));
    let bearer = HeaderValue::from_str(&format!("bearer {}", token.trim()))
        .map_err(|_| MetricsError::auth("credential contains invalid header characters"))?;
    headers.insert(AUTHORIZATION, bearer);

    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(config.timeout())
        .default_headers(headers)
        .build()
        .map_err(|e| MetricsError::network(format!("Failed to build HTTP client: {}", e)))
}

/// Issue one round's request, retrying transient failures with back-off and
/// suspending on secondary rate limiting. Returns the response `data` object.
async fn send_round(
    client: &Client,
    config: &ExecutorConfig,
    body: &Value,
    cancel: Option<&CancelToken>,
) -> Result<Value> {
    let mut attempts = 0;
    let mut limit_waits = 0;
    let mut delay = config.retry_delay();

    loop {
        let outcome = client.post(config.endpoint.as_str()).json(body).send().await;
        match outcome {
            Ok(response) => {
                let status = response.status();

                if status == StatusCode::UNAUTHORIZED {
                    return Err(MetricsError::auth("invalid or expired token (HTTP 401)"));
                }

                if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS {
                    if limit_waits >= config.max_retries {
                        return Err(MetricsError::network(format!(
                            "rate limited and wait budget exhausted (HTTP {})",
                            status
                        )));
                    }
                    limit_waits += 1;
                    let wait = response
                        .headers()
                        .get("x-ratelimit-reset")
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.parse::<i64>().ok())
                        .and_then(|epoch| DateTime::<Utc>::from_timestamp(epoch, 0))
                        .map(|reset| wait_duration(reset, Utc::now(), config.rate_limit_grace_secs))
                        .unwrap_or_else(|| Duration::from_secs(60));
                    warn!(
                        "rate limit exceeded (HTTP {}), sleeping {}s",
                        status,
                        wait.as_secs()
                    );
                    sleep_cancellable(wait, cancel).await?;
                    continue;
                }

                if status.is_server_error() {
                    if attempts >= config.max_retries {
                        return Err(MetricsError::network(format!(
                            "server error persisted after {} retries (HTTP {})",
                            attempts, status
                        )));
                    }
                    warn!("server error (HTTP {}), retrying", status);
                    attempts += 1;
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                    continue;
                }

                if !status.is_success() {
                    return Err(MetricsError::schema(format!("HTTP {}", status)));
                }

                let payload: Value = response.json().await?;
                if let Some(errors) = payload.get("errors").and_then(Value::as_array) {
                    if !errors.is_empty() {
                        let message = errors[0]
                            .get("message")
                            .and_then(Value::as_str)
                            .unwrap_or("unknown GraphQL error");
                        return Err(MetricsError::schema(message.to_string()));
                    }
                }
                return payload
                    .get("data")
                    .cloned()
                    .ok_or_else(|| MetricsError::schema("response carried no data object"));
            }
            Err(e) => {
                if attempts >= config.max_retries {
                    return Err(MetricsError::Network(Box::new(e)));
                }
                warn!("request failed, retrying: {}", e);
                attempts += 1;
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
        }
    }
}

/// Parse the rateLimit object out of a response's data, if present
fn parse_rate_limit(data: &Value) -> Option<RateLimitInfo> {
    data.get("rateLimit")
        .cloned()
        .and_then(|value| serde_json::from_value(value).ok())
}

/// How long to suspend until the given reset time, plus grace
pub(crate) fn wait_duration(
    reset_at: DateTime<Utc>,
    now: DateTime<Utc>,
    grace_secs: u64,
) -> Duration {
    let until_reset = (reset_at - now).num_milliseconds().max(0) as u64;
    Duration::from_millis(until_reset) + Duration::from_secs(grace_secs)
}

/// Sleep in short slices so cancellation interrupts a rate-limit wait
async fn sleep_cancellable(total: Duration, cancel: Option<&CancelToken>) -> Result<()> {
    const SLICE: Duration = Duration::from_millis(500);
    let mut remaining = total;
    while remaining > Duration::ZERO {
        if let Some(token) = cancel {
            if token.is_cancelled() {
                return Err(MetricsError::Cancelled);
            }
        }
        let nap = remaining.min(SLICE);
        tokio::time::sleep(nap).await;
        remaining = remaining.saturating_sub(nap);
    }
    Ok(())
}
