//! Metrics over repository activity: pull requests, commits, releases, issues

use super::{parse_time, require_fragment};
use crate::error::MetricError;
use crate::types::CanonicalRecord;
use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};
use std::collections::BTreeMap;

type MetricResult = std::result::Result<Value, MetricError>;

/// Mean time between opening and merging pull requests, in milliseconds.
/// Null when no merged pull requests exist.
pub(super) fn mean_pull_requests(record: &CanonicalRecord) -> MetricResult {
    let diffs = merge_latencies_ms(record)?;
    if diffs.is_empty() {
        return Ok(Value::Null);
    }
    let mean = diffs.iter().sum::<f64>() / diffs.len() as f64;
    Ok(json!(mean))
}

/// Median time between opening and merging pull requests, in milliseconds
pub(super) fn median_pull_requests(record: &CanonicalRecord) -> MetricResult {
    let mut diffs = merge_latencies_ms(record)?;
    if diffs.is_empty() {
        return Ok(Value::Null);
    }
    diffs.sort_by(|a, b| a.total_cmp(b));
    let mid = diffs.len() / 2;
    let median = if diffs.len() % 2 == 0 {
        (diffs[mid - 1] + diffs[mid]) / 2.0
    } else {
        diffs[mid]
    };
    Ok(json!(median))
}

fn merge_latencies_ms(record: &CanonicalRecord) -> std::result::Result<Vec<f64>, MetricError> {
    let pulls = require_fragment(record, "pull_requests")?;
    let mut diffs = Vec::new();
    for pull in pulls {
        // Unmerged entries carry a null mergedAt; skip them.
        let merged = pull.get("mergedAt").and_then(Value::as_str);
        let created = pull.get("createdAt").and_then(Value::as_str);
        if merged.is_none() || created.is_none() {
            continue;
        }
        let merged_at = parse_time(pull, "mergedAt")?;
        let created_at = parse_time(pull, "createdAt")?;
        diffs.push((merged_at - created_at).num_milliseconds() as f64);
    }
    Ok(diffs)
}

/// Number of commits acquired from the default branch history
pub(super) fn commit_count(record: &CanonicalRecord) -> MetricResult {
    let commits = require_fragment(record, "commits")?;
    Ok(json!(commits.len()))
}

/// Number of distinct commit authors
pub(super) fn contributor_count(record: &CanonicalRecord) -> MetricResult {
    let counts = author_contributions(record)?;
    Ok(json!(counts.len()))
}

/// Smallest number of authors whose commits cover at least half of all
/// commits. A low factor means the project depends on very few people.
pub(super) fn elephant_factor(record: &CanonicalRecord) -> MetricResult {
    let counts = author_contributions(record)?;
    let total: u64 = counts.values().sum();
    if total == 0 {
        return Ok(json!(0));
    }
    let mut sorted: Vec<u64> = counts.into_values().collect();
    sorted.sort_unstable_by(|a, b| b.cmp(a));

    let threshold = total as f64 * 0.5;
    let mut covered = 0.0;
    let mut factor = 0u32;
    for count in sorted {
        if covered <= threshold {
            covered += count as f64;
            factor += 1;
        }
    }
    Ok(json!(factor))
}

fn author_contributions(
    record: &CanonicalRecord,
) -> std::result::Result<BTreeMap<String, u64>, MetricError> {
    let commits = require_fragment(record, "commits")?;
    let mut counts = BTreeMap::new();
    for commit in commits {
        let author = commit.get("author");
        let login = author
            .and_then(|a| a.get("user"))
            .and_then(|u| u.get("login"))
            .and_then(Value::as_str);
        // Commits without a linked account fall back to the author email.
        let key = login.or_else(|| {
            author
                .and_then(|a| a.get("email"))
                .and_then(Value::as_str)
        });
        if let Some(key) = key {
            *counts.entry(key.to_string()).or_insert(0) += 1;
        }
    }
    Ok(counts)
}

/// Ratio of deleted to added lines over the last month, as a percentage.
/// Null when the window holds no commits or no additions.
pub(super) fn churn(record: &CanonicalRecord) -> MetricResult {
    let commits = require_fragment(record, "commits")?;
    let cutoff = Utc::now() - Duration::days(30);

    let mut added: u64 = 0;
    let mut deleted: u64 = 0;
    let mut seen = false;
    for commit in commits {
        let committed_at = parse_time(commit, "committedDate")?;
        if committed_at < cutoff {
            continue;
        }
        seen = true;
        added += commit.get("additions").and_then(Value::as_u64).unwrap_or(0);
        deleted += commit.get("deletions").and_then(Value::as_u64).unwrap_or(0);
    }
    if !seen || added == 0 {
        return Ok(Value::Null);
    }
    Ok(json!((deleted as f64 / added as f64) * 100.0))
}

/// Number of published releases
pub(super) fn release_count(record: &CanonicalRecord) -> MetricResult {
    let releases = require_fragment(record, "releases")?;
    Ok(json!(releases.len()))
}

/// Mean days between consecutive releases; null with fewer than two
pub(super) fn release_cadence(record: &CanonicalRecord) -> MetricResult {
    let releases = require_fragment(record, "releases")?;
    let mut published: Vec<DateTime<Utc>> = Vec::new();
    for release in releases {
        if release.get("publishedAt").and_then(Value::as_str).is_some() {
            published.push(parse_time(release, "publishedAt")?);
        }
    }
    if published.len() < 2 {
        return Ok(Value::Null);
    }
    published.sort_unstable();
    let gaps: Vec<f64> = published
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).num_seconds() as f64 / 86_400.0)
        .collect();
    let mean = gaps.iter().sum::<f64>() / gaps.len() as f64;
    Ok(json!(mean))
}

/// Summary of issue activity over the last three months: counts by state,
/// average resolving time, and weekly creation average
pub(super) fn issue_activity(record: &CanonicalRecord) -> MetricResult {
    let issues = require_fragment(record, "issues")?;
    let cutoff = Utc::now() - Duration::days(90);

    let mut total = 0u64;
    let mut open = 0u64;
    let mut closed = 0u64;
    let mut close_days: Vec<f64> = Vec::new();
    let mut created_times: Vec<DateTime<Utc>> = Vec::new();

    for issue in issues {
        let updated_at = parse_time(issue, "updatedAt")?;
        if updated_at < cutoff {
            continue;
        }
        total += 1;
        created_times.push(parse_time(issue, "createdAt")?);
        match issue.get("state").and_then(Value::as_str) {
            Some("OPEN") => open += 1,
            Some("CLOSED") => {
                closed += 1;
                if issue.get("closedAt").and_then(Value::as_str).is_some() {
                    let closed_at = parse_time(issue, "closedAt")?;
                    let created_at = parse_time(issue, "createdAt")?;
                    close_days.push((closed_at - created_at).num_seconds() as f64 / 86_400.0);
                }
            }
            _ => {}
        }
    }

    let average_resolving_days = if close_days.is_empty() {
        Value::Null
    } else {
        json!(close_days.iter().sum::<f64>() / close_days.len() as f64)
    };

    Ok(json!({
        "total_issues": total,
        "open_issues": open,
        "closed_issues": closed,
        "average_issue_resolving_days": average_resolving_days,
        "average_issues_created_per_week": weekly_average(&created_times),
    }))
}

/// Share of closed issues over all acquired issues, as a percentage
pub(super) fn issue_close_ratio(record: &CanonicalRecord) -> MetricResult {
    let issues = require_fragment(record, "issues")?;
    if issues.is_empty() {
        return Ok(Value::Null);
    }
    let closed = issues
        .iter()
        .filter(|issue| issue.get("state").and_then(Value::as_str) == Some("CLOSED"))
        .count();
    Ok(json!((closed as f64 / issues.len() as f64) * 100.0))
}

/// Average events per week across the span covered by the given times
fn weekly_average(times: &[DateTime<Utc>]) -> Value {
    if times.len() < 2 {
        return Value::Null;
    }
    let earliest = times.iter().min().copied().unwrap_or_else(Utc::now);
    let latest = times.iter().max().copied().unwrap_or_else(Utc::now);
    let weeks = ((latest - earliest).num_days() / 7 + 1) as usize;
    let mut per_week = vec![0u64; weeks];
    for time in times {
        let index = ((*time - earliest).num_days() / 7) as usize;
        per_week[index] += 1;
    }
    let mean = per_week.iter().sum::<u64>() as f64 / per_week.len() as f64;
    json!(mean.round())
}
