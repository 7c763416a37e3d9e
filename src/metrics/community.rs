//! Metrics over repository identity, policies, and community signals

use super::{require_fragment, require_single};
use crate::error::MetricError;
use crate::types::CanonicalRecord;
use serde_json::{json, Value};

type MetricResult = std::result::Result<Value, MetricError>;

fn overview_field<'a>(record: &'a CanonicalRecord, field: &str) -> std::result::Result<&'a Value, MetricError> {
    let overview = require_single(record, "overview")?;
    overview
        .get(field)
        .ok_or_else(|| MetricError::missing_field(field))
}

/// Repository name, owner login, and the combined slug
pub(super) fn identity(record: &CanonicalRecord) -> MetricResult {
    let overview = require_single(record, "overview")?;
    let name = overview
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| MetricError::missing_field("name"))?;
    let owner = overview
        .get("owner")
        .and_then(|o| o.get("login"))
        .and_then(Value::as_str)
        .ok_or_else(|| MetricError::missing_field("owner.login"))?;
    let name_with_owner = overview
        .get("nameWithOwner")
        .and_then(Value::as_str)
        .ok_or_else(|| MetricError::missing_field("nameWithOwner"))?;
    Ok(json!({
        "name": name,
        "owner": owner,
        "name_with_owner": name_with_owner,
    }))
}

/// Whether the repository declares a security policy
pub(super) fn has_security_policy(record: &CanonicalRecord) -> MetricResult {
    let value = overview_field(record, "isSecurityPolicyEnabled")?;
    Ok(json!(value.as_bool().unwrap_or(false)))
}

/// Whether a CONTRIBUTING document exists at any of the usual locations
pub(super) fn has_contributing_policy(record: &CanonicalRecord) -> MetricResult {
    let community = require_single(record, "community")?;
    let found = ["contributing_md", "contributing_txt", "contributing_raw"]
        .iter()
        .any(|key| {
            community
                .get(*key)
                .map(|blob| !blob.is_null())
                .unwrap_or(false)
        });
    Ok(json!(found))
}

/// Whether the repository declares at least one funding platform
pub(super) fn is_fundable(record: &CanonicalRecord) -> MetricResult {
    let links = require_fragment(record, "funding_links")?;
    Ok(json!(!links.is_empty()))
}

/// Total number of issues labelled as feature requests
pub(super) fn feature_request_count(record: &CanonicalRecord) -> MetricResult {
    feature_total(record, "feature_requests")
}

/// Number of closed issues labelled as feature requests
pub(super) fn closed_feature_request_count(record: &CanonicalRecord) -> MetricResult {
    feature_total(record, "closed_feature_requests")
}

fn feature_total(record: &CanonicalRecord, key: &str) -> MetricResult {
    let community = require_single(record, "community")?;
    let count = community
        .get(key)
        .and_then(|c| c.get("totalCount"))
        .and_then(Value::as_u64)
        .ok_or_else(|| MetricError::missing_field(key))?;
    Ok(json!(count))
}

/// Total dependencies declared across all manifests in the dependency graph
pub(super) fn dependency_count(record: &CanonicalRecord) -> MetricResult {
    let manifests = require_fragment(record, "manifests")?;
    let total: u64 = manifests
        .iter()
        .map(|manifest| {
            manifest
                .get("dependenciesCount")
                .and_then(Value::as_u64)
                .unwrap_or(0)
        })
        .sum();
    Ok(json!(total))
}

/// The repository license as `{spdx_id, name}`; null when none is detected
pub(super) fn license(record: &CanonicalRecord) -> MetricResult {
    let info = overview_field(record, "licenseInfo")?;
    if info.is_null() {
        return Ok(Value::Null);
    }
    Ok(json!({
        "spdx_id": info.get("spdxId").cloned().unwrap_or(Value::Null),
        "name": info.get("name").cloned().unwrap_or(Value::Null),
    }))
}

/// Number of stargazers
pub(super) fn stargazer_count(record: &CanonicalRecord) -> MetricResult {
    let value = overview_field(record, "stargazerCount")?;
    value
        .as_u64()
        .map(|count| json!(count))
        .ok_or_else(|| MetricError::missing_field("stargazerCount"))
}

/// Number of forks
pub(super) fn fork_count(record: &CanonicalRecord) -> MetricResult {
    let value = overview_field(record, "forkCount")?;
    value
        .as_u64()
        .map(|count| json!(count))
        .ok_or_else(|| MetricError::missing_field("forkCount"))
}

/// Whether the repository has been archived
pub(super) fn is_archived(record: &CanonicalRecord) -> MetricResult {
    let value = overview_field(record, "isArchived")?;
    Ok(json!(value.as_bool().unwrap_or(false)))
}
