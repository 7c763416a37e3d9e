//! Normalizes paginated fragment results into one canonical record

use crate::error::{MetricsError, Result};
use crate::query::FragmentDescriptor;
use crate::types::{CanonicalRecord, Page};
use serde_json::Value;
use std::collections::BTreeMap;

/// Resolve a fragment's declared result path against one raw response.
///
/// A missing key signals a library/schema contract violation and is fatal.
/// An explicit JSON `null` at or along the path means the repository simply
/// lacks that data (no default branch, no license) and resolves to `None`.
pub fn resolve_path<'a>(
    fragment: &FragmentDescriptor,
    data: &'a Value,
) -> Result<Option<&'a Value>> {
    let mut current = data;
    for key in fragment.result_path {
        if current.is_null() {
            return Ok(None);
        }
        current = current
            .get(key)
            .ok_or_else(|| MetricsError::mismatch(fragment.name, fragment.path_display()))?;
    }
    if current.is_null() {
        return Ok(None);
    }
    Ok(Some(current))
}

/// Extract one page for a fragment from one raw response.
///
/// Connections contribute their `nodes` plus pagination info; plain arrays
/// contribute their elements; any other payload is a single-shot item.
pub fn extract_page(fragment: &FragmentDescriptor, data: &Value) -> Result<Page> {
    let payload = match resolve_path(fragment, data)? {
        Some(payload) => payload,
        None => return Ok(Page::terminal(Vec::new())),
    };

    if fragment.paginated {
        let nodes = payload
            .get("nodes")
            .and_then(Value::as_array)
            .ok_or_else(|| MetricsError::mismatch(fragment.name, fragment.path_display()))?;
        let page_info = payload
            .get("pageInfo")
            .ok_or_else(|| MetricsError::mismatch(fragment.name, fragment.path_display()))?;
        let has_more = page_info
            .get("hasNextPage")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let next_cursor = page_info
            .get("endCursor")
            .and_then(Value::as_str)
            .map(String::from);
        return Ok(Page {
            items: nodes.clone(),
            next_cursor,
            has_more,
        });
    }

    let items = match payload {
        Value::Array(elements) => elements.clone(),
        other => vec![other.clone()],
    };
    Ok(Page::terminal(items))
}

/// Fold completed page streams into the canonical record.
///
/// Pure; preserves API response order within each fragment and keeps
/// duplicates.
pub fn assemble(streams: Vec<(String, Vec<Page>)>) -> CanonicalRecord {
    let mut fragments = BTreeMap::new();
    for (name, pages) in streams {
        let merged: Vec<Value> = pages.into_iter().flat_map(|page| page.items).collect();
        fragments.insert(name, merged);
    }
    CanonicalRecord::new(fragments)
}
