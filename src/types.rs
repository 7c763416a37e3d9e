//! Core data types shared by the acquisition pipeline and the metrics engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// One page of raw records for a single fragment, produced per HTTP round-trip
/// and discarded after assembly
#[derive(Debug, Clone)]
pub struct Page {
    /// Raw records in API response order
    pub items: Vec<Value>,
    /// Opaque cursor marking the position for the next page
    pub next_cursor: Option<String>,
    /// Whether the API reported further pages
    pub has_more: bool,
}

impl Page {
    /// A terminal page carrying the given items and no continuation
    pub fn terminal(items: Vec<Value>) -> Self {
        Self {
            items,
            next_cursor: None,
            has_more: false,
        }
    }
}

/// Rate-limit budget signal returned by the API alongside each response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitInfo {
    /// Cost of the query that produced this signal
    pub cost: u32,
    /// Total budget per window
    pub limit: u32,
    /// Remaining budget in the current window
    pub remaining: u32,
    /// When the current window resets
    pub reset_at: DateTime<Utc>,
    /// Nodes touched by the query
    pub node_count: u32,
    /// Budget consumed in the current window
    pub used: u32,
}

impl RateLimitInfo {
    /// Fold a later round's signal into an accumulated one.
    ///
    /// Costs and node counts sum across rounds; remaining/reset/used always
    /// reflect the most recent response.
    pub fn absorb(&mut self, later: &RateLimitInfo) {
        self.cost += later.cost;
        self.node_count += later.node_count;
        self.limit = later.limit;
        self.remaining = later.remaining;
        self.reset_at = later.reset_at;
        self.used = later.used;
    }
}

/// The fully merged, fragment-keyed result of one acquisition run.
///
/// Each fragment maps to all of its pages concatenated in API response order.
/// Single-shot fragments contribute a one-element sequence. Immutable once
/// assembled; the sole input to every metric function.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CanonicalRecord {
    fragments: BTreeMap<String, Vec<Value>>,
    /// Accumulated rate-limit signal, present when rate limiting was enabled
    pub rate_limit: Option<RateLimitInfo>,
}

impl CanonicalRecord {
    /// Create a record from pre-merged fragment sequences
    pub fn new(fragments: BTreeMap<String, Vec<Value>>) -> Self {
        Self {
            fragments,
            rate_limit: None,
        }
    }

    /// All records acquired for a fragment, in API order
    pub fn fragment(&self, name: &str) -> Option<&[Value]> {
        self.fragments.get(name).map(Vec::as_slice)
    }

    /// The single payload of a single-shot fragment
    pub fn single(&self, name: &str) -> Option<&Value> {
        self.fragments.get(name).and_then(|items| items.first())
    }

    /// Whether the record contains data for the given fragment
    pub fn contains(&self, name: &str) -> bool {
        self.fragments.contains_key(name)
    }

    /// Fragment names present in this record
    pub fn fragment_names(&self) -> impl Iterator<Item = &str> {
        self.fragments.keys().map(String::as_str)
    }

    /// Number of fragments in this record
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    /// Whether the record holds no fragments at all
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

/// Outcome of one metric computation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum MetricOutcome {
    /// The metric computed successfully
    Value { value: Value },
    /// The metric failed; the run continued without it
    Failed { reason: String },
}

impl MetricOutcome {
    /// The computed value, if the metric succeeded
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Value { value } => Some(value),
            Self::Failed { .. } => None,
        }
    }

    /// Whether the metric failed
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Mapping of metric name to outcome, produced fresh per metrics run.
///
/// Covers every registered metric: failures appear as explicit markers, never
/// as absent keys.
pub type MetricReport = BTreeMap<String, MetricOutcome>;

/// Cancellation handle for an in-flight acquisition.
///
/// Cancelling aborts at the next round boundary; already merged partial pages
/// are discarded, so no partial canonical record ever becomes visible.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a fresh, uncancelled token
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
