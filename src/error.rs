//! Error types for acquisition and metric computation

use thiserror::Error;

/// Result type alias for acquisition and registry operations
pub type Result<T> = std::result::Result<T, MetricsError>;

/// Main error type for the acquisition pipeline and the metrics registry
#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("Unknown query fragment: {0}")]
    UnknownFragment(String),

    #[error("No query fragments selected")]
    EmptySelection,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Metric already registered: {0}")]
    DuplicateMetric(String),

    #[error("Unknown metric: {0}")]
    UnknownMetric(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Query rejected by the API: {0}")]
    Schema(String),

    #[error("Network error: {0}")]
    Network(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Fragment '{fragment}' did not resolve at path '{path}'")]
    AssemblyMismatch { fragment: String, path: String },

    #[error("Pagination did not terminate within {rounds} rounds")]
    PaginationLimitExceeded { rounds: u32 },

    #[error("Acquisition cancelled")]
    Cancelled,

    #[error("HTTP request error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

#[derive(Debug)]
struct StringError(String);

impl std::fmt::Display for StringError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for StringError {}

impl MetricsError {
    /// Create a network error from a plain message
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(Box::new(StringError(msg.into())))
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a schema error
    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }

    /// Create an assembly mismatch error
    pub fn mismatch(fragment: impl Into<String>, path: impl Into<String>) -> Self {
        Self::AssemblyMismatch {
            fragment: fragment.into(),
            path: path.into(),
        }
    }

    /// Whether the error aborts an acquisition as a whole (as opposed to
    /// build-time configuration errors raised before any request is sent)
    pub fn is_fatal_acquisition(&self) -> bool {
        matches!(
            self,
            Self::Authentication(_)
                | Self::Schema(_)
                | Self::Network(_)
                | Self::AssemblyMismatch { .. }
                | Self::PaginationLimitExceeded { .. }
                | Self::Cancelled
        )
    }
}

/// Failure of a single metric computation.
///
/// Never escalated: the runner captures these as failure markers in the
/// report, keyed by metric name.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct MetricError(pub String);

impl MetricError {
    /// Create a metric error from a plain message
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// The required fragment is absent from the canonical record
    pub fn missing_fragment(name: &str) -> Self {
        Self(format!("fragment '{}' not present in record", name))
    }

    /// A field expected within the fragment data is absent or mistyped
    pub fn missing_field(field: &str) -> Self {
        Self(format!("expected field '{}' absent or mistyped", field))
    }
}
