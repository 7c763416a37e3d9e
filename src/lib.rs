//! # repo_health_metrics
//!
//! Acquire repository metadata from the GitHub GraphQL API and derive
//! standardized open-source-health metrics from it:
//! - **Composable acquisition**: named query fragments (commits, issues,
//!   releases, dependency manifests, ...) selected per request and paginated
//!   independently until exhaustion
//! - **Budget-aware execution**: cost tracking against the API rate limit with
//!   automatic suspension until the quota window resets
//! - **Metrics pipeline**: a registry of pure scoring functions over the
//!   acquired record, with per-metric failure isolation
//!
//! ## Quick Start
//!
//! ```no_run
//! use repo_health_metrics::{get_metrics, ExecutorConfig, RepositoryQuery};
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let config = ExecutorConfig {
//!     rate_limit: true,
//!     ..Default::default()
//! };
//! let record = RepositoryQuery::new("laurent22", "joplin")
//!     .select_all()
//!     .execute("ghp_yourtoken", &config)
//!     .await?;
//!
//! for (name, outcome) in get_metrics(&record) {
//!     println!("{}: {:?}", name, outcome);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Design
//!
//! Acquisition is all-or-nothing: a fatal error (authentication, rejected
//! query, exhausted retries) or a cancellation discards every partial page, so
//! the metrics engine only ever observes complete records. Metric failures go
//! the other way: each computation is isolated and reported as an explicit
//! failure marker, and a metrics run never fails as a whole.

mod acquire;
mod assembler;
mod config;
mod error;
mod executor;
mod metrics;
mod query;
mod types;

// Re-export public API
pub use acquire::RepositoryQuery;
pub use assembler::{assemble, extract_page, resolve_path};
pub use config::{ExecutorConfig, GITHUB_GRAPHQL_ENDPOINT};
pub use error::{MetricError, MetricsError, Result};
pub use metrics::{get_metric, get_metrics, MetricFn, MetricsRegistry};
pub use query::{FragmentDescriptor, QueryBuilder, QueryDocument, LIBRARY};
pub use types::{
    CancelToken, CanonicalRecord, MetricOutcome, MetricReport, Page, RateLimitInfo,
};
