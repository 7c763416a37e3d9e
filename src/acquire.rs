//! High-level acquisition surface for one repository

use crate::config::ExecutorConfig;
use crate::error::Result;
use crate::executor;
use crate::query::QueryBuilder;
use crate::types::{CancelToken, CanonicalRecord};
use tracing::info;

/// Fluent acquisition request for a single repository.
///
/// Accumulates fragment selections, then executes them against the API:
///
/// ```no_run
/// use repo_health_metrics::{ExecutorConfig, RepositoryQuery};
///
/// # #[tokio::main]
/// # async fn main() -> anyhow::Result<()> {
/// let record = RepositoryQuery::new("rust-lang", "rust")
///     .select_all()
///     .execute("ghp_token", &ExecutorConfig::default())
///     .await?;
/// println!("{} fragments acquired", record.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct RepositoryQuery {
    owner: String,
    name: String,
    builder: QueryBuilder,
}

impl RepositoryQuery {
    /// Start a request for `owner/name`
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            builder: QueryBuilder::new(),
        }
    }

    /// Add one fragment by name; fails on names the library does not know
    pub fn select(mut self, fragment: &str) -> Result<Self> {
        self.builder.select(fragment)?;
        Ok(self)
    }

    /// Add every fragment in the library
    pub fn select_all(mut self) -> Self {
        self.builder.select_all();
        self
    }

    /// Fragment names selected so far
    pub fn selected(&self) -> Vec<&'static str> {
        self.builder.selected_names()
    }

    /// Execute the selection and assemble the canonical record.
    ///
    /// The credential is an opaque bearer token supplied by the caller; the
    /// core never sources it from the environment.
    pub async fn execute(self, token: &str, config: &ExecutorConfig) -> Result<CanonicalRecord> {
        self.run(token, config, None).await
    }

    /// Like [`execute`](Self::execute), but abortable at round boundaries
    pub async fn execute_with_cancel(
        self,
        token: &str,
        config: &ExecutorConfig,
        cancel: &CancelToken,
    ) -> Result<CanonicalRecord> {
        self.run(token, config, Some(cancel)).await
    }

    async fn run(
        self,
        token: &str,
        config: &ExecutorConfig,
        cancel: Option<&CancelToken>,
    ) -> Result<CanonicalRecord> {
        let document = self.builder.build(self.owner, self.name)?;
        info!(
            "acquiring {}/{} ({} fragments)",
            document.owner(),
            document.name(),
            document.fragments().len()
        );
        let record = executor::execute_document(&document, token, config, cancel).await?;
        info!(
            "acquisition of {}/{} complete",
            document.owner(),
            document.name()
        );
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MetricsError;
    use crate::query::LIBRARY;

    #[test]
    fn test_select_unknown_fragment_fails_at_build_time() {
        let err = RepositoryQuery::new("rust-lang", "rust")
            .select("stargazer_history")
            .unwrap_err();
        assert!(matches!(err, MetricsError::UnknownFragment(_)));
    }

    #[tokio::test]
    async fn test_empty_selection_fails_before_any_request() {
        let err = RepositoryQuery::new("rust-lang", "rust")
            .execute("token", &ExecutorConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, MetricsError::EmptySelection));
    }

    #[test]
    fn test_select_all_covers_library() {
        let query = RepositoryQuery::new("rust-lang", "rust").select_all();
        assert_eq!(query.selected().len(), LIBRARY.len());
    }
}
