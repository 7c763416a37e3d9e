//! Accumulates selected fragments into a composite query document

use crate::error::{MetricsError, Result};
use crate::query::fragments::{self, FragmentDescriptor};
use serde_json::{json, Value};

/// Selection that rides along on every round when rate limiting is enabled
const RATELIMIT_SELECTION: &str = "rateLimit { cost limit remaining resetAt nodeCount used }";

/// Accumulates a set of fragments for one acquisition request.
///
/// Pure data assembly; no network access happens here.
#[derive(Debug, Default)]
pub struct QueryBuilder {
    selected: Vec<&'static FragmentDescriptor>,
}

impl QueryBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one fragment from the library by name.
    ///
    /// Selecting the same fragment twice is a no-op.
    pub fn select(&mut self, name: &str) -> Result<()> {
        let fragment = fragments::find(name)
            .ok_or_else(|| MetricsError::UnknownFragment(name.to_string()))?;
        if !self.selected.iter().any(|f| f.name == fragment.name) {
            self.selected.push(fragment);
        }
        Ok(())
    }

    /// Add every fragment in the library
    pub fn select_all(&mut self) {
        for fragment in fragments::LIBRARY {
            if !self.selected.iter().any(|f| f.name == fragment.name) {
                self.selected.push(fragment);
            }
        }
    }

    /// Names selected so far, in insertion order
    pub fn selected_names(&self) -> Vec<&'static str> {
        self.selected.iter().map(|f| f.name).collect()
    }

    /// Freeze the selection into an immutable query document
    pub fn build(self, owner: impl Into<String>, name: impl Into<String>) -> Result<QueryDocument> {
        if self.selected.is_empty() {
            return Err(MetricsError::EmptySelection);
        }
        Ok(QueryDocument {
            owner: owner.into(),
            name: name.into(),
            fragments: self.selected,
        })
    }
}

/// Immutable composite query over a fixed set of fragments.
///
/// The executor renders one document per round, covering only the fragments
/// that still have pages.
#[derive(Debug, Clone)]
pub struct QueryDocument {
    owner: String,
    name: String,
    fragments: Vec<&'static FragmentDescriptor>,
}

impl QueryDocument {
    /// Repository owner login
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Repository name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The fragments this document covers, in selection order
    pub fn fragments(&self) -> &[&'static FragmentDescriptor] {
        &self.fragments
    }

    /// GraphQL variables for every round of this document
    pub fn variables(&self) -> Value {
        json!({ "owner": self.owner, "name": self.name })
    }

    /// Render a full query document from pre-rendered fragment fields
    pub fn render(rendered_fragments: &[String], rate_limit: bool) -> String {
        let mut body = rendered_fragments.join(" ");
        if rate_limit {
            body.push(' ');
            body.push_str(RATELIMIT_SELECTION);
        }
        format!("query($owner: String!, $name: String!) {{ {} }}", body)
    }
}
