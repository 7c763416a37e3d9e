//! Declarative library of reusable GraphQL query fragments
//!
//! Each fragment aliases its own `repository(owner:, name:)` selection, so
//! fragments never share response keys and the builder, executor, and
//! assembler can treat them generically. Paginated fragments embed `{first}`
//! and `{after}` placeholders that are substituted per round.

use serde_json::Value;

/// A named, independently paginated sub-query against the GitHub schema.
///
/// Process-wide constant; adding a fragment here is all that is needed to make
/// it selectable, executable, and assemblable.
#[derive(Debug, Clone, Copy)]
pub struct FragmentDescriptor {
    /// Unique fragment name, also the alias of its repository selection and
    /// its key in the canonical record
    pub name: &'static str,
    /// Selection body placed inside the aliased `repository` field
    pub selection: &'static str,
    /// Keys from the response `data` object to this fragment's payload
    pub result_path: &'static [&'static str],
    /// Whether the payload is a cursor-paginated connection
    pub paginated: bool,
}

impl FragmentDescriptor {
    /// Render this fragment's aliased repository field for one round.
    ///
    /// `after` is embedded as a JSON-escaped string literal; cursors are
    /// opaque and must round-trip byte-exact.
    pub fn render(&self, page_size: u32, after: Option<&str>) -> String {
        let after_arg = match after {
            Some(cursor) => format!(", after: {}", Value::String(cursor.to_string())),
            None => String::new(),
        };
        let selection = self
            .selection
            .replace("{first}", &page_size.to_string())
            .replace("{after}", &after_arg);
        format!(
            "{}: repository(owner: $owner, name: $name) {{ {} }}",
            self.name, selection
        )
    }

    /// Dotted rendering of the result path, for error messages
    pub fn path_display(&self) -> String {
        self.result_path.join(".")
    }
}

/// Repository identity, popularity, and policy flags
const OVERVIEW: FragmentDescriptor = FragmentDescriptor {
    name: "overview",
    selection: "name nameWithOwner owner { login } isArchived isFork \
                stargazerCount forkCount createdAt pushedAt \
                licenseInfo { spdxId name } isSecurityPolicyEnabled hasIssuesEnabled",
    result_path: &["overview"],
    paginated: false,
};

/// Declared funding platforms
const FUNDING_LINKS: FragmentDescriptor = FragmentDescriptor {
    name: "funding_links",
    selection: "fundingLinks { platform url }",
    result_path: &["funding_links", "fundingLinks"],
    paginated: false,
};

/// Contribution guidelines and feature-request counts.
///
/// CONTRIBUTING is probed at the usual locations; the label filter matches the
/// labels commonly used for feature requests.
const COMMUNITY: FragmentDescriptor = FragmentDescriptor {
    name: "community",
    selection: "contributing_md: object(expression: \"HEAD:CONTRIBUTING.md\") { ... on Blob { oid byteSize } } \
                contributing_txt: object(expression: \"HEAD:CONTRIBUTING.txt\") { ... on Blob { oid byteSize } } \
                contributing_raw: object(expression: \"HEAD:CONTRIBUTING\") { ... on Blob { oid byteSize } } \
                feature_requests: issues(first: 0, states: [OPEN, CLOSED], filterBy: {labels: [\"enhancement\", \"feature\", \"feature request\", \"feature-request\"]}) { totalCount } \
                closed_feature_requests: issues(first: 0, states: [CLOSED], filterBy: {labels: [\"enhancement\", \"feature\", \"feature request\", \"feature-request\"]}) { totalCount }",
    result_path: &["community"],
    paginated: false,
};

/// Merged pull requests with creation and merge timestamps
const PULL_REQUESTS: FragmentDescriptor = FragmentDescriptor {
    name: "pull_requests",
    selection: "pullRequests(states: MERGED, first: {first}{after}) { \
                totalCount pageInfo { hasNextPage endCursor } \
                nodes { createdAt mergedAt } }",
    result_path: &["pull_requests", "pullRequests"],
    paginated: true,
};

/// Issues in any state with lifecycle timestamps
const ISSUES: FragmentDescriptor = FragmentDescriptor {
    name: "issues",
    selection: "issues(states: [OPEN, CLOSED], first: {first}{after}) { \
                totalCount pageInfo { hasNextPage endCursor } \
                nodes { state createdAt closedAt updatedAt } }",
    result_path: &["issues", "issues"],
    paginated: true,
};

/// Published releases
const RELEASES: FragmentDescriptor = FragmentDescriptor {
    name: "releases",
    selection: "releases(first: {first}{after}) { \
                totalCount pageInfo { hasNextPage endCursor } \
                nodes { publishedAt tagName isPrerelease } }",
    result_path: &["releases", "releases"],
    paginated: true,
};

/// Commit history of the default branch, including per-commit line counts
const COMMITS: FragmentDescriptor = FragmentDescriptor {
    name: "commits",
    selection: "defaultBranchRef { target { ... on Commit { \
                history(first: {first}{after}) { \
                totalCount pageInfo { hasNextPage endCursor } \
                nodes { committedDate additions deletions author { email user { login } } } } } } }",
    result_path: &["commits", "defaultBranchRef", "target", "history"],
    paginated: true,
};

/// Dependency manifests from the dependency graph
const MANIFESTS: FragmentDescriptor = FragmentDescriptor {
    name: "manifests",
    selection: "dependencyGraphManifests(first: {first}{after}) { \
                totalCount pageInfo { hasNextPage endCursor } \
                nodes { filename dependenciesCount } }",
    result_path: &["manifests", "dependencyGraphManifests"],
    paginated: true,
};

/// Every fragment known to the library
pub const LIBRARY: &[FragmentDescriptor] = &[
    OVERVIEW,
    FUNDING_LINKS,
    COMMUNITY,
    PULL_REQUESTS,
    ISSUES,
    RELEASES,
    COMMITS,
    MANIFESTS,
];

/// Look up a fragment descriptor by name
pub fn find(name: &str) -> Option<&'static FragmentDescriptor> {
    LIBRARY.iter().find(|fragment| fragment.name == name)
}
