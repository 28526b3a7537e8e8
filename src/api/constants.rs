//! API constants for the GitHub GraphQL endpoint

/// Public GitHub GraphQL endpoint
pub const DEFAULT_API_URL: &str = "https://api.github.com/graphql";

/// Largest page GitHub accepts for connection fields
pub const MAX_PAGE_SIZE: u32 = 100;

/// Field values fetched per item
pub const FIELD_VALUES_PER_ITEM: u32 = 50;

/// Assignees fetched per item
pub const ASSIGNEES_PER_ITEM: u32 = 20;

pub const USER_AGENT: &str = concat!("gh-projects/", env!("CARGO_PKG_VERSION"));

/// Standard headers for GraphQL requests
pub mod headers {
    pub const CONTENT_TYPE_JSON: &str = "application/json";

    pub const ACCEPT_JSON: &str = "application/vnd.github+json";

    pub const X_CORRELATION_ID: &str = "X-Correlation-Id";
}

/// GraphQL error `type` values GitHub uses
pub mod error_types {
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const FORBIDDEN: &str = "FORBIDDEN";
    pub const INSUFFICIENT_SCOPES: &str = "INSUFFICIENT_SCOPES";
    pub const RATE_LIMITED: &str = "RATE_LIMITED";
}
