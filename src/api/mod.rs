//! GitHub Projects (v2) remote data access
//!
//! [`ProjectDataProvider`] is the boundary the engines depend on;
//! [`GitHubClient`] implements it over the GraphQL API with retries for
//! reads, a shared rate limiter, and per-request timeouts.

pub mod client;
pub mod constants;
pub mod fields;
pub mod graphql;
pub mod models;
pub mod provider;
pub mod resilience;

pub use client::GitHubClient;
pub use models::{
    FieldDataType, FieldUpdate, FieldValue, Item, ItemFieldValue, ItemMutation, ItemPage, ItemRef,
    ItemType, Milestone, Project, ProjectAction, ProjectField, ProjectRef, ProjectView,
};
pub use provider::ProjectDataProvider;
pub use resilience::{RateLimitConfig, RateLimiter, ResilienceConfig, RetryConfig, RetryPolicy};
