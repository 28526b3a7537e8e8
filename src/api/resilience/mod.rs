//! Retry, rate limiting and timeout settings for GraphQL traffic

pub mod config;
pub mod rate_limiter;
pub mod retry;

pub use config::{RateLimitConfig, ResilienceConfig, ResilienceConfigBuilder};
pub use rate_limiter::{RateLimiter, RateLimiterStats};
pub use retry::{RetryConfig, RetryPolicy};
