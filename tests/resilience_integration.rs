//! Integration tests for the client's resilience stack: retry policy,
//! rate limiting and transport error classification working together.

use gh_projects::api::{
    GitHubClient, ProjectDataProvider, RateLimitConfig, RateLimiter, ResilienceConfig,
    RetryConfig, RetryPolicy,
};
use gh_projects::error::ProviderError;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

fn quick_retries(max_attempts: u32) -> RetryConfig {
    RetryConfig {
        max_attempts,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
        backoff_multiplier: 2.0,
        jitter: false,
    }
}

#[test]
fn test_builder_overrides_defaults() {
    let config = ResilienceConfig::builder()
        .max_retries(5)
        .requests_per_minute(120)
        .enable_rate_limiting(false)
        .request_timeout(Duration::from_secs(12))
        .build();

    assert_eq!(config.retry.max_attempts, 5);
    assert_eq!(config.rate_limit.requests_per_minute, 120);
    assert!(!config.rate_limit.enabled);
    assert_eq!(config.request_timeout, Duration::from_secs(12));
}

#[test]
fn test_presets() {
    let default_config = ResilienceConfig::default();
    assert_eq!(default_config.retry.max_attempts, 3);
    assert!(default_config.rate_limit.enabled);

    let conservative = ResilienceConfig::conservative();
    assert_eq!(conservative.retry.max_attempts, 2);
    assert!(conservative.rate_limit.requests_per_minute < default_config.rate_limit.requests_per_minute);

    let disabled = ResilienceConfig::disabled();
    assert_eq!(disabled.retry.max_attempts, 1);
    assert!(!disabled.rate_limit.enabled);
}

#[tokio::test]
async fn test_rate_limiter_burst_then_throttle() {
    let limiter = RateLimiter::new(RateLimitConfig {
        requests_per_minute: 60,
        burst_capacity: 2,
        enabled: true,
    });

    assert!(limiter.try_acquire());
    assert!(limiter.try_acquire());
    assert!(!limiter.try_acquire());

    let stats = limiter.stats();
    assert_eq!(stats.requests_granted, 2);
    assert_eq!(stats.requests_delayed, 1);
}

#[tokio::test]
async fn test_retry_recovers_from_transient_errors() {
    let policy = RetryPolicy::new(quick_retries(3));
    let calls = Arc::new(AtomicU32::new(0));

    let counter = Arc::clone(&calls);
    let result = policy
        .execute(|| {
            let counter = Arc::clone(&counter);
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(ProviderError::Unavailable("502 Bad Gateway".into()))
                } else {
                    Ok("page")
                }
            }
        })
        .await;

    assert_eq!(result.unwrap(), "page");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_permanent_errors_are_not_retried() {
    let policy = RetryPolicy::new(quick_retries(5));
    let calls = Arc::new(AtomicU32::new(0));

    let counter = Arc::clone(&calls);
    let result: Result<(), _> = policy
        .execute(|| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(ProviderError::Unauthorized("Bad credentials".into()))
            }
        })
        .await;

    assert!(matches!(result, Err(ProviderError::Unauthorized(_))));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unreachable_api_is_transient() {
    let client = GitHubClient::new(
        "http://127.0.0.1:9/graphql",
        "ghp_test",
        ResilienceConfig::builder()
            .retry_config(quick_retries(2))
            .enable_rate_limiting(false)
            .request_timeout(Duration::from_secs(2))
            .build(),
    )
    .unwrap();

    let error = client.fetch_project("octo-org", 1).await.unwrap_err();
    assert!(error.is_transient(), "unexpected error: {}", error);
    assert!(!client.rate_limiter_stats().enabled);
}
