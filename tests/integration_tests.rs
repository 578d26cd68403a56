use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use rategate::{
    ApiFailure, PolicyTable, Provider, RateLimitPolicy, Retrier, RetryPolicy, Throttle,
};

fn quota_error() -> ApiFailure {
    ApiFailure::RateLimited("requests per minute exceeded".into())
}

#[tokio::test(start_paused = true)]
async fn semantic_scholar_burst_scenario() {
    // Policy (rpm=30, burst=2): two immediate requests pass with jitter-only
    // delays, the third pays the 2s steady-state interval.
    let throttle = Throttle::default();

    let start = Instant::now();
    throttle.acquire(Provider::SemanticScholar).await;
    throttle.acquire(Provider::SemanticScholar).await;
    assert!(start.elapsed() <= Duration::from_secs(2));

    let third = Instant::now();
    throttle.acquire(Provider::SemanticScholar).await;
    assert!(third.elapsed() >= Duration::from_millis(1990));

    assert_eq!(throttle.request_count(Provider::SemanticScholar).await, 3);
}

#[tokio::test(start_paused = true)]
async fn concurrent_acquires_lose_no_updates() {
    let throttle = Arc::new(Throttle::default());
    let tasks = 10;

    let mut handles = Vec::new();
    for _ in 0..tasks {
        let throttle = Arc::clone(&throttle);
        handles.push(tokio::spawn(async move {
            throttle.acquire(Provider::Anthropic).await;
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(throttle.request_count(Provider::Anthropic).await, tasks);

    let metrics = throttle
        .metrics()
        .provider_metrics(Provider::Anthropic)
        .await
        .unwrap();
    assert_eq!(metrics.total_requests, u64::from(tasks));
}

#[tokio::test(start_paused = true)]
async fn providers_do_not_block_each_other() {
    // Saturate taylor_francis (burst 1, 4s interval), then acquire openai
    // while the slow provider would still be spacing. The openai acquire
    // must finish within its own jitter bound.
    let throttle = Arc::new(Throttle::default());

    throttle.acquire(Provider::TaylorFrancis).await;

    let slow = {
        let throttle = Arc::clone(&throttle);
        tokio::spawn(async move {
            let start = Instant::now();
            throttle.acquire(Provider::TaylorFrancis).await;
            start.elapsed()
        })
    };

    let start = Instant::now();
    throttle.acquire(Provider::OpenAi).await;
    let fast_elapsed = start.elapsed();

    let slow_elapsed = slow.await.unwrap();
    assert!(fast_elapsed <= Duration::from_secs(1));
    assert!(slow_elapsed >= Duration::from_millis(2990)); // 60/15 - jitter
}

#[tokio::test(start_paused = true)]
async fn invoke_recovers_after_two_rejections() {
    let throttle = Arc::new(Throttle::default());
    let retrier = Retrier::new(Arc::clone(&throttle));
    let attempts = AtomicU32::new(0);

    let result: Result<&str, ApiFailure> = retrier
        .invoke(Provider::SemanticScholar, || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(quota_error())
                } else {
                    Ok("paper metadata")
                }
            }
        })
        .await;

    assert_eq!(result.unwrap(), "paper metadata");
    assert_eq!(attempts.load(Ordering::SeqCst), 3);

    let metrics = throttle
        .metrics()
        .provider_metrics(Provider::SemanticScholar)
        .await
        .unwrap();
    assert_eq!(metrics.window_resets, 2);
}

#[tokio::test(start_paused = true)]
async fn invoke_gives_up_after_max_tries() {
    let retrier = Retrier::new(Arc::new(Throttle::default()));
    let attempts = AtomicU32::new(0);

    let result: Result<(), ApiFailure> = retrier
        .invoke(Provider::OpenAi, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(quota_error()) }
        })
        .await;

    assert!(matches!(result, Err(ApiFailure::RateLimited(_))));
    assert_eq!(attempts.load(Ordering::SeqCst), 5);
}

#[tokio::test(start_paused = true)]
async fn invoke_passes_transport_failures_through() {
    let retrier = Retrier::new(Arc::new(Throttle::default()));
    let attempts = AtomicU32::new(0);

    let result: Result<(), ApiFailure> = retrier
        .invoke(Provider::Scopus, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async {
                Err(ApiFailure::Connection("dns lookup failed".into()))
            }
        })
        .await;

    assert!(matches!(result, Err(ApiFailure::Connection(_))));
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn custom_policy_table_governs_spacing() {
    let mut table = PolicyTable::default();
    table.set_policy(Provider::Google, RateLimitPolicy::new(120, 1));
    let throttle = Throttle::new(table);

    throttle.acquire(Provider::Google).await;

    // 60 / 120 = 0.5s steady interval once the single-request burst is
    // spent.
    let start = Instant::now();
    throttle.acquire(Provider::Google).await;
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(490));
    assert!(elapsed <= Duration::from_millis(600));
}

#[tokio::test(start_paused = true)]
async fn shorter_retry_policy_is_honored() {
    let retrier = Retrier::with_policy(
        Arc::new(Throttle::default()),
        RetryPolicy {
            max_tries: 2,
            base: 2.0,
        },
    );
    let attempts = AtomicU32::new(0);

    let result: Result<(), ApiFailure> = retrier
        .invoke(Provider::Xai, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(quota_error()) }
        })
        .await;

    assert!(result.is_err());
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}
