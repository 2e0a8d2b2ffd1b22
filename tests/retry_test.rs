use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::info;

use notion_blog::{retry_delay, with_retry, RetryPolicy, RetryableError};

#[derive(Debug)]
struct FakeError {
    rate_limited: bool,
}

impl std::fmt::Display for FakeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "fake upstream error (rate limited: {})", self.rate_limited)
    }
}

impl RetryableError for FakeError {
    fn is_rate_limit(&self) -> bool {
        self.rate_limited
    }
}

fn quick_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        base_delay: Duration::from_millis(10),
    }
}

#[tokio::test]
async fn test_success_on_first_attempt() {
    // Initialize tracing
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .try_init();

    info!("Testing retry with an immediately successful operation");

    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();

    let result = with_retry(&quick_policy(3), move || {
        counter.fetch_add(1, Ordering::SeqCst);
        async { Ok::<_, FakeError>(42) }
    })
    .await;

    assert_eq!(result.unwrap(), 42);
    assert_eq!(calls.load(Ordering::SeqCst), 1, "Success should not retry");
}

#[tokio::test]
async fn test_success_after_failures() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .try_init();

    info!("Testing retry recovering after two failures");

    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();

    let result = with_retry(&quick_policy(3), move || {
        let attempt = counter.fetch_add(1, Ordering::SeqCst);
        async move {
            if attempt < 2 {
                Err(FakeError {
                    rate_limited: false,
                })
            } else {
                Ok(7)
            }
        }
    })
    .await;

    assert_eq!(result.unwrap(), 7);
    assert_eq!(
        calls.load(Ordering::SeqCst),
        3,
        "Should succeed on the third call"
    );
}

#[tokio::test]
async fn test_attempts_exhausted() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .try_init();

    info!("Testing that retries stop at the attempt limit");

    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();

    let result = with_retry(&quick_policy(3), move || {
        counter.fetch_add(1, Ordering::SeqCst);
        async { Err::<i32, _>(FakeError { rate_limited: true }) }
    })
    .await;

    assert!(matches!(result, Err(FakeError { rate_limited: true })));
    assert_eq!(
        calls.load(Ordering::SeqCst),
        3,
        "Total calls should equal max_attempts"
    );
}

#[tokio::test]
async fn test_rate_limit_backoff_grows() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .try_init();

    info!("Testing that rate-limit delays double between attempts");

    let start = Instant::now();
    let result = with_retry(&quick_policy(3), || async {
        Err::<i32, _>(FakeError { rate_limited: true })
    })
    .await;
    let elapsed = start.elapsed();

    assert!(result.is_err());
    // Two waits before giving up: 10ms then 20ms
    assert!(
        elapsed >= Duration::from_millis(30),
        "Expected at least 30ms of backoff, got {:?}",
        elapsed
    );
}

#[test]
fn test_retry_delay_curve() {
    let policy = RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::from_millis(100),
    };

    assert_eq!(retry_delay(&policy, 0, true), Duration::from_millis(100));
    assert_eq!(retry_delay(&policy, 1, true), Duration::from_millis(200));
    assert_eq!(retry_delay(&policy, 2, true), Duration::from_millis(400));

    assert_eq!(retry_delay(&policy, 0, false), Duration::from_millis(100));
    assert_eq!(
        retry_delay(&policy, 2, false),
        Duration::from_millis(100),
        "Non-rate-limit failures should wait a flat delay"
    );
}
