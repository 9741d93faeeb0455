use core_logic::{with_retry, RetryConfig, RetrySettings};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_retry_success_first_try() {
    let counter = Arc::new(AtomicUsize::new(0));
    let config = RetryConfig::new(3, 10).without_jitter();

    let result: Result<String, anyhow::Error> = with_retry(config, "test_op", || async {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok("success".to_string())
    })
    .await;

    assert!(result.is_ok());
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_retry_success_after_failures() {
    let counter = Arc::new(AtomicUsize::new(0));
    let config = RetryConfig::new(3, 10).without_jitter();

    let result: Result<String, anyhow::Error> = with_retry(config, "test_op", || async {
        let count = counter.fetch_add(1, Ordering::SeqCst) + 1;
        if count < 3 {
            Err(anyhow::anyhow!("temporary error"))
        } else {
            Ok("success".to_string())
        }
    })
    .await;

    assert!(result.is_ok());
    assert_eq!(counter.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_retry_all_failures() {
    let counter = Arc::new(AtomicUsize::new(0));
    let config = RetryConfig::new(3, 10).without_jitter();

    let result: Result<String, anyhow::Error> = with_retry(config, "test_op", || async {
        counter.fetch_add(1, Ordering::SeqCst);
        Err(anyhow::anyhow!("permanent error"))
    })
    .await;

    let err = result.unwrap_err();
    assert!(format!("{:#}", err).contains("permanent error"));
    assert_eq!(counter.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_no_retry_returns_original_error() {
    let counter = Arc::new(AtomicUsize::new(0));

    let result: Result<(), anyhow::Error> = with_retry(RetryConfig::none(), "test_op", || async {
        counter.fetch_add(1, Ordering::SeqCst);
        Err(anyhow::anyhow!("boom"))
    })
    .await;

    assert_eq!(result.unwrap_err().to_string(), "boom");
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_retry_with_delay() {
    let counter = Arc::new(AtomicUsize::new(0));
    let config = RetryConfig::new(2, 50).without_jitter();

    let start = tokio::time::Instant::now();
    let _: Result<String, anyhow::Error> = with_retry(config, "test_op", || async {
        counter.fetch_add(1, Ordering::SeqCst);
        if counter.load(Ordering::SeqCst) < 3 {
            Err(anyhow::anyhow!("temp"))
        } else {
            Ok("done".to_string())
        }
    })
    .await;

    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(100));
}

#[test]
fn test_retry_config_from_settings() {
    let settings = RetrySettings {
        max_retries: 5,
        base_delay_ms: 250,
        max_delay_ms: 4000,
        jitter: false,
    };
    let config = RetryConfig::from(settings);

    assert_eq!(config.max_retries, 5);
    assert_eq!(config.base_delay, Duration::from_millis(250));
    assert_eq!(config.max_delay, Duration::from_secs(4));
    assert!(!config.jitter);
    assert_eq!(RetryConfig::default().max_retries, 3);
}
