// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;

#[derive(Debug, thiserror::Error)]
#[error("boom")]
struct Boom;

#[tokio::test(start_paused = true)]
async fn first_success_returns_immediately() {
    let result: Result<u32, RetryError<Boom>> = retry_with_backoff(
        &[Duration::from_secs(1)],
        Duration::from_secs(10),
        || async { Attempt::Done(7) },
    )
    .await;
    assert_eq!(result.unwrap(), 7);
}

#[tokio::test(start_paused = true)]
async fn retries_until_success() {
    let calls = AtomicUsize::new(0);
    let calls = &calls;
    let result: Result<u32, RetryError<Boom>> = retry_with_backoff(
        &[Duration::from_millis(100), Duration::from_millis(120)],
        Duration::from_secs(10),
        move || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Attempt::Again
            } else {
                Attempt::Done(9)
            }
        },
    )
    .await;
    assert_eq!(result.unwrap(), 9);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn terminal_failure_stops_retrying() {
    let calls = AtomicUsize::new(0);
    let calls = &calls;
    let result: Result<u32, RetryError<Boom>> = retry_with_backoff(
        &[Duration::from_millis(100)],
        Duration::from_secs(10),
        move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Attempt::Fail(Boom)
        },
    )
    .await;
    assert!(matches!(result, Err(RetryError::Terminal(Boom))));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn gives_up_at_the_timeout() {
    let calls = AtomicUsize::new(0);
    let calls = &calls;
    let result: Result<u32, RetryError<Boom>> = retry_with_backoff(
        &[
            Duration::from_secs(1),
            Duration::from_millis(1200),
            Duration::from_secs(5),
        ],
        Duration::from_secs(10),
        move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Attempt::Again
        },
    )
    .await;
    assert!(matches!(result, Err(RetryError::TimedOut)));
    // 1.0 + 1.2 + 5.0 = 7.2s spent; another 5s would cross the 10s cap.
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}
