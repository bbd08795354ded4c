// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded retry with a backoff schedule.
//!
//! Attempts report an explicit outcome instead of throwing: done, try
//! again, or terminally failed. The last delay in the schedule repeats
//! until the overall timeout is reached.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;

/// Outcome of one attempt inside [`retry_with_backoff`].
pub enum Attempt<T, E> {
    Done(T),
    Again,
    Fail(E),
}

/// Why a retried operation gave up.
#[derive(Debug, Error)]
pub enum RetryError<E: std::error::Error> {
    #[error("retries timed out")]
    TimedOut,

    #[error(transparent)]
    Terminal(E),
}

/// Run `op` until it succeeds, terminally fails, or `timeout` elapses.
pub async fn retry_with_backoff<T, E, F, Fut>(
    delays: &[Duration],
    timeout: Duration,
    mut op: F,
) -> Result<T, RetryError<E>>
where
    E: std::error::Error,
    F: FnMut() -> Fut,
    Fut: Future<Output = Attempt<T, E>>,
{
    let started = Instant::now();
    let mut schedule = delays.iter().copied();
    let mut last_delay = delays.last().copied().unwrap_or(Duration::from_secs(1));

    loop {
        match op().await {
            Attempt::Done(value) => return Ok(value),
            Attempt::Fail(error) => return Err(RetryError::Terminal(error)),
            Attempt::Again => {}
        }

        let delay = schedule.next().unwrap_or(last_delay);
        last_delay = delay;
        if started.elapsed() + delay > timeout {
            return Err(RetryError::TimedOut);
        }
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
