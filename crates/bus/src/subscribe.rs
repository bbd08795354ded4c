// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subscribe side of the updates channel.

use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{Endpoint, RECONNECT_DELAY};

/// Prefix-filtered subscriber with a background reconnect loop.
///
/// The connection is re-established after every failure, so a subscriber
/// started before its publisher (or surviving a publisher restart) keeps
/// working; it simply misses whatever was published while disconnected.
pub struct Subscriber {
    rx: mpsc::Receiver<Vec<u8>>,
    cancel: CancellationToken,
}

impl Subscriber {
    /// Connect to a publish endpoint, delivering only frames that start
    /// with `filter` (a node name; empty matches everything).
    pub fn connect(endpoint: Endpoint, filter: impl Into<String>) -> Self {
        let (tx, rx) = mpsc::channel(64);
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let filter = filter.into();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = task_cancel.cancelled() => return,
                    conn = TcpStream::connect(endpoint.addr()) => match conn {
                        Ok(mut stream) => {
                            debug!(endpoint = %endpoint, filter = %filter, "subscribed");
                            read_frames(&mut stream, &filter, &tx, &task_cancel).await;
                            if task_cancel.is_cancelled() || tx.is_closed() {
                                return;
                            }
                        }
                        Err(e) => debug!(endpoint = %endpoint, "connect failed: {e}"),
                    }
                }
                tokio::select! {
                    _ = task_cancel.cancelled() => return,
                    _ = tokio::time::sleep(RECONNECT_DELAY) => {}
                }
            }
        });

        Self { rx, cancel }
    }

    /// Wait up to `timeout` for the next matching frame.
    pub async fn recv(&mut self, timeout: Duration) -> Option<Vec<u8>> {
        tokio::time::timeout(timeout, self.rx.recv()).await.ok().flatten()
    }
}

/// Pump frames from one connection until it breaks or we shut down.
async fn read_frames(
    stream: &mut TcpStream,
    filter: &str,
    tx: &mpsc::Sender<Vec<u8>>,
    cancel: &CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            frame = dpd_wire::read_frame(stream) => match frame {
                Ok(frame) => {
                    if !dpd_wire::matches_filter(&frame, filter) {
                        continue;
                    }
                    if tx.send(frame).await.is_err() {
                        return;
                    }
                }
                Err(e) => {
                    debug!("update stream lost: {e}");
                    return;
                }
            }
        }
    }
}

impl Drop for Subscriber {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
#[path = "subscribe_tests.rs"]
mod tests;
