// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stats channel: many pushers, one collector.
//!
//! Payloads are opaque bytes; the master logs them verbatim.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{BusError, Endpoint};

/// Push producer for the stats channel.
///
/// Sends are best-effort: the connection is established lazily and
/// re-established once per send attempt; an unreachable collector just
/// costs the payload.
pub struct StatsPusher {
    endpoint: Endpoint,
    stream: Option<TcpStream>,
}

impl StatsPusher {
    pub fn connect(endpoint: Endpoint) -> Self {
        Self { endpoint, stream: None }
    }

    /// Push one payload. Returns whether it was handed to the kernel.
    pub async fn send(&mut self, payload: &[u8]) -> bool {
        // Two passes: one with the cached connection, one after a
        // reconnect when the cached connection turned out dead.
        for _ in 0..2 {
            if self.stream.is_none() {
                match TcpStream::connect(self.endpoint.addr()).await {
                    Ok(stream) => self.stream = Some(stream),
                    Err(e) => {
                        debug!(endpoint = %self.endpoint, "stats connect failed: {e}");
                        return false;
                    }
                }
            }
            if let Some(stream) = self.stream.as_mut() {
                match dpd_wire::write_frame(stream, payload).await {
                    Ok(()) => return true,
                    Err(e) => {
                        debug!("stats connection lost: {e}");
                        self.stream = None;
                    }
                }
            }
        }
        false
    }
}

/// Pull consumer for the stats channel: accepts any number of producers
/// and merges their frames into one stream.
pub struct StatsCollector {
    local_addr: SocketAddr,
    rx: mpsc::Receiver<Vec<u8>>,
    cancel: CancellationToken,
}

impl StatsCollector {
    /// Bind the stats endpoint and start collecting.
    pub async fn bind(endpoint: &Endpoint) -> Result<Self, BusError> {
        let listener = TcpListener::bind(endpoint.addr()).await.map_err(|source| {
            BusError::Bind { endpoint: endpoint.to_string(), source }
        })?;
        let local_addr = listener.local_addr()?;

        let (tx, rx) = mpsc::channel(256);
        let cancel = CancellationToken::new();
        let accept_cancel = cancel.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = accept_cancel.cancelled() => return,
                    accepted = listener.accept() => match accepted {
                        Ok((stream, peer)) => {
                            debug!(%peer, "stats producer connected");
                            let tx = tx.clone();
                            let cancel = accept_cancel.clone();
                            tokio::spawn(drain_producer(stream, tx, cancel));
                        }
                        Err(e) => warn!("stats accept error: {e}"),
                    }
                }
            }
        });

        Ok(Self { local_addr, rx, cancel })
    }

    /// Wait up to `timeout` for the next stats payload.
    pub async fn recv(&mut self, timeout: Duration) -> Option<Vec<u8>> {
        tokio::time::timeout(timeout, self.rx.recv()).await.ok().flatten()
    }

    /// The bound address (useful when binding port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

/// Forward frames from one producer connection until it closes.
async fn drain_producer(
    mut stream: TcpStream,
    tx: mpsc::Sender<Vec<u8>>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            frame = dpd_wire::read_frame(&mut stream) => match frame {
                Ok(frame) => {
                    if tx.send(frame).await.is_err() {
                        return;
                    }
                }
                Err(e) => {
                    debug!("stats producer gone: {e}");
                    return;
                }
            }
        }
    }
}

impl Drop for StatsCollector {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
#[path = "stats_tests.rs"]
mod tests;
