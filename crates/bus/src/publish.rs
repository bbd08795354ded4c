// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Publish side of the updates channel.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{BusError, Endpoint};

/// Fan-out publisher: every connected subscriber receives every frame.
///
/// Delivery is best-effort by design: frames sent while a subscriber is
/// absent are dropped, and a subscriber whose connection broke is
/// silently removed. Republishing on the next config change is the
/// recovery mechanism.
pub struct Publisher {
    local_addr: SocketAddr,
    conns: Arc<Mutex<Vec<TcpStream>>>,
    cancel: CancellationToken,
}

impl Publisher {
    /// Bind the publish endpoint and start accepting subscribers.
    pub async fn bind(endpoint: &Endpoint) -> Result<Self, BusError> {
        let listener = TcpListener::bind(endpoint.addr()).await.map_err(|source| {
            BusError::Bind { endpoint: endpoint.to_string(), source }
        })?;
        let local_addr = listener.local_addr()?;

        let conns = Arc::new(Mutex::new(Vec::new()));
        let cancel = CancellationToken::new();

        let accept_conns = Arc::clone(&conns);
        let accept_cancel = cancel.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = accept_cancel.cancelled() => return,
                    accepted = listener.accept() => match accepted {
                        Ok((stream, peer)) => {
                            debug!(%peer, "subscriber connected");
                            accept_conns.lock().await.push(stream);
                        }
                        Err(e) => warn!("accept error: {e}"),
                    }
                }
            }
        });

        Ok(Self { local_addr, conns, cancel })
    }

    /// Fan a frame out to every connected subscriber. Returns how many
    /// subscribers it reached; dead connections are dropped.
    pub async fn send(&self, payload: &[u8]) -> usize {
        let mut conns = self.conns.lock().await;
        let mut live = Vec::with_capacity(conns.len());
        let mut delivered = 0;
        for mut stream in conns.drain(..) {
            match dpd_wire::write_frame(&mut stream, payload).await {
                Ok(()) => {
                    delivered += 1;
                    live.push(stream);
                }
                Err(e) => debug!("dropping subscriber: {e}"),
            }
        }
        *conns = live;
        delivered
    }

    /// Number of currently connected subscribers.
    pub async fn subscriber_count(&self) -> usize {
        self.conns.lock().await.len()
    }

    /// The bound address (useful when binding port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

impl Drop for Publisher {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
