// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Endpoint URIs for bus channels.

use std::fmt;
use std::str::FromStr;

use crate::BusError;

/// A `tcp://host:port` endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    host: String,
    port: u16,
}

impl Endpoint {
    /// Parse a `tcp://host:port` URI. Only tcp endpoints are supported.
    pub fn parse(uri: &str) -> Result<Self, BusError> {
        let rest = uri.strip_prefix("tcp://").ok_or_else(|| BusError::InvalidEndpoint {
            uri: uri.to_string(),
            reason: "only tcp:// endpoints are supported".to_string(),
        })?;
        let (host, port) = rest.rsplit_once(':').ok_or_else(|| BusError::InvalidEndpoint {
            uri: uri.to_string(),
            reason: "missing port".to_string(),
        })?;
        if host.is_empty() {
            return Err(BusError::InvalidEndpoint {
                uri: uri.to_string(),
                reason: "missing host".to_string(),
            });
        }
        let port = port.parse().map_err(|_| BusError::InvalidEndpoint {
            uri: uri.to_string(),
            reason: format!("invalid port {port:?}"),
        })?;
        Ok(Self { host: host.to_string(), port })
    }

    /// Address tuple for connect/bind.
    pub fn addr(&self) -> (&str, u16) {
        (&self.host, self.port)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tcp://{}:{}", self.host, self.port)
    }
}

impl FromStr for Endpoint {
    type Err = BusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<std::net::SocketAddr> for Endpoint {
    fn from(addr: std::net::SocketAddr) -> Self {
        Self { host: addr.ip().to_string(), port: addr.port() }
    }
}

#[cfg(test)]
#[path = "endpoint_tests.rs"]
mod tests;
