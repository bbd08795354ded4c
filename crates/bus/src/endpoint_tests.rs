// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn parses_host_and_port() {
    let ep = Endpoint::parse("tcp://10.0.0.7:7700").unwrap();
    assert_eq!(ep.addr(), ("10.0.0.7", 7700));
    assert_eq!(ep.to_string(), "tcp://10.0.0.7:7700");
}

#[test]
fn parses_hostname_endpoints() {
    let ep = Endpoint::parse("tcp://master.internal:7700").unwrap();
    assert_eq!(ep.addr(), ("master.internal", 7700));
}

#[test]
fn from_str_matches_parse() {
    let ep: Endpoint = "tcp://127.0.0.1:0".parse().unwrap();
    assert_eq!(ep.addr(), ("127.0.0.1", 0));
}

#[yare::parameterized(
    no_scheme    = { "10.0.0.7:7700" },
    wrong_scheme = { "ipc:///tmp/dpd.sock" },
    no_port      = { "tcp://10.0.0.7" },
    bad_port     = { "tcp://10.0.0.7:seventy" },
    port_overflow = { "tcp://10.0.0.7:77000" },
    no_host      = { "tcp://:7700" },
)]
fn rejects_malformed_uris(uri: &str) {
    let err = Endpoint::parse(uri).unwrap_err();
    assert!(matches!(err, crate::BusError::InvalidEndpoint { .. }), "{uri} parsed");
}

#[test]
fn socket_addr_conversion_roundtrips() {
    let addr: std::net::SocketAddr = "127.0.0.1:9999".parse().unwrap();
    let ep = Endpoint::from(addr);
    assert_eq!(ep.to_string(), "tcp://127.0.0.1:9999");
}
