// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace-level specs: CLI exit codes and the master→subscriber
//! publish path, driven through the real binaries.

use std::path::Path;
use std::time::Duration;

use assert_cmd::cargo::CommandCargoExt;
use serial_test::serial;

const ROLES: [&str; 3] = ["dpd-masterd", "dpd-clientd", "dpd-workerd"];

fn role_command(bin: &str) -> std::process::Command {
    std::process::Command::cargo_bin(bin).unwrap_or_else(|e| panic!("missing binary {bin}: {e}"))
}

#[test]
fn missing_config_file_exits_with_code_2() {
    for bin in ROLES {
        let status = role_command(bin)
            .arg("/nonexistent/dpd.json")
            .status()
            .unwrap_or_else(|e| panic!("failed to run {bin}: {e}"));
        assert_eq!(status.code(), Some(2), "{bin} exit code");
    }
}

#[test]
fn unparsable_config_file_exits_with_code_2() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("dpd.json");
    std::fs::write(&path, "{ not json").expect("write config");

    for bin in ROLES {
        let status = role_command(bin).arg(&path).status().expect("run binary");
        assert_eq!(status.code(), Some(2), "{bin} exit code");
    }
}

#[test]
fn config_missing_role_fields_exits_with_code_2() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("dpd.json");
    // Valid JSON, but no endpoints: master and client cannot start.
    std::fs::write(&path, "{}").expect("write config");

    for bin in ["dpd-masterd", "dpd-clientd"] {
        let status = role_command(bin).arg(&path).status().expect("run binary");
        assert_eq!(status.code(), Some(2), "{bin} exit code");
    }
}

#[test]
fn help_flag_succeeds() {
    for bin in ROLES {
        let output = role_command(bin).arg("--help").output().expect("run binary");
        assert!(output.status.success(), "{bin} --help");
        let text = String::from_utf8_lossy(&output.stdout);
        assert!(text.contains("configuration"), "{bin} help text: {text}");
    }
}

fn write_master_config(path: &Path, updates_port: u16, stats_port: u16) {
    let config = format!(
        r#"{{
            "master_updates": "tcp://127.0.0.1:{updates_port}",
            "master_stats": "tcp://127.0.0.1:{stats_port}",
            "nodes": {{
                "alpha": [
                    {{"name": "web.1", "run": "/bin/sleep", "args": ["3600"],
                      "pid_file": "/tmp/dpd-spec/web.1.pid", "user": 0}}
                ],
                "beta": [
                    {{"name": "db.1", "run": "/bin/sleep", "args": ["3600"],
                      "pid_file": "/tmp/dpd-spec/db.1.pid", "user": 0}}
                ]
            }}
        }}"#
    );
    std::fs::write(path, config).expect("write master config");
}

fn free_port() -> u16 {
    let probe = std::net::TcpListener::bind("127.0.0.1:0").expect("probe bind");
    probe.local_addr().expect("probe addr").port()
}

/// A subscriber that connects after the master is already up still gets
/// the first manifest: the master waits out its settle delay before
/// publishing, and republishes on config changes after that.
#[test]
#[serial]
fn master_process_publishes_node_manifests() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config_path = dir.path().join("dpd.json");
    let updates_port = free_port();
    let stats_port = free_port();
    write_master_config(&config_path, updates_port, stats_port);

    let mut master = role_command("dpd-masterd").arg(&config_path).spawn().expect("spawn master");

    let runtime = tokio::runtime::Runtime::new().expect("runtime");
    let result = runtime.block_on(async {
        let endpoint =
            dpd_bus::Endpoint::parse(&format!("tcp://127.0.0.1:{updates_port}")).expect("endpoint");
        let mut sub = dpd_bus::Subscriber::connect(endpoint, "alpha");
        sub.recv(Duration::from_secs(15)).await
    });

    let _ = master.kill();
    let _ = master.wait();

    let frame = result.expect("no manifest received from master");
    let update = dpd_wire::Update::decode(&frame).expect("decode update");
    assert_eq!(update.node, "alpha");
    assert_eq!(update.procs.len(), 1);
    assert_eq!(update.procs[0].name, "web.1");
    assert_eq!(update.procs[0].run, Path::new("/bin/sleep"));
}

/// Messages addressed to other nodes never pass the subscribe filter.
#[test]
#[serial]
fn subscriber_filter_excludes_other_nodes() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config_path = dir.path().join("dpd.json");
    let updates_port = free_port();
    let stats_port = free_port();
    write_master_config(&config_path, updates_port, stats_port);

    let mut master = role_command("dpd-masterd").arg(&config_path).spawn().expect("spawn master");

    let runtime = tokio::runtime::Runtime::new().expect("runtime");
    let frames = runtime.block_on(async {
        let endpoint =
            dpd_bus::Endpoint::parse(&format!("tcp://127.0.0.1:{updates_port}")).expect("endpoint");
        let mut sub = dpd_bus::Subscriber::connect(endpoint, "beta");
        let mut frames = Vec::new();
        // Collect past the settle delay and first publish.
        let deadline = tokio::time::Instant::now() + Duration::from_secs(15);
        while tokio::time::Instant::now() < deadline && frames.is_empty() {
            if let Some(frame) = sub.recv(Duration::from_secs(1)).await {
                frames.push(frame);
            }
        }
        frames
    });

    let _ = master.kill();
    let _ = master.wait();

    assert_eq!(frames.len(), 1);
    let update = dpd_wire::Update::decode(&frames[0]).expect("decode update");
    assert_eq!(update.node, "beta", "beta's subscriber only sees beta's manifest");
    assert_eq!(update.procs[0].name, "db.1");
}
