// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! dpd-workerd: the node supervisor. Keeps declared processes alive,
//! restarting within rate limits and reconciling configuration changes
//! written by dpd-clientd.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use dpd_core::{Config, SystemClock};
use dpd_daemon::pidfile::RolePidFile;
use dpd_daemon::proc::LocalProcessAdapter;
use dpd_daemon::{logging, shutdown, FileRefresher, Supervisor};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::Notify;
use tracing::{error, info};

/// Exit code for configuration load failures.
const EXIT_CONFIG: i32 = 2;

#[derive(Parser)]
#[command(name = "dpd-workerd", version, about = "dpd worker: supervises node processes")]
struct Args {
    /// Path to the worker configuration file (rewritten by dpd-clientd).
    config: PathBuf,

    /// Write logs to this file instead of stderr.
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let _log_guard = logging::init(args.log_file.as_deref())?;

    let config = match Config::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!(path = %args.config.display(), error = %e, "failed to load configuration");
            std::process::exit(EXIT_CONFIG);
        }
    };

    let pidfile = config.pid_file.clone().map(RolePidFile::acquire).transpose()?;
    let cancel = shutdown::shutdown_token()?;

    // SIGHUP forces a reload regardless of the config file's mtime.
    let reload = Arc::new(Notify::new());
    let mut sighup = signal(SignalKind::hangup())?;
    let reload_tx = Arc::clone(&reload);
    tokio::spawn(async move {
        loop {
            sighup.recv().await;
            info!("received SIGHUP, scheduling config reload");
            reload_tx.notify_one();
        }
    });

    let clock = SystemClock;
    let refresher = FileRefresher::new(args.config.clone(), &clock);
    let supervisor = Supervisor::from_config(config, LocalProcessAdapter::new(), clock);

    supervisor.run(refresher, reload, cancel).await;

    if let Some(pidfile) = pidfile {
        pidfile.release();
    }
    info!("worker stopped");
    Ok(())
}
