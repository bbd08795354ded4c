// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! dpd-clientd: subscribes to this node's manifest updates and keeps
//! the local worker configuration current.

use std::path::PathBuf;

use clap::Parser;
use dpd_core::Config;
use dpd_daemon::pidfile::RolePidFile;
use dpd_daemon::{logging, shutdown, Client};
use tracing::{error, info};

/// Exit code for configuration load failures.
const EXIT_CONFIG: i32 = 2;

#[derive(Parser)]
#[command(name = "dpd-clientd", version, about = "dpd client: materializes manifest updates")]
struct Args {
    /// Path to the client configuration file.
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

    let client = match Client::new(&config) {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "invalid client configuration");
            std::process::exit(EXIT_CONFIG);
        }
    };

    let pidfile = config.pid_file.map(RolePidFile::acquire).transpose()?;
    let cancel = shutdown::shutdown_token()?;

    if let Err(e) = client.run(cancel).await {
        // A missing local config file surfaces here, after Client::new;
        // it is still a startup configuration failure.
        error!(error = %e, "client failed");
        std::process::exit(EXIT_CONFIG);
    }

    if let Some(pidfile) = pidfile {
        pidfile.release();
    }
    info!("client stopped");
    Ok(())
}
