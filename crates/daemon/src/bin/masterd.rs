// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! dpd-masterd: publishes per-node process manifests to the fleet.

use std::path::PathBuf;

use clap::Parser;
use dpd_core::Config;
use dpd_daemon::pidfile::RolePidFile;
use dpd_daemon::{logging, shutdown, Master};
use tracing::{error, info};

/// Exit code for configuration load failures.
const EXIT_CONFIG: i32 = 2;

#[derive(Parser)]
#[command(name = "dpd-masterd", version, about = "dpd master: distributes process manifests")]
struct Args {
    /// Path to the master configuration file.
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
    let own_pidfile = config.pid_file.clone();

    let master = match Master::new(config, args.config.clone()) {
        Ok(master) => master,
        Err(e) => {
            error!(error = %e, "invalid master configuration");
            std::process::exit(EXIT_CONFIG);
        }
    };

    let pidfile = own_pidfile.map(RolePidFile::acquire).transpose()?;
    let cancel = shutdown::shutdown_token()?;

    master.run(cancel).await?;

    if let Some(pidfile) = pidfile {
        pidfile.release();
    }
    info!("master stopped");
    Ok(())
}
