// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `itnd`: polls iTop and turns ticket activity into user notifications.

use std::process::ExitCode;

use itn_daemon::{startup, Config, LifecycleError};
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const LOG_FILE_PREFIX: &str = "itnd.log";

fn init_logging(config: &Config) -> Result<WorkerGuard, LifecycleError> {
    std::fs::create_dir_all(&config.log_dir)?;
    let appender = tracing_appender::rolling::daily(&config.log_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(writer).with_ansi(false).init();
    Ok(guard)
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

async fn run() -> Result<(), LifecycleError> {
    let config = Config::load()?;
    let _guard = init_logging(&config)?;

    let mut daemon = match startup(&config) {
        Ok(daemon) => daemon,
        Err(e) => {
            error!(error = %e, "startup failed");
            return Err(e);
        }
    };
    daemon.run(shutdown_signal()).await;
    info!("shutdown signal received");
    daemon.shutdown()
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("itnd: {e}");
            ExitCode::FAILURE
        }
    }
}
