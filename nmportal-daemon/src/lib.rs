//! Captive portal daemon.
//!
//! Opens the portal hotspot, serves the network list and the connect form
//! over HTTP, and exits once a network has been joined, on SIGINT/SIGTERM,
//! or after the configured period without portal requests.

pub mod args;
pub mod server;

use anyhow::Context;
use clap::Parser;
use log::info;
use std::sync::Arc;
use std::time::Duration;

use nmportal::Portal;

use crate::args::Args;
use crate::server::{Activity, HttpPortal};

/// How long to let the last HTTP response flush before exiting.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// Runs the daemon until it is provisioned, interrupted or idle.
pub async fn run() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Args::parse().into_config();
    let activity_timeout = config.activity_timeout;

    let http = Arc::new(HttpPortal::new(&config));
    let portal = Portal::spawn(config, http.clone())
        .await
        .context("failed to initialise the portal")?;

    if let Err(e) = portal.start().await {
        portal.shutdown().await;
        return Err(e).context("failed to open the portal");
    }

    let provisioned = http.provisioned();
    let reason = tokio::select! {
        _ = provisioned.cancelled() => "network provisioned",
        _ = idle(http.activity(), activity_timeout) => "activity timeout reached",
        res = terminated() => {
            res?;
            "termination signal received"
        }
    };

    info!("{reason}, shutting down");
    portal.shutdown().await;
    http.join(FLUSH_TIMEOUT).await;
    Ok(())
}

/// Completes once no request arrived for `timeout`. Never completes for a
/// zero timeout.
async fn idle(activity: Arc<Activity>, timeout: Duration) {
    if timeout.is_zero() {
        return std::future::pending().await;
    }

    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    loop {
        ticker.tick().await;
        if activity.idle() >= timeout {
            return;
        }
    }
}

async fn terminated() -> anyhow::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut term = signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => res.context("failed to listen for SIGINT")?,
        _ = term.recv() => {}
    }
    Ok(())
}
