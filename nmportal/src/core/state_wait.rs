//! Bounded, cancellable polling of NetworkManager state.
//!
//! Activation and connectivity are both confirmed by re-reading a property
//! once per tick until it reaches the wanted value or the timeout passes.
//! Every wait observes the portal's [`CancellationToken`] so shutdown never
//! sits behind a 20 second poll.

use log::debug;
use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;
use zvariant::OwnedObjectPath;

use crate::Result;
use crate::api::config::Timings;
use crate::api::models::{ActiveConnectionState, PortalError};
use crate::core::backend::NetworkBackend;

/// Polls `read` every `interval` until `accept` holds or `timeout` elapses.
///
/// Returns `Ok(true)` on a match and `Ok(false)` on timeout. Read errors
/// count as "not there yet". Cancellation yields [`PortalError::Cancelled`].
pub(crate) async fn wait_for_state<T, F, Fut, A>(
    timeout: Duration,
    interval: Duration,
    cancel: &CancellationToken,
    mut read: F,
    accept: A,
) -> Result<bool>
where
    T: Debug,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    A: Fn(&T) -> bool,
{
    let deadline = Instant::now() + timeout;

    loop {
        if cancel.is_cancelled() {
            return Err(PortalError::Cancelled);
        }

        match read().await {
            Ok(value) if accept(&value) => return Ok(true),
            Ok(value) => debug!("Still waiting, current value: {value:?}"),
            Err(e) => debug!("State read failed, retrying: {e}"),
        }

        if Instant::now() >= deadline {
            return Ok(false);
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PortalError::Cancelled),
            _ = sleep(interval) => {}
        }
    }
}

/// Waits for an active connection to reach the activated state.
pub(crate) async fn wait_for_activation(
    backend: &dyn NetworkBackend,
    active: &OwnedObjectPath,
    timings: &Timings,
    cancel: &CancellationToken,
) -> Result<bool> {
    wait_for_state(
        timings.activation_timeout,
        timings.poll_interval,
        cancel,
        || backend.activation_state(active),
        |state| *state == ActiveConnectionState::Activated,
    )
    .await
}

/// Waits for NetworkManager to report limited or full connectivity.
pub(crate) async fn wait_for_connectivity(
    backend: &dyn NetworkBackend,
    timings: &Timings,
    cancel: &CancellationToken,
) -> Result<bool> {
    wait_for_state(
        timings.connectivity_timeout,
        timings.poll_interval,
        cancel,
        || backend.connectivity(),
        |state| state.is_established(),
    )
    .await
}

/// Sleeps for `duration` unless cancelled first.
pub(crate) async fn pause(duration: Duration, cancel: &CancellationToken) -> Result<()> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(PortalError::Cancelled),
        _ = sleep(duration) => Ok(()),
    }
}
