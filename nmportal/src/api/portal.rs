//! The captive portal lifecycle.
//!
//! A [`Portal`] is a task that owns all engine state. Callers talk to it
//! through a cloneable [`PortalHandle`]; requests are queued and handled one
//! at a time, so a listing never observes a half-built hotspot and two
//! connection attempts never interleave.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use nmportal::{Portal, PortalConfig, PortalHandle, PortalService};
//!
//! struct Headless;
//!
//! #[async_trait]
//! impl PortalService for Headless {
//!     async fn start(&self, _portal: PortalHandle) -> nmportal::Result<()> {
//!         Ok(())
//!     }
//!     async fn stop(&self) -> nmportal::Result<()> {
//!         Ok(())
//!     }
//! }
//!
//! # async fn example() -> nmportal::Result<()> {
//! let portal = Portal::spawn(PortalConfig::default(), Arc::new(Headless)).await?;
//! portal.start().await?;
//!
//! for ap in portal.access_points().await? {
//!     println!("{} ({})", ap.ssid, ap.security);
//! }
//!
//! if portal.connect("Home", "password123", "").await? {
//!     portal.shutdown().await;
//! }
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use log::{debug, info};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::Result;
use crate::api::config::PortalConfig;
use crate::api::models::{AccessPointSummary, PortalError};
use crate::core::backend::{NetworkBackend, NmBackend};
use crate::core::engine::Engine;

/// Depth of the request queue.
const QUEUE_DEPTH: usize = 16;

/// The user-facing side of the portal, typically an HTTP server.
///
/// The engine starts it whenever the portal opens and stops it before a
/// connection attempt takes the radio away.
#[async_trait]
pub trait PortalService: Send + Sync {
    /// Starts serving. `portal` is the handle requests should go through.
    ///
    /// Starting a running service is a no-op.
    async fn start(&self, portal: PortalHandle) -> Result<()>;

    /// Asks the service to stop without waiting for it to finish.
    async fn stop(&self) -> Result<()>;
}

enum Command {
    Start(oneshot::Sender<Result<()>>),
    Close(oneshot::Sender<()>),
    AccessPoints(oneshot::Sender<Vec<AccessPointSummary>>),
    Connect {
        ssid: String,
        password: String,
        identity: String,
        reply: oneshot::Sender<Result<bool>>,
    },
    HotspotActive(oneshot::Sender<bool>),
    Shutdown(oneshot::Sender<()>),
}

/// Cloneable handle to a running [`Portal`].
#[derive(Clone)]
pub struct PortalHandle {
    tx: mpsc::Sender<Command>,
    cancel: CancellationToken,
}

/// Handle that does not keep the portal alive.
#[derive(Clone)]
pub(crate) struct WeakPortalHandle {
    tx: mpsc::WeakSender<Command>,
    cancel: CancellationToken,
}

impl WeakPortalHandle {
    pub(crate) fn upgrade(&self) -> Option<PortalHandle> {
        Some(PortalHandle {
            tx: self.tx.upgrade()?,
            cancel: self.cancel.clone(),
        })
    }
}

impl PortalHandle {
    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| PortalError::PortalStopped)?;
        rx.await.map_err(|_| PortalError::PortalStopped)
    }

    /// Opens the portal: scans, brings up the hotspot and the DHCP helper,
    /// then starts the portal service.
    pub async fn start(&self) -> Result<()> {
        self.request(Command::Start).await?
    }

    /// Closes the portal. Does nothing if it is not open.
    pub async fn close(&self) -> Result<()> {
        self.request(Command::Close).await
    }

    /// Networks found by the scan that preceded the hotspot.
    pub async fn access_points(&self) -> Result<Vec<AccessPointSummary>> {
        self.request(Command::AccessPoints).await
    }

    /// Joins `ssid`; see [`Portal`] for the fallback behaviour.
    ///
    /// `identity` is only used for enterprise networks.
    pub async fn connect(
        &self,
        ssid: impl Into<String>,
        password: impl Into<String>,
        identity: impl Into<String>,
    ) -> Result<bool> {
        let (ssid, password, identity) = (ssid.into(), password.into(), identity.into());
        self.request(|reply| Command::Connect {
            ssid,
            password,
            identity,
            reply,
        })
        .await?
    }

    pub async fn hotspot_active(&self) -> Result<bool> {
        self.request(Command::HotspotActive).await
    }

    /// Aborts in-flight waits, closes the portal and stops the portal task.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        if self.request(Command::Shutdown).await.is_err() {
            debug!("Portal already stopped");
        }
    }

    /// Whether [`shutdown`](Self::shutdown) has been requested.
    pub fn is_shutting_down(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// The portal task.
///
/// Owns the engine and serves [`PortalHandle`] requests in arrival order.
/// A failed [`connect`](PortalHandle::connect) reopens the portal before it
/// answers, so the caller can simply report the failure.
pub struct Portal {
    engine: Engine,
    rx: mpsc::Receiver<Command>,
}

impl Portal {
    /// Connects to NetworkManager on the system bus and spawns the portal.
    ///
    /// Fails when the bus is unreachable or no managed Wi-Fi device exists.
    pub async fn spawn(config: PortalConfig, service: Arc<dyn PortalService>) -> Result<PortalHandle> {
        let backend = NmBackend::new(config.interface.as_deref()).await?;
        Ok(Self::with_backend(config, Arc::new(backend), service))
    }

    /// Spawns the portal on top of an arbitrary backend.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn with_backend(
        config: PortalConfig,
        backend: Arc<dyn NetworkBackend>,
        service: Arc<dyn PortalService>,
    ) -> PortalHandle {
        let (tx, rx) = mpsc::channel(QUEUE_DEPTH);
        let cancel = CancellationToken::new();

        let weak = WeakPortalHandle {
            tx: tx.downgrade(),
            cancel: cancel.clone(),
        };
        let engine = Engine::new(backend, Arc::new(config), service, weak, cancel.clone());

        tokio::spawn(Self { engine, rx }.run());

        PortalHandle { tx, cancel }
    }

    async fn run(mut self) {
        let mut shutdown_reply = None;

        while let Some(cmd) = self.rx.recv().await {
            match cmd {
                Command::Start(reply) => {
                    let _ = reply.send(self.engine.open_portal().await);
                }
                Command::Close(reply) => {
                    self.engine.close_portal().await;
                    let _ = reply.send(());
                }
                Command::AccessPoints(reply) => {
                    let _ = reply.send(self.engine.access_points());
                }
                Command::Connect {
                    ssid,
                    password,
                    identity,
                    reply,
                } => {
                    let res = self.engine.connect(&ssid, &password, &identity).await;
                    let _ = reply.send(res);
                }
                Command::HotspotActive(reply) => {
                    let _ = reply.send(self.engine.hotspot_active());
                }
                Command::Shutdown(reply) => {
                    shutdown_reply = Some(reply);
                    break;
                }
            }
        }

        self.engine.close_portal().await;
        info!("Portal stopped");

        if let Some(reply) = shutdown_reply {
            let _ = reply.send(());
        }
    }
}
