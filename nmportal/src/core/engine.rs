//! State owned by the portal task.
//!
//! Everything that used to be process-wide (hotspot state, cached scan,
//! configuration) lives in one [`Engine`] that only the portal task touches.

use log::{error, info, warn};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::Result;
use crate::api::config::PortalConfig;
use crate::api::models::{AccessPointSummary, PortalError};
use crate::api::portal::{PortalService, WeakPortalHandle};
use crate::core::backend::NetworkBackend;
use crate::core::hotspot::HotspotController;

pub(crate) struct Engine {
    pub(crate) backend: Arc<dyn NetworkBackend>,
    pub(crate) config: Arc<PortalConfig>,
    pub(crate) hotspot: HotspotController,
    service: Arc<dyn PortalService>,
    portal: WeakPortalHandle,
    pub(crate) cancel: CancellationToken,
}

impl Engine {
    pub(crate) fn new(
        backend: Arc<dyn NetworkBackend>,
        config: Arc<PortalConfig>,
        service: Arc<dyn PortalService>,
        portal: WeakPortalHandle,
        cancel: CancellationToken,
    ) -> Self {
        let hotspot = HotspotController::new(Arc::clone(&backend), Arc::clone(&config));
        Self {
            backend,
            config,
            hotspot,
            service,
            portal,
            cancel,
        }
    }

    /// Brings up the hotspot, then the portal-facing service.
    ///
    /// If the service fails to start the hotspot is closed again.
    pub(crate) async fn open_portal(&mut self) -> Result<()> {
        self.hotspot.create(&self.cancel).await?;

        let Some(handle) = self.portal.upgrade() else {
            self.hotspot.close(&self.cancel).await;
            return Err(PortalError::PortalStopped);
        };

        if let Err(e) = self.service.start(handle).await {
            error!("Portal service failed to start: {e}");
            self.hotspot.close(&self.cancel).await;
            return Err(e);
        }

        info!("Portal '{}' is open", self.config.ssid);
        Ok(())
    }

    /// Stops the portal-facing service and tears the hotspot down.
    pub(crate) async fn close_portal(&mut self) {
        if let Err(e) = self.service.stop().await {
            warn!("Portal service failed to stop: {e}");
        }
        self.hotspot.close(&self.cancel).await;
    }

    /// Reopens the portal after a failed connection attempt.
    pub(crate) async fn reopen_portal(&mut self) {
        info!("Reopening portal");
        if let Err(e) = self.open_portal().await {
            error!("Failed to reopen portal: {e}");
        }
    }

    /// The cached scan, as exposed to portal clients.
    pub(crate) fn access_points(&self) -> Vec<AccessPointSummary> {
        self.hotspot
            .access_points()
            .iter()
            .map(|ap| ap.summary())
            .collect()
    }

    pub(crate) fn hotspot_active(&self) -> bool {
        self.hotspot.state().is_created()
    }
}
