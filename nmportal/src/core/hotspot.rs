//! Captive portal access point lifecycle.
//!
//! The controller owns the [`HotspotState`]: it brings the AP profile up,
//! starts the DHCP/DNS helper once the profile is active and tears both
//! down again. A failed bring-up never leaves a profile behind.

use log::{debug, error, info, warn};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::Result;
use crate::api::builders::build_hotspot_connection;
use crate::api::config::PortalConfig;
use crate::api::models::{AccessPoint, ActivatedProfile, HotspotState, PortalError};
use crate::core::backend::NetworkBackend;
use crate::core::process::ProcessSupervisor;
use crate::core::scan::scan;
use crate::core::state_wait::{pause, wait_for_activation};
use crate::types::constants::DHCP_HELPER_ID;

pub(crate) struct HotspotController {
    backend: Arc<dyn NetworkBackend>,
    config: Arc<PortalConfig>,
    supervisor: ProcessSupervisor,
    state: HotspotState,
    /// Networks seen right before the hotspot went up. The radio is busy
    /// serving the AP afterwards, so listing queries answer from here.
    access_points: Vec<AccessPoint>,
}

impl HotspotController {
    pub(crate) fn new(backend: Arc<dyn NetworkBackend>, config: Arc<PortalConfig>) -> Self {
        Self {
            backend,
            config,
            supervisor: ProcessSupervisor::new(),
            state: HotspotState::Closed,
            access_points: Vec::new(),
        }
    }

    pub(crate) fn state(&self) -> &HotspotState {
        &self.state
    }

    pub(crate) fn access_points(&self) -> &[AccessPoint] {
        &self.access_points
    }

    /// Scans, then brings up the portal access point and its DHCP helper.
    pub(crate) async fn create(&mut self, cancel: &CancellationToken) -> Result<()> {
        if self.state.is_created() {
            return Err(PortalError::HotspotAlreadyCreated);
        }

        let timings = &self.config.timings;
        self.access_points = scan(self.backend.as_ref(), timings.scan_retries, timings, cancel).await?;

        let interface = self.backend.interface_name().to_string();
        let settings = build_hotspot_connection(&self.config, &interface);
        debug!("Creating hotspot '{}' on {interface}", self.config.ssid);

        let profile = self.backend.add_and_activate(settings, None).await?;

        if let Err(e) = self.bring_up(&profile, &interface, cancel).await {
            warn!("Hotspot bring-up failed, removing profile: {e}");
            self.discard(&profile).await;
            return Err(e);
        }

        info!("Hotspot '{}' is up on {interface}", self.config.ssid);
        self.state = HotspotState::Created(profile);
        Ok(())
    }

    async fn bring_up(
        &self,
        profile: &ActivatedProfile,
        interface: &str,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let activated =
            wait_for_activation(self.backend.as_ref(), &profile.active, &self.config.timings, cancel)
                .await?;
        if !activated {
            return Err(PortalError::ActivationTimeout);
        }

        self.supervisor
            .start(
                DHCP_HELPER_ID,
                &self.config.dhcp_helper,
                &self.config.dhcp_helper_args(interface),
            )
            .await
    }

    /// Tears the hotspot down. Does nothing when no hotspot exists.
    ///
    /// Teardown is best effort: failures are logged and the state ends up
    /// `Closed` regardless. The settle pause is skipped on cancellation.
    pub(crate) async fn close(&mut self, cancel: &CancellationToken) {
        let HotspotState::Created(profile) = std::mem::take(&mut self.state) else {
            return;
        };

        info!("Closing hotspot '{}'", self.config.ssid);
        self.discard(&profile).await;
        self.supervisor
            .stop_and_wait(DHCP_HELPER_ID, self.config.timings.drain_timeout)
            .await;

        if pause(self.config.timings.settle, cancel).await.is_err() {
            debug!("Skipping settle pause, shutting down");
        }
    }

    /// Deactivates and deletes a hotspot profile.
    async fn discard(&self, profile: &ActivatedProfile) {
        if let Err(e) = self.backend.deactivate(&profile.active).await {
            error!("Failed to deactivate {}: {e}", profile.active.as_str());
        }
        if let Err(e) = self.backend.delete_profile(&profile.connection).await {
            error!("Failed to delete {}: {e}", profile.connection.as_str());
        }
    }

    #[cfg(test)]
    pub(crate) async fn helper_running(&self) -> bool {
        self.supervisor.is_running(DHCP_HELPER_ID).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::ApCapabilities;
    use crate::core::mock::{MockBackend, test_config};

    const OPEN: ApCapabilities = ApCapabilities {
        flags: 0,
        wpa_flags: 0,
        rsn_flags: 0,
    };

    fn controller(backend: &MockBackend, config: PortalConfig) -> HotspotController {
        HotspotController::new(Arc::new(backend.clone()), Arc::new(config))
    }

    #[tokio::test]
    async fn create_activates_profile_and_caches_scan() {
        let backend = MockBackend::new().with_ap("Home", 80, OPEN);
        let mut hotspot = controller(&backend, test_config());
        let cancel = CancellationToken::new();

        hotspot.create(&cancel).await.unwrap();

        assert!(hotspot.state().is_created());
        assert_eq!(hotspot.access_points().len(), 1);
        assert_eq!(backend.profile_count(), 1);

        let added = backend.added_ids();
        assert_eq!(added, vec!["WiFi Connect".to_string()]);
        assert_eq!(backend.last_specific_object(), None);
    }

    #[tokio::test]
    async fn second_create_fails_without_side_effects() {
        let backend = MockBackend::new().with_ap("Home", 80, OPEN);
        let mut hotspot = controller(&backend, test_config());
        let cancel = CancellationToken::new();

        hotspot.create(&cancel).await.unwrap();
        let before = hotspot.state().clone();

        let err = hotspot.create(&cancel).await.unwrap_err();

        assert!(matches!(err, PortalError::HotspotAlreadyCreated));
        assert_eq!(hotspot.state(), &before);
        assert_eq!(backend.profile_count(), 1);
        assert_eq!(backend.added_ids().len(), 1);
    }

    #[tokio::test]
    async fn failed_activation_leaves_no_profile() {
        let backend = MockBackend::new()
            .with_ap("Home", 80, OPEN)
            .with_profile("Office")
            .never_activate("WiFi Connect");
        let mut hotspot = controller(&backend, test_config());

        let err = hotspot.create(&CancellationToken::new()).await.unwrap_err();

        assert!(matches!(err, PortalError::ActivationTimeout));
        assert!(!hotspot.state().is_created());
        assert_eq!(backend.profile_count(), 1);
        assert_eq!(backend.deactivated_count(), 1);
    }

    #[tokio::test]
    async fn helper_spawn_failure_rolls_back() {
        let backend = MockBackend::new().with_ap("Home", 80, OPEN);
        let config = PortalConfig {
            dhcp_helper: "/nonexistent/dnsmasq".into(),
            ..test_config()
        };
        let mut hotspot = controller(&backend, config);

        let err = hotspot.create(&CancellationToken::new()).await.unwrap_err();

        assert!(matches!(err, PortalError::Spawn { .. }));
        assert!(!hotspot.state().is_created());
        assert_eq!(backend.profile_count(), 0);
    }

    #[tokio::test]
    async fn no_access_points_fails_before_creating_profile() {
        let backend = MockBackend::new();
        let mut hotspot = controller(&backend, test_config());

        let err = hotspot.create(&CancellationToken::new()).await.unwrap_err();

        assert!(matches!(err, PortalError::NoAccessPoint));
        assert!(backend.added_ids().is_empty());
    }

    #[tokio::test]
    async fn close_removes_profile_and_stops_helper() {
        let backend = MockBackend::new().with_ap("Home", 80, OPEN);
        let mut hotspot = controller(&backend, test_config());
        let cancel = CancellationToken::new();

        hotspot.create(&cancel).await.unwrap();
        hotspot.close(&cancel).await;

        assert!(!hotspot.state().is_created());
        assert_eq!(backend.profile_count(), 0);
        assert!(!hotspot.helper_running().await);
    }

    #[tokio::test]
    async fn close_when_closed_is_noop() {
        let backend = MockBackend::new();
        let mut hotspot = controller(&backend, test_config());

        hotspot.close(&CancellationToken::new()).await;

        assert_eq!(backend.deactivated_count(), 0);
    }
}
