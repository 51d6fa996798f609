//! Joining the network the user picked in the portal.
//!
//! The portal has to go down before the real connection is attempted
//! because the same radio serves both. Whenever the attempt fails after
//! that point the portal is brought back so the user can try again.

use log::{debug, info, warn};

use crate::Result;
use crate::api::builders::build_client_connection;
use crate::api::models::{ActivatedProfile, PortalError};
use crate::core::engine::Engine;
use crate::core::scan::scan;
use crate::core::state_wait::{wait_for_activation, wait_for_connectivity};

impl Engine {
    /// Connects to `ssid`, reopening the portal on failure.
    ///
    /// Returns `Ok(true)` once the profile is activated. Failing to confirm
    /// internet access afterwards is only a warning unless strict
    /// connectivity is configured. Every other failure yields `Ok(false)`;
    /// only cancellation is reported as an error.
    pub(crate) async fn connect(&mut self, ssid: &str, password: &str, identity: &str) -> Result<bool> {
        info!("Connecting to '{ssid}'");

        if let Err(e) = self.forget(ssid).await {
            warn!("Failed to remove existing profiles for '{ssid}': {e}");
            return Ok(false);
        }

        self.close_portal().await;

        match self.join(ssid, password, identity).await {
            Ok(true) => Ok(true),
            Ok(false) => {
                self.reopen_portal().await;
                Ok(false)
            }
            Err(PortalError::Cancelled) => Err(PortalError::Cancelled),
            Err(e) => {
                warn!("Connection to '{ssid}' failed: {e}");
                self.reopen_portal().await;
                Ok(false)
            }
        }
    }

    /// Deletes every profile on the device stored for `ssid`.
    async fn forget(&self, ssid: &str) -> Result<()> {
        for profile in self.backend.saved_profiles().await? {
            if profile.ssid.as_deref() == Some(ssid) {
                debug!("Deleting existing profile {}", profile.path.as_str());
                self.backend.delete_profile(&profile.path).await?;
            }
        }
        Ok(())
    }

    async fn join(&self, ssid: &str, password: &str, identity: &str) -> Result<bool> {
        let timings = &self.config.timings;

        let ap = scan(self.backend.as_ref(), timings.scan_retries, timings, &self.cancel)
            .await?
            .into_iter()
            .find(|ap| ap.ssid == ssid)
            .ok_or_else(|| PortalError::NotFound(ssid.to_string()))?;

        debug!("Matched '{ssid}' with security {}", ap.security);
        let settings = build_client_connection(ssid, ap.security, password, identity);
        let profile = self.backend.add_and_activate(settings, Some(&ap.path)).await?;

        let activated =
            match wait_for_activation(self.backend.as_ref(), &profile.active, timings, &self.cancel).await {
                Ok(activated) => activated,
                Err(e) => {
                    self.discard(&profile).await;
                    return Err(e);
                }
            };

        if !activated {
            warn!("Connection to '{ssid}' was not activated in time");
            self.discard(&profile).await;
            return Ok(false);
        }

        info!("Connection to '{ssid}' activated");

        if wait_for_connectivity(self.backend.as_ref(), timings, &self.cancel).await? {
            info!("Internet connectivity confirmed");
        } else if self.config.strict_connectivity {
            warn!("No connectivity through '{ssid}', giving up on it");
            self.discard(&profile).await;
            return Ok(false);
        } else {
            warn!("Connected to '{ssid}' but connectivity could not be confirmed");
        }

        Ok(true)
    }

    async fn discard(&self, profile: &ActivatedProfile) {
        if let Err(e) = self.backend.delete_profile(&profile.connection).await {
            warn!("Failed to delete {}: {e}", profile.connection.as_str());
        }
    }
}
