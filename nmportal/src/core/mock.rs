//! Scripted NetworkManager and portal service for tests.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use zvariant::{OwnedObjectPath, Value};

use crate::Result;
use crate::api::builders::ConnectionSettings;
use crate::api::config::{PortalConfig, Timings};
use crate::api::models::{
    ActivatedProfile, ActiveConnectionState, ApCapabilities, ConnectivityState, PortalError,
    SavedProfile,
};
use crate::api::portal::{PortalHandle, PortalService};
use crate::core::backend::NetworkBackend;

/// Millisecond timings so engine tests finish quickly.
pub(crate) fn fast_timings() -> Timings {
    Timings {
        scan_backoff: Duration::from_millis(1),
        scan_retries: 2,
        activation_timeout: Duration::from_millis(40),
        connectivity_timeout: Duration::from_millis(40),
        poll_interval: Duration::from_millis(5),
        settle: Duration::from_millis(1),
        drain_timeout: Duration::from_millis(500),
    }
}

/// Portal config whose DHCP helper exits immediately.
pub(crate) fn test_config() -> PortalConfig {
    PortalConfig {
        dhcp_helper: "true".into(),
        timings: fast_timings(),
        ..PortalConfig::default()
    }
}

#[derive(Debug, Clone)]
struct MockAp {
    path: OwnedObjectPath,
    ssid: Vec<u8>,
    strength: u8,
    caps: ApCapabilities,
    broken: bool,
}

#[derive(Debug, Default)]
struct MockState {
    aps: Vec<MockAp>,
    scan_calls: u32,
    profiles: Vec<SavedProfile>,
    next_id: u32,
    active: HashMap<OwnedObjectPath, ActiveConnectionState>,
    never_activate: HashSet<String>,
    fail_add: bool,
    fail_profiles: bool,
    connectivity: Option<ConnectivityState>,
    added: Vec<(String, ConnectionSettings)>,
    specific_objects: Vec<Option<OwnedObjectPath>>,
    deactivated: Vec<OwnedObjectPath>,
}

/// In-memory [`NetworkBackend`] on interface `wlan0`.
///
/// Every added profile activates immediately unless its id was passed to
/// [`never_activate`](Self::never_activate). Connectivity defaults to full.
#[derive(Debug, Clone, Default)]
pub(crate) struct MockBackend {
    inner: Arc<Mutex<MockState>>,
}

fn path(s: String) -> OwnedObjectPath {
    OwnedObjectPath::try_from(s).unwrap()
}

fn profile_id(settings: &ConnectionSettings) -> String {
    match settings.get("connection").and_then(|c| c.get("id")) {
        Some(Value::Str(id)) => id.as_str().to_string(),
        _ => String::new(),
    }
}

impl MockBackend {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.inner.lock().unwrap()
    }

    pub(crate) fn with_ap(self, ssid: &str, strength: u8, caps: ApCapabilities) -> Self {
        self.push_ap(ssid, strength, caps, false);
        self
    }

    /// Adds an access point whose properties fail to read.
    pub(crate) fn with_broken_ap(self, ssid: &str) -> Self {
        self.push_ap(ssid, 0, ApCapabilities::default(), true);
        self
    }

    fn push_ap(&self, ssid: &str, strength: u8, caps: ApCapabilities, broken: bool) {
        let mut st = self.state();
        let n = st.aps.len();
        st.aps.push(MockAp {
            path: path(format!("/org/freedesktop/NetworkManager/AccessPoint/{n}")),
            ssid: ssid.as_bytes().to_vec(),
            strength,
            caps,
            broken,
        });
    }

    /// Adds a saved profile for `ssid`.
    pub(crate) fn with_profile(self, ssid: &str) -> Self {
        {
            let mut st = self.state();
            let n = st.next_id;
            st.next_id += 1;
            st.profiles.push(SavedProfile {
                path: path(format!("/org/freedesktop/NetworkManager/Settings/{n}")),
                ssid: Some(ssid.to_string()),
            });
        }
        self
    }

    /// Profiles with this id stay in the activating state forever.
    pub(crate) fn never_activate(self, id: &str) -> Self {
        self.state().never_activate.insert(id.to_string());
        self
    }

    pub(crate) fn fail_add(self) -> Self {
        self.state().fail_add = true;
        self
    }

    pub(crate) fn fail_profile_listing(self) -> Self {
        self.state().fail_profiles = true;
        self
    }

    pub(crate) fn with_connectivity(self, state: ConnectivityState) -> Self {
        self.state().connectivity = Some(state);
        self
    }

    pub(crate) fn scan_calls(&self) -> u32 {
        self.state().scan_calls
    }

    pub(crate) fn profile_count(&self) -> usize {
        self.state().profiles.len()
    }

    pub(crate) fn profile_ssids(&self) -> Vec<Option<String>> {
        self.state().profiles.iter().map(|p| p.ssid.clone()).collect()
    }

    pub(crate) fn deactivated_count(&self) -> usize {
        self.state().deactivated.len()
    }

    /// Ids of all profiles passed to `add_and_activate`, in order.
    pub(crate) fn added_ids(&self) -> Vec<String> {
        self.state().added.iter().map(|(id, _)| id.clone()).collect()
    }

    /// Settings of the last profile added with this id.
    pub(crate) fn added_settings(&self, id: &str) -> Option<ConnectionSettings> {
        self.state()
            .added
            .iter()
            .rev()
            .find(|(added, _)| added == id)
            .map(|(_, settings)| settings.clone())
    }

    pub(crate) fn last_specific_object(&self) -> Option<OwnedObjectPath> {
        self.state().specific_objects.last().cloned().flatten()
    }

    fn ap(&self, ap: &OwnedObjectPath) -> Result<MockAp> {
        let st = self.state();
        match st.aps.iter().find(|a| &a.path == ap) {
            Some(a) if !a.broken => Ok(a.clone()),
            _ => Err(PortalError::NotFound(ap.as_str().to_string())),
        }
    }
}

#[async_trait]
impl NetworkBackend for MockBackend {
    fn interface_name(&self) -> &str {
        "wlan0"
    }

    async fn visible_access_points(&self) -> Result<Vec<OwnedObjectPath>> {
        let mut st = self.state();
        st.scan_calls += 1;
        Ok(st.aps.iter().map(|a| a.path.clone()).collect())
    }

    async fn access_point_ssid(&self, ap: &OwnedObjectPath) -> Result<Vec<u8>> {
        Ok(self.ap(ap)?.ssid)
    }

    async fn access_point_strength(&self, ap: &OwnedObjectPath) -> Result<u8> {
        Ok(self.ap(ap)?.strength)
    }

    async fn access_point_capabilities(&self, ap: &OwnedObjectPath) -> Result<ApCapabilities> {
        Ok(self.ap(ap)?.caps)
    }

    async fn saved_profiles(&self) -> Result<Vec<SavedProfile>> {
        let st = self.state();
        if st.fail_profiles {
            return Err(PortalError::Service("settings unavailable".into()));
        }
        Ok(st.profiles.clone())
    }

    async fn delete_profile(&self, profile: &OwnedObjectPath) -> Result<()> {
        let mut st = self.state();
        let before = st.profiles.len();
        st.profiles.retain(|p| &p.path != profile);
        if st.profiles.len() == before {
            return Err(PortalError::NotFound(profile.as_str().to_string()));
        }
        Ok(())
    }

    async fn add_and_activate(
        &self,
        settings: ConnectionSettings,
        specific_object: Option<&OwnedObjectPath>,
    ) -> Result<ActivatedProfile> {
        let mut st = self.state();
        if st.fail_add {
            return Err(PortalError::Service("activation refused".into()));
        }

        let id = profile_id(&settings);
        let n = st.next_id;
        st.next_id += 1;

        let profile = ActivatedProfile {
            connection: path(format!("/org/freedesktop/NetworkManager/Settings/{n}")),
            active: path(format!("/org/freedesktop/NetworkManager/ActiveConnection/{n}")),
        };

        let state = if st.never_activate.contains(&id) {
            ActiveConnectionState::Activating
        } else {
            ActiveConnectionState::Activated
        };
        st.active.insert(profile.active.clone(), state);

        let ssid = settings
            .get("802-11-wireless")
            .and_then(|w| w.get("ssid"))
            .and_then(crate::core::connection_settings::ssid_from_value);
        st.profiles.push(SavedProfile {
            path: profile.connection.clone(),
            ssid,
        });

        st.specific_objects.push(specific_object.cloned());
        st.added.push((id, settings));
        Ok(profile)
    }

    async fn deactivate(&self, active: &OwnedObjectPath) -> Result<()> {
        let mut st = self.state();
        st.active
            .insert(active.clone(), ActiveConnectionState::Deactivated);
        st.deactivated.push(active.clone());
        Ok(())
    }

    async fn activation_state(&self, active: &OwnedObjectPath) -> Result<ActiveConnectionState> {
        Ok(self
            .state()
            .active
            .get(active)
            .copied()
            .unwrap_or(ActiveConnectionState::Unknown))
    }

    async fn connectivity(&self) -> Result<ConnectivityState> {
        Ok(self.state().connectivity.unwrap_or(ConnectivityState::Full))
    }
}

/// Counts how often the portal-facing service was started and stopped.
#[derive(Debug, Default)]
pub(crate) struct MockService {
    starts: Mutex<u32>,
    stops: Mutex<u32>,
}

impl MockService {
    pub(crate) fn starts(&self) -> u32 {
        *self.starts.lock().unwrap()
    }

    pub(crate) fn stops(&self) -> u32 {
        *self.stops.lock().unwrap()
    }
}

#[async_trait]
impl PortalService for MockService {
    async fn start(&self, _portal: PortalHandle) -> Result<()> {
        *self.starts.lock().unwrap() += 1;
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        *self.stops.lock().unwrap() += 1;
        Ok(())
    }
}
