//! Operating parameters of the captive portal.
//!
//! A [`PortalConfig`] is built once at startup and shared read-only with
//! every component through an `Arc`.

use std::path::PathBuf;
use std::time::Duration;

use crate::types::constants::timeouts;

/// Immutable snapshot of the portal settings.
#[derive(Debug, Clone)]
pub struct PortalConfig {
    /// Address of this device on the portal network; also the DNS target.
    pub gateway: String,
    /// `start,end` range handed to the DHCP helper.
    pub dhcp_range: String,
    /// SSID broadcast by the portal hotspot.
    pub ssid: String,
    /// WPA2 passphrase of the portal network. Empty means an open hotspot.
    pub passphrase: String,
    /// Wireless interface to use. `None` picks the first managed Wi-Fi device.
    pub interface: Option<String>,
    /// Port the portal web server listens on.
    pub listening_port: u16,
    /// Directory holding the portal UI.
    pub ui_directory: PathBuf,
    /// Exit after this much portal inactivity. Zero disables the check.
    pub activity_timeout: Duration,
    /// DHCP/DNS helper executable.
    pub dhcp_helper: PathBuf,
    /// Treat a join without confirmed connectivity as a failure.
    pub strict_connectivity: bool,
    pub timings: Timings,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            gateway: "192.168.42.1".into(),
            dhcp_range: "192.168.42.2,192.168.42.254".into(),
            ssid: "WiFi Connect".into(),
            passphrase: String::new(),
            interface: None,
            listening_port: 80,
            ui_directory: PathBuf::from("ui"),
            activity_timeout: Duration::ZERO,
            dhcp_helper: PathBuf::from("dnsmasq"),
            strict_connectivity: false,
            timings: Timings::default(),
        }
    }
}

impl PortalConfig {
    /// Arguments passed to the DHCP/DNS helper for the given interface.
    ///
    /// Every DNS name resolves to the gateway so that clients land on the
    /// portal, `/etc/hosts` and any system config file are ignored, and the
    /// helper stays in the foreground so it can be supervised.
    pub fn dhcp_helper_args(&self, interface: &str) -> Vec<String> {
        vec![
            format!("--address=/#/{}", self.gateway),
            format!("--dhcp-range={}", self.dhcp_range),
            format!("--dhcp-option=option:router,{}", self.gateway),
            format!("--interface={interface}"),
            "--keep-in-foreground".into(),
            "--bind-interfaces".into(),
            "--except-interface=lo".into(),
            "--conf-file".into(),
            "--no-hosts".into(),
        ]
    }
}

/// Retry and timeout policy of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    /// Wait between two scan passes that found nothing.
    pub scan_backoff: Duration,
    /// Extra scan passes allowed before reporting that nothing is visible.
    pub scan_retries: u32,
    /// Upper bound for a profile to become activated.
    pub activation_timeout: Duration,
    /// Upper bound for NetworkManager to confirm connectivity.
    pub connectivity_timeout: Duration,
    /// Tick of the polling loops.
    pub poll_interval: Duration,
    /// Pause after tearing down the hotspot.
    pub settle: Duration,
    /// Bound on waiting for helper output to drain after stopping it.
    pub drain_timeout: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            scan_backoff: timeouts::scan_backoff(),
            scan_retries: timeouts::SCAN_RETRIES,
            activation_timeout: timeouts::activation_timeout(),
            connectivity_timeout: timeouts::connectivity_timeout(),
            poll_interval: timeouts::poll_interval(),
            settle: timeouts::settle(),
            drain_timeout: timeouts::drain_timeout(),
        }
    }
}
