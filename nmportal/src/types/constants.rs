//! Constants for NetworkManager D-Bus interface values.
//!
//! These constants correspond to the numeric codes used by NetworkManager's
//! D-Bus API for device types, states, access point flags, and connectivity.

/// NetworkManager device type constants.
pub mod device_type {
    pub const WIFI: u32 = 2;
}

/// NetworkManager device state constants
pub mod device_state {
    pub const UNMANAGED: u32 = 10;
}

/// General access point capability flags (`NM80211ApFlags`).
pub mod ap_flags {
    pub const PRIVACY: u32 = 0x1;
}

/// WPA/RSN security flag constants (`NM80211ApSecurityFlags`).
pub mod security_flags {
    pub const EAP: u32 = 0x0200;
}

/// Global connectivity states (`NMConnectivityState`).
pub mod connectivity {
    pub const UNKNOWN: u32 = 0;
    pub const NONE: u32 = 1;
    pub const PORTAL: u32 = 2;
    pub const LIMITED: u32 = 3;
    pub const FULL: u32 = 4;
}

/// Value of `wep-key-type` used for user supplied WEP keys.
pub const WEP_KEY_TYPE: u32 = 2;

/// Object path NetworkManager uses for "no object".
pub const NULL_PATH: &str = "/";

/// Symbolic id of the DHCP/DNS helper inside the process supervisor.
pub const DHCP_HELPER_ID: &str = "dnsmasq";

/// Default timing values for scanning, activation polling and teardown.
///
/// The public [`Timings`](crate::Timings) struct starts from these.
pub mod timeouts {
    use std::time::Duration;

    /// Pause between two empty scan passes (2 seconds).
    const SCAN_BACKOFF_SECS: u64 = 2;

    /// Extra scan passes before giving up on an empty result.
    pub const SCAN_RETRIES: u32 = 10;

    /// Maximum time an activation may take before it counts as failed.
    const ACTIVATION_TIMEOUT_SECS: u64 = 20;

    /// Maximum time to wait for NetworkManager to report internet access.
    const CONNECTIVITY_TIMEOUT_SECS: u64 = 20;

    /// Granularity of state polling.
    const POLL_INTERVAL_SECS: u64 = 1;

    /// Time the wireless device needs to release the AP before reuse.
    const SETTLE_SECS: u64 = 5;

    /// Bound on waiting for helper output to drain after a kill.
    const DRAIN_TIMEOUT_SECS: u64 = 2;

    pub fn scan_backoff() -> Duration {
        Duration::from_secs(SCAN_BACKOFF_SECS)
    }

    pub fn activation_timeout() -> Duration {
        Duration::from_secs(ACTIVATION_TIMEOUT_SECS)
    }

    pub fn connectivity_timeout() -> Duration {
        Duration::from_secs(CONNECTIVITY_TIMEOUT_SECS)
    }

    pub fn poll_interval() -> Duration {
        Duration::from_secs(POLL_INTERVAL_SECS)
    }

    pub fn settle() -> Duration {
        Duration::from_secs(SETTLE_SECS)
    }

    pub fn drain_timeout() -> Duration {
        Duration::from_secs(DRAIN_TIMEOUT_SECS)
    }
}
