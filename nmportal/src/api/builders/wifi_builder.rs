//! Wi-Fi connection builder.
//!
//! Wraps [`ConnectionBuilder`] with the `802-11-wireless` section and the
//! security blocks the portal needs: WPA-PSK, WEP and PEAP enterprise, in
//! either infrastructure (client) or access point mode.

use std::collections::HashMap;
use zvariant::Value;

use super::connection_builder::{ConnectionBuilder, ConnectionSettings, IpConfig};
use crate::types::constants::WEP_KEY_TYPE;

const SECURITY_SECTION: &str = "802-11-wireless-security";

/// Operating mode of the wireless interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiMode {
    /// Join an existing network.
    Infrastructure,
    /// Broadcast our own network.
    AccessPoint,
}

impl WifiMode {
    fn as_str(self) -> &'static str {
        match self {
            Self::Infrastructure => "infrastructure",
            Self::AccessPoint => "ap",
        }
    }
}

/// WiFi band selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiBand {
    /// 2.4 GHz band
    Bg,
    /// 5 GHz band
    A,
}

/// Builder for 802.11 connections.
///
/// # Examples
///
/// ```rust
/// use nmportal::builders::{WifiConnectionBuilder, WifiMode};
///
/// let settings = WifiConnectionBuilder::new("HomeNetwork")
///     .mode(WifiMode::Infrastructure)
///     .wpa_psk("my_secure_password")
///     .build();
/// assert!(settings.contains_key("802-11-wireless-security"));
/// ```
pub struct WifiConnectionBuilder {
    inner: ConnectionBuilder,
    ssid: String,
    mode: WifiMode,
    secured: bool,
    hidden: Option<bool>,
    band: Option<WifiBand>,
}

impl WifiConnectionBuilder {
    /// Creates a builder for an open infrastructure network named `ssid`.
    ///
    /// The profile id is the SSID.
    pub fn new(ssid: impl Into<String>) -> Self {
        let ssid = ssid.into();
        let inner = ConnectionBuilder::new("802-11-wireless", ssid.clone());

        Self {
            inner,
            ssid,
            mode: WifiMode::Infrastructure,
            secured: false,
            hidden: None,
            band: None,
        }
    }

    pub fn mode(mut self, mode: WifiMode) -> Self {
        self.mode = mode;
        self
    }

    /// Configures WPA/WPA2 personal security with the given passphrase.
    ///
    /// Protocol and ciphers are left for NetworkManager to negotiate, so the
    /// same block serves WPA-only and mixed-mode routers.
    pub fn wpa_psk(mut self, psk: impl Into<String>) -> Self {
        let mut security = HashMap::new();
        security.insert("key-mgmt", Value::from("wpa-psk"));
        security.insert("psk", Value::from(psk.into()));

        self.inner = self.inner.with_section(SECURITY_SECTION, security);
        self.secured = true;
        self
    }

    /// Configures static WEP with a user supplied key.
    pub fn wep(mut self, key: impl Into<String>) -> Self {
        let mut security = HashMap::new();
        security.insert("key-mgmt", Value::from("none"));
        security.insert("wep-key0", Value::from(key.into()));
        security.insert("wep-key-type", Value::from(WEP_KEY_TYPE));

        self.inner = self.inner.with_section(SECURITY_SECTION, security);
        self.secured = true;
        self
    }

    /// Configures WPA enterprise with PEAP and MSCHAPv2 inner authentication.
    pub fn wpa_eap(mut self, identity: impl Into<String>, password: impl Into<String>) -> Self {
        let mut security = HashMap::new();
        security.insert("key-mgmt", Value::from("wpa-eap"));
        self.inner = self.inner.with_section(SECURITY_SECTION, security);

        let mut e1x = HashMap::new();
        e1x.insert("eap", Value::from(vec!["peap".to_string()]));
        e1x.insert("identity", Value::from(identity.into()));
        e1x.insert("password", Value::from(password.into()));
        e1x.insert("phase2-auth", Value::from("mschapv2"));

        self.inner = self.inner.with_section("802-1x", e1x);
        self.secured = true;
        self
    }

    /// Marks this network as hidden (doesn't broadcast SSID).
    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = Some(hidden);
        self
    }

    /// Restricts the connection to a specific band.
    pub fn band(mut self, band: WifiBand) -> Self {
        self.band = Some(band);
        self
    }

    // Delegation to the inner ConnectionBuilder

    pub fn interface_name(mut self, name: impl Into<String>) -> Self {
        self.inner = self.inner.interface_name(name);
        self
    }

    pub fn autoconnect(mut self, enabled: bool) -> Self {
        self.inner = self.inner.autoconnect(enabled);
        self
    }

    pub fn ipv4_auto(mut self) -> Self {
        self.inner = self.inner.ipv4_auto();
        self
    }

    pub fn ipv4_manual(mut self, addresses: Vec<IpConfig>) -> Self {
        self.inner = self.inner.ipv4_manual(addresses);
        self
    }

    pub fn ipv6_auto(mut self) -> Self {
        self.inner = self.inner.ipv6_auto();
        self
    }

    pub fn ipv6_ignore(mut self) -> Self {
        self.inner = self.inner.ipv6_ignore();
        self
    }

    /// Builds the final settings dictionary.
    ///
    /// The wireless section references the security section only when one
    /// was configured; NetworkManager rejects a dangling reference.
    pub fn build(mut self) -> ConnectionSettings {
        let mut wireless = HashMap::new();
        wireless.insert("ssid", Value::from(self.ssid.as_bytes().to_vec()));
        wireless.insert("mode", Value::from(self.mode.as_str()));

        if let Some(hidden) = self.hidden {
            wireless.insert("hidden", Value::from(hidden));
        }

        if let Some(band) = self.band {
            let band_str = match band {
                WifiBand::Bg => "bg",
                WifiBand::A => "a",
            };
            wireless.insert("band", Value::from(band_str));
        }

        if self.secured {
            wireless.insert("security", Value::from(SECURITY_SECTION));
        }

        self.inner = self.inner.with_section("802-11-wireless", wireless);
        self.inner.build()
    }
}
