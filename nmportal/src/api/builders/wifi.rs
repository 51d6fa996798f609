//! NetworkManager connection settings for the two profiles the portal creates.
//!
//! # Settings Structure
//!
//! - `connection`: General settings (type, id, uuid, autoconnect, interface)
//! - `802-11-wireless`: Wi-Fi specific settings (ssid, mode, security reference)
//! - `802-11-wireless-security`: Security settings (key-mgmt, psk, wep-key0)
//! - `802-1x`: Enterprise authentication settings (for WPA-EAP)
//! - `ipv4` / `ipv6`: IP configuration
//!
//! The hotspot profile puts the device in AP mode with a static gateway
//! address. The client profile joins the chosen network with DHCP, and its
//! credentials are picked from the access point's classification.

use log::debug;

use super::connection_builder::{ConnectionSettings, IpConfig};
use super::wifi_builder::{WifiBand, WifiConnectionBuilder, WifiMode};
use crate::api::config::PortalConfig;
use crate::api::models::Security;

/// Prefix length of the portal network.
const PORTAL_PREFIX: u32 = 24;

/// Builds the captive portal access point profile for `interface`.
///
/// An empty passphrase yields an open hotspot.
pub fn build_hotspot_connection(config: &PortalConfig, interface: &str) -> ConnectionSettings {
    let mut builder = WifiConnectionBuilder::new(&config.ssid)
        .mode(WifiMode::AccessPoint)
        .band(WifiBand::Bg)
        .hidden(false)
        .autoconnect(false)
        .interface_name(interface)
        .ipv4_manual(vec![IpConfig::new(&config.gateway, PORTAL_PREFIX)])
        .ipv6_ignore();

    if !config.passphrase.is_empty() {
        builder = builder.wpa_psk(&config.passphrase);
    }

    builder.build()
}

/// Builds the profile that joins `ssid` with the credentials its security
/// calls for.
///
/// Enterprise wins over every other flag, then WPA/WPA2, then WEP. An empty
/// security set produces an open profile and the password is ignored.
pub fn build_client_connection(
    ssid: &str,
    security: Security,
    password: &str,
    identity: &str,
) -> ConnectionSettings {
    let builder = WifiConnectionBuilder::new(ssid).ipv4_auto().ipv6_auto();

    let builder = if security.contains(Security::ENTERPRISE) {
        debug!("using 802.1x credentials for {ssid}");
        builder.wpa_eap(identity, password)
    } else if security.intersects(Security::WPA | Security::WPA2) {
        builder.wpa_psk(password)
    } else if security.contains(Security::WEP) {
        builder.wep(password)
    } else {
        builder
    };

    builder.build()
}
