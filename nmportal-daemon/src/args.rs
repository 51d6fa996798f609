use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use nmportal::{PortalConfig, Timings};

/// Command line of the `nmportal` binary.
#[derive(Parser, Debug)]
#[command(name = "nmportal")]
#[command(version, about = "Captive portal for provisioning Wi-Fi through NetworkManager")]
pub struct Args {
    /// Wireless network interface to use (default: first managed Wi-Fi device)
    #[arg(long)]
    pub portal_interface: Option<String>,

    /// SSID of the captive portal Wi-Fi network
    #[arg(long, default_value = "WiFi Connect")]
    pub portal_ssid: String,

    /// WPA2 passphrase of the captive portal network (default: open network)
    #[arg(long, default_value = "")]
    pub portal_passphrase: String,

    /// Gateway of the captive portal Wi-Fi network
    #[arg(long, default_value = "192.168.42.1")]
    pub portal_gateway: String,

    /// DHCP range of the captive portal Wi-Fi network
    #[arg(long, default_value = "192.168.42.2,192.168.42.254")]
    pub portal_dhcp_range: String,

    /// Listening port of the captive portal web server
    #[arg(long, default_value_t = 80)]
    pub portal_listening_port: u16,

    /// Exit if no portal request arrives for this many seconds (0 disables)
    #[arg(long, default_value_t = 0)]
    pub activity_timeout: u64,

    /// Web UI directory location
    #[arg(long, default_value = "ui")]
    pub ui_directory: PathBuf,

    /// DHCP/DNS helper executable
    #[arg(long, default_value = "dnsmasq")]
    pub dhcp_helper: PathBuf,

    /// Treat a join without confirmed internet access as a failure
    #[arg(long)]
    pub strict_connectivity: bool,
}

impl Args {
    /// Converts the arguments into the portal configuration.
    pub fn into_config(self) -> PortalConfig {
        PortalConfig {
            gateway: self.portal_gateway,
            dhcp_range: self.portal_dhcp_range,
            ssid: self.portal_ssid,
            passphrase: self.portal_passphrase,
            interface: self.portal_interface.filter(|name| !name.is_empty()),
            listening_port: self.portal_listening_port,
            ui_directory: self.ui_directory,
            activity_timeout: Duration::from_secs(self.activity_timeout),
            dhcp_helper: self.dhcp_helper,
            strict_connectivity: self.strict_connectivity,
            timings: Timings::default(),
        }
    }
}
