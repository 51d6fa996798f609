//! Core connection builder for NetworkManager settings.
//!
//! The `ConnectionBuilder` handles the sections every profile shares
//! (`connection`, `ipv4`, `ipv6`); [`WifiConnectionBuilder`] wraps it and adds
//! the wireless and security sections.
//!
//! [`WifiConnectionBuilder`]: super::wifi_builder::WifiConnectionBuilder
//!
//! # Example
//!
//! ```rust
//! use nmportal::builders::{ConnectionBuilder, IpConfig};
//!
//! let settings = ConnectionBuilder::new("802-11-wireless", "Portal")
//!     .autoconnect(false)
//!     .ipv4_manual(vec![IpConfig::new("192.168.42.1", 24)])
//!     .ipv6_ignore()
//!     .build();
//! assert!(settings.contains_key("ipv4"));
//! ```

use std::collections::HashMap;
use uuid::Uuid;
use zvariant::Value;

/// Settings dictionary accepted by `AddAndActivateConnection`.
pub type ConnectionSettings = HashMap<&'static str, HashMap<&'static str, Value<'static>>>;

/// IP address configuration with CIDR prefix.
#[derive(Debug, Clone)]
pub struct IpConfig {
    pub address: String,
    pub prefix: u32,
}

impl IpConfig {
    /// Creates a new IP configuration.
    pub fn new(address: impl Into<String>, prefix: u32) -> Self {
        Self {
            address: address.into(),
            prefix,
        }
    }
}

/// Core connection settings builder.
///
/// # Sections Managed
///
/// - `connection`: Metadata (type, id, uuid, autoconnect, interface)
/// - `ipv4`: IPv4 configuration (auto or manual)
/// - `ipv6`: IPv6 configuration (auto or ignore)
pub struct ConnectionBuilder {
    settings: ConnectionSettings,
}

impl ConnectionBuilder {
    /// Creates a new connection builder with the specified type and ID.
    ///
    /// A random UUID is generated for the profile.
    pub fn new(connection_type: &str, id: impl Into<String>) -> Self {
        let mut settings = HashMap::new();
        let mut connection = HashMap::new();

        connection.insert("type", Value::from(connection_type.to_string()));
        connection.insert("id", Value::from(id.into()));
        connection.insert("uuid", Value::from(Uuid::new_v4().to_string()));

        settings.insert("connection", connection);

        Self { settings }
    }

    /// Restricts the connection to one network interface (e.g. "wlan0").
    pub fn interface_name(mut self, name: impl Into<String>) -> Self {
        if let Some(conn) = self.settings.get_mut("connection") {
            conn.insert("interface-name", Value::from(name.into()));
        }
        self
    }

    /// Enables or disables automatic connection on boot/availability.
    pub fn autoconnect(mut self, enabled: bool) -> Self {
        if let Some(conn) = self.settings.get_mut("connection") {
            conn.insert("autoconnect", Value::from(enabled));
        }
        self
    }

    /// Configures IPv4 to use automatic configuration (DHCP).
    pub fn ipv4_auto(mut self) -> Self {
        let mut ipv4 = HashMap::new();
        ipv4.insert("method", Value::from("auto"));
        self.settings.insert("ipv4", ipv4);
        self
    }

    /// Configures IPv4 with manual (static) addresses.
    pub fn ipv4_manual(mut self, addresses: Vec<IpConfig>) -> Self {
        let mut ipv4 = HashMap::new();
        ipv4.insert("method", Value::from("manual"));

        // address-data is an array of {address, prefix} dictionaries
        let address_data: Vec<HashMap<String, Value<'static>>> = addresses
            .into_iter()
            .map(|config| {
                let mut addr_dict = HashMap::new();
                addr_dict.insert("address".to_string(), Value::from(config.address));
                addr_dict.insert("prefix".to_string(), Value::from(config.prefix));
                addr_dict
            })
            .collect();

        ipv4.insert("address-data", Value::from(address_data));
        self.settings.insert("ipv4", ipv4);
        self
    }

    /// Configures IPv6 to use automatic configuration (SLAAC/DHCPv6).
    pub fn ipv6_auto(mut self) -> Self {
        let mut ipv6 = HashMap::new();
        ipv6.insert("method", Value::from("auto"));
        self.settings.insert("ipv6", ipv6);
        self
    }

    /// Disables IPv6 for this connection.
    pub fn ipv6_ignore(mut self) -> Self {
        let mut ipv6 = HashMap::new();
        ipv6.insert("method", Value::from("ignore"));
        self.settings.insert("ipv6", ipv6);
        self
    }

    /// Adds or replaces a complete settings section.
    pub fn with_section(
        mut self,
        name: &'static str,
        section: HashMap<&'static str, Value<'static>>,
    ) -> Self {
        self.settings.insert(name, section);
        self
    }

    /// Builds the final settings dictionary.
    pub fn build(self) -> ConnectionSettings {
        self.settings
    }
}
