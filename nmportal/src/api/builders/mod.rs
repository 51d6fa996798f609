//! Connection builders.
//!
//! Functions and builders that produce the settings dictionaries passed to
//! NetworkManager's `AddAndActivateConnection`.
//!
//! # When to Use These
//!
//! The [`Portal`](crate::Portal) builds its profiles internally. These are
//! exposed for callers that want to inspect or reuse the exact settings.
//!
//! # Examples
//!
//! ```rust
//! use nmportal::builders::build_client_connection;
//! use nmportal::Security;
//!
//! let settings = build_client_connection("Home", Security::WPA2, "password123", "");
//! assert!(settings.contains_key("802-11-wireless-security"));
//! assert!(!settings.contains_key("802-1x"));
//! ```

pub mod connection_builder;
pub mod wifi;
pub mod wifi_builder;

pub use connection_builder::{ConnectionBuilder, ConnectionSettings, IpConfig};
pub use wifi::{build_client_connection, build_hotspot_connection};
pub use wifi_builder::{WifiBand, WifiConnectionBuilder, WifiMode};
