//! Captive-portal Wi-Fi provisioning on top of NetworkManager.
//!
//! A headless device without network access opens its own access point,
//! lets a user pick one of the networks it saw nearby and then joins that
//! network. If joining fails the access point comes back so the user can
//! try again.
//!
//! The crate provides:
//!
//! - Scanning and security classification of visible networks
//! - The hotspot lifecycle, including a supervised `dnsmasq` for DHCP/DNS
//! - The connection flow with its timeouts and fallback to the portal
//! - A [`Portal`] task that serializes all of the above
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use nmportal::{Portal, PortalConfig, PortalHandle, PortalService};
//!
//! struct Api;
//!
//! #[async_trait::async_trait]
//! impl PortalService for Api {
//!     async fn start(&self, _portal: PortalHandle) -> nmportal::Result<()> { Ok(()) }
//!     async fn stop(&self) -> nmportal::Result<()> { Ok(()) }
//! }
//!
//! # async fn example() -> nmportal::Result<()> {
//! let config = PortalConfig {
//!     ssid: "Setup".into(),
//!     ..PortalConfig::default()
//! };
//! let portal = Portal::spawn(config, Arc::new(Api)).await?;
//! portal.start().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! All operations return `Result<T, PortalError>`. Transient conditions
//! (nothing visible yet, activation still pending) are retried internally;
//! a failed connection attempt is reported as `Ok(false)` after the portal
//! has been reopened.
//!
//! # Logging
//!
//! This crate uses the [`log`](https://docs.rs/log) facade for logging. To see
//! log output, add a logging implementation like `env_logger`. For example:
//!
//! ```no_run,ignore
//! env_logger::init();
//! // ...
//! ```

// Internal implementation modules
mod core;
mod dbus;
mod types;
mod util;

// Public API modules
pub mod api;

// Re-exported public API
pub use api::builders;
pub use api::config::{PortalConfig, Timings};
pub use api::models::{
    AccessPoint, AccessPointSummary, ActivatedProfile, ActiveConnectionState, ApCapabilities,
    ConnectivityState, HotspotState, PortalError, SavedProfile, Security,
};
pub use api::portal::{Portal, PortalHandle, PortalService};
pub use crate::core::backend::{NetworkBackend, NmBackend};
pub use crate::core::process::ProcessSupervisor;
pub use crate::core::security::classify;

/// A specialized `Result` type for portal operations.
pub type Result<T> = std::result::Result<T, PortalError>;
