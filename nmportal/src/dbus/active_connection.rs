//! NetworkManager Active Connection proxy.

use zbus::{Result, proxy};

/// Proxy for active connection interface.
///
/// Only the activation state is read; the engine polls it after
/// `AddAndActivateConnection` until the profile is up or a timeout passes.
#[proxy(
    interface = "org.freedesktop.NetworkManager.Connection.Active",
    default_service = "org.freedesktop.NetworkManager"
)]
pub trait NMActiveConnection {
    /// Current state of the active connection.
    ///
    /// Values:
    /// - 0: Unknown
    /// - 1: Activating
    /// - 2: Activated
    /// - 3: Deactivating
    /// - 4: Deactivated
    #[zbus(property)]
    fn state(&self) -> Result<u32>;
}
