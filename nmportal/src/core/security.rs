//! Access point security classification.
//!
//! NetworkManager reports security as three capability words per access
//! point. This module folds them into a [`Security`] flag set.

use crate::api::models::{ApCapabilities, Security};
use crate::types::constants::{ap_flags, security_flags};

/// Classifies an access point from its raw capability words.
///
/// The rules are additive and nothing is rejected:
///
/// - privacy bit set with empty WPA and RSN words: WEP
/// - any WPA bit: WPA
/// - any RSN bit: WPA2
/// - 802.1X key management in either word: ENTERPRISE
///
/// # Example
///
/// ```rust
/// use nmportal::{classify, ApCapabilities, Security};
///
/// let caps = ApCapabilities { flags: 0x1, wpa_flags: 0, rsn_flags: 0x188 };
/// assert_eq!(classify(caps), Security::WPA2);
/// ```
pub fn classify(caps: ApCapabilities) -> Security {
    let mut security = Security::empty();

    if caps.flags & ap_flags::PRIVACY != 0 && caps.wpa_flags == 0 && caps.rsn_flags == 0 {
        security |= Security::WEP;
    }

    if caps.wpa_flags != 0 {
        security |= Security::WPA;
    }

    if caps.rsn_flags != 0 {
        security |= Security::WPA2;
    }

    if (caps.wpa_flags | caps.rsn_flags) & security_flags::EAP != 0 {
        security |= Security::ENTERPRISE;
    }

    security
}
