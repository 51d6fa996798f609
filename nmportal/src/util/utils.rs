//! Utility functions for Wi-Fi data conversion.

use log::warn;
use std::borrow::Cow;
use std::str;

/// Decode SSID bytes, defaulting to an empty string if empty or invalid UTF-8.
///
/// Callers treat the empty string as "no usable SSID".
pub(crate) fn decode_ssid_or_empty(bytes: &[u8]) -> Cow<'static, str> {
    if bytes.is_empty() {
        return Cow::Borrowed("");
    }

    match str::from_utf8(bytes) {
        Ok(s) => Cow::Owned(s.to_owned()),
        Err(e) => {
            warn!("Invalid UTF-8 in SSID: {e}");
            Cow::Borrowed("")
        }
    }
}
