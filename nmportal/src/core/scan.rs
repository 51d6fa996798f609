//! Wi-Fi network scanning and enumeration.
//!
//! Reads every access point visible to the wireless device, classifies its
//! security and returns one entry per SSID, strongest first.

use log::{debug, info, warn};
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;
use zvariant::OwnedObjectPath;

use crate::Result;
use crate::api::config::Timings;
use crate::api::models::{AccessPoint, PortalError};
use crate::core::backend::NetworkBackend;
use crate::core::security::classify;
use crate::core::state_wait::pause;
use crate::util::utils::decode_ssid_or_empty;

/// Scans until at least one access point is visible.
///
/// An empty pass is retried after `timings.scan_backoff`, up to
/// `retry_limit` times, so an empty environment costs exactly
/// `retry_limit + 1` queries before [`PortalError::NoAccessPoint`].
pub(crate) async fn scan(
    backend: &dyn NetworkBackend,
    retry_limit: u32,
    timings: &Timings,
    cancel: &CancellationToken,
) -> Result<Vec<AccessPoint>> {
    let mut attempt = 0;

    loop {
        let aps = list_access_points(backend).await?;
        if !aps.is_empty() {
            info!("Found {} access points", aps.len());
            return Ok(aps);
        }

        if attempt >= retry_limit {
            warn!("No access point found after {} scans", attempt + 1);
            return Err(PortalError::NoAccessPoint);
        }
        attempt += 1;

        debug!("No access point visible yet, retry {attempt}/{retry_limit}");
        pause(timings.scan_backoff, cancel).await?;
    }
}

/// One scan pass: deduplicated by SSID and sorted by strength.
///
/// An access point whose properties cannot be read is logged and skipped.
/// Within the pass the last access point seen for an SSID wins. Ties in
/// strength are ordered by SSID so the listing is stable.
pub(crate) async fn list_access_points(backend: &dyn NetworkBackend) -> Result<Vec<AccessPoint>> {
    let mut by_ssid: HashMap<String, AccessPoint> = HashMap::new();

    for path in backend.visible_access_points().await? {
        match read_access_point(backend, &path).await {
            Ok(Some(ap)) => {
                by_ssid.insert(ap.ssid.clone(), ap);
            }
            Ok(None) => debug!("Ignoring access point without SSID: {}", path.as_str()),
            Err(e) => warn!("Skipping access point {}: {e}", path.as_str()),
        }
    }

    let mut aps: Vec<AccessPoint> = by_ssid.into_values().collect();
    aps.sort_by(|a, b| b.strength.cmp(&a.strength).then_with(|| a.ssid.cmp(&b.ssid)));
    Ok(aps)
}

async fn read_access_point(
    backend: &dyn NetworkBackend,
    path: &OwnedObjectPath,
) -> Result<Option<AccessPoint>> {
    let ssid_bytes = backend.access_point_ssid(path).await?;
    let ssid = decode_ssid_or_empty(&ssid_bytes);
    if ssid.is_empty() {
        return Ok(None);
    }

    let strength = backend.access_point_strength(path).await?;
    let caps = backend.access_point_capabilities(path).await?;

    Ok(Some(AccessPoint {
        ssid: ssid.into_owned(),
        path: path.clone(),
        strength,
        security: classify(caps),
    }))
}
