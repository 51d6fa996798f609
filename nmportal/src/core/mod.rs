//! Core internal logic of the provisioning engine.
//!
//! This module contains the NetworkManager seam, scanning and
//! classification, helper process supervision, the hotspot lifecycle and
//! the connection flow.

pub(crate) mod backend;
pub(crate) mod connection;
pub(crate) mod connection_settings;
pub(crate) mod device;
pub(crate) mod engine;
pub(crate) mod hotspot;
#[cfg(test)]
pub(crate) mod mock;
pub(crate) mod process;
pub(crate) mod scan;
pub(crate) mod security;
pub(crate) mod state_wait;
