//! Type definitions and constants.
//!
//! This module contains NetworkManager constants shared by the engine.

pub(crate) mod constants;
