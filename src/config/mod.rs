//! Configuration constants
//!
//! Defaults shared by the config loader, the builders and the device bridge.

pub mod defaults;
