//! Caiman - MicroPython firmware build orchestrator
//!
//! This library turns a workspace of MicroPython sources, resources and
//! channel packages into a staged build tree, and pushes that tree to an
//! attached board through a remote-control program.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`cli`] - Command-line interface parsing and output formatting
//! - [`core`] - Business logic: config, manifests, projection, builders
//! - [`infra`] - Infrastructure layer (filesystem, processes, device)
//! - [`config`] - Configuration constants
//! - [`error`] - Error types and handling

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod infra;
