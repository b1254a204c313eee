//! Core business logic module
//!
//! Everything that decides what to build, install or deploy. Side effects on
//! the outside world go through [`crate::infra`].
//!
//! # Submodules
//!
//! - [`config`] - Workspace config (caiman.toml) parsing and validation
//! - [`workspace`] - Workspace layout and path containment
//! - [`ignore`] - `.gitignore`-style ignore rules
//! - [`target`] - Target kinds and descriptors
//! - [`manifest`] - Content-addressed file manifests and their store
//! - [`source`] - File selection and source-to-target projection
//! - [`task`] - Copy, compile, move and remote install tasks
//! - [`builder`] - Build orchestration
//! - [`installer`] - Package installation through a channel
//! - [`deployment`] - Staging manifested files and uploading the build tree
//! - [`clean`] - Clean build output
//! - [`init`] - Workspace initialization
//! - [`doctor`] - Environment checks

pub mod builder;
pub mod clean;
pub mod config;
pub mod deployment;
pub mod doctor;
pub mod ignore;
pub mod init;
pub mod installer;
pub mod manifest;
pub mod source;
pub mod target;
pub mod task;
pub mod workspace;
