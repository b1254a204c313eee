//! Infrastructure layer
//!
//! Handles all I/O with the outside world: the filesystem, external
//! processes, the cross compiler and the attached device.

pub mod device;
pub mod filesystem;
pub mod process;
pub mod remote_fs;
pub mod toolchain;
