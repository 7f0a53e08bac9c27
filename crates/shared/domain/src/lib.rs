//! # Domain Models
//!
//! Pure data types shared by the workspace: the extension manifest, the
//! auto-configuration decision and the harness configuration.
//! Keep it lean: `serde` only, no I/O.

pub mod autoconfig;
pub mod config;
pub mod constants;
pub mod manifest;
