//! Settings for terra-stac
//!
//! This crate defines the immutable `Settings` value and the loader that
//! assembles it from defaults, an optional JSON file and environment variables.

pub mod loader;
pub mod settings;

pub use loader::*;
pub use settings::*;
