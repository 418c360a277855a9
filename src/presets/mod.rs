//! Request preset persistence.
//!
//! Presets are kept in memory and the full set is rewritten to a JSON file
//! on every upsert. Reads never touch the disk after startup.

pub mod store;

pub use store::{Preset, PresetError, PresetStore};
