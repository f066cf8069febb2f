//! Configuration loading for decorsim.
//!
//! Reads a [`SimConfig`](decorsim_core::config::SimConfig) from a RON, TOML
//! or JSON file; the format is picked from the file extension. Every section
//! and field is optional and falls back to the built-in defaults.

pub mod loader;

pub use loader::{ConfigError, Format, load_config, load_config_dir};
