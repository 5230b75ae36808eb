//! caplet-core - shared infrastructure for caplet plugins
//!
//! Holds the YAML configuration the built-in plugins and the CLI read from.

pub mod config;

pub use config::{Config, ConfigError, CryptoConfig, YoutubeConfig};
