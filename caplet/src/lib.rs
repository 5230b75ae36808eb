//! caplet - pluggable capabilities for conversational agents
//!
//! This is the convenience wrapper crate that re-exports caplet components
//! with optional feature flags for easy usage.
//!
//! # Features
//!
//! - `std` (default): Include the built-in plugins

pub use caplet_core::*;
pub use caplet_plugin;

#[cfg(feature = "std")]
pub use caplet_std;

/// Prelude module for convenient imports
pub mod prelude {
    pub use caplet_core::Config;
    pub use caplet_plugin::{
        CapabilitySpec, ExecutionRequest, ExecutionResult, Plugin, PluginHelper, PluginRegistry,
    };

    #[cfg(feature = "std")]
    pub use caplet_std::{builtin_plugins, CryptoRatePlugin, YoutubeAudioPlugin};
}
