//! Standard plugins for caplet
//!
//! - Crypto price lookup against the CoinGecko simple-price API
//! - YouTube audio extraction through `yt-dlp`

mod crypto;
mod youtube;

pub use crypto::CryptoRatePlugin;
pub use youtube::{AudioExtractor, ExtractError, YoutubeAudioPlugin, YtDlpExtractor, FAILURE_MESSAGE};

use caplet_core::Config;
use caplet_plugin::Plugin;
use std::sync::Arc;

/// Every built-in plugin, configured from `config`.
pub fn builtin_plugins(config: &Config) -> Vec<Arc<dyn Plugin>> {
    vec![
        Arc::new(CryptoRatePlugin::from_config(&config.crypto)),
        Arc::new(YoutubeAudioPlugin::from_config(&config.youtube)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use caplet_plugin::{ExecutionRequest, ExecutionResult, PluginHelper, PluginRegistry};
    use serde_json::json;

    fn registry() -> PluginRegistry {
        let mut registry = PluginRegistry::new();
        for plugin in builtin_plugins(&Config::default()) {
            registry.register(plugin).unwrap();
        }
        registry
    }

    #[test]
    fn test_builtin_specs_are_valid() {
        let registry = registry();
        assert_eq!(registry.len(), 2);
        for spec in registry.specs() {
            assert!(spec.validate().is_ok(), "{} has an invalid spec", spec.name);
        }
        assert_eq!(registry.source_of("extract_youtube_audio"), Some("YouTube Audio Extractor"));
    }

    #[tokio::test]
    async fn test_registry_rejects_missing_arguments() {
        let registry = registry();

        let result = registry
            .execute(ExecutionRequest::from_json("get_crypto_rate", json!({})), &PluginHelper::new())
            .await
            .unwrap();
        assert_eq!(result, ExecutionResult::error("Asset parameter is required."));

        let result = registry
            .execute(
                ExecutionRequest::from_json("extract_youtube_audio", json!({"youtube_link": ""})),
                &PluginHelper::new(),
            )
            .await
            .unwrap();
        assert_eq!(result, ExecutionResult::error("Youtube_link parameter is required."));
    }
}
