use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config file the CLI reads when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "caplet.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Configuration for the built-in plugins.
///
/// Every section is optional in the YAML file; missing sections fall back to
/// their defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crypto: CryptoConfig,
    #[serde(default)]
    pub youtube: YoutubeConfig,
}

/// Settings for the price lookup plugin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CryptoConfig {
    /// Base URL of the price API, without the `/simple/price` suffix
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_base_url() -> String {
    "https://api.coingecko.com/api/v3".to_string()
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

/// Settings for the audio extraction plugin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YoutubeConfig {
    /// Extraction tool executable
    #[serde(default = "default_binary")]
    pub binary: String,
    /// Stream selector handed to the tool
    #[serde(default = "default_format")]
    pub format: String,
    /// Audio codec to transcode to (`--audio-format`). `aac`/`alac` produce
    /// `.m4a` files and `vorbis` produces `.ogg`.
    #[serde(default = "default_codec")]
    pub codec: String,
    /// Bitrate in kbit/s
    #[serde(default = "default_quality")]
    pub quality: u32,
    /// Directory the audio file is written to. Unset means the working directory.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

fn default_binary() -> String {
    "yt-dlp".to_string()
}

fn default_format() -> String {
    "bestaudio/best".to_string()
}

fn default_codec() -> String {
    "mp3".to_string()
}

fn default_quality() -> u32 {
    320
}

impl Default for YoutubeConfig {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            format: default_format(),
            codec: default_codec(),
            quality: default_quality(),
            output_dir: None,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }
}
