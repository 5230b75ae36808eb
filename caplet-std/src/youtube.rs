use async_trait::async_trait;
use caplet_core::YoutubeConfig;
use caplet_plugin::{CapabilitySpec, ExecutionResult, Plugin, PluginHelper};
use regex::Regex;
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Arc, LazyLock};
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Result string returned for every extraction failure.
pub const FAILURE_MESSAGE: &str = "Failed to extract audio";

/// Output name template: the video title plus whatever extension the tool picks.
const OUTPUT_TEMPLATE: &str = "%(title)s.%(ext)s";

/// Longest stderr excerpt kept in an error.
const MAX_STDERR_CHARS: usize = 2000;

static FEATURE_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&feature=.*").expect("feature suffix pattern is valid"));

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to spawn {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{binary} exited with {status}: {stderr}")]
    Failed {
        binary: String,
        status: String,
        stderr: String,
    },

    #[error("{0} did not report an output file")]
    NoOutput(String),
}

/// Strip a trailing `&feature=...` tracking suffix from a link.
pub(crate) fn normalize_link(link: &str) -> String {
    FEATURE_SUFFIX.replace(link, "").into_owned()
}

/// Extension of the file yt-dlp writes for an `--audio-format` value.
///
/// `None` for `best`, which keeps whatever the source stream was.
pub(crate) fn audio_extension(codec: &str) -> Option<&str> {
    match codec {
        "best" => None,
        "aac" | "alac" => Some("m4a"),
        "vorbis" => Some("ogg"),
        other => Some(other),
    }
}

/// Downloads a link and transcodes its best audio stream.
///
/// Returns the path of the produced file. An extractor may report the
/// pre-transcode name instead; the plugin corrects the extension either way.
#[async_trait]
pub trait AudioExtractor: Send + Sync {
    async fn extract(&self, link: &str) -> Result<PathBuf, ExtractError>;
}

/// [`AudioExtractor`] backed by the `yt-dlp` executable.
///
/// The child process is killed if the extraction future is dropped.
pub struct YtDlpExtractor {
    config: YoutubeConfig,
}

impl YtDlpExtractor {
    pub fn new(config: YoutubeConfig) -> Self {
        Self { config }
    }

    fn output_template(&self) -> String {
        match &self.config.output_dir {
            Some(dir) => dir.join(OUTPUT_TEMPLATE).to_string_lossy().into_owned(),
            None => OUTPUT_TEMPLATE.to_string(),
        }
    }

    fn args(&self, link: &str) -> Vec<String> {
        vec![
            "--format".to_string(),
            self.config.format.clone(),
            "--extract-audio".to_string(),
            "--audio-format".to_string(),
            self.config.codec.clone(),
            "--audio-quality".to_string(),
            format!("{}K", self.config.quality),
            "--output".to_string(),
            self.output_template(),
            "--no-simulate".to_string(),
            "--no-progress".to_string(),
            "--print".to_string(),
            "after_move:filepath".to_string(),
            "--".to_string(),
            link.to_string(),
        ]
    }
}

#[async_trait]
impl AudioExtractor for YtDlpExtractor {
    async fn extract(&self, link: &str) -> Result<PathBuf, ExtractError> {
        let binary = &self.config.binary;
        debug!(binary = %binary, link = %link, "Running extraction tool");

        let output = Command::new(binary)
            .args(self.args(link))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| ExtractError::Spawn {
                binary: binary.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractError::Failed {
                binary: binary.clone(),
                status: output.status.to_string(),
                stderr: stderr.trim().chars().take(MAX_STDERR_CHARS).collect(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        stdout
            .lines()
            .map(str::trim)
            .rev()
            .find(|line| !line.is_empty())
            .map(PathBuf::from)
            .ok_or_else(|| ExtractError::NoOutput(binary.clone()))
    }
}

/// Plugin for extracting the audio track of a YouTube video to a local file.
pub struct YoutubeAudioPlugin {
    extractor: Arc<dyn AudioExtractor>,
    codec: String,
}

impl YoutubeAudioPlugin {
    pub fn new() -> Self {
        Self::from_config(&YoutubeConfig::default())
    }

    pub fn from_config(config: &YoutubeConfig) -> Self {
        Self::with_extractor(Arc::new(YtDlpExtractor::new(config.clone())), &config.codec)
    }

    /// Use a custom extractor. `codec` is the `--audio-format` it transcodes to.
    pub fn with_extractor(extractor: Arc<dyn AudioExtractor>, codec: impl Into<String>) -> Self {
        Self {
            extractor,
            codec: codec.into(),
        }
    }

    async fn extract(&self, link: &str) -> Result<PathBuf, ExtractError> {
        let link = normalize_link(link);
        let produced = self.extractor.extract(&link).await?;
        Ok(match audio_extension(&self.codec) {
            Some(extension) => produced.with_extension(extension),
            None => produced,
        })
    }
}

impl Default for YoutubeAudioPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Plugin for YoutubeAudioPlugin {
    fn source_name(&self) -> &str {
        "YouTube Audio Extractor"
    }

    fn specs(&self) -> Vec<CapabilitySpec> {
        vec![CapabilitySpec::new(
            "extract_youtube_audio",
            "Extract audio from a YouTube video",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "youtube_link": {
                        "type": "string",
                        "description": "YouTube video link to extract audio from"
                    }
                },
                "required": ["youtube_link"]
            }),
        )]
    }

    async fn execute(
        &self,
        _function_name: &str,
        _helper: &PluginHelper,
        arguments: Map<String, Value>,
    ) -> ExecutionResult {
        let Some(link) = arguments.get("youtube_link").and_then(Value::as_str) else {
            warn!("Failed to extract audio from YouTube video: no youtube_link given");
            return ExecutionResult::text(FAILURE_MESSAGE);
        };

        match self.extract(link).await {
            Ok(path) => {
                info!(path = %path.display(), "Extracted audio");
                ExecutionResult::file(path)
            }
            Err(e) => {
                warn!(link = %link, error = %e, "Failed to extract audio from YouTube video");
                ExecutionResult::text(FAILURE_MESSAGE)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    struct FakeExtractor {
        prepared: Option<&'static str>,
        links: Mutex<Vec<String>>,
    }

    impl FakeExtractor {
        fn new(prepared: Option<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                prepared,
                links: Mutex::new(Vec::new()),
            })
        }

        fn links(&self) -> Vec<String> {
            self.links.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl AudioExtractor for FakeExtractor {
        async fn extract(&self, link: &str) -> Result<PathBuf, ExtractError> {
            self.links.lock().unwrap().push(link.to_string());
            self.prepared.map(PathBuf::from).ok_or_else(|| ExtractError::Failed {
                binary: "fake".to_string(),
                status: "exit status: 1".to_string(),
                stderr: "ERROR: Video unavailable".to_string(),
            })
        }
    }

    fn args(link: &str) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("youtube_link".to_string(), json!(link));
        map
    }

    #[test]
    fn test_normalize_link() {
        assert_eq!(
            normalize_link("https://www.youtube.com/watch?v=abc123&feature=shared"),
            "https://www.youtube.com/watch?v=abc123"
        );
        assert_eq!(
            normalize_link("https://www.youtube.com/watch?v=abc123&feature=share&t=42"),
            "https://www.youtube.com/watch?v=abc123"
        );
        assert_eq!(normalize_link("https://youtu.be/abc123"), "https://youtu.be/abc123");
    }

    #[test]
    fn test_spec_is_stable() {
        let plugin = YoutubeAudioPlugin::new();
        let specs = plugin.specs();
        assert_eq!(specs, plugin.specs());
        assert!(specs[0].validate().is_ok());
        assert_eq!(specs[0].required_arguments(), vec!["youtube_link"]);
    }

    #[tokio::test]
    async fn test_feature_suffix_removed_before_extraction() {
        let extractor = FakeExtractor::new(Some("Song.webm"));
        let plugin = YoutubeAudioPlugin::with_extractor(extractor.clone(), "mp3");

        plugin
            .execute(
                "extract_youtube_audio",
                &PluginHelper::new(),
                args("https://www.youtube.com/watch?v=abc123&feature=shared"),
            )
            .await;

        assert_eq!(extractor.links(), vec!["https://www.youtube.com/watch?v=abc123"]);
    }

    #[tokio::test]
    async fn test_success_returns_file_with_codec_extension() {
        for prepared in ["Never Gonna Give You Up.webm", "Never Gonna Give You Up.m4a"] {
            let plugin = YoutubeAudioPlugin::with_extractor(FakeExtractor::new(Some(prepared)), "mp3");
            let result = plugin
                .execute("extract_youtube_audio", &PluginHelper::new(), args("https://youtu.be/x"))
                .await;

            assert_eq!(
                result.to_value(),
                json!({"direct_result": {
                    "kind": "file",
                    "format": "path",
                    "value": "Never Gonna Give You Up.mp3"
                }})
            );
        }
    }

    #[tokio::test]
    async fn test_container_codecs_use_their_file_extension() {
        for (codec, expected) in [
            ("vorbis", "Song.ogg"),
            ("aac", "Song.m4a"),
            ("alac", "Song.m4a"),
            ("opus", "Song.opus"),
            ("best", "Song.webm"),
        ] {
            let plugin = YoutubeAudioPlugin::with_extractor(FakeExtractor::new(Some("Song.webm")), codec);
            let result = plugin
                .execute("extract_youtube_audio", &PluginHelper::new(), args("https://youtu.be/x"))
                .await;

            assert_eq!(result.file_path(), Some(expected), "codec {}", codec);
        }
    }

    #[test]
    fn test_audio_extension() {
        assert_eq!(audio_extension("mp3"), Some("mp3"));
        assert_eq!(audio_extension("vorbis"), Some("ogg"));
        assert_eq!(audio_extension("aac"), Some("m4a"));
        assert_eq!(audio_extension("best"), None);
    }

    #[tokio::test]
    async fn test_failure_returns_legacy_result() {
        let plugin = YoutubeAudioPlugin::with_extractor(FakeExtractor::new(None), "mp3");
        let result = plugin
            .execute("extract_youtube_audio", &PluginHelper::new(), args("https://youtu.be/x"))
            .await;

        assert_eq!(result.to_value(), json!({"result": "Failed to extract audio"}));
        assert!(result.file_path().is_none());
    }

    #[tokio::test]
    async fn test_missing_link_does_not_reach_extractor() {
        let extractor = FakeExtractor::new(Some("Song.webm"));
        let plugin = YoutubeAudioPlugin::with_extractor(extractor.clone(), "mp3");

        let result = plugin
            .execute("extract_youtube_audio", &PluginHelper::new(), Map::new())
            .await;

        assert_eq!(result, ExecutionResult::text(FAILURE_MESSAGE));
        assert!(extractor.links().is_empty());
    }

    #[test]
    fn test_yt_dlp_args() {
        let extractor = YtDlpExtractor::new(YoutubeConfig {
            output_dir: Some(PathBuf::from("/tmp/audio")),
            ..YoutubeConfig::default()
        });
        let args = extractor.args("https://youtu.be/x");

        let expected: Vec<String> = [
            "--format",
            "bestaudio/best",
            "--extract-audio",
            "--audio-format",
            "mp3",
            "--audio-quality",
            "320K",
            "--output",
            "/tmp/audio/%(title)s.%(ext)s",
            "--no-simulate",
            "--no-progress",
            "--print",
            "after_move:filepath",
            "--",
            "https://youtu.be/x",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        assert_eq!(args, expected);
    }

    #[tokio::test]
    async fn test_missing_binary_is_spawn_error() {
        let extractor = YtDlpExtractor::new(YoutubeConfig {
            binary: "/nonexistent/yt-dlp".to_string(),
            ..YoutubeConfig::default()
        });

        let err = extractor.extract("https://youtu.be/x").await.unwrap_err();
        assert!(matches!(err, ExtractError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_tool_failure_falls_back() {
        let config = YoutubeConfig {
            binary: "false".to_string(),
            ..YoutubeConfig::default()
        };
        let plugin = YoutubeAudioPlugin::from_config(&config);

        let result = plugin
            .execute("extract_youtube_audio", &PluginHelper::new(), args("https://youtu.be/x"))
            .await;

        assert_eq!(result, ExecutionResult::text(FAILURE_MESSAGE));
    }
}
