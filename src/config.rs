use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Semaphore;
use crate::error::{Result, MuxError};

fn default_overwrite() -> bool {
    true
}

fn default_sort_files() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub paths: PathsConfig,
    pub mux: MuxConfig,
    pub matching: MatchingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory holding the episode videos
    pub video_dir: PathBuf,
    /// Directory holding the audio tracks to attach
    pub audio_dir: PathBuf,
    /// Directory receiving merged containers (created when missing)
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MuxConfig {
    /// Path to merge tool binary (e.g., mkvmerge)
    pub binary_path: String,
    /// Maximum number of merge tool processes running at once
    pub max_concurrency: usize,
    /// Language code applied to every attached audio track
    pub language: String,
    /// Track name applied to every attached audio track
    pub track_name: String,
    /// Extension of the produced container files
    pub container_extension: String,
    /// Re-create outputs that already exist instead of skipping the video
    #[serde(default = "default_overwrite")]
    pub overwrite: bool,
    /// Kill a merge that runs longer than this; unset waits indefinitely
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Extension of video files picked up from the video directory
    pub video_extension: String,
    /// Extension of audio files picked up from the audio directory
    pub audio_extension: String,
    /// Regex locating the episode number in a video name; group 1 is the id
    pub episode_pattern: String,
    /// Regex template for audio names; `{episode}` is replaced by the escaped id
    pub audio_pattern: String,
    /// Sort listings by file name instead of keeping directory order
    #[serde(default = "default_sort_files")]
    pub sort_files: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            paths: PathsConfig {
                video_dir: PathBuf::from("Episodes"),
                audio_dir: PathBuf::from("Audio"),
                output_dir: PathBuf::from("Output"),
            },
            mux: MuxConfig {
                binary_path: "mkvmerge".to_string(),
                max_concurrency: 2,
                language: "rus".to_string(),
                track_name: "Озвучка".to_string(),
                container_extension: "mkv".to_string(),
                overwrite: true,
                timeout_secs: None,
            },
            matching: MatchingConfig {
                video_extension: "mp4".to_string(),
                audio_extension: "mka".to_string(),
                episode_pattern: r"E(\d{2})".to_string(),
                audio_pattern: r"-\s*{episode}\b".to_string(),
                sort_files: true,
            },
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| MuxError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)?;

        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;

        std::fs::write(path, content)
            .map_err(|e| MuxError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Reject settings the merge run cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.mux.max_concurrency == 0 {
            return Err(MuxError::Config("max_concurrency must be at least 1".to_string()));
        }
        if self.mux.max_concurrency > Semaphore::MAX_PERMITS {
            return Err(MuxError::Config(format!(
                "max_concurrency must be at most {}",
                Semaphore::MAX_PERMITS
            )));
        }
        if self.mux.binary_path.trim().is_empty() {
            return Err(MuxError::Config("binary_path must not be empty".to_string()));
        }

        let extensions = [
            ("video_extension", &self.matching.video_extension),
            ("audio_extension", &self.matching.audio_extension),
            ("container_extension", &self.mux.container_extension),
        ];
        for (name, value) in extensions {
            if value.trim().is_empty() {
                return Err(MuxError::Config(format!("{} must not be empty", name)));
            }
        }

        Ok(())
    }
}
