use thiserror::Error;

#[derive(Error, Debug)]
pub enum MuxError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("Invalid pattern: {0}")]
    Regex(#[from] regex::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Directory not found: {0}")]
    DirectoryNotFound(String),

    #[error("Merge tool unavailable: {0}")]
    ToolUnavailable(String),

    #[error("No episode number in '{0}'")]
    NoEpisodeId(String),

    #[error("No audio file matches episode '{0}'")]
    NoMatchingAudio(String),

    #[error("[{label}] merge tool failed: {reason}")]
    ToolExecutionFailed { label: String, reason: String },

    #[error("[{label}] failed to launch merge tool: {message}")]
    Launch { label: String, message: String },
}

pub type Result<T> = std::result::Result<T, MuxError>;
