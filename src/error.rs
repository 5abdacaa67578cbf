use thiserror::Error;

/// Library-level errors using thiserror for structured error handling.
///
/// Construction-time problems (bad target, bad config) are returned to the
/// caller synchronously. Per-tick capture failures never leave the worker;
/// they are logged and the tick is skipped.

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Failed to initialize screen capturer")]
    InitFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Failed to capture screen")]
    CaptureFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("No displays found")]
    NoDisplays,
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Screen capture unavailable")]
    CaptureUnavailable(#[from] CaptureError),

    #[error("Invalid target image: {reason}")]
    InvalidTarget { reason: String },

    #[error("Invalid engine configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("Match loop already running")]
    AlreadyRunning,

    #[error("Failed to start match worker thread")]
    WorkerSpawn(#[source] std::io::Error),
}

impl EngineError {
    pub(crate) fn invalid_target(reason: impl Into<String>) -> Self {
        EngineError::InvalidTarget {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_config(reason: impl Into<String>) -> Self {
        EngineError::InvalidConfig {
            reason: reason.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum AlertError {
    #[error("Failed to load audio file: {path}")]
    LoadFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to decode audio format")]
    DecodeFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Failed to initialize audio output stream")]
    StreamInitFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Custom sound selected but no file configured")]
    NoCustomSound,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration from {path}")]
    LoadFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to save configuration to {path}")]
    SaveFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Could not determine user config directory")]
    NoConfigDir,

    #[error("Failed to create config directory: {path}")]
    DirectoryCreationFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Type alias for application Results using anyhow for context chaining
pub type AppResult<T> = anyhow::Result<T>;
