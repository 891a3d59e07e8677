//! Error types for the timer.

/// Everything that can go wrong while talking to the disk or the host.
#[derive(Debug, thiserror::Error)]
pub enum TimerError {
    /// I/O error while reading or writing a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A config or preference file could not be parsed.
    #[error("couldn't parse {}: {source}", path.display())]
    Parse {
        path: std::path::PathBuf,
        source: toml::de::Error,
    },

    /// A config or preference table could not be serialized.
    #[error("couldn't serialize: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// The platform has no home/config directory for us.
    #[error("couldn't find a config directory for {0}")]
    NoProjectDirs(&'static str),

    /// Audio output or decoding error.
    #[error("audio error: {0}")]
    Audio(String),

    /// Desktop notification error.
    #[error("notification error: {0}")]
    Notification(String),

    /// A vibration waveform that can't be played.
    #[error("invalid waveform: {0}")]
    Waveform(&'static str),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, TimerError>;
