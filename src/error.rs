/// Custom error type for the soundwatch monitor.
#[derive(Debug, thiserror::Error)]
pub enum SoundwatchError {
    #[error("No usable input device: {0}")]
    DeviceUnavailable(String),

    #[error("Unsupported sample rate/format: {0}")]
    RateUnsupported(String),

    #[error("Audio stream error: {0}")]
    Stream(String),

    #[error("Classifier error: {0}")]
    Classifier(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WAV error: {0}")]
    Wav(String),
}

impl SoundwatchError {
    /// Whether this error should abort the process rather than be retried.
    ///
    /// Device and rate negotiation failures at startup are fatal; everything
    /// else is recovered inside the monitoring loop.
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            SoundwatchError::DeviceUnavailable(_) | SoundwatchError::RateUnsupported(_)
        )
    }
}
