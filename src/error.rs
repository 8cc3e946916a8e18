// Error types for playback and the audio device layer
use thiserror::Error;

/// Failures the playlist controller recovers from by skipping to the next song.
///
/// None of these reach the caller. They exist so the skip can be logged with
/// a reason attached.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaybackError {
    #[error("failed to load {uri}: {reason}")]
    LoadFailure { uri: String, reason: String },

    #[error("failed to start {uri}: {reason}")]
    PlaybackStartFailure { uri: String, reason: String },

    #[error("failed to resume {uri}: {reason}")]
    ResumeFailure { uri: String, reason: String },
}

/// Errors raised while decoding a recording or driving the output device.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("unsupported recording uri: {0}")]
    UnsupportedUri(String),

    #[error("failed to open file: {0}")]
    Open(#[from] std::io::Error),

    #[error("failed to probe file format: {0}")]
    Probe(String),

    #[error("no audio track found")]
    NoTrack,

    #[error("decoder error: {0}")]
    Codec(String),

    #[error("no output device available")]
    NoDevice,

    #[error("output stream error: {0}")]
    Stream(String),

    #[error("resampler error: {0}")]
    Resample(String),
}

pub type AudioResult<T> = std::result::Result<T, AudioError>;
