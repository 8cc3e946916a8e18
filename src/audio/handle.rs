// Audio handle abstraction
// The playlist only talks to playback through these traits
use std::fmt;
use tokio::sync::mpsc;

/// Generation id of a handle. Events carry it so stale ones can be dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackToken(pub u64);

impl fmt::Display for TrackToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "track-{}", self.0)
    }
}

/// Asynchronous completions reported by a handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaEvent {
    /// Enough is loaded to start playing
    CanPlay,
    LoadError(String),
    /// A `play()` request went through
    PlayStarted,
    PlayFailed(String),
    /// Playback reached the end of the recording
    Ended,
}

/// Event sender bound to one handle's token.
#[derive(Debug, Clone)]
pub struct MediaEvents {
    token: TrackToken,
    sender: mpsc::UnboundedSender<(TrackToken, MediaEvent)>,
}

impl MediaEvents {
    pub fn new(
        token: TrackToken,
        sender: mpsc::UnboundedSender<(TrackToken, MediaEvent)>,
    ) -> Self {
        Self { token, sender }
    }

    pub fn token(&self) -> TrackToken {
        self.token
    }

    /// Events sent after the receiver is gone are dropped
    pub fn emit(&self, event: MediaEvent) {
        let _ = self.sender.send((self.token, event));
    }
}

/// One playable recording.
///
/// Mirrors a media element: `load` and `play` complete asynchronously through
/// the handle's [`MediaEvents`], everything else takes effect immediately.
pub trait AudioHandle: Send {
    fn set_volume(&mut self, volume: f32);

    /// Start loading. Reports `CanPlay` or `LoadError`.
    fn load(&mut self);

    /// Start or resume playback. Reports `PlayStarted` or `PlayFailed`.
    fn play(&mut self);

    fn pause(&mut self);

    fn is_paused(&self) -> bool;

    fn seek_to_start(&mut self);

    /// Free the underlying resources. Events already in flight may still arrive.
    fn release(self: Box<Self>);
}

/// Factory for handles
pub trait AudioBackend: Send + 'static {
    fn create(&mut self, uri: &str, events: MediaEvents) -> Box<dyn AudioHandle>;
}
