// Simulated audio backend
// Plays nothing; reports load/play/ended on tokio timers. Used by --simulate and the tests.
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::handle::{AudioBackend, AudioHandle, MediaEvent, MediaEvents, TrackToken};

/// Observable state of one simulated handle
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedTrack {
    pub token: TrackToken,
    pub uri: String,
    pub volume: f32,
    pub paused: bool,
    pub rewound: bool,
    pub released: bool,
    pub plays: usize,
}

#[derive(Default)]
struct BackendShared {
    tracks: Vec<Arc<Mutex<SimulatedTrack>>>,
    broken: HashSet<String>,
    unplayable: HashSet<String>,
}

/// Backend whose recordings last `track_length` and make no sound.
#[derive(Clone)]
pub struct SimulatedBackend {
    track_length: Duration,
    shared: Arc<Mutex<BackendShared>>,
}

impl SimulatedBackend {
    pub fn new(track_length: Duration) -> Self {
        Self {
            track_length,
            shared: Arc::new(Mutex::new(BackendShared::default())),
        }
    }

    /// Recordings with this uri report a load error
    pub fn with_broken(self, uri: &str) -> Self {
        self.shared.lock().broken.insert(uri.to_string());
        self
    }

    /// Recordings with this uri load but refuse to play
    pub fn with_unplayable(self, uri: &str) -> Self {
        self.shared.lock().unplayable.insert(uri.to_string());
        self
    }

    /// Every handle created so far, oldest first
    pub fn tracks(&self) -> Vec<SimulatedTrack> {
        self.shared
            .lock()
            .tracks
            .iter()
            .map(|track| track.lock().clone())
            .collect()
    }

    /// Handles that have not been released
    pub fn live_tracks(&self) -> Vec<SimulatedTrack> {
        self.tracks().into_iter().filter(|t| !t.released).collect()
    }
}

impl AudioBackend for SimulatedBackend {
    fn create(&mut self, uri: &str, events: MediaEvents) -> Box<dyn AudioHandle> {
        let state = Arc::new(Mutex::new(SimulatedTrack {
            token: events.token(),
            uri: uri.to_string(),
            volume: 1.0,
            paused: true,
            rewound: false,
            released: false,
            plays: 0,
        }));

        let mut shared = self.shared.lock();
        shared.tracks.push(state.clone());

        Box::new(SimulatedHandle {
            state,
            events,
            broken: shared.broken.contains(uri),
            unplayable: shared.unplayable.contains(uri),
            remaining: self.track_length,
            track_length: self.track_length,
            started_at: None,
            timer: None,
        })
    }
}

struct SimulatedHandle {
    state: Arc<Mutex<SimulatedTrack>>,
    events: MediaEvents,
    broken: bool,
    unplayable: bool,
    remaining: Duration,
    track_length: Duration,
    started_at: Option<Instant>,
    // Fires `Ended` when the remaining time runs out
    timer: Option<JoinHandle<()>>,
}

impl SimulatedHandle {
    fn stop_clock(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        if let Some(started_at) = self.started_at.take() {
            self.remaining = self.remaining.saturating_sub(started_at.elapsed());
        }
    }
}

impl AudioHandle for SimulatedHandle {
    fn set_volume(&mut self, volume: f32) {
        self.state.lock().volume = volume.clamp(0.0, 1.0);
    }

    fn load(&mut self) {
        if self.broken {
            self.events
                .emit(MediaEvent::LoadError("simulated load failure".to_string()));
        } else {
            self.events.emit(MediaEvent::CanPlay);
        }
    }

    fn play(&mut self) {
        if self.unplayable {
            self.events
                .emit(MediaEvent::PlayFailed("simulated play failure".to_string()));
            return;
        }
        let ended = match &self.timer {
            Some(timer) if !timer.is_finished() => {
                self.events.emit(MediaEvent::PlayStarted);
                return;
            }
            Some(_) => true,
            None => false,
        };
        // Settle the clock so an ended recording starts over
        if ended {
            self.stop_clock();
        }
        if self.remaining.is_zero() {
            self.remaining = self.track_length;
        }

        {
            let mut state = self.state.lock();
            state.paused = false;
            state.rewound = false;
            state.plays += 1;
        }
        self.events.emit(MediaEvent::PlayStarted);

        let remaining = self.remaining;
        let events = self.events.clone();
        let state = self.state.clone();
        self.started_at = Some(Instant::now());
        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(remaining).await;
            state.lock().paused = true;
            events.emit(MediaEvent::Ended);
        }));
    }

    fn pause(&mut self) {
        self.stop_clock();
        self.state.lock().paused = true;
    }

    fn is_paused(&self) -> bool {
        self.state.lock().paused
    }

    fn seek_to_start(&mut self) {
        self.remaining = self.track_length;
        self.state.lock().rewound = true;
    }

    fn release(mut self: Box<Self>) {
        self.stop_clock();
        self.state.lock().released = true;
    }
}

impl Drop for SimulatedHandle {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}
