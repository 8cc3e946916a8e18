// Playlist audio controller
// Keeps one audio handle in step with the store's playback snapshots
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::fade::{FadeRamp, FadeTimer};
use crate::audio::{AudioBackend, AudioHandle, MediaEvent, MediaEvents, TrackToken};
use crate::error::PlaybackError;
use crate::settings::FadeSettings;
use crate::store::{Intent, IntentDispatcher, PlaybackState, StateNotifier, SubscriptionId};

/// Volumes closer than this count as equal
const VOLUME_EPSILON: f32 = 1e-4;

/// Where the active track is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackPhase {
    /// Waiting for the handle to report it can play
    Loading,
    /// `play()` requested after load
    Starting,
    FadingIn,
    Playing,
    /// `play()` requested on a paused handle
    Resuming,
    Ended,
}

struct ActiveTrack {
    bird_card_id: i64,
    token: TrackToken,
    uri: String,
    handle: Box<dyn AudioHandle>,
    // Volume the store asked for; the handle may still be ramping towards it
    target_volume: f32,
    phase: TrackPhase,
}

impl ActiveTrack {
    fn has_started(&self) -> bool {
        matches!(
            self.phase,
            TrackPhase::FadingIn | TrackPhase::Playing | TrackPhase::Ended
        )
    }
}

struct ActiveFade {
    ramp: FadeRamp,
    timer: FadeTimer,
}

/// Receiving ends of the controller's own event channels
pub struct ControllerEvents {
    pub media: mpsc::UnboundedReceiver<(TrackToken, MediaEvent)>,
    pub fade_ticks: mpsc::UnboundedReceiver<TrackToken>,
}

pub struct PlaylistAudioController {
    backend: Box<dyn AudioBackend>,
    dispatcher: Arc<dyn IntentDispatcher>,
    fade_settings: FadeSettings,
    rng: StdRng,
    media_tx: mpsc::UnboundedSender<(TrackToken, MediaEvent)>,
    fade_tx: mpsc::UnboundedSender<TrackToken>,
    next_token: u64,
    subscription: Option<(Arc<dyn StateNotifier>, SubscriptionId)>,
    active: Option<ActiveTrack>,
    fade: Option<ActiveFade>,
}

impl PlaylistAudioController {
    pub fn new(
        backend: Box<dyn AudioBackend>,
        dispatcher: Arc<dyn IntentDispatcher>,
        fade_settings: FadeSettings,
    ) -> (Self, ControllerEvents) {
        let (media_tx, media) = mpsc::unbounded_channel();
        let (fade_tx, fade_ticks) = mpsc::unbounded_channel();

        let controller = Self {
            backend,
            dispatcher,
            fade_settings,
            rng: StdRng::from_entropy(),
            media_tx,
            fade_tx,
            next_token: 1,
            subscription: None,
            active: None,
            fade: None,
        };

        (controller, ControllerEvents { media, fade_ticks })
    }

    /// Replace the recording picker's randomness, e.g. with a seeded rng
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    /// Register the single store listener. A previous subscription is dropped first.
    pub fn subscribe(
        &mut self,
        notifier: Arc<dyn StateNotifier>,
    ) -> mpsc::UnboundedReceiver<PlaybackState> {
        self.unsubscribe();
        let subscription = notifier.subscribe();
        debug!(id = subscription.id.0, "Subscribed to playback state");
        self.subscription = Some((notifier, subscription.id));
        subscription.receiver
    }

    fn unsubscribe(&mut self) {
        if let Some((notifier, id)) = self.subscription.take() {
            notifier.unsubscribe(id);
            debug!(id = id.0, "Unsubscribed from playback state");
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn active_bird_id(&self) -> Option<i64> {
        self.active.as_ref().map(|track| track.bird_card_id)
    }

    pub fn active_token(&self) -> Option<TrackToken> {
        self.active.as_ref().map(|track| track.token)
    }

    pub fn active_phase(&self) -> Option<TrackPhase> {
        self.active.as_ref().map(|track| track.phase)
    }

    pub fn is_fading(&self) -> bool {
        self.fade.is_some()
    }

    /// React to one store emission
    pub fn handle_playback_change(&mut self, snapshot: &PlaybackState) {
        if snapshot.is_playing {
            // None: nothing active for this bird yet
            let paused = self
                .active
                .as_ref()
                .filter(|track| Some(track.bird_card_id) == snapshot.current_bird_id)
                .map(|track| track.has_started() && track.handle.is_paused());

            match paused {
                Some(true) => self.resume_audio(),
                Some(false) => {}
                None => self.play_current_song(snapshot),
            }
        } else {
            self.stop_audio();
        }

        self.apply_volume(snapshot.volume);
    }

    fn play_current_song(&mut self, snapshot: &PlaybackState) {
        let Some(bird_id) = snapshot.current_bird_id else {
            info!("No bird selected, stopping playlist");
            self.dispatch(Intent::StopPlaylist);
            return;
        };

        let card = match snapshot.find_card(bird_id) {
            Some(card) if !card.recordings.is_empty() => card,
            Some(card) => {
                info!(bird = %card.label(), "Bird has no recordings, skipping");
                self.dispatch(Intent::NextSong);
                return;
            }
            None => {
                warn!(bird_id, "Selected bird is not in the card list, skipping");
                self.dispatch(Intent::NextSong);
                return;
            }
        };

        if self.active_bird_id() == Some(bird_id) {
            return;
        }

        self.stop_audio();

        let index = self.rng.gen_range(0..card.recordings.len());
        let uri = card.recordings[index].clone();
        let token = TrackToken(self.next_token);
        self.next_token += 1;

        let mut handle = self
            .backend
            .create(&uri, MediaEvents::new(token, self.media_tx.clone()));
        handle.set_volume(0.0);
        handle.load();

        info!(bird = %card.label(), %uri, %token, "Loading recording");
        self.active = Some(ActiveTrack {
            bird_card_id: bird_id,
            token,
            uri,
            handle,
            target_volume: snapshot.volume,
            phase: TrackPhase::Loading,
        });
    }

    /// Assign a changed store volume straight to the handle
    fn apply_volume(&mut self, volume: f32) {
        let Some(track) = self.active.as_mut() else {
            return;
        };
        if (track.target_volume - volume).abs() <= VOLUME_EPSILON {
            return;
        }

        debug!(from = track.target_volume, to = volume, "Volume changed");
        track.target_volume = volume;
        track.handle.set_volume(volume);

        // The ramp would overwrite the new level on its next tick
        if self.fade.take().is_some() && track.phase == TrackPhase::FadingIn {
            track.phase = TrackPhase::Playing;
        }
    }

    /// Handle a completion reported by an audio handle
    pub fn handle_media_event(&mut self, token: TrackToken, event: MediaEvent) {
        let Some(track) = self.active.as_mut().filter(|track| track.token == token) else {
            debug!(%token, ?event, "Ignoring event from a released handle");
            return;
        };

        match event {
            MediaEvent::CanPlay => {
                if track.phase == TrackPhase::Loading {
                    track.phase = TrackPhase::Starting;
                    track.handle.play();
                }
            }
            MediaEvent::PlayStarted => match track.phase {
                TrackPhase::Starting => {
                    let target = track.target_volume;
                    info!(uri = %track.uri, %token, "Playback started");
                    self.fade_in_volume(target);
                }
                TrackPhase::Resuming => {
                    track.phase = if self.fade.is_some() {
                        TrackPhase::FadingIn
                    } else {
                        TrackPhase::Playing
                    };
                    debug!(uri = %track.uri, %token, "Playback resumed");
                }
                phase => debug!(?phase, %token, "Unexpected play confirmation"),
            },
            MediaEvent::LoadError(reason) => {
                let error = PlaybackError::LoadFailure {
                    uri: track.uri.clone(),
                    reason,
                };
                self.skip_after(error);
            }
            MediaEvent::PlayFailed(reason) => {
                let uri = track.uri.clone();
                let error = match track.phase {
                    TrackPhase::Resuming => PlaybackError::ResumeFailure { uri, reason },
                    _ => PlaybackError::PlaybackStartFailure { uri, reason },
                };
                self.skip_after(error);
            }
            MediaEvent::Ended => {
                if track.phase == TrackPhase::Ended {
                    return;
                }
                track.phase = TrackPhase::Ended;
                info!(uri = %track.uri, %token, "Recording ended");
                self.fade = None;
                self.dispatch(Intent::PlaylistSongEnded);
            }
        }
    }

    fn skip_after(&mut self, error: PlaybackError) {
        warn!(%error, "Skipping to next song");
        self.stop_audio();
        self.dispatch(Intent::NextSong);
    }

    /// Ramp the active handle from silence to `target`
    fn fade_in_volume(&mut self, target: f32) {
        self.fade = None;
        let Some(track) = self.active.as_mut() else {
            return;
        };

        track.handle.set_volume(0.0);
        track.phase = TrackPhase::FadingIn;
        self.fade = Some(ActiveFade {
            ramp: FadeRamp::new(target, self.fade_settings.steps),
            timer: FadeTimer::start(track.token, self.fade_settings.tick(), self.fade_tx.clone()),
        });
        debug!(target, token = %track.token, "Fading in");
    }

    /// Advance the fade by one step
    pub fn handle_fade_tick(&mut self, token: TrackToken) {
        let Some(fade) = self.fade.as_mut().filter(|fade| fade.timer.token() == token) else {
            return;
        };
        let Some(track) = self.active.as_mut().filter(|track| track.token == token) else {
            self.fade = None;
            return;
        };

        if let Some(volume) = fade.ramp.tick() {
            track.handle.set_volume(volume);
        }

        if fade.ramp.is_complete() {
            debug!(target = fade.ramp.target(), %token, "Fade-in complete");
            if track.phase == TrackPhase::FadingIn {
                track.phase = TrackPhase::Playing;
            }
            self.fade = None;
        }
    }

    fn resume_audio(&mut self) {
        let Some(track) = self.active.as_mut() else {
            return;
        };
        if track.handle.is_paused() {
            debug!(uri = %track.uri, token = %track.token, "Resuming playback");
            track.phase = TrackPhase::Resuming;
            track.handle.play();
        }
    }

    /// Cancel the fade and release the handle. Safe to call when idle.
    pub fn stop_audio(&mut self) {
        self.fade = None;
        if let Some(mut track) = self.active.take() {
            track.handle.pause();
            track.handle.seek_to_start();
            track.handle.release();
            info!(uri = %track.uri, token = %track.token, "Stopped playback");
        }
    }

    /// Drop the store listener and stop playback
    pub fn teardown(&mut self) {
        self.unsubscribe();
        self.stop_audio();
    }

    fn dispatch(&self, intent: Intent) {
        debug!(?intent, "Dispatching intent");
        self.dispatcher.dispatch(intent);
    }
}

impl Drop for PlaylistAudioController {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{BirdCard, PlaylistStore};
    use parking_lot::Mutex;

    #[derive(Debug, Default)]
    struct MockTrack {
        uri: String,
        volume: f32,
        paused: bool,
        loads: usize,
        plays: usize,
        rewound: bool,
        released: bool,
    }

    #[derive(Clone, Default)]
    struct MockBackend {
        tracks: Arc<Mutex<Vec<Arc<Mutex<MockTrack>>>>>,
    }

    impl MockBackend {
        fn count(&self) -> usize {
            self.tracks.lock().len()
        }

        fn track(&self, index: usize) -> Arc<Mutex<MockTrack>> {
            self.tracks.lock()[index].clone()
        }
    }

    struct MockHandle(Arc<Mutex<MockTrack>>);

    impl AudioBackend for MockBackend {
        fn create(&mut self, uri: &str, _events: MediaEvents) -> Box<dyn AudioHandle> {
            let track = Arc::new(Mutex::new(MockTrack {
                uri: uri.to_string(),
                volume: 1.0,
                paused: true,
                ..Default::default()
            }));
            self.tracks.lock().push(track.clone());
            Box::new(MockHandle(track))
        }
    }

    impl AudioHandle for MockHandle {
        fn set_volume(&mut self, volume: f32) {
            self.0.lock().volume = volume;
        }

        fn load(&mut self) {
            self.0.lock().loads += 1;
        }

        fn play(&mut self) {
            let mut track = self.0.lock();
            track.plays += 1;
            track.paused = false;
        }

        fn pause(&mut self) {
            self.0.lock().paused = true;
        }

        fn is_paused(&self) -> bool {
            self.0.lock().paused
        }

        fn seek_to_start(&mut self) {
            self.0.lock().rewound = true;
        }

        fn release(self: Box<Self>) {
            self.0.lock().released = true;
        }
    }

    struct Harness {
        controller: PlaylistAudioController,
        _events: ControllerEvents,
        backend: MockBackend,
        intents: mpsc::UnboundedReceiver<Intent>,
    }

    impl Harness {
        fn new() -> Self {
            let backend = MockBackend::default();
            let (tx, intents) = mpsc::unbounded_channel();
            let (controller, events) = PlaylistAudioController::new(
                Box::new(backend.clone()),
                Arc::new(tx),
                FadeSettings::default(),
            );
            Self {
                controller: controller.with_rng(StdRng::seed_from_u64(7)),
                _events: events,
                backend,
                intents,
            }
        }

        fn intents(&mut self) -> Vec<Intent> {
            let mut out = Vec::new();
            while let Ok(intent) = self.intents.try_recv() {
                out.push(intent);
            }
            out
        }

        /// Drive the active track through load and play confirmation
        fn start_active(&mut self) -> TrackToken {
            let token = self.controller.active_token().unwrap();
            self.controller.handle_media_event(token, MediaEvent::CanPlay);
            self.controller.handle_media_event(token, MediaEvent::PlayStarted);
            token
        }

        fn finish_fade(&mut self, token: TrackToken) {
            for _ in 0..50 {
                self.controller.handle_fade_tick(token);
            }
        }
    }

    fn playing(bird: Option<i64>, volume: f32, cards: Vec<BirdCard>) -> PlaybackState {
        PlaybackState {
            is_playing: true,
            current_bird_id: bird,
            volume,
            bird_cards: cards,
        }
    }

    fn card(id: i64, recordings: &[&str]) -> BirdCard {
        BirdCard::new(id, recordings.iter().map(|r| r.to_string()).collect())
    }

    #[tokio::test]
    async fn new_bird_loads_silently_then_fades_to_target() {
        let mut h = Harness::new();
        h.controller
            .handle_playback_change(&playing(Some(7), 0.8, vec![card(7, &["a.mp3"])]));

        assert_eq!(h.backend.count(), 1);
        let track = h.backend.track(0);
        assert_eq!(track.lock().uri, "a.mp3");
        assert_eq!(track.lock().volume, 0.0);
        assert_eq!(track.lock().loads, 1);
        assert_eq!(h.controller.active_phase(), Some(TrackPhase::Loading));

        let token = h.controller.active_token().unwrap();
        h.controller.handle_media_event(token, MediaEvent::CanPlay);
        assert_eq!(track.lock().plays, 1);
        assert_eq!(h.controller.active_phase(), Some(TrackPhase::Starting));

        h.controller.handle_media_event(token, MediaEvent::PlayStarted);
        assert!(h.controller.is_fading());
        assert_eq!(h.controller.active_phase(), Some(TrackPhase::FadingIn));

        let mut last = 0.0;
        for _ in 0..50 {
            h.controller.handle_fade_tick(token);
            let volume = track.lock().volume;
            assert!(volume >= last && volume <= 0.8);
            last = volume;
        }
        assert_eq!(last, 0.8);
        assert!(!h.controller.is_fading());
        assert_eq!(h.controller.active_phase(), Some(TrackPhase::Playing));
        assert!(h.intents().is_empty());
    }

    #[tokio::test]
    async fn bird_without_recordings_is_skipped() {
        let mut h = Harness::new();
        h.controller
            .handle_playback_change(&playing(Some(3), 1.0, vec![card(3, &[])]));

        assert_eq!(h.intents(), vec![Intent::NextSong]);
        assert_eq!(h.backend.count(), 0);
        assert_eq!(h.controller.active_bird_id(), None);
    }

    #[tokio::test]
    async fn unknown_bird_is_skipped() {
        let mut h = Harness::new();
        h.controller
            .handle_playback_change(&playing(Some(9), 1.0, vec![card(3, &["c.mp3"])]));

        assert_eq!(h.intents(), vec![Intent::NextSong]);
        assert_eq!(h.backend.count(), 0);
    }

    #[tokio::test]
    async fn missing_selection_stops_the_playlist() {
        let mut h = Harness::new();
        h.controller
            .handle_playback_change(&playing(None, 1.0, vec![card(3, &["c.mp3"])]));

        assert_eq!(h.intents(), vec![Intent::StopPlaylist]);
        assert_eq!(h.backend.count(), 0);
    }

    #[tokio::test]
    async fn ended_is_reported_once() {
        let mut h = Harness::new();
        h.controller
            .handle_playback_change(&playing(Some(1), 1.0, vec![card(1, &["a.mp3"])]));
        let token = h.start_active();

        h.controller.handle_media_event(token, MediaEvent::Ended);
        h.controller.handle_media_event(token, MediaEvent::Ended);

        assert_eq!(h.intents(), vec![Intent::PlaylistSongEnded]);
        assert_eq!(h.controller.active_phase(), Some(TrackPhase::Ended));
        assert!(!h.controller.is_fading());
    }

    #[tokio::test]
    async fn repeated_snapshot_does_not_restart_playback() {
        let mut h = Harness::new();
        let state = playing(Some(1), 0.5, vec![card(1, &["a.mp3"])]);
        h.controller.handle_playback_change(&state);
        let token = h.start_active();
        h.finish_fade(token);

        h.controller.handle_playback_change(&state);
        h.controller.handle_playback_change(&state);

        assert_eq!(h.backend.count(), 1);
        assert_eq!(h.backend.track(0).lock().plays, 1);
        assert_eq!(h.controller.active_token(), Some(token));
        assert_eq!(h.backend.track(0).lock().volume, 0.5);
    }

    #[tokio::test]
    async fn repeated_snapshot_while_loading_leaves_the_handle_alone() {
        let mut h = Harness::new();
        let state = playing(Some(1), 0.5, vec![card(1, &["a.mp3"])]);
        h.controller.handle_playback_change(&state);
        h.controller.handle_playback_change(&state);

        assert_eq!(h.backend.count(), 1);
        let track = h.backend.track(0);
        assert_eq!(track.lock().plays, 0);
        assert_eq!(track.lock().volume, 0.0);
    }

    #[tokio::test]
    async fn stopping_pauses_rewinds_and_releases() {
        let mut h = Harness::new();
        let mut state = playing(Some(1), 1.0, vec![card(1, &["a.mp3"])]);
        h.controller.handle_playback_change(&state);
        h.start_active();
        assert!(h.controller.is_fading());

        state.is_playing = false;
        h.controller.handle_playback_change(&state);

        let track = h.backend.track(0);
        let track = track.lock();
        assert!(track.paused);
        assert!(track.rewound);
        assert!(track.released);
        assert!(!h.controller.is_fading());
        assert_eq!(h.controller.active_bird_id(), None);

        // Stopping again is harmless
        h.controller.stop_audio();
    }

    #[tokio::test]
    async fn changing_bird_replaces_the_handle_and_ignores_stale_events() {
        let mut h = Harness::new();
        let cards = vec![card(1, &["a.mp3"]), card(2, &["b.mp3"])];
        h.controller
            .handle_playback_change(&playing(Some(1), 1.0, cards.clone()));
        let old = h.start_active();

        h.controller.handle_playback_change(&playing(Some(2), 1.0, cards));
        assert_eq!(h.backend.count(), 2);
        assert!(h.backend.track(0).lock().released);
        assert!(!h.controller.is_fading());
        let new = h.controller.active_token().unwrap();
        assert_ne!(old, new);

        h.controller.handle_media_event(old, MediaEvent::LoadError("late".into()));
        h.controller.handle_media_event(old, MediaEvent::Ended);
        h.controller.handle_fade_tick(old);

        assert!(h.intents().is_empty());
        let fresh = h.backend.track(1);
        assert_eq!(fresh.lock().volume, 0.0);
        assert!(!fresh.lock().released);
        assert_eq!(h.controller.active_token(), Some(new));
    }

    #[tokio::test]
    async fn volume_change_during_fade_applies_immediately() {
        let mut h = Harness::new();
        let mut state = playing(Some(1), 0.8, vec![card(1, &["a.mp3"])]);
        h.controller.handle_playback_change(&state);
        let token = h.start_active();
        for _ in 0..10 {
            h.controller.handle_fade_tick(token);
        }

        state.volume = 0.3;
        h.controller.handle_playback_change(&state);
        assert_eq!(h.backend.track(0).lock().volume, 0.3);
        assert!(!h.controller.is_fading());

        h.controller.handle_fade_tick(token);
        assert_eq!(h.backend.track(0).lock().volume, 0.3);
        assert_eq!(h.controller.active_phase(), Some(TrackPhase::Playing));
    }

    #[tokio::test]
    async fn load_error_skips_to_next_song() {
        let mut h = Harness::new();
        h.controller
            .handle_playback_change(&playing(Some(1), 1.0, vec![card(1, &["a.mp3"])]));
        let token = h.controller.active_token().unwrap();

        h.controller
            .handle_media_event(token, MediaEvent::LoadError("404".into()));

        assert_eq!(h.intents(), vec![Intent::NextSong]);
        assert!(h.backend.track(0).lock().released);
        assert_eq!(h.controller.active_bird_id(), None);
    }

    #[tokio::test]
    async fn rejected_start_skips_to_next_song() {
        let mut h = Harness::new();
        h.controller
            .handle_playback_change(&playing(Some(1), 1.0, vec![card(1, &["a.mp3"])]));
        let token = h.controller.active_token().unwrap();
        h.controller.handle_media_event(token, MediaEvent::CanPlay);
        h.controller
            .handle_media_event(token, MediaEvent::PlayFailed("no device".into()));

        assert_eq!(h.intents(), vec![Intent::NextSong]);
        assert!(!h.controller.is_fading());
        assert_eq!(h.controller.active_bird_id(), None);
    }

    #[tokio::test]
    async fn paused_handle_is_resumed_and_resume_failure_skips() {
        let mut h = Harness::new();
        let state = playing(Some(1), 1.0, vec![card(1, &["a.mp3"])]);
        h.controller.handle_playback_change(&state);
        let token = h.start_active();
        h.finish_fade(token);

        // Paused from outside the controller
        h.backend.track(0).lock().paused = true;
        h.controller.handle_playback_change(&state);
        assert_eq!(h.backend.track(0).lock().plays, 2);
        assert_eq!(h.controller.active_phase(), Some(TrackPhase::Resuming));

        h.controller
            .handle_media_event(token, MediaEvent::PlayFailed("interrupted".into()));
        assert_eq!(h.intents(), vec![Intent::NextSong]);
        assert_eq!(h.controller.active_bird_id(), None);
    }

    #[tokio::test]
    async fn successful_resume_returns_to_playing() {
        let mut h = Harness::new();
        let state = playing(Some(1), 1.0, vec![card(1, &["a.mp3"])]);
        h.controller.handle_playback_change(&state);
        let token = h.start_active();
        h.finish_fade(token);

        h.backend.track(0).lock().paused = true;
        h.controller.handle_playback_change(&state);
        h.controller.handle_media_event(token, MediaEvent::PlayStarted);

        assert_eq!(h.controller.active_phase(), Some(TrackPhase::Playing));
        assert!(h.intents().is_empty());
    }

    #[tokio::test]
    async fn recording_is_picked_from_all_options() {
        let mut h = Harness::new();
        let cards = vec![card(1, &["a.mp3", "b.mp3"]), card(2, &["c.mp3"])];
        for round in 0..40 {
            let bird = if round % 2 == 0 { 1 } else { 2 };
            h.controller
                .handle_playback_change(&playing(Some(bird), 1.0, cards.clone()));
        }

        let picked: Vec<String> = (0..h.backend.count())
            .map(|i| h.backend.track(i).lock().uri.clone())
            .filter(|uri| uri != "c.mp3")
            .collect();
        assert!(picked.iter().any(|uri| uri == "a.mp3"));
        assert!(picked.iter().any(|uri| uri == "b.mp3"));
        assert_eq!(
            (0..h.backend.count())
                .filter(|&i| !h.backend.track(i).lock().released)
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn teardown_unsubscribes_and_releases() {
        let store = PlaylistStore::default();
        let mut h = Harness::new();
        let _snapshots = h.controller.subscribe(Arc::new(store.clone()));
        assert_eq!(store.subscriber_count(), 1);

        h.controller
            .handle_playback_change(&playing(Some(1), 1.0, vec![card(1, &["a.mp3"])]));
        h.start_active();

        h.controller.teardown();
        assert_eq!(store.subscriber_count(), 0);
        assert!(!h.controller.is_subscribed());
        assert!(!h.controller.is_fading());
        assert!(h.backend.track(0).lock().released);
    }
}
