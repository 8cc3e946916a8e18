// In-memory playback store
// Holds the playlist state, reduces intents and notifies subscribers
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::models::{BirdCard, Intent, PlaybackState};
use super::notifier::{IntentDispatcher, StateNotifier, Subscription, SubscriptionId};

struct StoreInner {
    state: PlaybackState,
    subscribers: HashMap<SubscriptionId, mpsc::UnboundedSender<PlaybackState>>,
    next_subscription: u64,
    // Cards skipped in a row without a track finishing
    skip_streak: usize,
}

/// Reference store used by the binary and the integration tests.
///
/// Every mutation emits the new state to all subscribers, even when nothing
/// changed.
#[derive(Clone)]
pub struct PlaylistStore {
    inner: Arc<Mutex<StoreInner>>,
}

impl Default for PlaylistStore {
    fn default() -> Self {
        Self::new(PlaybackState::default())
    }
}

impl PlaylistStore {
    pub fn new(state: PlaybackState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(StoreInner {
                state,
                subscribers: HashMap::new(),
                next_subscription: 1,
                skip_streak: 0,
            })),
        }
    }

    pub fn snapshot(&self) -> PlaybackState {
        self.inner.lock().state.clone()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().subscribers.len()
    }

    pub fn load_cards(&self, cards: Vec<BirdCard>) {
        self.update(|state| state.bird_cards = cards);
    }

    /// Select a bird and start playing it
    pub fn play(&self, bird_id: i64) {
        self.update(|state| {
            state.current_bird_id = Some(bird_id);
            state.is_playing = true;
        });
    }

    /// Start from the first card. Does nothing when there are no cards.
    pub fn play_first(&self) -> bool {
        let first = self.inner.lock().state.bird_cards.first().map(|card| card.id);
        match first {
            Some(id) => {
                self.play(id);
                true
            }
            None => false,
        }
    }

    pub fn resume(&self) {
        self.update(|state| state.is_playing = true);
    }

    pub fn pause(&self) {
        self.update(|state| state.is_playing = false);
    }

    /// Clamped to 0.0-1.0. NaN and infinities are ignored.
    pub fn set_volume(&self, volume: f32) {
        if !volume.is_finite() {
            warn!(volume, "Ignoring non-finite volume");
            return;
        }
        self.update(|state| state.volume = volume.clamp(0.0, 1.0));
    }

    /// User-requested skip; resets the skip streak like any other user action
    pub fn skip(&self) {
        self.update(|state| Self::advance(state));
    }

    fn update<F>(&self, mutate: F)
    where
        F: FnOnce(&mut PlaybackState),
    {
        let mut inner = self.inner.lock();
        mutate(&mut inner.state);
        inner.skip_streak = 0;
        Self::notify(&mut inner);
    }

    fn reduce(&self, intent: Intent) {
        let mut inner = self.inner.lock();
        match intent {
            Intent::StopPlaylist => {
                inner.state.is_playing = false;
                inner.state.current_bird_id = None;
            }
            Intent::NextSong => {
                inner.skip_streak += 1;
                if inner.state.bird_cards.is_empty()
                    || inner.skip_streak >= inner.state.bird_cards.len()
                {
                    info!("No playable bird left, stopping playlist");
                    inner.skip_streak = 0;
                    inner.state.is_playing = false;
                    inner.state.current_bird_id = None;
                } else {
                    Self::advance(&mut inner.state);
                }
            }
            Intent::PlaylistSongEnded => {
                inner.skip_streak = 0;
                Self::advance(&mut inner.state);
            }
        }
        debug!(?intent, bird = ?inner.state.current_bird_id, "Reduced intent");
        Self::notify(&mut inner);
    }

    /// Move to the card after the current one, wrapping around
    fn advance(state: &mut PlaybackState) {
        if state.bird_cards.is_empty() {
            state.is_playing = false;
            state.current_bird_id = None;
            return;
        }

        let next_index = state
            .current_bird_id
            .and_then(|id| state.bird_cards.iter().position(|card| card.id == id))
            .map(|index| (index + 1) % state.bird_cards.len())
            .unwrap_or(0);
        state.current_bird_id = Some(state.bird_cards[next_index].id);
    }

    fn notify(inner: &mut StoreInner) {
        let snapshot = inner.state.clone();
        inner
            .subscribers
            .retain(|_, sender| sender.send(snapshot.clone()).is_ok());
    }
}

impl StateNotifier for PlaylistStore {
    fn subscribe(&self) -> Subscription {
        let mut inner = self.inner.lock();
        let id = SubscriptionId(inner.next_subscription);
        inner.next_subscription += 1;

        let (sender, receiver) = mpsc::unbounded_channel();
        inner.subscribers.insert(id, sender);
        Subscription { id, receiver }
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.inner.lock().subscribers.remove(&id);
    }
}

impl IntentDispatcher for PlaylistStore {
    fn dispatch(&self, intent: Intent) {
        self.reduce(intent);
    }
}
