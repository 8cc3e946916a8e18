// Seams between the playlist and whatever store owns the playback state
use tokio::sync::mpsc;

use super::models::{Intent, PlaybackState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// A registered listener. Every snapshot the store emits lands on `receiver`.
pub struct Subscription {
    pub id: SubscriptionId,
    pub receiver: mpsc::UnboundedReceiver<PlaybackState>,
}

/// Source of playback snapshots.
pub trait StateNotifier: Send + Sync + 'static {
    fn subscribe(&self) -> Subscription;

    /// Removing an unknown id is a no-op.
    fn unsubscribe(&self, id: SubscriptionId);
}

/// Sink for intents raised by the playlist.
pub trait IntentDispatcher: Send + Sync + 'static {
    fn dispatch(&self, intent: Intent);
}

impl IntentDispatcher for mpsc::UnboundedSender<Intent> {
    fn dispatch(&self, intent: Intent) {
        // A closed channel means nobody is listening anymore
        let _ = self.send(intent);
    }
}
