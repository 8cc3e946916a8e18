// Playback store module
// State snapshots, intents and the in-memory reference store

pub mod memory;
pub mod models;
pub mod notifier;

pub use memory::PlaylistStore;
pub use models::{BirdCard, Intent, PlaybackState};
pub use notifier::{IntentDispatcher, StateNotifier, Subscription, SubscriptionId};
