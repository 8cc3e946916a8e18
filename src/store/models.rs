// Store data models
use serde::{Deserialize, Serialize};

/// A species record with the recordings that can be played for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BirdCard {
    pub id: i64,
    #[serde(default)]
    pub recordings: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl BirdCard {
    pub fn new(id: i64, recordings: Vec<String>) -> Self {
        Self {
            id,
            recordings,
            name: None,
        }
    }

    /// Label used in log lines
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => format!("{} ({})", name, self.id),
            None => format!("#{}", self.id),
        }
    }
}

/// Projection of the store state the playlist cares about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
    pub is_playing: bool,
    pub current_bird_id: Option<i64>,
    pub volume: f32,
    pub bird_cards: Vec<BirdCard>,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            is_playing: false,
            current_bird_id: None,
            volume: 1.0,
            bird_cards: Vec::new(),
        }
    }
}

impl PlaybackState {
    /// First card with the given id
    pub fn find_card(&self, bird_id: i64) -> Option<&BirdCard> {
        self.bird_cards.iter().find(|card| card.id == bird_id)
    }
}

/// Signals dispatched back to the store. None of them carry data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    StopPlaylist,
    NextSong,
    PlaylistSongEnded,
}
