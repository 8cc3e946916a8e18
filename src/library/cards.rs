// Bird card loading
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{info, warn};
use url::Url;

use crate::store::BirdCard;

/// Read a JSON array of bird cards.
///
/// Relative recording paths are resolved against the file's directory, so a
/// card file can sit next to its recordings.
pub fn load_cards(path: &Path) -> Result<Vec<BirdCard>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read bird cards from {:?}", path))?;
    let mut cards: Vec<BirdCard> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse bird cards in {:?}", path))?;

    if let Some(base) = path.parent() {
        for card in cards.iter_mut() {
            for recording in card.recordings.iter_mut() {
                *recording = resolve_relative(base, recording);
            }
        }
    }

    let mut seen = HashSet::new();
    for card in &cards {
        if !seen.insert(card.id) {
            // Lookups stop at the first card with an id
            warn!(bird = %card.label(), "Duplicate bird id, later card is unreachable");
        }
        if card.recordings.is_empty() {
            warn!(bird = %card.label(), "Bird has no recordings and will be skipped");
        }
    }

    info!("Loaded {} bird cards from {:?}", cards.len(), path);
    Ok(cards)
}

fn resolve_relative(base: &Path, recording: &str) -> String {
    // Absolute paths and anything with a scheme are kept as written
    if Url::parse(recording).is_ok() || Path::new(recording).is_absolute() {
        return recording.to_string();
    }
    base.join(recording).to_string_lossy().to_string()
}
