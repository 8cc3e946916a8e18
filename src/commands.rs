// Interactive command handlers
use std::str::FromStr;

use crate::state::AppState;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Play,
    Pause,
    Next,
    Volume(f32),
    Bird(i64),
    Status,
    Quit,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut parts = line.split_whitespace();
        let name = parts.next().ok_or_else(|| "Empty command".to_string())?;
        let arg = parts.next();

        let command = match (name, arg) {
            ("play", None) => Command::Play,
            ("pause", None) => Command::Pause,
            ("next", None) => Command::Next,
            ("status", None) => Command::Status,
            ("quit", None) | ("exit", None) => Command::Quit,
            ("volume", Some(value)) => Command::Volume(parse_volume(value)?),
            ("bird", Some(value)) => Command::Bird(
                value
                    .parse()
                    .map_err(|e| format!("Invalid bird id {:?}: {}", value, e))?,
            ),
            _ => return Err(format!("Unknown command: {}", line.trim())),
        };

        if parts.next().is_some() {
            return Err(format!("Too many arguments: {}", line.trim()));
        }
        Ok(command)
    }
}

/// Parse a volume, rejecting NaN and infinities. In-range clamping happens in the store.
pub fn parse_volume(value: &str) -> Result<f32, String> {
    let volume: f32 = value
        .parse()
        .map_err(|e| format!("Invalid volume {:?}: {}", value, e))?;
    if !volume.is_finite() {
        return Err(format!("Invalid volume {:?}: must be a finite number", value));
    }
    Ok(volume)
}

/// Apply a command. Returns text to show the user, if any.
pub fn execute(command: Command, state: &AppState) -> Result<Option<String>, String> {
    match command {
        Command::Play => {
            let snapshot = state.store.snapshot();
            if snapshot.current_bird_id.is_some() {
                state.store.resume();
            } else if !state.store.play_first() {
                return Err("No bird cards loaded".to_string());
            }
        }
        Command::Pause => state.store.pause(),
        Command::Next => state.store.skip(),
        Command::Volume(volume) => state.set_volume(volume),
        Command::Bird(id) => {
            if state.store.snapshot().find_card(id).is_none() {
                return Err(format!("No bird with id {}", id));
            }
            state.store.play(id);
        }
        Command::Status => {
            let snapshot = state.store.snapshot();
            return Ok(Some(format!(
                "playing: {}, bird: {}, volume: {:.2}",
                snapshot.is_playing,
                snapshot
                    .current_bird_id
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "none".to_string()),
                snapshot.volume
            )));
        }
        Command::Quit => {}
    }
    Ok(None)
}
