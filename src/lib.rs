// Birdsong - bird-call playlist player
// Module declarations
pub mod audio;
pub mod commands;
pub mod error;
pub mod library;
pub mod playlist;
pub mod settings;
pub mod state;
pub mod store;

use anyhow::{Context, Result};
use clap::Parser;
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use audio::{AudioBackend, DeviceBackend, SimulatedBackend};
use commands::Command;
use playlist::PlaylistService;
use settings::PlayerSettings;
use state::AppState;
use store::{PlaybackState, PlaylistStore};

/// Command-line arguments for birdsong
#[derive(Parser, Debug)]
#[command(name = "birdsong")]
#[command(about = "Plays a playlist of bird calls")]
#[command(version)]
pub struct Args {
    /// JSON file with the bird cards to play
    #[arg(short, long)]
    pub cards: PathBuf,

    /// Directory holding settings.json
    #[arg(short, long)]
    pub settings_dir: Option<PathBuf>,

    /// Bird to start with (defaults to the first card)
    #[arg(short, long)]
    pub bird: Option<i64>,

    /// Initial volume, 0.0-1.0 (overrides settings)
    #[arg(short, long, value_parser = commands::parse_volume)]
    pub volume: Option<f32>,

    /// Play without an audio device
    #[arg(long)]
    pub simulate: bool,

    /// Length of each simulated recording
    #[arg(long, default_value = "5000")]
    pub track_length_ms: u64,
}

/// Install the global tracing subscriber. `RUST_LOG` wins over `filter`.
pub fn init_logging(filter: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

pub async fn run(args: Args) -> Result<()> {
    let settings = match &args.settings_dir {
        Some(dir) => PlayerSettings::load(dir)?,
        None => PlayerSettings::default(),
    };
    init_logging(&settings.logging.filter);

    let cards = library::load_cards(&args.cards)?;
    let volume = args.volume.unwrap_or(settings.volume).clamp(0.0, 1.0);

    let store = PlaylistStore::new(PlaybackState {
        volume,
        bird_cards: cards,
        ..PlaybackState::default()
    });

    let backend: Box<dyn AudioBackend> = if args.simulate {
        info!("Using simulated audio");
        Box::new(SimulatedBackend::new(Duration::from_millis(args.track_length_ms)))
    } else {
        Box::new(DeviceBackend::new())
    };

    let service = PlaylistService::spawn(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        backend,
        settings.fade.clone(),
    );
    let state = AppState::new(store, settings, args.settings_dir.clone());

    match args.bird {
        Some(id) => {
            commands::execute(Command::Bird(id), &state)
                .map_err(anyhow::Error::msg)
                .context("Cannot start playback")?;
        }
        None => {
            if !state.store.play_first() {
                warn!("No bird cards to play");
            }
        }
    }

    let mut lines = spawn_stdin_reader();
    let mut stdin_open = true;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.recv(), if stdin_open => match line {
                Some(line) if line.trim().is_empty() => {}
                Some(line) => match line.parse::<Command>() {
                    Ok(Command::Quit) => break,
                    Ok(command) => match commands::execute(command, &state) {
                        Ok(Some(message)) => println!("{}", message),
                        Ok(None) => {}
                        Err(e) => warn!("{}", e),
                    },
                    Err(e) => warn!("{}", e),
                },
                // Keep playing until Ctrl-C once stdin is gone
                None => stdin_open = false,
            },
        }
    }

    service.shutdown().await;
    Ok(())
}

/// Forward stdin lines from a plain thread, so a pending read never holds up runtime shutdown
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!("Failed to read stdin: {}", e);
                    break;
                }
            }
        }
    });
    rx
}
