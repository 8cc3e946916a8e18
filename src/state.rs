// Application state management
use parking_lot::Mutex;
use std::path::PathBuf;
use tracing::warn;

use crate::settings::PlayerSettings;
use crate::store::PlaylistStore;

pub struct AppState {
    pub store: PlaylistStore,
    pub settings: Mutex<PlayerSettings>,
    // Where settings are saved; None keeps them in memory only
    pub settings_dir: Option<PathBuf>,
}

impl AppState {
    pub fn new(
        store: PlaylistStore,
        settings: PlayerSettings,
        settings_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            store,
            settings: Mutex::new(settings),
            settings_dir,
        }
    }

    /// Change the store volume and remember it for the next start
    pub fn set_volume(&self, volume: f32) {
        if !volume.is_finite() {
            warn!(volume, "Ignoring non-finite volume");
            return;
        }
        let volume = volume.clamp(0.0, 1.0);
        self.store.set_volume(volume);

        let mut settings = self.settings.lock();
        settings.volume = volume;
        if let Some(dir) = &self.settings_dir {
            if let Err(e) = settings.save(dir) {
                warn!("Failed to persist volume: {:#}", e);
            }
        }
    }
}
