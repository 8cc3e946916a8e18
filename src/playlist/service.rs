// Playlist service
// Runs the controller on a tokio task, feeding it snapshots, media events
// and fade ticks one at a time
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::controller::{ControllerEvents, PlaylistAudioController};
use crate::audio::AudioBackend;
use crate::settings::FadeSettings;
use crate::store::{IntentDispatcher, StateNotifier};

pub struct PlaylistService;

impl PlaylistService {
    /// Subscribe to `notifier` and start reacting to its snapshots.
    ///
    /// Must be called inside a tokio runtime.
    pub fn spawn(
        notifier: Arc<dyn StateNotifier>,
        dispatcher: Arc<dyn IntentDispatcher>,
        backend: Box<dyn AudioBackend>,
        fade: FadeSettings,
    ) -> PlaylistServiceHandle {
        let (controller, events) = PlaylistAudioController::new(backend, dispatcher, fade);
        Self::spawn_with(notifier, controller, events)
    }

    /// Like [`spawn`](Self::spawn), for a controller the caller already built
    pub fn spawn_with(
        notifier: Arc<dyn StateNotifier>,
        mut controller: PlaylistAudioController,
        mut events: ControllerEvents,
    ) -> PlaylistServiceHandle {
        let mut snapshots = controller.subscribe(notifier);
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            info!("Playlist service started");
            loop {
                tokio::select! {
                    biased;

                    // Fires on an explicit shutdown and when the handle is dropped
                    _ = &mut shutdown_rx => break,

                    snapshot = snapshots.recv() => match snapshot {
                        Some(snapshot) => controller.handle_playback_change(&snapshot),
                        None => {
                            debug!("Playback state stream closed");
                            break;
                        }
                    },

                    Some((token, event)) = events.media.recv() => {
                        controller.handle_media_event(token, event);
                    }

                    Some(token) = events.fade_ticks.recv() => {
                        controller.handle_fade_tick(token);
                    }
                }
            }

            controller.teardown();
            info!("Playlist service stopped");
        });

        PlaylistServiceHandle {
            shutdown: Some(shutdown_tx),
            task,
        }
    }
}

/// Owner of a running service. Dropping it also stops the service.
pub struct PlaylistServiceHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl PlaylistServiceHandle {
    /// Tear the controller down and wait for the task to finish
    pub async fn shutdown(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Err(e) = (&mut self.task).await {
            warn!("Playlist service task failed: {}", e);
        }
    }
}
