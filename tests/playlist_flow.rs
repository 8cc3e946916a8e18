//! End-to-end playlist behaviour: the service loop against the in-memory
//! store and the simulated backend, on tokio's paused clock.

use std::sync::Arc;
use std::time::Duration;

use birdsong_lib::audio::SimulatedBackend;
use birdsong_lib::playlist::{PlaylistService, PlaylistServiceHandle};
use birdsong_lib::settings::FadeSettings;
use birdsong_lib::store::{BirdCard, PlaybackState, PlaylistStore};

const TRACK_LENGTH: Duration = Duration::from_secs(10);

fn card(id: i64, recordings: &[&str]) -> BirdCard {
    BirdCard::new(id, recordings.iter().map(|r| r.to_string()).collect())
}

fn store_with(cards: Vec<BirdCard>, volume: f32) -> PlaylistStore {
    PlaylistStore::new(PlaybackState {
        volume,
        bird_cards: cards,
        ..PlaybackState::default()
    })
}

fn spawn(store: &PlaylistStore, backend: &SimulatedBackend) -> PlaylistServiceHandle {
    PlaylistService::spawn(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Box::new(backend.clone()),
        FadeSettings::default(),
    )
}

async fn advance(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

#[tokio::test(start_paused = true)]
async fn selected_bird_fades_in_over_one_and_a_half_seconds() {
    let store = store_with(vec![card(7, &["a.mp3"])], 0.8);
    let backend = SimulatedBackend::new(TRACK_LENGTH);
    let service = spawn(&store, &backend);

    store.play(7);
    advance(10).await;

    let tracks = backend.tracks();
    assert_eq!(tracks.len(), 1);
    assert_eq!(tracks[0].uri, "a.mp3");
    assert!(!tracks[0].paused);
    assert_eq!(tracks[0].volume, 0.0);

    advance(750).await;
    let halfway = backend.tracks()[0].volume;
    assert!(halfway > 0.3 && halfway < 0.5, "volume halfway was {}", halfway);

    advance(800).await;
    assert_eq!(backend.tracks()[0].volume, 0.8);

    service.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn finished_recording_advances_to_the_next_bird() {
    let store = store_with(vec![card(1, &["a.mp3"]), card(2, &["b.mp3"])], 1.0);
    let backend = SimulatedBackend::new(Duration::from_secs(2));
    let service = spawn(&store, &backend);

    store.play(1);
    advance(2500).await;

    let tracks = backend.tracks();
    assert_eq!(tracks.len(), 2);
    assert!(tracks[0].released);
    assert_eq!(tracks[1].uri, "b.mp3");
    assert!(!tracks[1].released);
    assert_eq!(store.snapshot().current_bird_id, Some(2));

    service.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn birds_without_recordings_are_skipped() {
    let store = store_with(vec![card(1, &[]), card(2, &["b.mp3"])], 1.0);
    let backend = SimulatedBackend::new(TRACK_LENGTH);
    let service = spawn(&store, &backend);

    store.play(1);
    advance(10).await;

    let tracks = backend.tracks();
    assert_eq!(tracks.len(), 1);
    assert_eq!(tracks[0].uri, "b.mp3");
    assert_eq!(store.snapshot().current_bird_id, Some(2));

    service.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn playlist_stops_when_every_recording_fails() {
    let store = store_with(vec![card(1, &["x.mp3"]), card(2, &["y.mp3"])], 1.0);
    let backend = SimulatedBackend::new(TRACK_LENGTH)
        .with_broken("x.mp3")
        .with_unplayable("y.mp3");
    let service = spawn(&store, &backend);

    store.play(1);
    advance(10).await;

    let state = store.snapshot();
    assert!(!state.is_playing);
    assert_eq!(state.current_bird_id, None);
    assert_eq!(backend.tracks().len(), 2);
    assert!(backend.live_tracks().is_empty());

    service.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn pausing_releases_the_handle_and_playing_again_reloads() {
    let store = store_with(vec![card(1, &["a.mp3"])], 1.0);
    let backend = SimulatedBackend::new(TRACK_LENGTH);
    let service = spawn(&store, &backend);

    store.play(1);
    advance(100).await;
    store.pause();
    advance(10).await;

    let tracks = backend.tracks();
    let first = &tracks[0];
    assert!(first.paused);
    assert!(first.rewound);
    assert!(first.released);

    store.resume();
    advance(10).await;
    let tracks = backend.tracks();
    assert_eq!(tracks.len(), 2);
    assert!(!tracks[1].released);
    assert!(!tracks[1].paused);

    service.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn volume_change_mid_fade_is_applied_at_once() {
    let store = store_with(vec![card(1, &["a.mp3"])], 1.0);
    let backend = SimulatedBackend::new(TRACK_LENGTH);
    let service = spawn(&store, &backend);

    store.play(1);
    advance(300).await;
    store.set_volume(0.25);
    advance(5).await;
    assert_eq!(backend.tracks()[0].volume, 0.25);

    // The cancelled ramp must not raise it again
    advance(2000).await;
    assert_eq!(backend.tracks()[0].volume, 0.25);

    service.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn shutdown_unsubscribes_and_releases_everything() {
    let store = store_with(vec![card(1, &["a.mp3"])], 1.0);
    let backend = SimulatedBackend::new(TRACK_LENGTH);
    let service = spawn(&store, &backend);
    assert_eq!(store.subscriber_count(), 1);

    store.play(1);
    advance(100).await;
    service.shutdown().await;

    assert_eq!(store.subscriber_count(), 0);
    assert!(backend.live_tracks().is_empty());
}
