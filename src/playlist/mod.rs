// Playlist module
// The controller that keeps audio in step with the store, its fade-in and the service loop

pub mod controller;
pub mod fade;
pub mod service;

pub use controller::{ControllerEvents, PlaylistAudioController, TrackPhase};
pub use fade::{FadeRamp, FadeTimer};
pub use service::{PlaylistService, PlaylistServiceHandle};
