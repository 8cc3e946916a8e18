// Audio playback module
// Handle traits plus the Symphonia/cpal device backend and a simulated backend

pub mod decoder;
pub mod handle;
pub mod output;
pub mod player;
pub mod resampler;
pub mod simulated;

pub use handle::{AudioBackend, AudioHandle, MediaEvent, MediaEvents, TrackToken};
pub use player::DeviceBackend;
pub use simulated::{SimulatedBackend, SimulatedTrack};
