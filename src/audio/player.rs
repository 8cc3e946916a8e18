// Device-backed audio handles
// Each handle owns a worker thread that decodes with Symphonia and plays through cpal
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TryRecvError};
use tracing::{debug, warn};

use super::decoder::{remap_channels, resolve_recording, AudioDecoder};
use super::handle::{AudioBackend, AudioHandle, MediaEvent, MediaEvents};
use super::output::{AudioOutput, OutputControls};
use super::resampler::StreamResampler;

#[derive(Debug)]
enum WorkerCommand {
    Load,
    Play,
    Pause,
    Rewind,
    Release,
}

/// Backend that plays recordings on the default output device.
#[derive(Debug, Default, Clone)]
pub struct DeviceBackend;

impl DeviceBackend {
    pub fn new() -> Self {
        Self
    }
}

impl AudioBackend for DeviceBackend {
    fn create(&mut self, uri: &str, events: MediaEvents) -> Box<dyn AudioHandle> {
        Box::new(DeviceHandle::spawn(uri.to_string(), events))
    }
}

pub struct DeviceHandle {
    controls: Arc<OutputControls>,
    commands: mpsc::UnboundedSender<WorkerCommand>,
}

impl DeviceHandle {
    fn spawn(uri: String, events: MediaEvents) -> Self {
        let controls = Arc::new(OutputControls::new(1.0));
        let (commands, receiver) = mpsc::unbounded_channel();

        let worker_events = events.clone();
        let worker_controls = controls.clone();

        // cpal streams are not Send, so the worker is assembled on its own thread
        let spawned = thread::Builder::new()
            .name(format!("birdsong-{}", events.token()))
            .spawn(move || {
                Worker {
                    uri,
                    events: worker_events,
                    controls: worker_controls,
                    commands: receiver,
                    decoder: None,
                    output: None,
                    resampler: None,
                    pending: Vec::new(),
                    playing: false,
                    finished: false,
                }
                .run()
            });
        if let Err(e) = spawned {
            events.emit(MediaEvent::LoadError(format!("failed to spawn audio worker: {}", e)));
        }

        Self { controls, commands }
    }

    fn send(&self, command: WorkerCommand) {
        // The worker exits after a load error; later commands have nowhere to go
        let _ = self.commands.send(command);
    }
}

impl AudioHandle for DeviceHandle {
    fn set_volume(&mut self, volume: f32) {
        self.controls.set_volume(volume);
    }

    fn load(&mut self) {
        self.send(WorkerCommand::Load);
    }

    fn play(&mut self) {
        self.send(WorkerCommand::Play);
    }

    fn pause(&mut self) {
        self.controls.set_paused(true);
        self.send(WorkerCommand::Pause);
    }

    fn is_paused(&self) -> bool {
        self.controls.is_paused()
    }

    fn seek_to_start(&mut self) {
        self.send(WorkerCommand::Rewind);
    }

    fn release(self: Box<Self>) {
        // Drop does the work
    }
}

impl Drop for DeviceHandle {
    fn drop(&mut self) {
        self.send(WorkerCommand::Release);
    }
}

struct Worker {
    uri: String,
    events: MediaEvents,
    controls: Arc<OutputControls>,
    commands: mpsc::UnboundedReceiver<WorkerCommand>,
    decoder: Option<AudioDecoder>,
    output: Option<AudioOutput>,
    // Set when the device runs at a different rate than the recording
    resampler: Option<StreamResampler>,
    // Remapped samples not yet accepted by the ring buffer
    pending: Vec<f32>,
    playing: bool,
    // Decoder hit end of stream; waiting for the buffer to drain
    finished: bool,
}

impl Worker {
    fn run(mut self) {
        loop {
            let command = if self.playing {
                match self.commands.try_recv() {
                    Ok(command) => Some(command),
                    Err(TryRecvError::Empty) => None,
                    Err(TryRecvError::Disconnected) => break,
                }
            } else {
                match self.commands.blocking_recv() {
                    Some(command) => Some(command),
                    None => break,
                }
            };

            match command {
                Some(WorkerCommand::Release) => break,
                Some(command) => {
                    if !self.handle(command) {
                        break;
                    }
                }
                None => self.pump(),
            }
        }
        debug!(token = %self.events.token(), "Audio worker exiting");
    }

    /// Returns false when the worker should stop
    fn handle(&mut self, command: WorkerCommand) -> bool {
        match command {
            WorkerCommand::Load => {
                let opened =
                    resolve_recording(&self.uri).and_then(|path| AudioDecoder::open(&path));
                match opened {
                    Ok(decoder) => {
                        self.decoder = Some(decoder);
                        self.events.emit(MediaEvent::CanPlay);
                    }
                    Err(e) => {
                        self.events.emit(MediaEvent::LoadError(e.to_string()));
                        return false;
                    }
                }
            }
            WorkerCommand::Play => self.start(),
            WorkerCommand::Pause => {
                self.playing = false;
                self.controls.set_paused(true);
            }
            WorkerCommand::Rewind => self.rewind(),
            WorkerCommand::Release => return false,
        }
        true
    }

    fn start(&mut self) {
        let Some(decoder) = self.decoder.as_ref() else {
            self.events
                .emit(MediaEvent::PlayFailed("recording is not loaded".to_string()));
            return;
        };

        if self.output.is_none() {
            let opened = AudioOutput::open(decoder.sample_rate(), self.controls.clone())
                .and_then(|output| {
                    let resampler = StreamResampler::between(
                        decoder.sample_rate(),
                        output.sample_rate(),
                        decoder.channels(),
                    )?;
                    Ok((output, resampler))
                });
            match opened {
                Ok((output, resampler)) => {
                    self.output = Some(output);
                    self.resampler = resampler;
                }
                Err(e) => {
                    self.events.emit(MediaEvent::PlayFailed(e.to_string()));
                    return;
                }
            }
        }

        // Playing an ended recording starts it over
        if self.finished {
            self.rewind();
        }

        self.playing = true;
        self.controls.set_paused(false);
        self.events.emit(MediaEvent::PlayStarted);
    }

    fn rewind(&mut self) {
        self.pending.clear();
        self.finished = false;
        self.controls.request_clear();
        if let Some(resampler) = self.resampler.as_mut() {
            resampler.reset();
        }
        if let Some(decoder) = self.decoder.as_mut() {
            if let Err(e) = decoder.rewind() {
                warn!(uri = %self.uri, "Failed to rewind recording: {}", e);
            }
        }
    }

    /// Move one step of audio towards the device
    fn pump(&mut self) {
        let (Some(decoder), Some(output)) = (self.decoder.as_mut(), self.output.as_mut()) else {
            self.playing = false;
            return;
        };

        if self.pending.is_empty() {
            if self.finished {
                if output.buffered() == 0 {
                    self.playing = false;
                    self.controls.set_paused(true);
                    self.events.emit(MediaEvent::Ended);
                } else {
                    thread::sleep(Duration::from_millis(5));
                }
                return;
            }

            let decoded = match decoder.decode_next() {
                Ok(Some(samples)) => match self.resampler.as_mut() {
                    Some(resampler) => resampler.push(&samples),
                    None => Ok(samples),
                },
                Ok(None) => {
                    self.finished = true;
                    match self.resampler.as_mut() {
                        // Resampler still holds the tail of the recording
                        Some(resampler) => resampler.flush(),
                        None => return,
                    }
                }
                Err(e) => Err(e),
            };

            match decoded {
                Ok(samples) => {
                    self.pending =
                        remap_channels(&samples, decoder.channels(), output.channels() as usize);
                }
                Err(e) => {
                    // Treated like a media error on the element
                    self.playing = false;
                    self.controls.set_paused(true);
                    self.events.emit(MediaEvent::LoadError(e.to_string()));
                    return;
                }
            }
            if self.pending.is_empty() {
                return;
            }
        }

        let written = output.write(&self.pending);
        self.pending.drain(..written);
        if written == 0 {
            // Buffer full, wait a bit
            thread::sleep(Duration::from_millis(1));
        }
    }
}
