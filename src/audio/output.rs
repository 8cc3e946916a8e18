// Audio output using cpal
// One output stream per playing recording, fed through a ring buffer

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, Stream, StreamConfig, SupportedStreamConfig};
use parking_lot::Mutex;
use ringbuf::{
    traits::{Consumer, Observer, Producer, Split},
    HeapRb,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error};

use crate::error::{AudioError, AudioResult};

const RING_BUFFER_SIZE: usize = 48000 * 2 / 4; // ~250ms of stereo audio at 48kHz

type RingProducer = ringbuf::HeapProd<f32>;
type RingConsumer = ringbuf::HeapCons<f32>;

/// State shared between a handle, its worker thread and the output callback.
#[derive(Debug)]
pub struct OutputControls {
    pub volume: Mutex<f32>,
    pub paused: AtomicBool,
    clear: AtomicBool,
}

impl OutputControls {
    pub fn new(volume: f32) -> Self {
        Self {
            volume: Mutex::new(volume.clamp(0.0, 1.0)),
            paused: AtomicBool::new(true),
            clear: AtomicBool::new(false),
        }
    }

    pub fn volume(&self) -> f32 {
        *self.volume.lock()
    }

    pub fn set_volume(&self, volume: f32) {
        *self.volume.lock() = volume.clamp(0.0, 1.0);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::SeqCst);
    }

    /// Drop whatever is buffered on the next callback
    pub fn request_clear(&self) {
        self.clear.store(true, Ordering::SeqCst);
    }
}

pub struct AudioOutput {
    _stream: Stream,
    producer: RingProducer,
    sample_rate: u32,
    channels: u16,
}

impl AudioOutput {
    /// Open the default device, preferring the recording's sample rate
    pub fn open(preferred_rate: u32, controls: Arc<OutputControls>) -> AudioResult<Self> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;

        let config = Self::pick_config(&device, preferred_rate)?;
        let sample_rate = config.sample_rate().0;
        let channels = config.channels();
        if sample_rate != preferred_rate {
            debug!(
                preferred_rate,
                sample_rate, "Device does not support the recording's sample rate"
            );
        }

        let rb = HeapRb::<f32>::new(RING_BUFFER_SIZE);
        let (producer, consumer) = rb.split();

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => {
                Self::build_stream::<f32>(&device, &config.clone().into(), consumer, controls)?
            }
            cpal::SampleFormat::I16 => {
                Self::build_stream::<i16>(&device, &config.clone().into(), consumer, controls)?
            }
            cpal::SampleFormat::U16 => {
                Self::build_stream::<u16>(&device, &config.clone().into(), consumer, controls)?
            }
            format => {
                return Err(AudioError::Stream(format!(
                    "unsupported sample format: {:?}",
                    format
                )))
            }
        };

        stream
            .play()
            .map_err(|e| AudioError::Stream(e.to_string()))?;

        Ok(Self {
            _stream: stream,
            producer,
            sample_rate,
            channels,
        })
    }

    fn pick_config(
        device: &cpal::Device,
        preferred_rate: u32,
    ) -> AudioResult<SupportedStreamConfig> {
        let wanted = SampleRate(preferred_rate);
        if let Ok(mut ranges) = device.supported_output_configs() {
            if let Some(range) = ranges.find(|r| {
                r.min_sample_rate() <= wanted && wanted <= r.max_sample_rate() && r.channels() <= 2
            }) {
                return Ok(range.with_sample_rate(wanted));
            }
        }

        device
            .default_output_config()
            .map_err(|e| AudioError::Stream(e.to_string()))
    }

    fn build_stream<T: cpal::SizedSample + cpal::FromSample<f32>>(
        device: &cpal::Device,
        config: &StreamConfig,
        mut consumer: RingConsumer,
        controls: Arc<OutputControls>,
    ) -> AudioResult<Stream> {
        device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    if controls.clear.swap(false, Ordering::SeqCst) {
                        while consumer.try_pop().is_some() {}
                    }

                    // Paused streams keep their buffered samples for later
                    if controls.is_paused() {
                        for sample in data.iter_mut() {
                            *sample = T::from_sample(0.0);
                        }
                        return;
                    }

                    let vol = controls.volume();
                    for sample in data.iter_mut() {
                        let value = consumer.try_pop().unwrap_or(0.0) * vol;
                        *sample = T::from_sample(value);
                    }
                },
                move |err| {
                    error!("Audio output error: {}", err);
                },
                None,
            )
            .map_err(|e| AudioError::Stream(e.to_string()))
    }

    /// Write samples to the output buffer
    /// Returns the number of samples actually written
    pub fn write(&mut self, samples: &[f32]) -> usize {
        self.producer.push_slice(samples)
    }

    /// Samples still waiting to be played
    pub fn buffered(&self) -> usize {
        self.producer.occupied_len()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }
}
