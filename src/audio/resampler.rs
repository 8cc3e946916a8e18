// Sample rate conversion for the device worker
// Feeds decoded packets through rubato in fixed-size chunks
use rubato::{FastFixedIn, PolynomialDegree, Resampler};
use tracing::debug;

use crate::error::{AudioError, AudioResult};

/// Frames handed to rubato per call
const CHUNK_FRAMES: usize = 1024;

/// Streaming resampler for interleaved f32 audio.
///
/// Packets of any size go in and come out once a full chunk has built up.
/// The filter delay is trimmed from the front and the tail is cut so a whole
/// recording keeps its duration at the new rate.
pub struct StreamResampler {
    inner: FastFixedIn<f32>,
    channels: usize,
    ratio: f64,
    // Planar samples waiting for a full chunk
    queued: Vec<Vec<f32>>,
    // Leading output frames that are only filter delay
    skip: usize,
    frames_in: u64,
    frames_out: u64,
}

impl StreamResampler {
    /// Returns None when the rates already match
    pub fn between(
        input_rate: u32,
        output_rate: u32,
        channels: usize,
    ) -> AudioResult<Option<Self>> {
        if input_rate == output_rate {
            return Ok(None);
        }
        Self::new(input_rate, output_rate, channels).map(Some)
    }

    pub fn new(input_rate: u32, output_rate: u32, channels: usize) -> AudioResult<Self> {
        let channels = channels.max(1);
        let ratio = output_rate as f64 / input_rate as f64;
        let inner = FastFixedIn::<f32>::new(
            ratio,
            1.0,
            PolynomialDegree::Septic,
            CHUNK_FRAMES,
            channels,
        )
        .map_err(|e| AudioError::Resample(e.to_string()))?;

        debug!(input_rate, output_rate, channels, "Resampling recording");

        Ok(Self {
            skip: inner.output_delay(),
            inner,
            channels,
            ratio,
            queued: vec![Vec::new(); channels],
            frames_in: 0,
            frames_out: 0,
        })
    }

    /// Queue interleaved samples, returning whatever full chunks produced
    pub fn push(&mut self, samples: &[f32]) -> AudioResult<Vec<f32>> {
        for frame in samples.chunks_exact(self.channels) {
            for (queue, sample) in self.queued.iter_mut().zip(frame) {
                queue.push(*sample);
            }
        }
        self.frames_in += (samples.len() / self.channels) as u64;

        let mut out = Vec::new();
        loop {
            let needed = self.inner.input_frames_next();
            if self.queued[0].len() < needed {
                break;
            }
            let chunk: Vec<Vec<f32>> = self
                .queued
                .iter_mut()
                .map(|queue| queue.drain(..needed).collect())
                .collect();
            let planar = self
                .inner
                .process(&chunk, None)
                .map_err(|e| AudioError::Resample(e.to_string()))?;
            self.emit(planar, None, &mut out);
        }
        Ok(out)
    }

    /// End of stream: push out everything still held back, then start fresh
    pub fn flush(&mut self) -> AudioResult<Vec<f32>> {
        let expected = (self.frames_in as f64 * self.ratio).round() as u64;
        let mut out = Vec::new();

        if !self.queued[0].is_empty() {
            let rest = std::mem::replace(&mut self.queued, vec![Vec::new(); self.channels]);
            let planar = self
                .inner
                .process_partial(Some(rest.as_slice()), None)
                .map_err(|e| AudioError::Resample(e.to_string()))?;
            self.emit(planar, Some(expected), &mut out);
        }

        // Silence in drains the filter delay
        let mut rounds = 0;
        while self.frames_out < expected && rounds < 4 {
            let planar = self
                .inner
                .process_partial(None::<&[Vec<f32>]>, None)
                .map_err(|e| AudioError::Resample(e.to_string()))?;
            self.emit(planar, Some(expected), &mut out);
            rounds += 1;
        }

        self.reset();
        Ok(out)
    }

    /// Drop queued audio and filter state, e.g. after a rewind
    pub fn reset(&mut self) {
        self.inner.reset();
        for queue in &mut self.queued {
            queue.clear();
        }
        self.skip = self.inner.output_delay();
        self.frames_in = 0;
        self.frames_out = 0;
    }

    fn emit(&mut self, planar: Vec<Vec<f32>>, limit: Option<u64>, out: &mut Vec<f32>) {
        let frames = planar.first().map_or(0, Vec::len);
        let start = self.skip.min(frames);
        self.skip -= start;

        out.reserve((frames - start) * self.channels);
        for frame in start..frames {
            if matches!(limit, Some(limit) if self.frames_out >= limit) {
                break;
            }
            for channel in &planar {
                out.push(channel[frame]);
            }
            self.frames_out += 1;
        }
    }
}
