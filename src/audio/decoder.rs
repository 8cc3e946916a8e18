// Audio decoder using Symphonia
// Decodes recordings to interleaved f32 PCM samples

use symphonia::core::audio::{AudioBufferRef, AudioPlanes, Signal};
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::Sample;
use symphonia::core::units::Time;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

use crate::error::{AudioError, AudioResult};

/// Turn a recording URI into a local path.
///
/// `file://` URLs and plain paths are accepted. Anything with another scheme
/// is rejected; streaming is not supported.
pub fn resolve_recording(uri: &str) -> AudioResult<PathBuf> {
    match Url::parse(uri) {
        Ok(url) if url.scheme() == "file" => url
            .to_file_path()
            .map_err(|_| AudioError::UnsupportedUri(uri.to_string())),
        // Single letters are Windows drive prefixes, not schemes
        Ok(url) if url.scheme().len() > 1 => Err(AudioError::UnsupportedUri(uri.to_string())),
        _ => Ok(PathBuf::from(uri)),
    }
}

pub struct AudioDecoder {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    sample_rate: u32,
    channels: usize,
}

impl AudioDecoder {
    /// Open an audio file and prepare for decoding
    pub fn open(path: &Path) -> AudioResult<Self> {
        let file = File::open(path)?;

        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        // Create a hint using the file extension
        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| AudioError::Probe(e.to_string()))?;

        let format = probed.format;

        // Find the first audio track
        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or(AudioError::NoTrack)?;

        let track_id = track.id;
        let sample_rate = track.codec_params.sample_rate.unwrap_or(44100);
        let channels = track.codec_params.channels.map(|c| c.count()).unwrap_or(2);

        let duration_ms = track
            .codec_params
            .n_frames
            .map(|frames| (frames as f64 / sample_rate as f64 * 1000.0) as i64);

        let decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| AudioError::Codec(e.to_string()))?;

        debug!(
            path = %path.display(),
            sample_rate,
            channels,
            duration_ms = ?duration_ms,
            "Opened recording"
        );

        Ok(Self {
            format,
            decoder,
            track_id,
            sample_rate,
            channels,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Decode next packet, returns interleaved f32 samples
    /// Returns None when end of stream is reached
    pub fn decode_next(&mut self) -> AudioResult<Option<Vec<f32>>> {
        loop {
            let packet = match self.format.next_packet() {
                Ok(p) => p,
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    return Ok(None);
                }
                Err(SymphoniaError::ResetRequired) => {
                    self.decoder.reset();
                    continue;
                }
                Err(e) => return Err(AudioError::Codec(e.to_string())),
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            match self.decoder.decode(&packet) {
                Ok(decoded) => return Ok(Some(Self::audio_buf_to_f32(&decoded))),
                Err(SymphoniaError::DecodeError(e)) => {
                    // Corrupt packets are skipped, not fatal
                    debug!("Decode error (skipping): {}", e);
                    continue;
                }
                Err(e) => return Err(AudioError::Codec(e.to_string())),
            }
        }
    }

    /// Seek back to the first sample
    pub fn rewind(&mut self) -> AudioResult<()> {
        self.format
            .seek(
                SeekMode::Accurate,
                SeekTo::Time {
                    time: Time::new(0, 0.0),
                    track_id: Some(self.track_id),
                },
            )
            .map_err(|e| AudioError::Codec(e.to_string()))?;

        self.decoder.reset();
        Ok(())
    }

    fn audio_buf_to_f32(buf: &AudioBufferRef) -> Vec<f32> {
        match buf {
            AudioBufferRef::F32(b) => Self::interleave(b.planes(), b.frames(), |s: f32| s),
            AudioBufferRef::F64(b) => Self::interleave(b.planes(), b.frames(), |s: f64| s as f32),
            AudioBufferRef::S8(b) => {
                Self::interleave(b.planes(), b.frames(), |s: i8| s as f32 / 128.0)
            }
            AudioBufferRef::S16(b) => {
                Self::interleave(b.planes(), b.frames(), |s: i16| s as f32 / 32768.0)
            }
            AudioBufferRef::S24(b) => {
                Self::interleave(b.planes(), b.frames(), |s| s.inner() as f32 / 8388608.0)
            }
            AudioBufferRef::S32(b) => {
                Self::interleave(b.planes(), b.frames(), |s: i32| s as f32 / 2147483648.0)
            }
            AudioBufferRef::U8(b) => {
                Self::interleave(b.planes(), b.frames(), |s: u8| (s as f32 - 128.0) / 128.0)
            }
            AudioBufferRef::U16(b) => {
                Self::interleave(b.planes(), b.frames(), |s: u16| (s as f32 - 32768.0) / 32768.0)
            }
            AudioBufferRef::U24(b) => Self::interleave(b.planes(), b.frames(), |s| {
                (s.inner() as f32 - 8388608.0) / 8388608.0
            }),
            AudioBufferRef::U32(b) => Self::interleave(b.planes(), b.frames(), |s: u32| {
                ((s as f64 - 2147483648.0) / 2147483648.0) as f32
            }),
        }
    }

    fn interleave<T: Sample + Copy, F: Fn(T) -> f32>(
        planes: AudioPlanes<T>,
        frames: usize,
        convert: F,
    ) -> Vec<f32> {
        let planes = planes.planes();
        if planes.is_empty() || frames == 0 {
            return vec![];
        }

        let mut interleaved = Vec::with_capacity(frames * planes.len());
        for frame in 0..frames {
            for plane in planes.iter() {
                interleaved.push(convert(plane[frame]));
            }
        }
        interleaved
    }
}

/// Spread interleaved frames from `from` channels over `to` channels.
///
/// Mono is copied to every output channel; otherwise channels map by index
/// and extra output channels repeat the last source channel.
pub fn remap_channels(samples: &[f32], from: usize, to: usize) -> Vec<f32> {
    if from == to || from == 0 || to == 0 {
        return samples.to_vec();
    }

    let frames = samples.len() / from;
    let mut out = Vec::with_capacity(frames * to);
    for frame in samples.chunks_exact(from) {
        for ch in 0..to {
            out.push(frame[ch.min(from - 1)]);
        }
    }
    out
}
