//! Output device built on cpal.
//!
//! cpal pulls audio from a real-time callback, while the playback driver
//! pushes fixed-size chunks. A channel sits in between. `write` waits while
//! two callback periods (at least two chunks) are already queued, and the
//! callback flags an underrun whenever it runs dry mid-playback. Once the
//! stream reports an error, writes fail instead of waiting.

use anyhow::{anyhow, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{
    BufferSize, SampleFormat, SampleRate, StreamConfig, SupportedBufferSize,
    SupportedStreamConfigRange,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use super::playback::{PcmSink, SinkError};

/// Minimum chunks (and callback periods) buffered ahead of the callback.
const QUEUE_DEPTH: usize = 2;
const WRITE_POLL: Duration = Duration::from_millis(1);
const DRAIN_POLL: Duration = Duration::from_millis(5);
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Parameters the device actually accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Negotiated {
    pub chunk_frames: usize,
    pub sample_rate: u32,
    pub channels: usize,
}

pub struct OutputDevice {
    device: cpal::Device,
    name: String,
}

impl OutputDevice {
    /// Opens the named output device; `"default"` picks the host default.
    pub fn open(name: &str) -> Result<Self> {
        let host = cpal::default_host();
        let device = if name == "default" {
            host.default_output_device()
                .ok_or_else(|| anyhow!("No audio output device found"))?
        } else {
            host.output_devices()
                .context("Failed to enumerate output devices")?
                .find(|d| d.name().map(|n| n == name).unwrap_or(false))
                .ok_or_else(|| anyhow!("Output device not found: {}", name))?
        };

        let name = device.name().unwrap_or_else(|_| name.to_string());
        log::info!("Output device: {}", name);
        Ok(Self { device, name })
    }

    /// Negotiates chunk size and sample rate, then starts the stream.
    pub fn configure(
        self,
        chunk_frames: usize,
        sample_rate: u32,
        channels: usize,
    ) -> Result<(OutputStream, PcmWriter, Negotiated)> {
        let ranges: Vec<ConfigRange> = self
            .device
            .supported_output_configs()
            .context("Failed to query output configs")?
            .map(|r| ConfigRange::from(&r))
            .collect();
        let (config, negotiated) = negotiate(&ranges, chunk_frames, sample_rate, channels)
            .ok_or_else(|| {
                anyhow!("{} has no f32 {}-channel output config", self.name, channels)
            })?;

        if negotiated.sample_rate != sample_rate {
            log::warn!(
                "Device rate {}Hz differs from file rate {}Hz",
                negotiated.sample_rate,
                sample_rate
            );
        }
        log::info!(
            "Negotiated {} frames per write, {}Hz, {} channels",
            negotiated.chunk_frames,
            negotiated.sample_rate,
            negotiated.channels
        );

        let (tx, rx) = mpsc::channel();
        let state = Arc::new(StreamState::default());
        let mut feed = CallbackFeed::new(rx, Arc::clone(&state));
        let error_state = Arc::clone(&state);

        let stream = self
            .device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| feed.fill(data),
                move |err| {
                    log::debug!("Output stream error: {}", err);
                    error_state.failed.store(true, Ordering::Release);
                },
                None,
            )
            .context("Failed to build output stream")?;
        stream.play().context("Failed to start output stream")?;

        let writer = PcmWriter {
            tx,
            state: Arc::clone(&state),
        };
        Ok((OutputStream { stream, state }, writer, negotiated))
    }
}

/// The parts of a supported output config that negotiation looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigRange {
    pub channels: u16,
    pub min_rate: u32,
    pub max_rate: u32,
    pub buffer_frames: Option<(u32, u32)>,
    pub is_f32: bool,
}

impl From<&SupportedStreamConfigRange> for ConfigRange {
    fn from(range: &SupportedStreamConfigRange) -> Self {
        Self {
            channels: range.channels(),
            min_rate: range.min_sample_rate().0,
            max_rate: range.max_sample_rate().0,
            buffer_frames: match *range.buffer_size() {
                SupportedBufferSize::Range { min, max } => Some((min, max)),
                SupportedBufferSize::Unknown => None,
            },
            is_f32: range.sample_format() == SampleFormat::F32,
        }
    }
}

/// Picks the f32 config with `channels` channels whose rate range lies
/// nearest `sample_rate`, clamping both rate and chunk size into range.
pub fn negotiate(
    ranges: &[ConfigRange],
    chunk_frames: usize,
    sample_rate: u32,
    channels: usize,
) -> Option<(StreamConfig, Negotiated)> {
    let range = ranges
        .iter()
        .filter(|r| r.is_f32 && r.channels as usize == channels)
        .min_by_key(|r| sample_rate.clamp(r.min_rate, r.max_rate).abs_diff(sample_rate))?;

    let rate = sample_rate.clamp(range.min_rate, range.max_rate);
    let (buffer_size, chunk_frames) = match range.buffer_frames {
        Some((min, max)) => {
            let frames = (chunk_frames as u32).clamp(min, max);
            (BufferSize::Fixed(frames), frames as usize)
        }
        None => (BufferSize::Default, chunk_frames),
    };

    let config = StreamConfig {
        channels: range.channels,
        sample_rate: SampleRate(rate),
        buffer_size,
    };
    let negotiated = Negotiated {
        chunk_frames,
        sample_rate: rate,
        channels,
    };
    Some((config, negotiated))
}

#[derive(Debug, Default)]
struct StreamState {
    started: AtomicBool,
    underrun: AtomicBool,
    drained: AtomicBool,
    /// Set by the stream error callback; the callback may never run again.
    failed: AtomicBool,
    /// Samples sent but not yet taken by the callback.
    queued: AtomicUsize,
    /// Samples requested by the latest callback.
    period: AtomicUsize,
}

/// Callback side of the queue.
struct CallbackFeed {
    rx: Receiver<Vec<f32>>,
    pending: Vec<f32>,
    cursor: usize,
    state: Arc<StreamState>,
}

impl CallbackFeed {
    fn new(rx: Receiver<Vec<f32>>, state: Arc<StreamState>) -> Self {
        Self {
            rx,
            pending: Vec::new(),
            cursor: 0,
            state,
        }
    }

    fn fill(&mut self, data: &mut [f32]) {
        self.state.period.store(data.len(), Ordering::Relaxed);
        let mut filled = 0;
        while filled < data.len() {
            if self.cursor == self.pending.len() {
                match self.rx.try_recv() {
                    Ok(chunk) => {
                        self.state.queued.fetch_sub(chunk.len(), Ordering::Relaxed);
                        self.pending = chunk;
                        self.cursor = 0;
                        self.state.started.store(true, Ordering::Relaxed);
                        continue;
                    }
                    Err(TryRecvError::Empty) => {
                        if self.state.started.load(Ordering::Relaxed) {
                            self.state.underrun.store(true, Ordering::Relaxed);
                        }
                        break;
                    }
                    Err(TryRecvError::Disconnected) => {
                        self.state.drained.store(true, Ordering::Release);
                        break;
                    }
                }
            }
            let n = (self.pending.len() - self.cursor).min(data.len() - filled);
            data[filled..filled + n]
                .copy_from_slice(&self.pending[self.cursor..self.cursor + n]);
            self.cursor += n;
            filled += n;
        }
        data[filled..].fill(0.0);
    }
}

/// Driver side of the queue. Sent to the playback thread.
pub struct PcmWriter {
    tx: Sender<Vec<f32>>,
    state: Arc<StreamState>,
}

impl PcmWriter {
    /// Samples allowed in the queue before `write` waits.
    fn queue_limit(&self, chunk_len: usize) -> usize {
        let period = self.state.period.load(Ordering::Relaxed);
        (QUEUE_DEPTH * period).max(QUEUE_DEPTH * chunk_len)
    }
}

impl PcmSink for PcmWriter {
    fn write(&mut self, chunk: &[f32]) -> Result<(), SinkError> {
        if self.state.underrun.load(Ordering::Relaxed) {
            return Err(SinkError::Underrun);
        }
        loop {
            if self.state.failed.load(Ordering::Acquire) {
                return Err(SinkError::Disconnected);
            }
            if self.state.queued.load(Ordering::Relaxed) < self.queue_limit(chunk.len()) {
                break;
            }
            thread::sleep(WRITE_POLL);
        }
        self.state.queued.fetch_add(chunk.len(), Ordering::Relaxed);
        self.tx.send(chunk.to_vec()).map_err(|_| SinkError::Disconnected)
    }

    fn recover(&mut self) {
        self.state.underrun.store(false, Ordering::Relaxed);
    }
}

/// Running output stream. Must stay on the thread that built it.
pub struct OutputStream {
    stream: cpal::Stream,
    state: Arc<StreamState>,
}

impl OutputStream {
    /// Closes the queue and waits until the callback has played everything
    /// already written.
    pub fn drain(&self, writer: PcmWriter) {
        drop(writer);
        let deadline = Instant::now() + DRAIN_TIMEOUT;
        while !self.state.drained.load(Ordering::Acquire) {
            if self.state.failed.load(Ordering::Acquire) {
                log::warn!("Output stream failed before draining");
                return;
            }
            if Instant::now() >= deadline {
                log::warn!("Timed out draining output stream");
                return;
            }
            thread::sleep(DRAIN_POLL);
        }
    }

    pub fn close(self) {
        if let Err(err) = self.stream.pause() {
            log::debug!("Failed to pause output stream: {}", err);
        }
    }
}
