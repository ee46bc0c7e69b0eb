use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use thiserror::Error;

/// Failure of a single device write. Always recovered inside the driver.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("output buffer underrun")]
    Underrun,
    #[error("output stream disconnected")]
    Disconnected,
}

/// Destination for interleaved chunks of audio.
pub trait PcmSink {
    /// Hand one chunk to the device, blocking while it is busy.
    fn write(&mut self, chunk: &[f32]) -> Result<(), SinkError>;

    /// Reset device state after a failed write.
    ///
    /// A sink whose device is gone must keep failing fast rather than block,
    /// so the driver can run its position to the end.
    fn recover(&mut self);
}

/// Shared playback position in sample-buffer index units.
///
/// Written only by the playback driver and read with relaxed ordering, so
/// readers may see a slightly stale value.
#[derive(Debug, Default)]
pub struct PlaybackClock {
    position: AtomicUsize,
    finished: AtomicBool,
}

impl PlaybackClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> usize {
        self.position.load(Ordering::Relaxed)
    }

    /// Moves the position forward by `step`, never past `limit`.
    fn advance(&self, step: usize, limit: usize) -> usize {
        let next = (self.position() + step).min(limit);
        self.position.store(next, Ordering::Relaxed);
        next
    }

    /// True once the driver loop has exited, normally or by unwinding.
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    fn finish(&self) {
        self.finished.store(true, Ordering::Release);
    }
}

struct FinishOnDrop<'a>(&'a PlaybackClock);

impl Drop for FinishOnDrop<'_> {
    fn drop(&mut self) {
        self.0.finish();
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaybackReport {
    pub writes: usize,
    pub underruns: usize,
}

/// Streams the sample buffer to a sink one chunk at a time.
pub struct PlaybackDriver<S> {
    sink: S,
    chunk_frames: usize,
    channels: usize,
}

impl<S: PcmSink> PlaybackDriver<S> {
    pub fn new(sink: S, chunk_frames: usize, channels: usize) -> Self {
        Self {
            sink,
            chunk_frames: chunk_frames.max(1),
            channels: channels.max(1),
        }
    }

    /// Samples the position advances per write.
    pub fn step(&self) -> usize {
        self.chunk_frames * self.channels
    }

    /// Plays until the clock reaches the end of `samples`.
    ///
    /// The position advances by a full step after every write, whether or
    /// not the write went through. The last chunk is padded with silence.
    pub fn run(mut self, samples: &[f32], clock: &PlaybackClock) -> (S, PlaybackReport) {
        let _finish = FinishOnDrop(clock);
        let step = self.step();
        let mut padded = vec![0.0f32; step];
        let mut report = PlaybackReport::default();

        let mut position = clock.position();
        while position < samples.len() {
            let src = &samples[position..(position + step).min(samples.len())];
            let chunk = if src.len() == step {
                src
            } else {
                padded[..src.len()].copy_from_slice(src);
                padded[src.len()..].fill(0.0);
                &padded[..]
            };

            if let Err(err) = self.sink.write(chunk) {
                log::debug!("write at sample {} failed: {}, recovering", position, err);
                self.sink.recover();
                report.underruns += 1;
            }
            report.writes += 1;
            position = clock.advance(step, samples.len());
        }

        (self.sink, report)
    }
}
