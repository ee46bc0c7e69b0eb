//! Runs playback and visualization side by side.
//!
//! The two threads share nothing but the read-only sample buffer and the
//! playback clock. The spectrum thread polls the clock; it is never
//! signalled by the playback thread.

use anyhow::{anyhow, Context, Result};
use std::hint;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::audio::analysis::SpectrumAnalyzer;
use crate::audio::playback::{PcmSink, PlaybackClock, PlaybackDriver, PlaybackReport};
use crate::render::bars::draw_bars;
use crate::render::Surface;

/// Spectrum loop: analyze at the current position, draw, sleep.
pub struct Visualizer<T> {
    analyzer: SpectrumAnalyzer,
    surface: T,
    interval: Duration,
}

impl<T: Surface> Visualizer<T> {
    pub fn new(analyzer: SpectrumAnalyzer, surface: T, interval: Duration) -> Self {
        Self {
            analyzer,
            surface,
            interval,
        }
    }

    /// Spins until playback has started, then redraws every interval until
    /// the clock reaches the end of `samples`. Also returns once the driver
    /// has stopped, so a driver that never advances cannot hang this loop.
    pub fn run(mut self, samples: &[f32], clock: &PlaybackClock) -> T {
        while clock.position() == 0 && !clock.is_finished() {
            hint::spin_loop();
        }

        loop {
            let position = clock.position();
            if position >= samples.len() || clock.is_finished() {
                break;
            }
            if let Err(err) = self.draw_frame(samples, position) {
                log::debug!("Frame at sample {} not drawn: {}", position, err);
            }
            thread::sleep(self.interval);
        }

        self.surface
    }

    fn draw_frame(&mut self, samples: &[f32], position: usize) -> std::io::Result<()> {
        let (lines, cols) = self.surface.dimensions()?;
        let rows = lines.saturating_sub(1);
        let values = self.analyzer.analyze(samples, position, cols, rows);
        draw_bars(&mut self.surface, &values, rows)
    }
}

/// Result of a finished run, handed back for teardown.
pub struct Finished<S, T> {
    pub sink: S,
    pub surface: T,
    pub report: PlaybackReport,
}

/// Owns the shared state and both loops.
pub struct Coordinator<S, T> {
    samples: Arc<[f32]>,
    clock: Arc<PlaybackClock>,
    driver: PlaybackDriver<S>,
    visualizer: Visualizer<T>,
}

impl<S, T> Coordinator<S, T>
where
    S: PcmSink + Send + 'static,
    T: Surface + Send + 'static,
{
    pub fn new(samples: Arc<[f32]>, driver: PlaybackDriver<S>, visualizer: Visualizer<T>) -> Self {
        Self {
            samples,
            clock: Arc::new(PlaybackClock::new()),
            driver,
            visualizer,
        }
    }

    pub fn clock(&self) -> Arc<PlaybackClock> {
        Arc::clone(&self.clock)
    }

    /// Starts both threads and waits for them to reach end-of-stream.
    pub fn run(self) -> Result<Finished<S, T>> {
        let Coordinator {
            samples,
            clock,
            driver,
            visualizer,
        } = self;

        let playback = {
            let samples = Arc::clone(&samples);
            let clock = Arc::clone(&clock);
            thread::Builder::new()
                .name("playback".into())
                .spawn(move || driver.run(&samples, &clock))
                .context("Failed to spawn playback thread")?
        };

        let spectrum = thread::Builder::new()
            .name("spectrum".into())
            .spawn(move || visualizer.run(&samples, &clock))
            .context("Failed to spawn spectrum thread")?;

        let surface = spectrum
            .join()
            .map_err(|_| anyhow!("spectrum thread panicked"))?;
        let (sink, report) = playback
            .join()
            .map_err(|_| anyhow!("playback thread panicked"))?;

        Ok(Finished { sink, surface, report })
    }
}
