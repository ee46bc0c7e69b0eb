mod audio;
mod cli;
mod config;
mod coordinator;
mod error;
mod render;

use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;

use audio::analysis::SpectrumAnalyzer;
use audio::device::OutputDevice;
use audio::playback::PlaybackDriver;
use cli::Cli;
use config::{PlayerConfig, FRAME_LEN};
use coordinator::{Coordinator, Visualizer};
use error::SetupError;
use render::terminal::TerminalSurface;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::from(error::exit_code(&err))
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let input = cli.input.as_ref().ok_or(SetupError::MissingInput)?;
    let config = PlayerConfig::from_cli(cli);

    log::info!("tunescope - terminal spectrum player");
    log::info!("Input: {}", input.display());

    // 1. Decode the whole file up front
    let audio = audio::decode::decode_audio(input)
        .with_context(|| SetupError::Load(input.clone()))?;

    // 2. Open and configure the output device
    let (stream, writer, negotiated) = OutputDevice::open(&config.device)
        .and_then(|device| device.configure(config.chunk_frames, audio.sample_rate, audio.channels))
        .with_context(|| SetupError::Device(config.device.clone()))?;

    // 3. Take over the terminal
    let mut surface = TerminalSurface::new();
    surface.enter_mode().context("Failed to set up terminal")?;

    let samples: Arc<[f32]> = audio.samples.into();
    let driver = PlaybackDriver::new(writer, negotiated.chunk_frames, negotiated.channels);
    let analyzer = SpectrumAnalyzer::new(FRAME_LEN, negotiated.sample_rate, negotiated.channels);
    let visualizer = Visualizer::new(analyzer, surface, config.refresh_interval);

    let coordinator = Coordinator::new(Arc::clone(&samples), driver, visualizer);
    let clock = coordinator.clock();
    let finished = coordinator.run()?;

    // Release in reverse order: terminal, device, buffer
    let mut surface = finished.surface;
    surface.exit_mode().context("Failed to restore terminal")?;
    stream.drain(finished.sink);
    stream.close();

    log::info!(
        "Playback complete at sample {}/{}: {} writes, {} underruns recovered",
        clock.position(),
        samples.len(),
        finished.report.writes,
        finished.report.underruns
    );
    drop(samples);
    Ok(())
}
