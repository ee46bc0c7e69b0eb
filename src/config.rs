use std::time::Duration;

use crate::cli::Cli;

/// Samples per analysis frame (one channel).
pub const FRAME_LEN: usize = 1024;
/// Frequency assigned to the rightmost display column.
pub const MAX_DISPLAY_FREQ: f32 = 10_000.0;
/// Magnitude that fills a 60-row terminal.
pub const MAGNITUDE_SCALE: f32 = 60.0;
pub const BAR_GLYPH: char = '^';

#[derive(Debug, Clone)]
pub struct PlayerConfig {
    pub device: String,
    pub chunk_frames: usize,
    pub refresh_interval: Duration,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            device: default_device(),
            chunk_frames: default_chunk_frames(),
            refresh_interval: default_refresh_interval(),
        }
    }
}

impl PlayerConfig {
    pub fn from_cli(cli: &Cli) -> Self {
        let defaults = Self::default();
        Self {
            device: if cli.device.is_empty() { defaults.device } else { cli.device.clone() },
            chunk_frames: if cli.chunk_frames == 0 {
                log::warn!("--chunk-frames must be positive, using {}", defaults.chunk_frames);
                defaults.chunk_frames
            } else {
                cli.chunk_frames
            },
            refresh_interval: Duration::from_millis(cli.interval_ms),
        }
    }
}

fn default_device() -> String { "default".into() }
fn default_chunk_frames() -> usize { 256 }
fn default_refresh_interval() -> Duration { Duration::from_millis(100) }

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn cli_defaults_match_config_defaults() {
        let cli = Cli::parse_from(["tunescope", "song.wav"]);
        let config = PlayerConfig::from_cli(&cli);

        assert_eq!(config.device, "default");
        assert_eq!(config.chunk_frames, 256);
        assert_eq!(config.refresh_interval, Duration::from_millis(100));
    }

    #[test]
    fn zero_chunk_frames_falls_back() {
        let cli = Cli::parse_from(["tunescope", "song.wav", "--chunk-frames", "0"]);
        assert_eq!(PlayerConfig::from_cli(&cli).chunk_frames, 256);
    }

    #[test]
    fn missing_input_still_parses() {
        let cli = Cli::parse_from(["tunescope"]);
        assert!(cli.input.is_none());
    }
}
