use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "tunescope", about = "Play an audio file with a live terminal spectrum")]
pub struct Cli {
    /// Input audio file (WAV, MP3, FLAC, OGG)
    pub input: Option<PathBuf>,

    /// Output device name ("default" selects the system default output)
    #[arg(short, long, default_value = "default")]
    pub device: String,

    /// Frames handed to the output device per write
    #[arg(long, default_value_t = 256)]
    pub chunk_frames: usize,

    /// Spectrum refresh interval in milliseconds
    #[arg(long, default_value_t = 100)]
    pub interval_ms: u64,
}
