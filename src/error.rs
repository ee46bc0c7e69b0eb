use std::path::PathBuf;
use thiserror::Error;

/// Fatal failures that happen before playback starts.
///
/// Attached as anyhow context so `main` can pick the exit status.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("enter an audio file path as the first argument")]
    MissingInput,
    #[error("cannot load audio file {}", .0.display())]
    Load(PathBuf),
    #[error("cannot open or configure audio device '{0}'")]
    Device(String),
}

impl SetupError {
    pub fn exit_code(&self) -> u8 {
        match self {
            SetupError::MissingInput | SetupError::Load(_) => 1,
            // -1 as seen by the shell
            SetupError::Device(_) => 255,
        }
    }
}

/// Exit status for an error returned from `run`.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<SetupError>()
        .map_or(1, SetupError::exit_code)
}
