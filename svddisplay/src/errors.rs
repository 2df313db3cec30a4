use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DisplayError {
    #[error("Speaker {0} not found")]
    SpeakerNotFound(String),
    #[error("Cannot read font {0}: {1}")]
    FontUnreadable(PathBuf, std::io::Error),
    #[error("Invalid font {0}")]
    FontInvalid(PathBuf),
    #[error("Cannot allocate a {0}x{1} frame")]
    FrameSize(u32, u32),
    #[error("Window error: {0}")]
    Window(String),
}

impl DisplayError {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> u8 {
        1
    }
}
