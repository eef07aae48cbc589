use thiserror::Error;

use crate::core::audio::FormatError;
use crate::core::cache::StoreError;

/// Errors surfaced to callers of the speech pipeline.
///
/// Backend failures never appear here: the orchestrator records them and
/// falls back, and exhaustion degrades to a silent container.
#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Audio format error: {0}")]
    Format(#[from] FormatError),

    #[error("Cache store error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type SpeechResult<T> = Result<T, SpeechError>;
