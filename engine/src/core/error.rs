//! Subburn Error Definitions
//!
//! Defines error types used throughout the project.

use thiserror::Error;

use super::captions::audio::AudioExtractionError;
use super::captions::transcribe::TranscribeError;
use super::ffmpeg::EngineError;
use super::render::RenderError;

/// Core engine error types
#[derive(Error, Debug)]
pub enum CoreError {
    // =========================================================================
    // Input Errors
    // =========================================================================
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Unknown style preset: {0}")]
    UnknownPreset(String),

    #[error("Segment index out of range: {index} (track has {len} segments)")]
    SegmentOutOfRange { index: usize, len: usize },

    #[error("File not found: {0}")]
    FileNotFound(String),

    // =========================================================================
    // Export Errors
    // =========================================================================
    #[error("Missing prerequisite: {0}")]
    MissingPrerequisite(String),

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    // =========================================================================
    // Transcription Errors
    // =========================================================================
    #[error("Transcription error: {0}")]
    Transcribe(#[from] TranscribeError),

    #[error("Audio extraction error: {0}")]
    Audio(#[from] AudioExtractionError),

    // =========================================================================
    // General Errors
    // =========================================================================
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Core engine result type
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Convert to a one-line message suitable for a status line
    ///
    /// Multi-line messages (engine failures carry a stderr tail) keep their
    /// first and last lines.
    pub fn to_status_message(&self) -> String {
        let message = self.to_string();
        let mut lines = message.lines().map(str::trim).filter(|line| !line.is_empty());
        let first = lines.next().unwrap_or_default();
        match lines.last() {
            Some(last) => format!("{} ... {}", first, last),
            None => first.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::UnknownPreset("neon".to_string());
        assert_eq!(err.to_string(), "Unknown style preset: neon");

        let err = CoreError::SegmentOutOfRange { index: 4, len: 2 };
        assert_eq!(err.to_status_message(), err.to_string());
    }

    #[test]
    fn test_status_message_is_one_line() {
        let err: CoreError = EngineError::ExecutionFailed(
            "ffmpeg exited with exit status: 1: ffmpeg version 6.1\n  built with gcc\n\nsubs.ass: No such file or directory".to_string(),
        )
        .into();

        assert_eq!(
            err.to_status_message(),
            "Engine error: FFmpeg execution failed: ffmpeg exited with exit status: 1: ffmpeg version 6.1 ... subs.ass: No such file or directory"
        );
    }

    #[test]
    fn test_engine_error_conversion() {
        let err: CoreError = EngineError::NotFound.into();
        assert!(matches!(err, CoreError::Engine(EngineError::NotFound)));
    }
}
