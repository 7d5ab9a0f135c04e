//! Speech Recognition Seam
//!
//! The recognizer is an external collaborator: a factory loads a model for
//! a task and reports download/load progress, and the loaded recognizer
//! turns 16 kHz mono samples into text plus timestamped chunks. Chunks are
//! then mapped onto [`TimedSegment`]s.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

use super::{interpolate_words, TimedSegment};
use crate::core::seconds_to_ms;

// =============================================================================
// Error Types
// =============================================================================

/// Errors raised by recognizer factories and recognizers
#[derive(Error, Debug)]
pub enum TranscribeError {
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Failed to load model: {0}")]
    ModelLoadError(String),

    #[error("Invalid audio input: {0}")]
    InvalidAudio(String),

    #[error("Transcription failed: {0}")]
    InferenceError(String),

    #[error("Unsupported recognizer task: {0}")]
    UnsupportedTask(String),

    /// No recognizer backend compiled in
    #[error("Whisper feature not enabled. Rebuild with --features whisper")]
    FeatureNotEnabled,
}

pub type TranscribeResult<T> = Result<T, TranscribeError>;

// =============================================================================
// Configuration
// =============================================================================

pub const DEFAULT_RECOGNIZER_TASK: &str = "automatic-speech-recognition";
pub const DEFAULT_MODEL_ID: &str = "distil-whisper/distil-small.en";
pub const DEFAULT_CHUNK_LENGTH_S: f64 = 30.0;
pub const DEFAULT_STRIDE_LENGTH_S: f64 = 5.0;

/// What a factory needs to load a model
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognizerConfig {
    pub task: String,
    /// Model identifier or a path to a local model file
    pub model_id: String,
    pub quantized: bool,
    pub chunk_length_s: f64,
    pub stride_length_s: f64,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            task: DEFAULT_RECOGNIZER_TASK.to_string(),
            model_id: DEFAULT_MODEL_ID.to_string(),
            quantized: true,
            chunk_length_s: DEFAULT_CHUNK_LENGTH_S,
            stride_length_s: DEFAULT_STRIDE_LENGTH_S,
        }
    }
}

/// Whether the recognizer keeps the spoken language or translates to English
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscribeTask {
    #[default]
    Transcribe,
    Translate,
}

impl std::str::FromStr for TranscribeTask {
    type Err = TranscribeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "transcribe" => Ok(TranscribeTask::Transcribe),
            "translate" => Ok(TranscribeTask::Translate),
            other => Err(TranscribeError::UnsupportedTask(other.to_string())),
        }
    }
}

/// Per-call options
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscribeOptions {
    /// Spoken language code, `None` for auto-detection
    pub language: Option<String>,
    pub task: TranscribeTask,
    pub chunk_length_s: f64,
    pub stride_length_s: f64,
    pub return_timestamps: bool,
}

impl Default for TranscribeOptions {
    fn default() -> Self {
        Self {
            language: Some("english".to_string()),
            task: TranscribeTask::Transcribe,
            chunk_length_s: DEFAULT_CHUNK_LENGTH_S,
            stride_length_s: DEFAULT_STRIDE_LENGTH_S,
            return_timestamps: true,
        }
    }
}

// =============================================================================
// Output
// =============================================================================

/// One timestamped piece of recognized speech (seconds; the end may be open)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TranscriptChunk {
    pub timestamp: (f64, Option<f64>),
    pub text: String,
}

impl TranscriptChunk {
    pub fn new(start: f64, end: Option<f64>, text: &str) -> Self {
        Self {
            timestamp: (start, end),
            text: text.to_string(),
        }
    }
}

/// Full recognizer output
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TranscriptOutput {
    pub text: String,
    pub chunks: Vec<TranscriptChunk>,
}

// =============================================================================
// Model Loading Progress
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelStatus {
    Initiate,
    Progress,
    Done,
    Ready,
}

/// A model download/load notification
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelProgress {
    pub status: ModelStatus,
    pub file: Option<String>,
    pub loaded: u64,
    pub total: u64,
}

impl ModelProgress {
    pub fn new(status: ModelStatus, file: Option<&str>, loaded: u64, total: u64) -> Self {
        Self {
            status,
            file: file.map(str::to_string),
            loaded,
            total,
        }
    }

    /// Percentage loaded; 0 while the total is unknown
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        let pct = (self.loaded as f64 / self.total as f64 * 100.0).round();
        pct.clamp(0.0, 100.0) as u8
    }
}

/// Where factories send loading progress
pub type ModelProgressSink = Option<UnboundedSender<ModelProgress>>;

/// Sends a progress notification, ignoring a closed or absent receiver
pub fn report_progress(sink: &ModelProgressSink, progress: ModelProgress) {
    if let Some(tx) = sink {
        let _ = tx.send(progress);
    }
}

// =============================================================================
// Recognizer Traits
// =============================================================================

/// A loaded speech recognizer
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Identifier of the loaded model
    fn model_id(&self) -> &str;

    /// Recognizes speech in 16 kHz mono samples
    async fn transcribe(
        &self,
        samples: &[f32],
        options: &TranscribeOptions,
    ) -> TranscribeResult<TranscriptOutput>;
}

/// Loads recognizers for a task and model
#[async_trait]
pub trait RecognizerFactory: Send + Sync {
    async fn load(
        &self,
        config: &RecognizerConfig,
        progress: ModelProgressSink,
    ) -> TranscribeResult<Box<dyn SpeechRecognizer>>;
}

// =============================================================================
// Chunk Mapping
// =============================================================================

/// Maps recognizer chunks onto segments with interpolated word timing
///
/// Seconds become milliseconds, an open end falls back to the start, text
/// is trimmed and chunks with no text are dropped.
pub fn chunks_to_segments(chunks: &[TranscriptChunk]) -> Vec<TimedSegment> {
    chunks
        .iter()
        .filter_map(|chunk| {
            let text = chunk.text.trim();
            if text.is_empty() {
                return None;
            }

            let (start_s, end_s) = chunk.timestamp;
            let start = seconds_to_ms(start_s);
            let end = match end_s {
                Some(end_s) => seconds_to_ms(end_s),
                None => {
                    debug!("Chunk at {:.2}s has an open end, using its start", start_s);
                    start
                }
            };

            let segment = TimedSegment::new(start, end, text);
            let words = interpolate_words(&segment);
            Some(segment.with_words(words))
        })
        .collect()
}

/// Runs a recognizer over samples and returns segments ready for the editor
pub async fn transcribe_to_segments(
    recognizer: &dyn SpeechRecognizer,
    samples: &[f32],
    options: &TranscribeOptions,
) -> TranscribeResult<Vec<TimedSegment>> {
    if samples.is_empty() {
        return Err(TranscribeError::InvalidAudio("no samples".to_string()));
    }

    let output = recognizer.transcribe(samples, options).await?;
    let segments = chunks_to_segments(&output.chunks);

    if segments.is_empty() && !output.text.trim().is_empty() {
        warn!(
            "Recognizer '{}' returned text without timestamps",
            recognizer.model_id()
        );
    }

    Ok(segments)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedRecognizer {
        output: TranscriptOutput,
    }

    #[async_trait]
    impl SpeechRecognizer for FixedRecognizer {
        fn model_id(&self) -> &str {
            "fixed"
        }

        async fn transcribe(
            &self,
            _samples: &[f32],
            _options: &TranscribeOptions,
        ) -> TranscribeResult<TranscriptOutput> {
            Ok(self.output.clone())
        }
    }

    #[test]
    fn test_recognizer_config_defaults() {
        let config = RecognizerConfig::default();
        assert_eq!(config.task, "automatic-speech-recognition");
        assert_eq!(config.model_id, "distil-whisper/distil-small.en");
        assert!(config.quantized);
        assert_eq!(config.chunk_length_s, 30.0);
        assert_eq!(config.stride_length_s, 5.0);
    }

    #[test]
    fn test_transcribe_task_parse() {
        assert_eq!("Translate".parse::<TranscribeTask>().unwrap(), TranscribeTask::Translate);
        assert!("summarize".parse::<TranscribeTask>().is_err());
    }

    #[test]
    fn test_model_progress_percent() {
        assert_eq!(ModelProgress::new(ModelStatus::Progress, None, 50, 200).percent(), 25);
        assert_eq!(ModelProgress::new(ModelStatus::Progress, None, 2, 3).percent(), 67);
        assert_eq!(ModelProgress::new(ModelStatus::Initiate, None, 0, 0).percent(), 0);
        assert_eq!(ModelProgress::new(ModelStatus::Done, None, 10, 5).percent(), 100);
    }

    #[test]
    fn test_report_progress_without_receiver() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        drop(rx);
        report_progress(&Some(tx), ModelProgress::new(ModelStatus::Ready, None, 0, 0));
        report_progress(&None, ModelProgress::new(ModelStatus::Ready, None, 0, 0));
    }

    #[test]
    fn test_chunks_to_segments() {
        let chunks = vec![
            TranscriptChunk::new(0.0, Some(1.5), " Hello there "),
            TranscriptChunk::new(1.5, Some(2.0), "   "),
            TranscriptChunk::new(2.25, None, "open end"),
        ];

        let segments = chunks_to_segments(&chunks);
        assert_eq!(segments.len(), 2);

        assert_eq!(segments[0].start_ms, 0);
        assert_eq!(segments[0].end_ms, 1500);
        assert_eq!(segments[0].text, "Hello there");
        assert_eq!(segments[0].words.as_ref().map(Vec::len), Some(2));

        assert_eq!(segments[1].start_ms, 2250);
        assert_eq!(segments[1].end_ms, 2250);
    }

    #[tokio::test]
    async fn test_transcribe_to_segments() {
        let recognizer = FixedRecognizer {
            output: TranscriptOutput {
                text: "one two".to_string(),
                chunks: vec![TranscriptChunk::new(0.5, Some(1.0), "one two")],
            },
        };

        let segments = transcribe_to_segments(&recognizer, &[0.0; 16], &TranscribeOptions::default())
            .await
            .unwrap();
        assert_eq!(segments, vec![TimedSegment::new(500, 1000, "one two").with_words(vec![
            crate::core::captions::WordSpan::new("one", 500.0, 750.0),
            crate::core::captions::WordSpan::new("two", 750.0, 1000.0),
        ])]);
    }

    #[tokio::test]
    async fn test_transcribe_to_segments_rejects_empty_audio() {
        let recognizer = FixedRecognizer {
            output: TranscriptOutput::default(),
        };
        let result = transcribe_to_segments(&recognizer, &[], &TranscribeOptions::default()).await;
        assert!(matches!(result, Err(TranscribeError::InvalidAudio(_))));
    }
}
