//! Whisper Recognizer Backend
//!
//! A [`RecognizerFactory`] backed by whisper.cpp through whisper-rs. The
//! model id is the path of a local ggml model file. Compiled only with the
//! `whisper` feature; otherwise the factory reports `FeatureNotEnabled`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::transcribe::{
    ModelProgressSink, RecognizerConfig, RecognizerFactory, SpeechRecognizer, TranscribeError,
    TranscribeResult, DEFAULT_RECOGNIZER_TASK,
};

/// Loads whisper.cpp models from local files
#[derive(Debug, Clone, Default)]
pub struct WhisperFactory {
    /// Directory that relative model ids are resolved against
    model_dir: Option<PathBuf>,
}

impl WhisperFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model_dir(dir: &Path) -> Self {
        Self {
            model_dir: Some(dir.to_path_buf()),
        }
    }

    /// Resolves a model id to a file path
    pub fn resolve_model_path(&self, model_id: &str) -> PathBuf {
        let candidate = PathBuf::from(model_id);
        match &self.model_dir {
            Some(dir) if candidate.is_relative() => dir.join(candidate),
            _ => candidate,
        }
    }

    fn check_config(&self, config: &RecognizerConfig) -> TranscribeResult<PathBuf> {
        if config.task != DEFAULT_RECOGNIZER_TASK {
            return Err(TranscribeError::UnsupportedTask(config.task.clone()));
        }
        let path = self.resolve_model_path(&config.model_id);
        if !path.is_file() {
            return Err(TranscribeError::ModelNotFound(
                path.to_string_lossy().to_string(),
            ));
        }
        Ok(path)
    }
}

// =============================================================================
// Whisper Engine - Feature-gated Implementation
// =============================================================================

#[cfg(feature = "whisper")]
mod engine_impl {
    use std::sync::Arc;

    use tracing::info;
    use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

    use super::*;
    use crate::core::captions::transcribe::{
        report_progress, ModelProgress, ModelStatus, TranscribeOptions, TranscribeTask,
        TranscriptChunk, TranscriptOutput,
    };

    /// A loaded whisper.cpp model
    pub struct WhisperRecognizer {
        context: Arc<WhisperContext>,
        model_id: String,
    }

    #[async_trait]
    impl SpeechRecognizer for WhisperRecognizer {
        fn model_id(&self) -> &str {
            &self.model_id
        }

        async fn transcribe(
            &self,
            samples: &[f32],
            options: &TranscribeOptions,
        ) -> TranscribeResult<TranscriptOutput> {
            let context = Arc::clone(&self.context);
            let samples = samples.to_vec();
            let options = options.clone();

            tokio::task::spawn_blocking(move || run_inference(&context, &samples, &options))
                .await
                .map_err(|e| TranscribeError::InferenceError(e.to_string()))?
        }
    }

    fn run_inference(
        context: &WhisperContext,
        samples: &[f32],
        options: &TranscribeOptions,
    ) -> TranscribeResult<TranscriptOutput> {
        let mut state = context
            .create_state()
            .map_err(|e| TranscribeError::InferenceError(e.to_string()))?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        if let Some(ref lang) = options.language {
            if lang != "auto" {
                params.set_language(Some(whisper_language_code(lang)));
            }
        }
        params.set_translate(options.task == TranscribeTask::Translate);
        params.set_no_timestamps(!options.return_timestamps);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);

        state
            .full(params, samples)
            .map_err(|e| TranscribeError::InferenceError(e.to_string()))?;

        let num_segments = state
            .full_n_segments()
            .map_err(|e| TranscribeError::InferenceError(e.to_string()))?;

        let mut chunks = Vec::with_capacity(num_segments.max(0) as usize);
        for i in 0..num_segments {
            let t0 = state
                .full_get_segment_t0(i)
                .map_err(|e| TranscribeError::InferenceError(e.to_string()))?;
            let t1 = state
                .full_get_segment_t1(i)
                .map_err(|e| TranscribeError::InferenceError(e.to_string()))?;
            let text = state
                .full_get_segment_text(i)
                .map_err(|e| TranscribeError::InferenceError(e.to_string()))?;

            // whisper.cpp timestamps are in centiseconds
            chunks.push(TranscriptChunk::new(
                t0 as f64 / 100.0,
                Some(t1 as f64 / 100.0),
                &text,
            ));
        }

        let text = chunks
            .iter()
            .map(|c| c.text.trim())
            .collect::<Vec<_>>()
            .join(" ");

        Ok(TranscriptOutput { text, chunks })
    }

    /// Maps long language names to whisper's two-letter codes
    fn whisper_language_code(language: &str) -> &str {
        match language.to_lowercase().as_str() {
            "english" => "en",
            "korean" => "ko",
            "japanese" => "ja",
            "spanish" => "es",
            "french" => "fr",
            "german" => "de",
            _ => language,
        }
    }

    #[async_trait]
    impl RecognizerFactory for WhisperFactory {
        async fn load(
            &self,
            config: &RecognizerConfig,
            progress: ModelProgressSink,
        ) -> TranscribeResult<Box<dyn SpeechRecognizer>> {
            let path = self.check_config(config)?;
            let file = path.to_string_lossy().to_string();
            let size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);

            report_progress(&progress, ModelProgress::new(ModelStatus::Initiate, Some(&file), 0, size));
            info!("Loading whisper model {}", file);

            let load_path = file.clone();
            let context = tokio::task::spawn_blocking(move || {
                WhisperContext::new_with_params(&load_path, WhisperContextParameters::default())
            })
            .await
            .map_err(|e| TranscribeError::ModelLoadError(e.to_string()))?
            .map_err(|e| TranscribeError::ModelLoadError(e.to_string()))?;

            report_progress(&progress, ModelProgress::new(ModelStatus::Progress, Some(&file), size, size));
            report_progress(&progress, ModelProgress::new(ModelStatus::Done, Some(&file), size, size));
            report_progress(&progress, ModelProgress::new(ModelStatus::Ready, Some(&file), size, size));

            Ok(Box::new(WhisperRecognizer {
                context: Arc::new(context),
                model_id: config.model_id.clone(),
            }))
        }
    }
}

#[cfg(feature = "whisper")]
pub use engine_impl::WhisperRecognizer;

// =============================================================================
// Stub Implementation (when whisper feature is disabled)
// =============================================================================

#[cfg(not(feature = "whisper"))]
#[async_trait]
impl RecognizerFactory for WhisperFactory {
    async fn load(
        &self,
        config: &RecognizerConfig,
        _progress: ModelProgressSink,
    ) -> TranscribeResult<Box<dyn SpeechRecognizer>> {
        self.check_config(config)?;
        Err(TranscribeError::FeatureNotEnabled)
    }
}

/// Returns true if a whisper backend is compiled in
pub fn is_whisper_available() -> bool {
    cfg!(feature = "whisper")
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_model_path() {
        let factory = WhisperFactory::with_model_dir(Path::new("/models"));
        assert_eq!(
            factory.resolve_model_path("ggml-base.bin"),
            PathBuf::from("/models/ggml-base.bin")
        );
        assert_eq!(
            factory.resolve_model_path("/abs/ggml-tiny.bin"),
            PathBuf::from("/abs/ggml-tiny.bin")
        );
        assert_eq!(
            WhisperFactory::new().resolve_model_path("ggml-base.bin"),
            PathBuf::from("ggml-base.bin")
        );
    }

    #[tokio::test]
    async fn test_load_missing_model() {
        let factory = WhisperFactory::new();
        let config = RecognizerConfig {
            model_id: "/nonexistent/ggml-base.bin".to_string(),
            ..RecognizerConfig::default()
        };

        let result = factory.load(&config, None).await;
        assert!(matches!(result, Err(TranscribeError::ModelNotFound(_))));
    }

    #[tokio::test]
    async fn test_load_rejects_unknown_task() {
        let factory = WhisperFactory::new();
        let config = RecognizerConfig {
            task: "image-classification".to_string(),
            ..RecognizerConfig::default()
        };

        let result = factory.load(&config, None).await;
        assert!(matches!(result, Err(TranscribeError::UnsupportedTask(_))));
    }

    #[cfg(not(feature = "whisper"))]
    #[tokio::test]
    async fn test_load_without_feature() {
        let temp_dir = TempDir::new().unwrap();
        let model = temp_dir.path().join("ggml-tiny.bin");
        std::fs::write(&model, b"weights").unwrap();

        let factory = WhisperFactory::with_model_dir(temp_dir.path());
        let config = RecognizerConfig {
            model_id: "ggml-tiny.bin".to_string(),
            ..RecognizerConfig::default()
        };

        let result = factory.load(&config, None).await;
        assert!(matches!(result, Err(TranscribeError::FeatureNotEnabled)));
        assert!(!is_whisper_available());
    }
}
