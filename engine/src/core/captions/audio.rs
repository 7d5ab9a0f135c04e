//! Audio Decoding for Transcription
//!
//! Speech recognizers take 16 kHz mono PCM. Media files are converted with
//! FFmpeg into a WAV file, which is then read back as normalized `f32`
//! samples with `hound`.

use std::path::Path;
use std::process::Command;

use thiserror::Error;
use tracing::{debug, info};

use crate::core::process::configure_std_command;

/// Sample rate every recognizer expects
pub const TRANSCRIBE_SAMPLE_RATE: u32 = 16_000;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while preparing audio for a recognizer
#[derive(Error, Debug)]
pub enum AudioExtractionError {
    /// FFmpeg exited with a non-zero status
    #[error("FFmpeg exited with error: {0}")]
    ProcessError(String),

    /// Input media file does not exist
    #[error("Input file not found: {0}")]
    InputNotFound(String),

    /// Output directory does not exist
    #[error("Output directory does not exist: {0}")]
    OutputDirNotFound(String),

    /// WAV file could not be read or has the wrong layout
    #[error("Invalid WAV data: {0}")]
    InvalidWav(String),

    /// Blocking task was cancelled or panicked
    #[error("Audio task failed: {0}")]
    TaskFailed(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type AudioResult<T> = Result<T, AudioExtractionError>;

// =============================================================================
// Extraction
// =============================================================================

/// Builds the FFmpeg arguments for a 16 kHz mono 16-bit WAV conversion
pub fn extraction_args(input_path: &Path, output_path: &Path) -> Vec<String> {
    vec![
        "-hide_banner".to_string(),
        "-nostdin".to_string(),
        "-i".to_string(),
        input_path.to_string_lossy().to_string(),
        "-vn".to_string(),
        "-ar".to_string(),
        TRANSCRIBE_SAMPLE_RATE.to_string(),
        "-ac".to_string(),
        "1".to_string(),
        "-c:a".to_string(),
        "pcm_s16le".to_string(),
        "-y".to_string(),
        output_path.to_string_lossy().to_string(),
    ]
}

/// Converts any media file FFmpeg can read into a recognizer-ready WAV
///
/// `ffmpeg_path` defaults to `ffmpeg` on the PATH.
pub fn extract_audio_for_transcription(
    input_path: &Path,
    output_path: &Path,
    ffmpeg_path: Option<&Path>,
) -> AudioResult<()> {
    if !input_path.exists() {
        return Err(AudioExtractionError::InputNotFound(
            input_path.to_string_lossy().to_string(),
        ));
    }

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            return Err(AudioExtractionError::OutputDirNotFound(
                parent.to_string_lossy().to_string(),
            ));
        }
    }

    let ffmpeg = ffmpeg_path.unwrap_or_else(|| Path::new("ffmpeg"));
    info!(
        "Extracting audio from {} for transcription",
        input_path.display()
    );

    let mut cmd = Command::new(ffmpeg);
    configure_std_command(&mut cmd);
    let output = cmd.args(extraction_args(input_path, output_path)).output()?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(AudioExtractionError::ProcessError(stderr.trim().to_string()));
    }

    debug!("Audio written to {}", output_path.display());
    Ok(())
}

/// Runs [`extract_audio_for_transcription`] on the blocking pool
pub async fn extract_audio_for_transcription_async(
    input_path: &Path,
    output_path: &Path,
    ffmpeg_path: Option<&Path>,
) -> AudioResult<()> {
    let input = input_path.to_path_buf();
    let output = output_path.to_path_buf();
    let ffmpeg = ffmpeg_path.map(Path::to_path_buf);

    tokio::task::spawn_blocking(move || {
        extract_audio_for_transcription(&input, &output, ffmpeg.as_deref())
    })
    .await
    .map_err(|e| AudioExtractionError::TaskFailed(e.to_string()))?
}

// =============================================================================
// WAV Loading
// =============================================================================

/// Reads a 16 kHz mono WAV as samples in `[-1.0, 1.0]`
///
/// Accepts 16/24/32-bit integer and 32-bit float data.
pub fn load_audio_samples(wav_path: &Path) -> AudioResult<Vec<f32>> {
    let reader = hound::WavReader::open(wav_path).map_err(|e| {
        AudioExtractionError::InvalidWav(format!("{}: {}", wav_path.display(), e))
    })?;

    let spec = reader.spec();

    if spec.sample_rate != TRANSCRIBE_SAMPLE_RATE {
        return Err(AudioExtractionError::InvalidWav(format!(
            "expected {} Hz, got {} Hz",
            TRANSCRIBE_SAMPLE_RATE, spec.sample_rate
        )));
    }

    if spec.channels != 1 {
        return Err(AudioExtractionError::InvalidWav(format!(
            "expected mono audio, got {} channels",
            spec.channels
        )));
    }

    let samples: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (hound::SampleFormat::Float, 32) => reader
            .into_samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(|e| AudioExtractionError::InvalidWav(e.to_string()))?,
        (hound::SampleFormat::Int, bits @ (16 | 24 | 32)) => {
            let scale = (1i64 << (bits - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()
                .map_err(|e| AudioExtractionError::InvalidWav(e.to_string()))?
        }
        (format, bits) => {
            return Err(AudioExtractionError::InvalidWav(format!(
                "unsupported sample layout: {:?} {} bit",
                format, bits
            )));
        }
    };

    debug!(
        "Loaded {} samples ({:.1}s) from {}",
        samples.len(),
        samples.len() as f64 / TRANSCRIBE_SAMPLE_RATE as f64,
        wav_path.display()
    );

    Ok(samples)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_wav(path: &Path, sample_rate: u32, channels: u16, samples: &[i16]) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for s in samples {
            writer.write_sample(*s).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_extract_audio_input_not_found() {
        let result = extract_audio_for_transcription(
            Path::new("/nonexistent/video.mp4"),
            Path::new("/tmp/output.wav"),
            None,
        );

        assert!(matches!(result, Err(AudioExtractionError::InputNotFound(_))));
    }

    #[test]
    fn test_extract_audio_output_dir_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let input_path = temp_dir.path().join("input.mp4");
        std::fs::write(&input_path, b"not really video").unwrap();

        let result = extract_audio_for_transcription(
            &input_path,
            Path::new("/nonexistent/dir/output.wav"),
            None,
        );

        assert!(matches!(
            result,
            Err(AudioExtractionError::OutputDirNotFound(_))
        ));
    }

    #[test]
    fn test_extraction_args_request_mono_16k() {
        let args = extraction_args(Path::new("in.mp4"), Path::new("out.wav"));
        let joined = args.join(" ");
        assert!(joined.contains("-ar 16000"));
        assert!(joined.contains("-ac 1"));
        assert!(joined.contains("-c:a pcm_s16le"));
        assert_eq!(args.last().map(String::as_str), Some("out.wav"));
    }

    #[test]
    fn test_load_audio_samples_normalizes() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("speech.wav");
        write_wav(&path, 16_000, 1, &[0, 16384, -32768]);

        let samples = load_audio_samples(&path).unwrap();
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0], 0.0);
        assert!((samples[1] - 0.5).abs() < 1e-6);
        assert_eq!(samples[2], -1.0);
    }

    #[test]
    fn test_load_audio_samples_rejects_wrong_rate() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cd.wav");
        write_wav(&path, 44_100, 1, &[0, 1, 2]);

        assert!(matches!(
            load_audio_samples(&path),
            Err(AudioExtractionError::InvalidWav(_))
        ));
    }

    #[test]
    fn test_load_audio_samples_rejects_stereo() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("stereo.wav");
        write_wav(&path, 16_000, 2, &[0, 0, 1, 1]);

        assert!(matches!(
            load_audio_samples(&path),
            Err(AudioExtractionError::InvalidWav(_))
        ));
    }

    #[test]
    fn test_load_audio_samples_missing_file() {
        assert!(load_audio_samples(Path::new("/nonexistent/a.wav")).is_err());
    }
}
