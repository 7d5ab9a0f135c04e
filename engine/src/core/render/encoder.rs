//! Transparent clip encoding
//!
//! Frames arrive as RGBA8 buffers and are encoded into a VP9 WebM with an
//! alpha plane, ready to be overlaid onto the source video.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::{RenderError, RenderResult};
use crate::core::process::configure_tokio_command;

/// Encoder the overlay clip needs for an alpha channel
pub const ALPHA_CLIP_ENCODER: &str = "libvpx-vp9";

/// Consumes rendered frames and produces an encoded clip
#[async_trait]
pub trait FrameEncoder: Send {
    /// Encodes one RGBA8 frame; `keyframe` requests an intra frame
    async fn encode_frame(&mut self, rgba: &[u8], timestamp_us: u64, keyframe: bool) -> RenderResult<()>;

    /// Flushes the encoder and returns the finished container bytes
    async fn finish(&mut self) -> RenderResult<Vec<u8>>;

    /// MIME type of the produced container
    fn mime_type(&self) -> &'static str;
}

// =============================================================================
// FFmpeg Frame Encoder
// =============================================================================

/// Pipes raw RGBA frames into an FFmpeg subprocess writing VP9/WebM with alpha
///
/// Keyframes are placed by `-g`, so the per-frame `keyframe` flag is
/// expected to agree with the configured interval.
pub struct FfmpegFrameEncoder {
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr_task: Option<JoinHandle<String>>,
    output_path: PathBuf,
    _workdir: TempDir,
    frame_bytes: usize,
    frames_written: u64,
}

impl FfmpegFrameEncoder {
    /// Arguments for an RGBA rawvideo -> VP9 (yuva420p) WebM encode
    pub fn build_args(width: u32, height: u32, fps: f64, keyframe_interval: u64, output: &Path) -> Vec<String> {
        vec![
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-f".to_string(),
            "rawvideo".to_string(),
            "-pix_fmt".to_string(),
            "rgba".to_string(),
            "-s".to_string(),
            format!("{}x{}", width, height),
            "-r".to_string(),
            format!("{}", fps),
            "-i".to_string(),
            "pipe:0".to_string(),
            "-c:v".to_string(),
            ALPHA_CLIP_ENCODER.to_string(),
            "-pix_fmt".to_string(),
            "yuva420p".to_string(),
            "-b:v".to_string(),
            "1M".to_string(),
            "-g".to_string(),
            keyframe_interval.max(1).to_string(),
            "-auto-alt-ref".to_string(),
            "0".to_string(),
            "-deadline".to_string(),
            "realtime".to_string(),
            "-y".to_string(),
            output.to_string_lossy().to_string(),
        ]
    }

    /// Spawns the encoder process
    pub fn spawn(
        ffmpeg_path: &Path,
        width: u32,
        height: u32,
        fps: f64,
        keyframe_interval: u64,
    ) -> RenderResult<Self> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidDimensions { width, height });
        }

        let workdir = tempfile::Builder::new().prefix("subburn-clip-").tempdir()?;
        let output_path = workdir.path().join("subtitles.webm");

        let mut cmd = tokio::process::Command::new(ffmpeg_path);
        configure_tokio_command(&mut cmd);
        cmd.args(Self::build_args(width, height, fps, keyframe_interval, &output_path))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .map_err(|e| RenderError::EncoderFailed(format!("Failed to spawn FFmpeg: {}", e)))?;

        let stdin = child.stdin.take();
        let stderr_task = child.stderr.take().map(|mut stderr| {
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let _ = stderr.read_to_end(&mut buf).await;
                String::from_utf8_lossy(&buf).to_string()
            })
        });

        info!("Encoding {}x{} @ {} fps alpha clip", width, height, fps);

        Ok(Self {
            child: Some(child),
            stdin,
            stderr_task,
            output_path,
            _workdir: workdir,
            frame_bytes: width as usize * height as usize * 4,
            frames_written: 0,
        })
    }

    async fn stderr_text(&mut self) -> String {
        match self.stderr_task.take() {
            Some(handle) => handle.await.unwrap_or_default(),
            None => String::new(),
        }
    }
}

#[async_trait]
impl FrameEncoder for FfmpegFrameEncoder {
    async fn encode_frame(&mut self, rgba: &[u8], _timestamp_us: u64, _keyframe: bool) -> RenderResult<()> {
        if rgba.len() != self.frame_bytes {
            return Err(RenderError::EncoderFailed(format!(
                "frame has {} bytes, expected {}",
                rgba.len(),
                self.frame_bytes
            )));
        }

        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| RenderError::EncoderFailed("encoder already finished".to_string()))?;

        if let Err(e) = stdin.write_all(rgba).await {
            let stderr = self.stderr_text().await;
            return Err(RenderError::EncoderFailed(format!("{}: {}", e, stderr.trim())));
        }

        self.frames_written += 1;
        Ok(())
    }

    async fn finish(&mut self) -> RenderResult<Vec<u8>> {
        // Closing stdin signals end of stream
        if let Some(mut stdin) = self.stdin.take() {
            stdin.flush().await?;
        }

        let mut child = self
            .child
            .take()
            .ok_or_else(|| RenderError::EncoderFailed("encoder already finished".to_string()))?;
        let status = child.wait().await?;
        let stderr = self.stderr_text().await;

        if !status.success() {
            return Err(RenderError::EncoderFailed(format!(
                "ffmpeg exited with {}: {}",
                status,
                stderr.trim()
            )));
        }

        let bytes = tokio::fs::read(&self.output_path).await?;
        debug!("Encoded {} frames into {} bytes", self.frames_written, bytes.len());
        Ok(bytes)
    }

    fn mime_type(&self) -> &'static str {
        "video/webm"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_args() {
        let args = FfmpegFrameEncoder::build_args(1280, 720, 30.0, 150, Path::new("/tmp/out.webm"));
        let joined = args.join(" ");

        assert!(joined.contains("-f rawvideo -pix_fmt rgba -s 1280x720 -r 30 -i pipe:0"));
        assert!(joined.contains("-c:v libvpx-vp9 -pix_fmt yuva420p"));
        assert!(joined.contains("-g 150"));
        assert_eq!(args.last().map(String::as_str), Some("/tmp/out.webm"));
    }

    #[test]
    fn test_build_args_fractional_fps() {
        let args = FfmpegFrameEncoder::build_args(2, 2, 29.97, 0, Path::new("o.webm"));
        assert!(args.contains(&"29.97".to_string()));
        assert!(args.contains(&"1".to_string()));
    }

    #[tokio::test]
    async fn test_spawn_missing_binary() {
        let result = FfmpegFrameEncoder::spawn(Path::new("/nonexistent/ffmpeg"), 4, 4, 30.0, 150);
        assert!(matches!(result, Err(RenderError::EncoderFailed(_))));
    }

    #[tokio::test]
    async fn test_spawn_zero_size() {
        let result = FfmpegFrameEncoder::spawn(Path::new("ffmpeg"), 0, 4, 30.0, 150);
        assert!(matches!(result, Err(RenderError::InvalidDimensions { .. })));
    }
}
