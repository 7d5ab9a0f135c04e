//! Subprocess-backed video engine
//!
//! Runs the FFmpeg binary inside a private scratch directory that serves as
//! the engine's filesystem. The directory is removed when the engine drops.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing::{debug, info};

use super::probe::{parse_probe_output, probe_args};
use super::{
    detect_ffmpeg, validate_engine_name, EngineError, EngineEvent, EngineInfo, EngineProgress,
    EngineResult, VideoEngine, ENGINE_EVENT_CAPACITY,
};
use crate::core::ffmpeg::parse_progress_line;
use crate::core::process::configure_tokio_command;
use crate::core::{VideoInfo, DEFAULT_FPS};

/// Lines of stderr kept for failure messages
const STDERR_TAIL_LINES: usize = 20;

/// FFmpeg driven as a subprocess over a scratch directory
pub struct FfmpegEngine {
    info: EngineInfo,
    scratch: TempDir,
    events: broadcast::Sender<EngineEvent>,
    fallback_fps: f64,
}

impl FfmpegEngine {
    /// Creates an engine for an already detected installation
    pub fn new(info: EngineInfo) -> EngineResult<Self> {
        let scratch = tempfile::Builder::new().prefix("subburn-engine-").tempdir()?;
        let (events, _) = broadcast::channel(ENGINE_EVENT_CAPACITY);

        debug!("Engine scratch directory: {}", scratch.path().display());

        Ok(Self {
            info,
            scratch,
            events,
            fallback_fps: DEFAULT_FPS,
        })
    }

    /// Detects FFmpeg (explicit path or system) and creates an engine
    pub fn detect(explicit: Option<&Path>) -> EngineResult<Self> {
        Self::new(detect_ffmpeg(explicit)?)
    }

    /// Frame rate assumed when a probed stream reports none
    pub fn with_fallback_fps(mut self, fps: f64) -> Self {
        self.fallback_fps = fps;
        self
    }

    pub fn info(&self) -> &EngineInfo {
        &self.info
    }

    /// Directory backing the engine filesystem
    pub fn scratch_dir(&self) -> &Path {
        self.scratch.path()
    }

    fn path_for(&self, name: &str) -> EngineResult<PathBuf> {
        validate_engine_name(name)?;
        Ok(self.scratch.path().join(name))
    }

    fn publish(&self, event: EngineEvent) {
        // No subscribers is not an error
        let _ = self.events.send(event);
    }

    /// Reads width, height, duration and frame rate of a host video file
    pub async fn probe(&self, input: &Path) -> EngineResult<VideoInfo> {
        if !input.is_file() {
            return Err(EngineError::FileNotFound(input.to_string_lossy().to_string()));
        }

        let mut cmd = tokio::process::Command::new(&self.info.ffprobe_path);
        configure_tokio_command(&mut cmd);
        let output = cmd
            .args(probe_args(&input.to_string_lossy()))
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EngineError::ProbeError(format!("FFprobe failed: {}", stderr.trim())));
        }

        parse_probe_output(&String::from_utf8_lossy(&output.stdout), self.fallback_fps)
    }
}

#[async_trait]
impl VideoEngine for FfmpegEngine {
    async fn write_file(&self, name: &str, bytes: &[u8]) -> EngineResult<()> {
        let path = self.path_for(name)?;
        tokio::fs::write(&path, bytes).await?;
        debug!("Engine file written: {} ({} bytes)", name, bytes.len());
        Ok(())
    }

    async fn read_file(&self, name: &str) -> EngineResult<Vec<u8>> {
        let path = self.path_for(name)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(EngineError::FileNotFound(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_file(&self, name: &str) -> EngineResult<()> {
        let path = self.path_for(name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(EngineError::FileNotFound(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn exec(&self, args: &[String]) -> EngineResult<()> {
        let mut full_args: Vec<String> = ["-hide_banner", "-nostdin", "-progress", "pipe:1"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        full_args.extend(args.iter().cloned());

        info!("Running ffmpeg {}", args.join(" "));

        let mut cmd = tokio::process::Command::new(&self.info.ffmpeg_path);
        configure_tokio_command(&mut cmd);
        cmd.args(&full_args)
            .current_dir(self.scratch.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn()?;

        // Drain stderr concurrently so a full pipe cannot stall FFmpeg
        let stderr_task = child.stderr.take().map(|stderr| {
            let events = self.events.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(target: "subburn::ffmpeg", "{}", line);
                    let _ = events.send(EngineEvent::Log(line.clone()));
                    if tail.len() == STDERR_TAIL_LINES {
                        tail.pop_front();
                    }
                    tail.push_back(line);
                }
                tail.into_iter().collect::<Vec<_>>().join("\n")
            })
        });

        if let Some(stdout) = child.stdout.take() {
            let mut lines = BufReader::new(stdout).lines();
            let mut progress = EngineProgress::default();
            while let Ok(Some(line)) = lines.next_line().await {
                if parse_progress_line(&line, &mut progress) {
                    self.publish(EngineEvent::Progress(progress.clone()));
                }
            }
        }

        let status = child.wait().await?;

        let stderr_tail = match stderr_task {
            Some(handle) => handle.await.unwrap_or_default(),
            None => String::new(),
        };

        if !status.success() {
            return Err(EngineError::ExecutionFailed(format!(
                "ffmpeg exited with {}: {}",
                status, stderr_tail
            )));
        }

        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    async fn import_file(&self, name: &str, source: &Path) -> EngineResult<()> {
        if !source.is_file() {
            return Err(EngineError::FileNotFound(source.to_string_lossy().to_string()));
        }
        let path = self.path_for(name)?;
        let copied = tokio::fs::copy(source, &path).await?;
        debug!("Engine file imported: {} ({} bytes)", name, copied);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_engine() -> FfmpegEngine {
        FfmpegEngine::new(EngineInfo {
            ffmpeg_path: PathBuf::from("/nonexistent/ffmpeg"),
            ffprobe_path: PathBuf::from("/nonexistent/ffprobe"),
            version: "test".to_string(),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_file_roundtrip_in_scratch_dir() {
        let engine = fake_engine();

        engine.write_file("subs.ass", b"[Script Info]").await.unwrap();
        assert!(engine.scratch_dir().join("subs.ass").is_file());
        assert_eq!(engine.read_file("subs.ass").await.unwrap(), b"[Script Info]");

        engine.delete_file("subs.ass").await.unwrap();
        assert!(matches!(
            engine.read_file("subs.ass").await,
            Err(EngineError::FileNotFound(_))
        ));
        assert!(matches!(
            engine.delete_file("subs.ass").await,
            Err(EngineError::FileNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_rejects_path_names() {
        let engine = fake_engine();
        assert!(matches!(
            engine.write_file("../outside.txt", b"x").await,
            Err(EngineError::InvalidFileName(_))
        ));
    }

    #[tokio::test]
    async fn test_import_file() {
        let engine = fake_engine();
        let source_dir = tempfile::TempDir::new().unwrap();
        let source = source_dir.path().join("clip.mp4");
        std::fs::write(&source, b"video bytes").unwrap();

        engine.import_file("input.mp4", &source).await.unwrap();
        assert_eq!(engine.read_file("input.mp4").await.unwrap(), b"video bytes");

        let missing = source_dir.path().join("missing.mp4");
        assert!(matches!(
            engine.import_file("input.mp4", &missing).await,
            Err(EngineError::FileNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_exec_missing_binary_is_process_error() {
        let engine = fake_engine();
        let result = engine.exec(&["-version".to_string()]).await;
        assert!(matches!(result, Err(EngineError::ProcessError(_))));
    }

    #[tokio::test]
    async fn test_scratch_dir_removed_on_drop() {
        let engine = fake_engine();
        let dir = engine.scratch_dir().to_path_buf();
        assert!(dir.is_dir());
        drop(engine);
        assert!(!dir.exists());
    }
}
