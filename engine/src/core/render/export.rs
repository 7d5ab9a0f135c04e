//! Export Orchestrator
//!
//! Drives the video engine through the two export paths:
//!
//! - **Burn-in**: the subtitle markup is written next to the source and
//!   rendered by the engine's `subtitles` filter, optionally after a crop
//!   and scale.
//! - **Overlay**: every frame of the subtitle track is drawn onto a
//!   transparent surface, encoded into a clip, and composited over the
//!   source with a colour key.
//!
//! Status and progress go out as [`ExportEvent`]s over an optional channel.
//! A failure at any step emits `ExportStatus::Failed` and returns the error;
//! files already written into the engine are left in place.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::crop::{CropSettings, FilterChain, ScaleSettings};
use super::encoder::FrameEncoder;
use super::frames::{draw_subtitle_frame, FrameSurface};
use crate::core::captions::{export_ass, export_srt, AssOptions, TimedSegment};
use crate::core::ffmpeg::{EngineEvent, VideoEngine};
use crate::core::style::SubtitleStyle;
use crate::core::{CoreError, CoreResult, VideoInfo};

/// Frames between forced keyframes in the overlay clip
pub const DEFAULT_KEYFRAME_INTERVAL: u64 = 150;

/// Frames rendered between scheduler yields
pub const DEFAULT_YIELD_EVERY: u64 = 10;

/// Colour-key composite of input 1 over input 0
pub const OVERLAY_FILTER: &str =
    "[1:v]colorkey=0x000000:0.1:0.2[ckout];[0:v][ckout]overlay=format=auto";

const OUTPUT_NAME: &str = "output.mp4";
const CLIP_NAME: &str = "subtitles.webm";

/// How long a finished run waits for its engine events to be forwarded
const FORWARD_DRAIN_TIMEOUT: Duration = Duration::from_millis(500);

// =============================================================================
// Events
// =============================================================================

/// Export phase reported to the user
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "camelCase")]
pub enum ExportStatus {
    Preparing,
    RenderingOverlay,
    Encoding,
    Compositing,
    Finalizing,
    Completed,
    Failed(String),
}

impl fmt::Display for ExportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportStatus::Preparing => f.write_str("Preparing input..."),
            ExportStatus::RenderingOverlay => f.write_str("Creating subtitle overlay..."),
            ExportStatus::Encoding => f.write_str("Burning subtitles into video..."),
            ExportStatus::Compositing => f.write_str("Overlaying subtitles on video..."),
            ExportStatus::Finalizing => f.write_str("Reading output..."),
            ExportStatus::Completed => f.write_str("Export complete"),
            ExportStatus::Failed(message) => write!(f, "Error exporting video: {}", message),
        }
    }
}

/// Notification sent while an export runs
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ExportEvent {
    Status(ExportStatus),
    /// Overall progress, 0..=100
    Progress(u8),
    /// A log line from the engine
    EngineLog(String),
}

// =============================================================================
// Request / Artifact
// =============================================================================

/// Which markup the burn-in path hands to the engine
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubtitleDialect {
    Styled(AssOptions),
    Simple,
}

impl SubtitleDialect {
    pub fn file_name(&self) -> &'static str {
        match self {
            SubtitleDialect::Styled(_) => "subs.ass",
            SubtitleDialect::Simple => "subs.srt",
        }
    }

    pub fn render(&self, segments: &[TimedSegment], style: &SubtitleStyle) -> String {
        match self {
            SubtitleDialect::Styled(options) => export_ass(segments, style, *options),
            SubtitleDialect::Simple => export_srt(segments),
        }
    }
}

impl Default for SubtitleDialect {
    fn default() -> Self {
        SubtitleDialect::Styled(AssOptions::default())
    }
}

/// Video encoder parameters of the final output
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodeSettings {
    pub video_codec: String,
    pub preset: String,
    pub crf: u8,
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            preset: "fast".to_string(),
            crf: 22,
        }
    }
}

/// Everything one export needs
#[derive(Clone, Debug)]
pub struct ExportRequest {
    pub source: PathBuf,
    pub video: VideoInfo,
    pub segments: Vec<TimedSegment>,
    pub style: SubtitleStyle,
    pub dialect: SubtitleDialect,
    pub crop: Option<CropSettings>,
    pub scale: Option<ScaleSettings>,
    pub encode: EncodeSettings,
    /// Stop the output at this many seconds
    pub limit_sec: Option<f64>,
    /// Directory the engine searches for fonts
    pub fonts_dir: Option<String>,
}

impl ExportRequest {
    pub fn new(source: &Path, video: VideoInfo, segments: Vec<TimedSegment>, style: SubtitleStyle) -> Self {
        Self {
            source: source.to_path_buf(),
            video,
            segments,
            style,
            dialect: SubtitleDialect::default(),
            crop: None,
            scale: None,
            encode: EncodeSettings::default(),
            limit_sec: None,
            fonts_dir: None,
        }
    }

    /// Engine-side name of the source, keeping its extension
    pub fn input_name(&self) -> String {
        let ext = self
            .source
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
            .unwrap_or("mp4");
        format!("input.{}", ext.to_lowercase())
    }

    /// Seconds of output that will actually be produced
    pub fn output_duration_sec(&self) -> f64 {
        match self.limit_sec {
            Some(limit) if limit > 0.0 => limit.min(self.video.duration_sec),
            _ => self.video.duration_sec,
        }
    }

    fn check_prerequisites(&self) -> CoreResult<()> {
        if self.segments.is_empty() {
            return Err(CoreError::MissingPrerequisite(
                "no subtitles loaded".to_string(),
            ));
        }
        if self.video.width == 0 || self.video.height == 0 {
            return Err(CoreError::MissingPrerequisite(
                "video dimensions unknown".to_string(),
            ));
        }
        Ok(())
    }
}

/// The produced file
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportArtifact {
    pub bytes: Vec<u8>,
    pub mime: String,
    pub file_name: String,
}

/// Formats seconds as `HH:MM:SS.mmm` for `-to`
pub fn format_ffmpeg_time(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let ms = total_ms % 1000;
    let total_secs = total_ms / 1000;
    format!(
        "{:02}:{:02}:{:02}.{:03}",
        total_secs / 3600,
        (total_secs / 60) % 60,
        total_secs % 60,
        ms
    )
}

/// Builds the burn-in `-vf` graph: crop, scale, then subtitles
pub fn burn_in_filter_chain(request: &ExportRequest) -> FilterChain {
    let mut chain = FilterChain::new();
    if let Some(crop) = request.crop.as_ref().filter(|c| !c.is_identity(&request.video)) {
        chain = chain.crop(crop);
    }
    if let Some(scale) = &request.scale {
        chain = chain.scale(scale);
    }
    chain.subtitles(request.dialect.file_name(), request.fonts_dir.as_deref())
}

/// Engine arguments for the burn-in path
pub fn burn_in_args(request: &ExportRequest) -> Vec<String> {
    let mut args = vec!["-i".to_string(), request.input_name()];

    if let Some(graph) = burn_in_filter_chain(request).build() {
        args.push("-vf".to_string());
        args.push(graph);
    }

    args.extend([
        "-c:v".to_string(),
        request.encode.video_codec.clone(),
        "-preset".to_string(),
        request.encode.preset.clone(),
        "-crf".to_string(),
        request.encode.crf.to_string(),
        "-c:a".to_string(),
        "copy".to_string(),
    ]);

    if let Some(limit) = request.limit_sec.filter(|l| *l > 0.0) {
        args.push("-to".to_string());
        args.push(format_ffmpeg_time(limit));
    }

    args.push("-y".to_string());
    args.push(OUTPUT_NAME.to_string());
    args
}

/// Engine arguments for compositing the clip over the source
pub fn overlay_args(request: &ExportRequest) -> Vec<String> {
    let mut args = vec![
        "-i".to_string(),
        request.input_name(),
        "-i".to_string(),
        CLIP_NAME.to_string(),
        "-filter_complex".to_string(),
        OVERLAY_FILTER.to_string(),
        "-c:v".to_string(),
        "libx264".to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        "-c:a".to_string(),
        "copy".to_string(),
        "-preset".to_string(),
        request.encode.preset.clone(),
    ];

    if let Some(limit) = request.limit_sec.filter(|l| *l > 0.0) {
        args.push("-to".to_string());
        args.push(format_ffmpeg_time(limit));
    }

    args.push("-y".to_string());
    args.push(OUTPUT_NAME.to_string());
    args
}

/// Maps an engine notification onto the export event stream, scaling
/// encoder progress into `from..=to`
fn map_engine_event(event: EngineEvent, duration_sec: f64, from: u8, to: u8) -> ExportEvent {
    match event {
        EngineEvent::Log(line) => ExportEvent::EngineLog(line),
        EngineEvent::Progress(progress) => {
            let span = f32::from(to.saturating_sub(from));
            let pct = from as f32 + progress.percent_of(duration_sec) / 100.0 * span;
            ExportEvent::Progress(pct.round() as u8)
        }
    }
}

// =============================================================================
// Orchestrator
// =============================================================================

/// Runs exports against a video engine
pub struct ExportOrchestrator {
    engine: Arc<dyn VideoEngine>,
    events: Option<mpsc::Sender<ExportEvent>>,
    keyframe_interval: u64,
    yield_every: u64,
}

impl ExportOrchestrator {
    pub fn new(engine: Arc<dyn VideoEngine>) -> Self {
        Self {
            engine,
            events: None,
            keyframe_interval: DEFAULT_KEYFRAME_INTERVAL,
            yield_every: DEFAULT_YIELD_EVERY,
        }
    }

    /// Sends status and progress notifications to `tx`
    pub fn with_events(mut self, tx: mpsc::Sender<ExportEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn with_keyframe_interval(mut self, frames: u64) -> Self {
        self.keyframe_interval = frames.max(1);
        self
    }

    pub fn with_yield_every(mut self, frames: u64) -> Self {
        self.yield_every = frames.max(1);
        self
    }

    async fn emit(&self, event: ExportEvent) {
        if let Some(tx) = &self.events {
            // A dropped receiver must not abort the export
            let _ = tx.send(event).await;
        }
    }

    async fn status(&self, status: ExportStatus) {
        info!("{}", status);
        self.emit(ExportEvent::Status(status)).await;
    }

    async fn progress(&self, percent: u8) {
        self.emit(ExportEvent::Progress(percent.min(100))).await;
    }

    async fn fail<T>(&self, err: CoreError) -> CoreResult<T> {
        error!("Export failed: {}", err);
        self.emit(ExportEvent::Status(ExportStatus::Failed(err.to_status_message())))
            .await;
        Err(err)
    }

    /// Forwards engine notifications, mapping encoder time onto `from..=to`
    ///
    /// The task runs until `done` fires and every event queued before it has
    /// been forwarded.
    fn forward_engine_events(
        &self,
        duration_sec: f64,
        from: u8,
        to: u8,
    ) -> Option<(oneshot::Sender<()>, JoinHandle<()>)> {
        let tx = self.events.clone()?;
        let mut rx = self.engine.subscribe();
        let (done_tx, mut done_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    // Queued events win over `done`
                    biased;
                    received = rx.recv() => match received {
                        Ok(event) => {
                            let event = map_engine_event(event, duration_sec, from, to);
                            if tx.send(event).await.is_err() {
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            debug!("Dropped {} engine events", skipped);
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                    _ = &mut done_rx => break,
                }
            }
        });

        Some((done_tx, handle))
    }

    async fn exec_with_forwarding(&self, args: &[String], duration_sec: f64, from: u8, to: u8) -> CoreResult<()> {
        let forwarder = self.forward_engine_events(duration_sec, from, to);
        let result = self.engine.exec(args).await;

        if let Some((done, handle)) = forwarder {
            let _ = done.send(());
            let abort = handle.abort_handle();
            if tokio::time::timeout(FORWARD_DRAIN_TIMEOUT, handle).await.is_err() {
                warn!("Engine events still pending after {:?}, dropping them", FORWARD_DRAIN_TIMEOUT);
                abort.abort();
            }
        }

        result.map_err(CoreError::from)
    }

    // -------------------------------------------------------------------------
    // Burn-in Path
    // -------------------------------------------------------------------------

    /// Renders the subtitles into the video with the engine's subtitle filter
    pub async fn burn_in(&self, request: &ExportRequest) -> CoreResult<ExportArtifact> {
        match self.burn_in_inner(request).await {
            Ok(artifact) => Ok(artifact),
            Err(err) => self.fail(err).await,
        }
    }

    async fn burn_in_inner(&self, request: &ExportRequest) -> CoreResult<ExportArtifact> {
        request.check_prerequisites()?;
        self.progress(0).await;

        self.status(ExportStatus::Preparing).await;
        self.engine
            .import_file(&request.input_name(), &request.source)
            .await?;

        let markup = request.dialect.render(&request.segments, &request.style);
        self.engine
            .write_file(request.dialect.file_name(), markup.as_bytes())
            .await?;
        debug!(
            "Wrote {} ({} segments)",
            request.dialect.file_name(),
            request.segments.len()
        );

        self.status(ExportStatus::Encoding).await;
        let args = burn_in_args(request);
        self.exec_with_forwarding(&args, request.output_duration_sec(), 0, 95)
            .await?;

        self.status(ExportStatus::Finalizing).await;
        let bytes = self.engine.read_file(OUTPUT_NAME).await?;

        self.progress(100).await;
        self.status(ExportStatus::Completed).await;

        Ok(ExportArtifact {
            bytes,
            mime: "video/mp4".to_string(),
            file_name: "video_with_subtitles.mp4".to_string(),
        })
    }

    // -------------------------------------------------------------------------
    // Overlay Path
    // -------------------------------------------------------------------------

    /// Draws every frame and encodes the transparent subtitle clip
    ///
    /// Renders up to the output duration, reporting each change of progress
    /// from 0 to 50 and yielding to the scheduler after every batch of frames.
    pub async fn render_clip(
        &self,
        request: &ExportRequest,
        surface: &mut (dyn FrameSurface + Send),
        encoder: &mut dyn FrameEncoder,
    ) -> CoreResult<Vec<u8>> {
        request.check_prerequisites()?;

        if surface.width() != request.video.width || surface.height() != request.video.height {
            warn!(
                "Surface is {}x{} but video is {}x{}",
                surface.width(),
                surface.height(),
                request.video.width,
                request.video.height
            );
        }

        let total_frames = request.video.frames_in(request.output_duration_sec());
        let frame_duration_ms = request.video.frame_duration_ms();
        info!(
            "Rendering {} subtitle frames ({:.2} ms each)",
            total_frames, frame_duration_ms
        );

        let mut last_pct = None;
        for frame_index in 0..total_frames {
            let timestamp_ms = frame_index as f64 * frame_duration_ms;
            let pct = (frame_index as f64 / total_frames as f64 * 50.0).round() as u8;
            if last_pct != Some(pct) {
                self.progress(pct).await;
                last_pct = Some(pct);
            }

            draw_subtitle_frame(
                surface,
                &request.segments,
                &request.style,
                timestamp_ms.floor() as u64,
            );

            let keyframe = frame_index % self.keyframe_interval == 0;
            encoder
                .encode_frame(surface.pixels(), (timestamp_ms * 1000.0).round() as u64, keyframe)
                .await?;

            if frame_index % self.yield_every == 0 {
                tokio::task::yield_now().await;
            }
        }

        let clip = encoder.finish().await?;
        if last_pct != Some(50) {
            self.progress(50).await;
        }
        Ok(clip)
    }

    /// Exports just the transparent subtitle clip
    pub async fn subtitle_clip(
        &self,
        request: &ExportRequest,
        surface: &mut (dyn FrameSurface + Send),
        encoder: &mut dyn FrameEncoder,
    ) -> CoreResult<ExportArtifact> {
        let result = async {
            self.status(ExportStatus::RenderingOverlay).await;
            let bytes = self.render_clip(request, surface, encoder).await?;
            self.progress(100).await;
            self.status(ExportStatus::Completed).await;
            Ok(ExportArtifact {
                bytes,
                mime: encoder.mime_type().to_string(),
                file_name: CLIP_NAME.to_string(),
            })
        }
        .await;

        match result {
            Ok(artifact) => Ok(artifact),
            Err(err) => self.fail(err).await,
        }
    }

    /// Renders the clip and composites it over the source with a colour key
    pub async fn overlay(
        &self,
        request: &ExportRequest,
        surface: &mut (dyn FrameSurface + Send),
        encoder: &mut dyn FrameEncoder,
    ) -> CoreResult<ExportArtifact> {
        match self.overlay_inner(request, surface, encoder).await {
            Ok(artifact) => Ok(artifact),
            Err(err) => self.fail(err).await,
        }
    }

    async fn overlay_inner(
        &self,
        request: &ExportRequest,
        surface: &mut (dyn FrameSurface + Send),
        encoder: &mut dyn FrameEncoder,
    ) -> CoreResult<ExportArtifact> {
        self.status(ExportStatus::RenderingOverlay).await;
        let clip = self.render_clip(request, surface, encoder).await?;

        self.status(ExportStatus::Compositing).await;
        self.engine
            .import_file(&request.input_name(), &request.source)
            .await?;
        self.engine.write_file(CLIP_NAME, &clip).await?;

        let args = overlay_args(request);
        self.exec_with_forwarding(&args, request.output_duration_sec(), 50, 89)
            .await?;
        self.progress(90).await;

        self.status(ExportStatus::Finalizing).await;
        let bytes = self.engine.read_file(OUTPUT_NAME).await?;

        self.progress(100).await;
        self.status(ExportStatus::Completed).await;

        Ok(ExportArtifact {
            bytes,
            mime: "video/mp4".to_string(),
            file_name: "video_with_subtitles.mp4".to_string(),
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
