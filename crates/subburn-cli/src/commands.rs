//! Command handlers

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context as _, Result};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use subburn_lib::core::captions::audio::{
    extract_audio_for_transcription_async, load_audio_samples, TRANSCRIBE_SAMPLE_RATE,
};
use subburn_lib::core::captions::transcribe::{
    transcribe_to_segments, ModelProgress, RecognizerFactory, TranscribeTask,
};
use subburn_lib::core::captions::whisper::WhisperFactory;
use subburn_lib::core::captions::{export_srt, parse_srt, with_word_timing, AssOptions, KaraokeMode};
use subburn_lib::core::ffmpeg::FfmpegEngine;
use subburn_lib::core::fs::atomic_write_bytes;
use subburn_lib::core::render::{
    calculate_crop, detect_capabilities, CropSettings, ExportArtifact, ExportEvent, ExportOrchestrator,
    ExportRequest, FfmpegFrameEncoder, RasterSurface, ScaleSettings, SubtitleDialect,
};
use subburn_lib::core::session::EditorSession;
use subburn_lib::core::settings::{SettingsManager, StudioSettings};
use subburn_lib::core::style::{ActiveWordStyle, PRESETS};

use crate::{FrameArgs, StyleArgs};

// =============================================================================
// Context
// =============================================================================

/// Settings and engine location shared by every command
pub struct Context {
    pub settings: StudioSettings,
    pub manager: Option<SettingsManager>,
    pub ffmpeg: Option<PathBuf>,
}

impl Context {
    pub fn load(config: Option<&Path>, ffmpeg: Option<PathBuf>) -> Self {
        let manager = match config {
            Some(path) => Some(SettingsManager::new(path.to_path_buf())),
            None => SettingsManager::default_location(),
        };
        let settings = manager
            .as_ref()
            .map(SettingsManager::load)
            .unwrap_or_default();

        Self {
            settings,
            manager,
            ffmpeg,
        }
    }

    fn detect_engine(&self) -> Result<FfmpegEngine> {
        FfmpegEngine::detect(self.ffmpeg.as_deref())
            .map(|engine| engine.with_fallback_fps(self.settings.export.default_fps))
            .context("FFmpeg is required for this command (install it or pass --ffmpeg)")
    }

    fn ass_options(&self) -> AssOptions {
        self.settings.export.ass_options()
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn write_or_print(output: Option<&Path>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Wrote {}", path.display());
        }
        None => print!("{}", content),
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Builds a session from an SRT file and the style arguments
fn session_from(ctx: &Context, srt: &Path, style: &StyleArgs) -> Result<EditorSession> {
    let preset = style
        .preset
        .as_deref()
        .unwrap_or(&ctx.settings.style.default_preset);
    let mut session = EditorSession::new(preset)?;

    session.style_mut().set_font_name(&ctx.settings.export.font_name);
    if let Some(size) = style.font_size {
        session.style_mut().set_font_size(size);
    }
    if let Some(color) = style.color {
        session.style_mut().set_primary_color(color);
    }
    if let Some(color) = style.active_color {
        let active_word = ActiveWordStyle {
            text_style: true,
            text_color: color,
            ..session.style().style().active_word
        };
        session.style_mut().set_active_word(active_word);
    }

    if session.load_srt(&read_text(srt)?) == 0 {
        bail!("No subtitles found in {}", srt.display());
    }
    Ok(session)
}

/// Prints export events to stderr until the sender side is dropped
fn spawn_event_printer() -> (mpsc::Sender<ExportEvent>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<ExportEvent>(256);
    let handle = tokio::spawn(async move {
        let mut last = None;
        while let Some(event) = rx.recv().await {
            match event {
                ExportEvent::Status(status) => eprintln!("{}", status),
                ExportEvent::Progress(pct) if last != Some(pct) => {
                    last = Some(pct);
                    eprintln!("{:>3}%", pct);
                }
                ExportEvent::Progress(_) => {}
                ExportEvent::EngineLog(line) => tracing::debug!("ffmpeg: {}", line),
            }
        }
    });
    (tx, handle)
}

fn save_artifact(artifact: &ExportArtifact, output: &Path) -> Result<()> {
    atomic_write_bytes(output, &artifact.bytes)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!(
        "Saved {} ({} bytes, {})",
        output.display(),
        artifact.bytes.len(),
        artifact.mime
    );
    Ok(())
}

// =============================================================================
// Text Commands
// =============================================================================

pub fn presets() -> Result<()> {
    for preset in PRESETS {
        println!("{:<10} {}", preset.name, preset.description);
    }
    Ok(())
}

pub fn parse(srt: &Path, words: bool) -> Result<()> {
    let mut segments = parse_srt(&read_text(srt)?);
    if words {
        segments = with_word_timing(segments);
    }
    print_json(&segments)
}

pub fn ass(
    ctx: &Context,
    srt: &Path,
    style: &StyleArgs,
    karaoke: Option<u32>,
    no_karaoke: bool,
    output: Option<&Path>,
) -> Result<()> {
    let session = session_from(ctx, srt, style)?;

    let mut options = ctx.ass_options();
    if no_karaoke {
        options.karaoke = KaraokeMode::Off;
    } else if let Some(centiseconds) = karaoke {
        options.karaoke = KaraokeMode::Fixed { centiseconds };
    }

    write_or_print(output, &session.build_ass(options))
}

pub fn srt(srt: &Path, output: Option<&Path>) -> Result<()> {
    let segments = parse_srt(&read_text(srt)?);
    write_or_print(output, &export_srt(&segments))
}

pub fn at(srt: &Path, seconds: f64) -> Result<()> {
    let mut session = EditorSession::default();
    session.load_srt(&read_text(srt)?);
    print_json(&session.sync_at(seconds))
}

// =============================================================================
// Engine Commands
// =============================================================================

pub async fn probe(ctx: &Context, video: &Path) -> Result<()> {
    let engine = ctx.detect_engine()?;
    let info = engine.probe(video).await?;
    print_json(&info)
}

pub async fn burn(
    ctx: &Context,
    video: &Path,
    srt: &Path,
    style: &StyleArgs,
    frame: &FrameArgs,
    simple: bool,
    output: &Path,
) -> Result<()> {
    let engine = Arc::new(ctx.detect_engine()?);
    let info = engine.probe(video).await?;

    let mut session = session_from(ctx, srt, style)?;
    session.set_video(info, video);
    session.set_engine_ready(true);

    let export = &ctx.settings.export;
    let mut request = session.export_request()?;
    request.encode = export.encode_settings();
    request.fonts_dir = export.fonts_dir.clone();
    request.limit_sec = frame.limit;
    request.dialect = if simple {
        SubtitleDialect::Simple
    } else {
        SubtitleDialect::Styled(ctx.ass_options())
    };
    if let Some(aspect) = frame.aspect {
        request.crop = Some(calculate_crop(&request.video, aspect)?);
    }
    if let Some(rect) = &frame.crop {
        request.crop = Some(CropSettings::parse_manual(&request.video, rect)?);
    }
    if let Some(scale) = &frame.scale {
        request.scale = Some(ScaleSettings::parse(scale)?);
    }

    let (tx, printer) = spawn_event_printer();
    let orchestrator = ExportOrchestrator::new(engine).with_events(tx);
    let result = orchestrator.burn_in(&request).await;
    drop(orchestrator);
    let _ = printer.await;

    save_artifact(&result?, output)
}

#[allow(clippy::too_many_arguments)]
pub async fn overlay(
    ctx: &Context,
    video: &Path,
    srt: &Path,
    font: &Path,
    style: &StyleArgs,
    limit: Option<f64>,
    clip_only: bool,
    output: Option<&Path>,
) -> Result<()> {
    let caps = detect_capabilities(ctx.ffmpeg.as_deref());
    if !caps.overlay {
        bail!("Overlay export is not supported here: FFmpeg with libvpx-vp9 is required (try `burn` instead)");
    }

    let engine = Arc::new(ctx.detect_engine()?);
    let info = engine.probe(video).await?;

    let mut session = session_from(ctx, srt, style)?;
    session.set_video(info, video);
    session.set_engine_ready(true);

    let export = &ctx.settings.export;
    let mut request: ExportRequest = session.export_request()?;
    request.encode = export.encode_settings();
    request.limit_sec = limit;

    let video_info = request.video.clone();
    let mut surface = RasterSurface::from_font_file(video_info.width, video_info.height, font)?;
    let mut encoder = FfmpegFrameEncoder::spawn(
        &engine.info().ffmpeg_path,
        video_info.width,
        video_info.height,
        video_info.fps,
        export.keyframe_interval,
    )?;

    let (tx, printer) = spawn_event_printer();
    let orchestrator = ExportOrchestrator::new(engine)
        .with_events(tx)
        .with_keyframe_interval(export.keyframe_interval)
        .with_yield_every(export.yield_every);

    let result = if clip_only {
        orchestrator
            .subtitle_clip(&request, &mut surface, &mut encoder)
            .await
    } else {
        orchestrator
            .overlay(&request, &mut surface, &mut encoder)
            .await
    };
    drop(orchestrator);
    let _ = printer.await;

    let artifact = result?;
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&artifact.file_name));
    save_artifact(&artifact, &output)
}

pub async fn transcribe(
    ctx: &Context,
    media: &Path,
    model: Option<&str>,
    language: Option<&str>,
    translate: bool,
    text: bool,
    output: Option<&Path>,
) -> Result<()> {
    let settings = &ctx.settings.transcription;

    let mut config = settings.recognizer_config();
    if let Some(model) = model {
        config.model_id = model.to_string();
    }

    let mut options = settings.transcribe_options();
    match language {
        Some(lang) if lang.eq_ignore_ascii_case("auto") => options.language = None,
        Some(lang) => options.language = Some(lang.to_string()),
        None => {}
    }
    if translate {
        options.task = TranscribeTask::Translate;
    }

    let factory = match &settings.model_dir {
        Some(dir) => WhisperFactory::with_model_dir(Path::new(dir)),
        None => WhisperFactory::new(),
    };

    let (progress_tx, mut progress_rx) = mpsc::unbounded_channel::<ModelProgress>();
    let progress_printer = tokio::spawn(async move {
        while let Some(progress) = progress_rx.recv().await {
            eprintln!("Model {:?}: {}%", progress.status, progress.percent());
        }
    });
    let recognizer = factory.load(&config, Some(progress_tx)).await;
    let _ = progress_printer.await;
    let recognizer = recognizer?;

    let workdir = tempfile::Builder::new().prefix("subburn-audio-").tempdir()?;
    let wav_path = workdir.path().join("audio.wav");
    eprintln!("Extracting audio...");
    extract_audio_for_transcription_async(media, &wav_path, ctx.ffmpeg.as_deref()).await?;
    let samples = load_audio_samples(&wav_path)?;

    eprintln!("Transcribing {:.1}s of audio...", samples.len() as f64 / f64::from(TRANSCRIBE_SAMPLE_RATE));
    let segments = transcribe_to_segments(recognizer.as_ref(), &samples, &options).await?;
    if segments.is_empty() {
        warn!("No speech recognized in {}", media.display());
    }

    let mut session = EditorSession::default();
    session.set_segments(segments);
    if text {
        return write_or_print(output, &format!("{}\n", session.track().full_text()));
    }
    write_or_print(output, &session.build_srt())
}

// =============================================================================
// Settings
// =============================================================================

pub fn config(ctx: &Context, show: bool, reset: bool) -> Result<()> {
    let Some(manager) = &ctx.manager else {
        bail!("No config directory available; pass --config <path>");
    };

    if reset {
        manager.reset()?;
        println!("Settings reset ({})", manager.settings_path().display());
        return Ok(());
    }

    if !show {
        println!("{}", manager.settings_path().display());
    }
    print_json(&ctx.settings)
}
