//! subburn command-line front end
//!
//! Parses, styles, previews and burns subtitles from the terminal. Every
//! command is a thin wrapper over `subburn_lib`.

mod commands;

use std::path::PathBuf;
use std::sync::OnceLock;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use subburn_lib::core::render::AspectPreset;
use subburn_lib::core::style::HexColor;
use tracing_subscriber::prelude::*;

static LOG_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "subburn", author, version, about = "Style, preview and burn subtitles into video")]
struct Cli {
    /// Settings file (defaults to the per-user config location)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Explicit ffmpeg binary; ffprobe is expected next to it
    #[arg(long, global = true)]
    ffmpeg: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Also write daily rolling log files into this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the built-in style presets
    Presets,
    /// Parse an SRT file and print its segments as JSON
    Parse {
        srt: PathBuf,
        /// Include interpolated word timing
        #[arg(long)]
        words: bool,
    },
    /// Generate a styled ASS document from an SRT file
    Ass {
        srt: PathBuf,
        #[command(flatten)]
        style: StyleArgs,
        /// Karaoke tag duration in centiseconds
        #[arg(long, conflicts_with = "no_karaoke")]
        karaoke: Option<u32>,
        /// Emit plain dialogue text without karaoke tags
        #[arg(long)]
        no_karaoke: bool,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Re-export an SRT file in normalized form
    Srt {
        srt: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show the active subtitle and word at a playback time
    At {
        srt: PathBuf,
        /// Playback position in seconds
        seconds: f64,
    },
    /// Print stream information of a video
    Probe { video: PathBuf },
    /// Burn subtitles into a video with the engine's subtitle filter
    Burn {
        video: PathBuf,
        srt: PathBuf,
        #[command(flatten)]
        style: StyleArgs,
        #[command(flatten)]
        frame: FrameArgs,
        /// Hand the engine plain SRT instead of styled ASS
        #[arg(long)]
        simple: bool,
        #[arg(short, long, default_value = "video_with_subtitles.mp4")]
        output: PathBuf,
    },
    /// Render subtitles frame by frame and composite them over a video
    Overlay {
        video: PathBuf,
        srt: PathBuf,
        /// TrueType/OpenType font used to draw the text
        #[arg(long)]
        font: PathBuf,
        #[command(flatten)]
        style: StyleArgs,
        /// Stop the output at this many seconds
        #[arg(long)]
        limit: Option<f64>,
        /// Export only the transparent subtitle clip
        #[arg(long)]
        clip_only: bool,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Transcribe speech in a media file into SRT
    Transcribe {
        media: PathBuf,
        /// Model file (or id resolved against the configured model dir)
        #[arg(long)]
        model: Option<String>,
        /// Spoken language, "auto" to detect
        #[arg(long)]
        language: Option<String>,
        /// Translate into English instead of transcribing
        #[arg(long)]
        translate: bool,
        /// Write the plain transcript instead of SRT
        #[arg(long)]
        text: bool,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show or reset the settings file
    Config {
        #[arg(long, conflicts_with = "reset")]
        show: bool,
        #[arg(long)]
        reset: bool,
    },
}

/// Style overrides on top of a preset
#[derive(Args, Debug, Clone, Default)]
struct StyleArgs {
    /// Preset name (tiktok, classic, boxed, highlight)
    #[arg(long)]
    preset: Option<String>,
    #[arg(long)]
    font_size: Option<f64>,
    /// Primary text colour as #RRGGBB
    #[arg(long)]
    color: Option<HexColor>,
    /// Recolour the word being spoken in overlay frames (#RRGGBB)
    #[arg(long)]
    active_color: Option<HexColor>,
}

/// Crop, scale and duration of the output
#[derive(Args, Debug, Clone, Default)]
struct FrameArgs {
    /// Target aspect ratio (Original, 1:1, 9:16, 16:9, 4:3, 3:4)
    #[arg(long)]
    aspect: Option<AspectPreset>,
    /// Manual crop rectangle as W:H:X:Y
    #[arg(long, conflicts_with = "aspect")]
    crop: Option<String>,
    /// Output size: shorts, 1080p, square or WxH
    #[arg(long)]
    scale: Option<String>,
    /// Stop the output at this many seconds
    #[arg(long)]
    limit: Option<f64>,
}

fn init_logging(verbose: bool, log_dir: Option<&PathBuf>) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let file_layer = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let file_appender = tracing_appender::rolling::daily(dir, "subburn.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let _ = LOG_GUARD.set(guard);
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(non_blocking)
                    .with_ansi(false),
            )
        }
        None => None,
    };

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer);

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_dir.as_ref())?;

    let ctx = commands::Context::load(cli.config.as_deref(), cli.ffmpeg.clone());

    match cli.command {
        Command::Presets => commands::presets(),
        Command::Parse { srt, words } => commands::parse(&srt, words),
        Command::Ass {
            srt,
            style,
            karaoke,
            no_karaoke,
            output,
        } => commands::ass(&ctx, &srt, &style, karaoke, no_karaoke, output.as_deref()),
        Command::Srt { srt, output } => commands::srt(&srt, output.as_deref()),
        Command::At { srt, seconds } => commands::at(&srt, seconds),
        Command::Probe { video } => commands::probe(&ctx, &video).await,
        Command::Burn {
            video,
            srt,
            style,
            frame,
            simple,
            output,
        } => commands::burn(&ctx, &video, &srt, &style, &frame, simple, &output).await,
        Command::Overlay {
            video,
            srt,
            font,
            style,
            limit,
            clip_only,
            output,
        } => {
            commands::overlay(
                &ctx,
                &video,
                &srt,
                &font,
                &style,
                limit,
                clip_only,
                output.as_deref(),
            )
            .await
        }
        Command::Transcribe {
            media,
            model,
            language,
            translate,
            text,
            output,
        } => {
            commands::transcribe(
                &ctx,
                &media,
                model.as_deref(),
                language.as_deref(),
                translate,
                text,
                output.as_deref(),
            )
            .await
        }
        Command::Config { show, reset } => commands::config(&ctx, show, reset),
    }
}
