//! Settings Persistence System
//!
//! Provides persistent studio settings with:
//! - Atomic file writes (temp file + rename)
//! - Tolerant normalization with defaults
//! - Schema version for future migrations
//!
//! Storage location: {config_dir}/subburn/settings.json

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::core::captions::transcribe::{
    RecognizerConfig, TranscribeOptions, TranscribeTask, DEFAULT_CHUNK_LENGTH_S,
    DEFAULT_MODEL_ID, DEFAULT_RECOGNIZER_TASK, DEFAULT_STRIDE_LENGTH_S,
};
use crate::core::captions::{AssOptions, KaraokeMode, DEFAULT_KARAOKE_CS, DEFAULT_PLAY_RES};
use crate::core::fs::atomic_write_json_pretty;
use crate::core::render::{EncodeSettings, DEFAULT_KEYFRAME_INTERVAL, DEFAULT_YIELD_EVERY};
use crate::core::style::{find_preset, DEFAULT_PRESET};
use crate::core::{CoreResult, DEFAULT_FPS};

/// Settings schema version for migration support
pub const SETTINGS_VERSION: u32 = 1;

/// Settings file name
pub const SETTINGS_FILE: &str = "settings.json";

/// Application directory name under the user config dir
pub const APP_DIR_NAME: &str = "subburn";

/// Studio settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StudioSettings {
    /// Schema version for migrations
    #[serde(default = "default_version")]
    pub version: u32,

    /// Export settings
    #[serde(default)]
    pub export: ExportSettings,

    /// Transcription settings
    #[serde(default)]
    pub transcription: TranscriptionSettings,

    /// Style settings
    #[serde(default)]
    pub style: StyleSettings,
}

fn default_version() -> u32 {
    SETTINGS_VERSION
}

impl Default for StudioSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            export: ExportSettings::default(),
            transcription: TranscriptionSettings::default(),
            style: StyleSettings::default(),
        }
    }
}

impl StudioSettings {
    /// Normalizes and clamps settings so persisted state is always valid.
    ///
    /// Bad values are corrected instead of failing, so old or hand-edited
    /// files still load.
    pub fn normalize(&mut self) {
        self.version = SETTINGS_VERSION;

        let export = &mut self.export;
        export.video_codec = normalize_enum(
            &export.video_codec,
            &["libx264", "libx265", "libvpx-vp9"],
            default_video_codec(),
        );
        export.preset = normalize_enum(
            &export.preset,
            &[
                "ultrafast", "superfast", "veryfast", "faster", "fast", "medium", "slow",
                "slower", "veryslow",
            ],
            default_encoder_preset(),
        );
        export.crf = export.crf.clamp(0, 51);
        if export.font_name.trim().is_empty() {
            export.font_name = default_font_name();
        }
        if export.fonts_dir.as_deref().is_some_and(|d| d.trim().is_empty()) {
            export.fonts_dir = None;
        }
        export.play_res_x = export.play_res_x.clamp(16, 7680);
        export.play_res_y = export.play_res_y.clamp(16, 4320);
        // 0 disables karaoke tags.
        export.karaoke_cs = export.karaoke_cs.min(1000);
        export.keyframe_interval = export.keyframe_interval.clamp(1, 1000);
        export.yield_every = export.yield_every.clamp(1, 1000);
        export.default_fps = clamp_f64(export.default_fps, 1.0, 240.0);

        let transcription = &mut self.transcription;
        if transcription.model_id.trim().is_empty() {
            transcription.model_id = DEFAULT_MODEL_ID.to_string();
        }
        transcription.chunk_length_s = clamp_f64(transcription.chunk_length_s, 1.0, 30.0);
        transcription.stride_length_s = clamp_f64(
            transcription.stride_length_s,
            0.0,
            transcription.chunk_length_s / 2.0,
        );
        transcription.task = normalize_enum(
            &transcription.task,
            &["transcribe", "translate"],
            default_task(),
        );
        if transcription
            .language
            .as_deref()
            .is_some_and(|l| l.trim().is_empty())
        {
            transcription.language = None;
        }

        if find_preset(&self.style.default_preset).is_err() {
            self.style.default_preset = DEFAULT_PRESET.to_string();
        }
    }
}

fn clamp_f64(value: f64, min: f64, max: f64) -> f64 {
    if !value.is_finite() {
        return min;
    }
    value.clamp(min, max)
}

fn normalize_enum(value: &str, allowed: &[&str], fallback: String) -> String {
    if allowed.iter().any(|v| v.eq_ignore_ascii_case(value)) {
        value.to_ascii_lowercase()
    } else {
        fallback
    }
}

// =============================================================================
// Export
// =============================================================================

/// Export settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExportSettings {
    #[serde(default = "default_video_codec")]
    pub video_codec: String,

    /// Encoder speed preset
    #[serde(default = "default_encoder_preset")]
    pub preset: String,

    #[serde(default = "default_crf")]
    pub crf: u8,

    /// Font used when rendering subtitles
    #[serde(default = "default_font_name")]
    pub font_name: String,

    /// Directory searched for fonts by the subtitles filter
    #[serde(default)]
    pub fonts_dir: Option<String>,

    #[serde(default = "default_play_res_x")]
    pub play_res_x: u32,

    #[serde(default = "default_play_res_y")]
    pub play_res_y: u32,

    /// Karaoke tag duration in centiseconds (0 = off)
    #[serde(default = "default_karaoke_cs")]
    pub karaoke_cs: u32,

    /// Frames between keyframes of the overlay clip
    #[serde(default = "default_keyframe_interval")]
    pub keyframe_interval: u64,

    /// Frames rendered between scheduler yields
    #[serde(default = "default_yield_every")]
    pub yield_every: u64,

    /// Frame rate assumed when the source reports none
    #[serde(default = "default_fps")]
    pub default_fps: f64,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            video_codec: default_video_codec(),
            preset: default_encoder_preset(),
            crf: default_crf(),
            font_name: default_font_name(),
            fonts_dir: None,
            play_res_x: default_play_res_x(),
            play_res_y: default_play_res_y(),
            karaoke_cs: default_karaoke_cs(),
            keyframe_interval: default_keyframe_interval(),
            yield_every: default_yield_every(),
            default_fps: default_fps(),
        }
    }
}

impl ExportSettings {
    pub fn encode_settings(&self) -> EncodeSettings {
        EncodeSettings {
            video_codec: self.video_codec.clone(),
            preset: self.preset.clone(),
            crf: self.crf,
        }
    }

    pub fn ass_options(&self) -> AssOptions {
        let karaoke = if self.karaoke_cs == 0 {
            KaraokeMode::Off
        } else {
            KaraokeMode::Fixed {
                centiseconds: self.karaoke_cs,
            }
        };
        AssOptions {
            play_res_x: self.play_res_x,
            play_res_y: self.play_res_y,
            karaoke,
        }
    }
}

fn default_video_codec() -> String {
    "libx264".to_string()
}

fn default_encoder_preset() -> String {
    "fast".to_string()
}

fn default_crf() -> u8 {
    22
}

fn default_font_name() -> String {
    "Roboto Bold".to_string()
}

fn default_play_res_x() -> u32 {
    DEFAULT_PLAY_RES.0
}

fn default_play_res_y() -> u32 {
    DEFAULT_PLAY_RES.1
}

fn default_karaoke_cs() -> u32 {
    DEFAULT_KARAOKE_CS
}

fn default_keyframe_interval() -> u64 {
    DEFAULT_KEYFRAME_INTERVAL
}

fn default_yield_every() -> u64 {
    DEFAULT_YIELD_EVERY
}

fn default_fps() -> f64 {
    DEFAULT_FPS
}

// =============================================================================
// Transcription
// =============================================================================

/// Transcription settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptionSettings {
    /// Model identifier or path to a local model file
    #[serde(default = "default_model_id")]
    pub model_id: String,

    /// Directory holding downloaded model files
    #[serde(default)]
    pub model_dir: Option<String>,

    #[serde(default = "default_true")]
    pub quantized: bool,

    #[serde(default = "default_chunk_length")]
    pub chunk_length_s: f64,

    #[serde(default = "default_stride_length")]
    pub stride_length_s: f64,

    /// Spoken language, `None` for auto-detection
    #[serde(default = "default_language")]
    pub language: Option<String>,

    /// "transcribe" or "translate"
    #[serde(default = "default_task")]
    pub task: String,
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            model_id: default_model_id(),
            model_dir: None,
            quantized: true,
            chunk_length_s: default_chunk_length(),
            stride_length_s: default_stride_length(),
            language: default_language(),
            task: default_task(),
        }
    }
}

impl TranscriptionSettings {
    pub fn recognizer_config(&self) -> RecognizerConfig {
        RecognizerConfig {
            task: DEFAULT_RECOGNIZER_TASK.to_string(),
            model_id: self.model_id.clone(),
            quantized: self.quantized,
            chunk_length_s: self.chunk_length_s,
            stride_length_s: self.stride_length_s,
        }
    }

    pub fn transcribe_options(&self) -> TranscribeOptions {
        TranscribeOptions {
            language: self.language.clone(),
            task: self.task.parse().unwrap_or(TranscribeTask::Transcribe),
            chunk_length_s: self.chunk_length_s,
            stride_length_s: self.stride_length_s,
            return_timestamps: true,
        }
    }
}

fn default_model_id() -> String {
    DEFAULT_MODEL_ID.to_string()
}

fn default_true() -> bool {
    true
}

fn default_chunk_length() -> f64 {
    DEFAULT_CHUNK_LENGTH_S
}

fn default_stride_length() -> f64 {
    DEFAULT_STRIDE_LENGTH_S
}

fn default_language() -> Option<String> {
    Some("english".to_string())
}

fn default_task() -> String {
    "transcribe".to_string()
}

// =============================================================================
// Style
// =============================================================================

/// Style settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StyleSettings {
    /// Preset applied to new sessions
    #[serde(default = "default_preset")]
    pub default_preset: String,
}

impl Default for StyleSettings {
    fn default() -> Self {
        Self {
            default_preset: default_preset(),
        }
    }
}

fn default_preset() -> String {
    DEFAULT_PRESET.to_string()
}

// =============================================================================
// Manager
// =============================================================================

/// Settings manager for loading, saving, and resetting settings
pub struct SettingsManager {
    settings_path: PathBuf,
}

impl SettingsManager {
    /// Create a settings manager for an explicit file path
    pub fn new(settings_path: PathBuf) -> Self {
        Self { settings_path }
    }

    /// Settings manager at the default per-user location
    pub fn default_location() -> Option<Self> {
        default_settings_path().map(Self::new)
    }

    /// Get the settings file path
    pub fn settings_path(&self) -> &Path {
        &self.settings_path
    }

    /// Load settings from disk, returning defaults if the file is missing or unreadable
    pub fn load(&self) -> StudioSettings {
        if !self.settings_path.exists() {
            info!("Settings file not found, using defaults");
            return StudioSettings::default();
        }

        let parsed = fs::read_to_string(&self.settings_path)
            .map_err(|e| format!("Failed to read settings file: {}", e))
            .and_then(|content| {
                serde_json::from_str::<StudioSettings>(&content)
                    .map_err(|e| format!("Failed to parse settings file: {}", e))
            });

        match parsed {
            Ok(mut settings) => {
                if settings.version < SETTINGS_VERSION {
                    info!(
                        "Migrating settings from version {} to {}",
                        settings.version, SETTINGS_VERSION
                    );
                }
                settings.normalize();
                settings
            }
            Err(e) => {
                warn!("Failed to load settings, using defaults: {}", e);
                StudioSettings::default()
            }
        }
    }

    /// Normalizes and saves settings atomically, returning what was written
    pub fn save(&self, settings: &StudioSettings) -> CoreResult<StudioSettings> {
        let mut normalized = settings.clone();
        normalized.normalize();

        atomic_write_json_pretty(&self.settings_path, &normalized)?;
        info!("Settings saved to {:?}", self.settings_path);
        Ok(normalized)
    }

    /// Reset settings to defaults and delete the settings file
    pub fn reset(&self) -> CoreResult<StudioSettings> {
        if self.settings_path.exists() {
            fs::remove_file(&self.settings_path)?;
            info!("Settings file deleted");
        }
        Ok(StudioSettings::default())
    }
}

/// `{config_dir}/subburn/settings.json`, when the platform has a config dir
pub fn default_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME).join(SETTINGS_FILE))
}
