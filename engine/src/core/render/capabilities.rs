//! Export capability detection
//!
//! Burn-in needs a working FFmpeg; the overlay path additionally needs an
//! encoder that keeps an alpha channel.

use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

use super::encoder::ALPHA_CLIP_ENCODER;
use crate::core::ffmpeg::{detect_ffmpeg, list_encoders, EngineInfo};

/// Export paths available in the current environment
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportCapabilities {
    pub burn_in: bool,
    pub overlay: bool,
    /// Engine version, when one was found
    pub engine_version: Option<String>,
}

impl ExportCapabilities {
    /// Capabilities given a detected engine and its encoder names
    pub fn from_encoders(info: &EngineInfo, encoders: &[String]) -> Self {
        Self {
            burn_in: true,
            overlay: encoders.iter().any(|e| e == ALPHA_CLIP_ENCODER),
            engine_version: Some(info.version.clone()),
        }
    }

    /// True when at least one export path works
    pub fn any(&self) -> bool {
        self.burn_in || self.overlay
    }
}

/// Probes FFmpeg (explicit path first) and its encoder list
pub fn detect_capabilities(explicit: Option<&Path>) -> ExportCapabilities {
    let info = match detect_ffmpeg(explicit) {
        Ok(info) => info,
        Err(e) => {
            warn!("No video engine available: {}", e);
            return ExportCapabilities::default();
        }
    };

    let encoders = match list_encoders(&info.ffmpeg_path) {
        Ok(encoders) => encoders,
        Err(e) => {
            warn!("Failed to list encoders: {}", e);
            Vec::new()
        }
    };

    let caps = ExportCapabilities::from_encoders(&info, &encoders);
    info!(
        "Export capabilities: burn-in={}, overlay={} (FFmpeg {})",
        caps.burn_in, caps.overlay, info.version
    );
    caps
}
