//! Render Pipeline Module
//!
//! Turns the edited subtitle track into video output.
//!
//! # Modules
//!
//! - `crop`: aspect presets, crop/scale settings and `-vf` filter chains
//! - `frames`: drawing one subtitle frame onto a [`FrameSurface`]
//! - `raster`: fontdue-backed software surface
//! - `encoder`: transparent-clip encoding through an FFmpeg subprocess
//! - `export`: the export orchestrator (burn-in and overlay paths)
//! - `capabilities`: which export paths the environment supports

pub mod capabilities;
mod crop;
pub mod encoder;
mod export;
pub mod frames;
pub mod raster;

pub use capabilities::{detect_capabilities, ExportCapabilities};
pub use crop::{
    calculate_crop, calculate_crop_for_ratio, escape_filter_value, AspectPreset, CropSettings,
    FilterChain, ScaleSettings,
};
pub use encoder::{FfmpegFrameEncoder, FrameEncoder};
pub use export::*;
pub use frames::{draw_subtitle_frame, FontSpec, FrameSurface, ShadowSpec};
pub use raster::RasterSurface;

/// Rendering error types
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Failed to load font: {0}")]
    FontLoad(String),

    #[error("Invalid frame dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Invalid crop: {0}")]
    InvalidCrop(String),

    #[error("Frame encoder failed: {0}")]
    EncoderFailed(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type RenderResult<T> = Result<T, RenderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_error_display() {
        let err = RenderError::InvalidDimensions {
            width: 0,
            height: 720,
        };
        assert_eq!(err.to_string(), "Invalid frame dimensions: 0x720");
    }
}
