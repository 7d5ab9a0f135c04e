//! Crop, scale and filter-chain construction
//!
//! Aspect presets are turned into centred crop rectangles; crop, scale and
//! subtitle filters are joined into one `-vf` graph.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{RenderError, RenderResult};
use crate::core::VideoInfo;

// =============================================================================
// Aspect Presets
// =============================================================================

/// Target aspect ratios offered for cropping
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AspectPreset {
    /// Keep the source ratio
    Original,
    Square,
    Vertical,
    Widescreen,
    Standard,
    Portrait,
}

impl AspectPreset {
    pub const ALL: [AspectPreset; 6] = [
        AspectPreset::Original,
        AspectPreset::Square,
        AspectPreset::Vertical,
        AspectPreset::Widescreen,
        AspectPreset::Standard,
        AspectPreset::Portrait,
    ];

    pub fn label(self) -> &'static str {
        match self {
            AspectPreset::Original => "Original",
            AspectPreset::Square => "1:1",
            AspectPreset::Vertical => "9:16",
            AspectPreset::Widescreen => "16:9",
            AspectPreset::Standard => "4:3",
            AspectPreset::Portrait => "3:4",
        }
    }

    /// Width / height for this preset against a given source frame
    pub fn ratio(self, info: &VideoInfo) -> f64 {
        match self {
            AspectPreset::Original => info.aspect_ratio(),
            AspectPreset::Square => 1.0,
            AspectPreset::Vertical => 9.0 / 16.0,
            AspectPreset::Widescreen => 16.0 / 9.0,
            AspectPreset::Standard => 4.0 / 3.0,
            AspectPreset::Portrait => 3.0 / 4.0,
        }
    }
}

impl fmt::Display for AspectPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for AspectPreset {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        AspectPreset::ALL
            .into_iter()
            .find(|preset| preset.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                RenderError::InvalidCrop(format!(
                    "Unknown aspect ratio '{}' (expected one of Original, 1:1, 9:16, 16:9, 4:3, 3:4)",
                    s
                ))
            })
    }
}

// =============================================================================
// Crop Settings
// =============================================================================

/// A crop rectangle in source pixels
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CropSettings {
    pub aspect_ratio_label: String,
    pub width: u32,
    pub height: u32,
    pub x: u32,
    pub y: u32,
}

impl CropSettings {
    /// A manually entered rectangle, checked against the source frame
    pub fn manual(info: &VideoInfo, width: u32, height: u32, x: u32, y: u32) -> RenderResult<Self> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidCrop("crop size must be non-zero".to_string()));
        }
        if x.saturating_add(width) > info.width || y.saturating_add(height) > info.height {
            return Err(RenderError::InvalidCrop(format!(
                "{}x{}+{}+{} exceeds the {}x{} frame",
                width, height, x, y, info.width, info.height
            )));
        }
        Ok(Self {
            aspect_ratio_label: "Custom".to_string(),
            width,
            height,
            x,
            y,
        })
    }

    /// Parses a manual rectangle written as `W:H:X:Y`
    pub fn parse_manual(info: &VideoInfo, value: &str) -> RenderResult<Self> {
        let parts = value
            .split(':')
            .map(|part| part.trim().parse::<u32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| RenderError::InvalidCrop(format!("Invalid crop '{}': {}", value, e)))?;

        match parts.as_slice() {
            [width, height, x, y] => Self::manual(info, *width, *height, *x, *y),
            _ => Err(RenderError::InvalidCrop(format!(
                "Invalid crop '{}': expected W:H:X:Y",
                value
            ))),
        }
    }

    /// `crop=W:H:X:Y`
    pub fn filter_expression(&self) -> String {
        format!("crop={}:{}:{}:{}", self.width, self.height, self.x, self.y)
    }

    /// True when the rectangle covers the whole source frame
    pub fn is_identity(&self, info: &VideoInfo) -> bool {
        self.x == 0 && self.y == 0 && self.width == info.width && self.height == info.height
    }
}

/// Largest centred rectangle of the preset's ratio inside the source frame
///
/// A wider target keeps the width and trims height; otherwise the height is
/// kept and width trimmed. All values are floored.
pub fn calculate_crop(info: &VideoInfo, preset: AspectPreset) -> RenderResult<CropSettings> {
    if preset == AspectPreset::Original {
        if info.width == 0 || info.height == 0 {
            return Err(RenderError::InvalidDimensions {
                width: info.width,
                height: info.height,
            });
        }
        // Exact full frame; the float ratio round trip can lose a pixel
        return Ok(CropSettings {
            aspect_ratio_label: preset.label().to_string(),
            width: info.width,
            height: info.height,
            x: 0,
            y: 0,
        });
    }

    let crop = calculate_crop_for_ratio(info.width, info.height, preset.ratio(info))?;
    Ok(CropSettings {
        aspect_ratio_label: preset.label().to_string(),
        ..crop
    })
}

/// Same as [`calculate_crop`] for an arbitrary width / height ratio
pub fn calculate_crop_for_ratio(width: u32, height: u32, ratio: f64) -> RenderResult<CropSettings> {
    if width == 0 || height == 0 {
        return Err(RenderError::InvalidDimensions { width, height });
    }
    if !ratio.is_finite() || ratio <= 0.0 {
        return Err(RenderError::InvalidCrop(format!("invalid aspect ratio {}", ratio)));
    }

    let original_w = width as f64;
    let original_h = height as f64;
    let current = original_w / original_h;

    let (new_w, new_h) = if ratio > current {
        (original_w, original_w / ratio)
    } else {
        (original_h * ratio, original_h)
    };

    Ok(CropSettings {
        aspect_ratio_label: format!("{:.4}", ratio),
        width: new_w.floor() as u32,
        height: new_h.floor() as u32,
        x: ((original_w - new_w) / 2.0).floor() as u32,
        y: ((original_h - new_h) / 2.0).floor() as u32,
    })
}

// =============================================================================
// Scale Settings
// =============================================================================

/// Output resolution after cropping
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaleSettings {
    pub label: String,
    pub width: u32,
    pub height: u32,
}

impl ScaleSettings {
    pub fn new(label: &str, width: u32, height: u32) -> Self {
        Self {
            label: label.to_string(),
            width,
            height,
        }
    }

    /// 1080x1920 vertical (shorts, reels)
    pub fn vertical_1080() -> Self {
        Self::new("shorts", 1080, 1920)
    }

    /// 1920x1080 landscape
    pub fn landscape_1080p() -> Self {
        Self::new("1080p", 1920, 1080)
    }

    /// 1080x1080 square
    pub fn square_1080() -> Self {
        Self::new("square", 1080, 1080)
    }

    /// Looks up a named preset or parses `WxH`
    pub fn parse(value: &str) -> RenderResult<Self> {
        match value.trim().to_lowercase().as_str() {
            "shorts" | "vertical" | "reels" => Ok(Self::vertical_1080()),
            "1080p" | "landscape" | "youtube" => Ok(Self::landscape_1080p()),
            "square" => Ok(Self::square_1080()),
            other => {
                let (w, h) = other.split_once('x').ok_or_else(|| {
                    RenderError::InvalidCrop(format!("Unknown scale '{}'", value))
                })?;
                let width: u32 = w.trim().parse().map_err(|_| {
                    RenderError::InvalidCrop(format!("Invalid scale width in '{}'", value))
                })?;
                let height: u32 = h.trim().parse().map_err(|_| {
                    RenderError::InvalidCrop(format!("Invalid scale height in '{}'", value))
                })?;
                if width == 0 || height == 0 {
                    return Err(RenderError::InvalidDimensions { width, height });
                }
                Ok(Self::new("custom", width, height))
            }
        }
    }

    /// `scale=W:H`
    pub fn filter_expression(&self) -> String {
        format!("scale={}:{}", self.width, self.height)
    }
}

// =============================================================================
// Filter Chain
// =============================================================================

/// Escapes a value for use inside a filtergraph option
pub fn escape_filter_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | ':' | '\'' | ',' | ';' | '[' | ']') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// An ordered, comma-joined `-vf` filter graph
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterChain {
    filters: Vec<String>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, filter: impl Into<String>) -> Self {
        self.filters.push(filter.into());
        self
    }

    pub fn crop(self, crop: &CropSettings) -> Self {
        self.push(crop.filter_expression())
    }

    pub fn scale(self, scale: &ScaleSettings) -> Self {
        self.push(scale.filter_expression())
    }

    /// `subtitles=<file>[:fontsdir=<dir>]`
    pub fn subtitles(self, file_name: &str, fonts_dir: Option<&str>) -> Self {
        let mut filter = format!("subtitles={}", escape_filter_value(file_name));
        if let Some(dir) = fonts_dir {
            filter.push_str(":fontsdir=");
            filter.push_str(&escape_filter_value(dir));
        }
        self.push(filter)
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// The graph string, `None` when no filter was added
    pub fn build(&self) -> Option<String> {
        (!self.filters.is_empty()).then(|| self.filters.join(","))
    }
}

// =============================================================================
// Tests
// =============================================================================
