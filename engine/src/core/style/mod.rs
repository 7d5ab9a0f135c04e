//! Subtitle Style Module
//!
//! The visual attributes applied to every subtitle line, the preset table
//! and the controller that owns the active selection.
//!
//! Colours are carried as `#RRGGBB` and converted to the styled dialect's
//! blue-green-red notation only at the markup boundary.

mod controller;
mod presets;

pub use controller::StyleController;
pub use presets::{find_preset, preset_names, StylePreset, DEFAULT_PRESET, PRESETS};

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::CoreError;

// =============================================================================
// Hex Color
// =============================================================================

/// A 24-bit RGB colour written as `#RRGGBB`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HexColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl HexColor {
    pub const WHITE: HexColor = HexColor::rgb(0xFF, 0xFF, 0xFF);
    pub const BLACK: HexColor = HexColor::rgb(0x00, 0x00, 0x00);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parses `#RRGGBB` (the leading `#` is optional, digits are case-insensitive)
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        let trimmed = value.trim();
        let hex = trimmed.strip_prefix('#').unwrap_or(trimmed);

        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(CoreError::ValidationError(format!(
                "Invalid colour '{}': expected #RRGGBB",
                value
            )));
        }

        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16)
                .map_err(|e| CoreError::ValidationError(format!("Invalid colour '{}': {}", value, e)))
        };

        Ok(Self {
            r: channel(0..2)?,
            g: channel(2..4)?,
            b: channel(4..6)?,
        })
    }

    /// Styled-dialect colour literal: `#RRGGBB` becomes `&HBBGGRR&`
    pub fn to_ass(&self) -> String {
        format!("&H{:02X}{:02X}{:02X}&", self.b, self.g, self.r)
    }

    /// Colour literal followed by the opacity byte as two lowercase hex digits
    ///
    /// `#000000` at 0.5 yields `&H000000&80`. Opacity outside `0..=1` is
    /// clamped here since the field is a single byte.
    pub fn to_ass_with_alpha(&self, opacity: f64) -> String {
        format!("{}{:02x}", self.to_ass(), opacity_byte(opacity))
    }

    /// RGBA quadruple for raster drawing
    pub fn to_rgba(&self, opacity: f64) -> [u8; 4] {
        [self.r, self.g, self.b, opacity_byte(opacity)]
    }
}

/// `round(clamp(opacity, 0, 1) * 255)`; NaN maps to fully transparent
pub fn opacity_byte(opacity: f64) -> u8 {
    if opacity.is_nan() {
        return 0;
    }
    (opacity.clamp(0.0, 1.0) * 255.0).round() as u8
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl std::str::FromStr for HexColor {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for HexColor {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<HexColor> for String {
    fn from(color: HexColor) -> Self {
        color.to_string()
    }
}

// =============================================================================
// Border Style
// =============================================================================

/// How the text outline and background are drawn
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum BorderStyle {
    /// Outline plus drop shadow
    #[default]
    Outline = 1,
    /// Opaque box behind the text
    OpaqueBox = 3,
    /// Outline with shadow emphasis (preview only distinguishes it)
    Shadow = 4,
}

impl BorderStyle {
    pub fn code(self) -> u8 {
        self as u8
    }

    /// True for styles that stroke the glyph outline
    pub fn strokes_text(self) -> bool {
        matches!(self, BorderStyle::Outline | BorderStyle::Shadow)
    }
}

impl TryFrom<u8> for BorderStyle {
    type Error = CoreError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(BorderStyle::Outline),
            3 => Ok(BorderStyle::OpaqueBox),
            4 => Ok(BorderStyle::Shadow),
            other => Err(CoreError::ValidationError(format!(
                "Invalid border style code {} (expected 1, 3 or 4)",
                other
            ))),
        }
    }
}

impl From<BorderStyle> for u8 {
    fn from(style: BorderStyle) -> Self {
        style.code()
    }
}

// =============================================================================
// Alignment
// =============================================================================

/// Anchor position on the 3x3 numpad grid (1 = bottom-left, 9 = top-right)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Alignment {
    BottomLeft = 1,
    #[default]
    BottomCenter = 2,
    BottomRight = 3,
    MiddleLeft = 4,
    MiddleCenter = 5,
    MiddleRight = 6,
    TopLeft = 7,
    TopCenter = 8,
    TopRight = 9,
}

impl Alignment {
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Alignment {
    type Error = CoreError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Ok(match code {
            1 => Alignment::BottomLeft,
            2 => Alignment::BottomCenter,
            3 => Alignment::BottomRight,
            4 => Alignment::MiddleLeft,
            5 => Alignment::MiddleCenter,
            6 => Alignment::MiddleRight,
            7 => Alignment::TopLeft,
            8 => Alignment::TopCenter,
            9 => Alignment::TopRight,
            other => {
                return Err(CoreError::ValidationError(format!(
                    "Invalid alignment code {} (expected 1..=9)",
                    other
                )))
            }
        })
    }
}

impl From<Alignment> for u8 {
    fn from(alignment: Alignment) -> Self {
        alignment.code()
    }
}

// =============================================================================
// Active Word Style
// =============================================================================

/// Emphasis for the word being spoken when lines are drawn word by word
///
/// Only the frame renderer reads these; the markup dialects style whole lines.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ActiveWordStyle {
    /// Fill a box behind the active word
    pub background: bool,
    pub background_color: HexColor,
    /// Recolour and stroke the active word
    pub text_style: bool,
    pub text_color: HexColor,
    pub stroke_width: f64,
    pub stroke_color: HexColor,
}

impl Default for ActiveWordStyle {
    fn default() -> Self {
        Self {
            background: false,
            background_color: HexColor::rgb(0x00, 0x00, 0xFF),
            text_style: false,
            text_color: HexColor::rgb(0xFF, 0xD7, 0x00),
            stroke_width: 3.0,
            stroke_color: HexColor::rgb(0xFF, 0x00, 0x00),
        }
    }
}

// =============================================================================
// Subtitle Style
// =============================================================================

/// Visual attributes applied uniformly to every subtitle line
///
/// Numeric attributes are stored as given; range handling happens where a
/// value is turned into a byte or a pixel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtitleStyle {
    pub font_name: String,
    pub font_size: f64,
    pub primary_color: HexColor,
    pub outline_color: HexColor,
    pub background_color: HexColor,
    pub background_opacity: f64,
    pub margin_l: f64,
    pub margin_r: f64,
    pub margin_v: f64,
    pub outline_width: f64,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strike_out: bool,
    pub scale_x: f64,
    pub scale_y: f64,
    pub spacing: f64,
    pub angle: f64,
    pub border_style: BorderStyle,
    pub shadow: f64,
    pub alignment: Alignment,
    #[serde(default)]
    pub active_word: ActiveWordStyle,
}

impl Default for SubtitleStyle {
    fn default() -> Self {
        find_preset(DEFAULT_PRESET)
            .map(|preset| preset.style())
            .unwrap_or_else(|_| presets::tiktok())
    }
}

/// Formats a flag as the dialect's `0`/`1`
pub(crate) fn flag(value: bool) -> u8 {
    u8::from(value)
}

// =============================================================================
// Tests
// =============================================================================
