//! Style Presets
//!
//! Named, fully specified styles. Applying a preset overwrites every
//! attribute of the current style.

use super::{ActiveWordStyle, Alignment, BorderStyle, HexColor, SubtitleStyle};
use crate::core::{CoreError, CoreResult};

/// Preset selected when nothing else is configured
pub const DEFAULT_PRESET: &str = "tiktok";

/// A named style preset
#[derive(Debug)]
pub struct StylePreset {
    pub name: &'static str,
    pub description: &'static str,
    build: fn() -> SubtitleStyle,
}

impl StylePreset {
    /// Builds a fresh copy of the preset's style
    pub fn style(&self) -> SubtitleStyle {
        (self.build)()
    }
}

/// All known presets, in display order
pub static PRESETS: &[StylePreset] = &[
    StylePreset {
        name: "tiktok",
        description: "White text, thin black outline, bottom centre",
        build: tiktok,
    },
    StylePreset {
        name: "classic",
        description: "Larger white text with a heavy black outline",
        build: classic,
    },
    StylePreset {
        name: "boxed",
        description: "White text on a translucent black box",
        build: boxed,
    },
    StylePreset {
        name: "highlight",
        description: "Bold yellow text with outline and drop shadow",
        build: highlight,
    },
];

/// Finds a preset by name (case-insensitive)
pub fn find_preset(name: &str) -> CoreResult<&'static StylePreset> {
    let wanted = name.trim();
    PRESETS
        .iter()
        .find(|preset| preset.name.eq_ignore_ascii_case(wanted))
        .ok_or_else(|| CoreError::UnknownPreset(name.to_string()))
}

/// Names of all known presets
pub fn preset_names() -> Vec<&'static str> {
    PRESETS.iter().map(|preset| preset.name).collect()
}

// =============================================================================
// Preset Definitions
// =============================================================================

pub(super) fn tiktok() -> SubtitleStyle {
    SubtitleStyle {
        font_name: "Roboto Bold".to_string(),
        font_size: 14.0,
        primary_color: HexColor::WHITE,
        outline_color: HexColor::BLACK,
        background_color: HexColor::BLACK,
        background_opacity: 0.5,
        margin_l: 10.0,
        margin_r: 10.0,
        margin_v: 10.0,
        outline_width: 1.0,
        bold: false,
        italic: false,
        underline: false,
        strike_out: false,
        scale_x: 100.0,
        scale_y: 100.0,
        spacing: 0.0,
        angle: 0.0,
        border_style: BorderStyle::Outline,
        shadow: 0.0,
        alignment: Alignment::BottomCenter,
        active_word: ActiveWordStyle::default(),
    }
}

fn classic() -> SubtitleStyle {
    SubtitleStyle {
        font_name: "Arial".to_string(),
        font_size: 18.0,
        outline_width: 2.0,
        margin_v: 16.0,
        ..tiktok()
    }
}

fn boxed() -> SubtitleStyle {
    SubtitleStyle {
        background_opacity: 0.6,
        outline_width: 0.0,
        border_style: BorderStyle::OpaqueBox,
        ..tiktok()
    }
}

fn highlight() -> SubtitleStyle {
    SubtitleStyle {
        font_size: 16.0,
        primary_color: HexColor::rgb(0xFF, 0xE0, 0x00),
        bold: true,
        outline_width: 2.0,
        shadow: 2.0,
        border_style: BorderStyle::Shadow,
        active_word: ActiveWordStyle {
            text_style: true,
            text_color: HexColor::WHITE,
            ..ActiveWordStyle::default()
        },
        ..tiktok()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tiktok_preset_values() {
        let style = find_preset("tiktok").unwrap().style();
        assert_eq!(style.font_size, 14.0);
        assert_eq!(style.margin_v, 10.0);
        assert_eq!(style.outline_width, 1.0);
        assert_eq!(style.background_opacity, 0.5);
        assert_eq!(style.scale_x, 100.0);
        assert_eq!(style.border_style, BorderStyle::Outline);
        assert_eq!(style.alignment, Alignment::BottomCenter);
        assert_eq!(style.primary_color, HexColor::WHITE);
    }

    #[test]
    fn test_find_preset_case_insensitive() {
        assert_eq!(find_preset("TikTok").unwrap().name, "tiktok");
        assert_eq!(find_preset(" boxed ").unwrap().name, "boxed");
    }

    #[test]
    fn test_find_preset_unknown() {
        assert!(matches!(
            find_preset("neon"),
            Err(CoreError::UnknownPreset(name)) if name == "neon"
        ));
    }

    #[test]
    fn test_preset_names_unique() {
        let names = preset_names();
        assert_eq!(names[0], DEFAULT_PRESET);
        let mut deduped = names.clone();
        deduped.sort_unstable();
        deduped.dedup();
        assert_eq!(deduped.len(), names.len());
    }

    #[test]
    fn test_boxed_uses_opaque_box() {
        let style = find_preset("boxed").unwrap().style();
        assert_eq!(style.border_style, BorderStyle::OpaqueBox);
    }
}
