//! Style Controller
//!
//! Owns the selected preset name and the current style. Applying a preset
//! replaces every attribute; each setter touches exactly one.

use tracing::debug;

use super::{find_preset, ActiveWordStyle, Alignment, BorderStyle, HexColor, SubtitleStyle, DEFAULT_PRESET};
use crate::core::CoreResult;

/// Current subtitle style plus the name of the last applied preset
#[derive(Clone, Debug, PartialEq)]
pub struct StyleController {
    selected: String,
    style: SubtitleStyle,
}

impl StyleController {
    /// Creates a controller initialised from the named preset
    pub fn new(preset: &str) -> CoreResult<Self> {
        let found = find_preset(preset)?;
        Ok(Self {
            selected: found.name.to_string(),
            style: found.style(),
        })
    }

    /// Name of the last applied preset
    pub fn selected(&self) -> &str {
        &self.selected
    }

    /// Snapshot of the current style
    pub fn current(&self) -> SubtitleStyle {
        self.style.clone()
    }

    pub fn style(&self) -> &SubtitleStyle {
        &self.style
    }

    /// Overwrites every attribute with the preset's values
    ///
    /// On an unknown name neither the style nor the selection changes.
    pub fn apply_preset(&mut self, name: &str) -> CoreResult<()> {
        let preset = find_preset(name)?;
        self.style = preset.style();
        self.selected = preset.name.to_string();
        debug!("Applied style preset '{}'", preset.name);
        Ok(())
    }

    /// Replaces the whole style, keeping the selected name
    pub fn replace(&mut self, style: SubtitleStyle) {
        self.style = style;
    }

    // =========================================================================
    // Attribute Setters
    // =========================================================================

    pub fn set_font_name(&mut self, name: &str) {
        self.style.font_name = name.to_string();
    }

    pub fn set_font_size(&mut self, size: f64) {
        self.style.font_size = size;
    }

    pub fn set_primary_color(&mut self, color: HexColor) {
        self.style.primary_color = color;
    }

    pub fn set_outline_color(&mut self, color: HexColor) {
        self.style.outline_color = color;
    }

    pub fn set_background_color(&mut self, color: HexColor) {
        self.style.background_color = color;
    }

    pub fn set_background_opacity(&mut self, opacity: f64) {
        self.style.background_opacity = opacity;
    }

    pub fn set_margin_l(&mut self, margin: f64) {
        self.style.margin_l = margin;
    }

    pub fn set_margin_r(&mut self, margin: f64) {
        self.style.margin_r = margin;
    }

    pub fn set_margin_v(&mut self, margin: f64) {
        self.style.margin_v = margin;
    }

    pub fn set_outline_width(&mut self, width: f64) {
        self.style.outline_width = width;
    }

    pub fn set_bold(&mut self, bold: bool) {
        self.style.bold = bold;
    }

    pub fn set_italic(&mut self, italic: bool) {
        self.style.italic = italic;
    }

    pub fn set_underline(&mut self, underline: bool) {
        self.style.underline = underline;
    }

    pub fn set_strike_out(&mut self, strike_out: bool) {
        self.style.strike_out = strike_out;
    }

    pub fn set_scale_x(&mut self, scale: f64) {
        self.style.scale_x = scale;
    }

    pub fn set_scale_y(&mut self, scale: f64) {
        self.style.scale_y = scale;
    }

    pub fn set_spacing(&mut self, spacing: f64) {
        self.style.spacing = spacing;
    }

    pub fn set_angle(&mut self, angle: f64) {
        self.style.angle = angle;
    }

    pub fn set_border_style(&mut self, border_style: BorderStyle) {
        self.style.border_style = border_style;
    }

    pub fn set_shadow(&mut self, shadow: f64) {
        self.style.shadow = shadow;
    }

    pub fn set_alignment(&mut self, alignment: Alignment) {
        self.style.alignment = alignment;
    }

    pub fn set_active_word(&mut self, active_word: ActiveWordStyle) {
        self.style.active_word = active_word;
    }
}

impl Default for StyleController {
    fn default() -> Self {
        Self {
            selected: DEFAULT_PRESET.to_string(),
            style: SubtitleStyle::default(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::CoreError;

    #[test]
    fn test_setter_changes_only_one_attribute() {
        let mut controller = StyleController::default();
        let before = controller.current();

        controller.set_font_size(20.0);

        let after = controller.current();
        assert_eq!(after.font_size, 20.0);
        assert_eq!(
            SubtitleStyle {
                font_size: before.font_size,
                ..after
            },
            before
        );
    }

    /// Keys of the serialized style whose values differ
    fn changed_fields(before: &SubtitleStyle, after: &SubtitleStyle) -> Vec<String> {
        let before = serde_json::to_value(before).unwrap();
        let after = serde_json::to_value(after).unwrap();
        let (before, after) = (before.as_object().unwrap(), after.as_object().unwrap());
        before
            .keys()
            .filter(|key| before[*key] != after[*key])
            .cloned()
            .collect()
    }

    #[test]
    fn test_every_setter_touches_exactly_its_field() {
        type Setter = fn(&mut StyleController);
        let cases: [(&str, Setter); 22] = [
            ("fontName", |c| c.set_font_name("Inter")),
            ("fontSize", |c| c.set_font_size(31.0)),
            ("primaryColor", |c| c.set_primary_color(HexColor::rgb(1, 2, 3))),
            ("outlineColor", |c| c.set_outline_color(HexColor::rgb(4, 5, 6))),
            ("backgroundColor", |c| c.set_background_color(HexColor::rgb(7, 8, 9))),
            ("backgroundOpacity", |c| c.set_background_opacity(0.25)),
            ("marginL", |c| c.set_margin_l(33.0)),
            ("marginR", |c| c.set_margin_r(34.0)),
            ("marginV", |c| c.set_margin_v(35.0)),
            ("outlineWidth", |c| c.set_outline_width(3.5)),
            ("bold", |c| c.set_bold(true)),
            ("italic", |c| c.set_italic(true)),
            ("underline", |c| c.set_underline(true)),
            ("strikeOut", |c| c.set_strike_out(true)),
            ("scaleX", |c| c.set_scale_x(120.0)),
            ("scaleY", |c| c.set_scale_y(80.0)),
            ("spacing", |c| c.set_spacing(2.0)),
            ("angle", |c| c.set_angle(15.0)),
            ("borderStyle", |c| c.set_border_style(BorderStyle::Shadow)),
            ("shadow", |c| c.set_shadow(4.0)),
            ("alignment", |c| c.set_alignment(Alignment::TopRight)),
            ("activeWord", |c| {
                c.set_active_word(ActiveWordStyle {
                    background: true,
                    ..ActiveWordStyle::default()
                })
            }),
        ];

        for (field, setter) in cases {
            let mut controller = StyleController::default();
            let before = controller.current();
            setter(&mut controller);
            assert_eq!(
                changed_fields(&before, controller.style()),
                vec![field.to_string()],
                "setter for {}",
                field
            );
            assert_eq!(controller.selected(), DEFAULT_PRESET);
        }
    }

    #[test]
    fn test_replace_keeps_selection() {
        let mut controller = StyleController::new("classic").unwrap();
        let boxed = find_preset("boxed").unwrap().style();
        controller.replace(boxed.clone());
        assert_eq!(controller.current(), boxed);
        assert_eq!(controller.selected(), "classic");
    }

    #[test]
    fn test_apply_preset_overwrites_everything() {
        let mut controller = StyleController::new("tiktok").unwrap();
        controller.set_font_size(99.0);
        controller.set_alignment(Alignment::TopLeft);
        controller.set_bold(true);

        controller.apply_preset("tiktok").unwrap();

        assert_eq!(controller.current(), find_preset("tiktok").unwrap().style());
        assert_eq!(controller.selected(), "tiktok");
    }

    #[test]
    fn test_apply_unknown_preset_keeps_state() {
        let mut controller = StyleController::default();
        controller.set_margin_v(42.0);
        let before = controller.clone();

        let result = controller.apply_preset("does-not-exist");
        assert!(matches!(result, Err(CoreError::UnknownPreset(_))));
        assert_eq!(controller, before);
    }

    #[test]
    fn test_setters_store_values_verbatim() {
        let mut controller = StyleController::default();
        controller.set_background_opacity(1.7);
        controller.set_font_size(-3.0);

        assert_eq!(controller.style().background_opacity, 1.7);
        assert_eq!(controller.style().font_size, -3.0);
    }

    #[test]
    fn test_apply_preset_updates_selection() {
        let mut controller = StyleController::default();
        controller.apply_preset("BOXED").unwrap();
        assert_eq!(controller.selected(), "boxed");
        assert_eq!(controller.style().border_style, BorderStyle::OpaqueBox);
    }
}
