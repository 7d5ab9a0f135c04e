//! Subtitle frame drawing
//!
//! Draws the active subtitle line of one instant onto a transparent
//! surface: optional background box, outline stroke with optional shadow,
//! then the fill. Lines with word timing are drawn one word at a time so
//! the spoken word can be emphasized. The surface decides how text is
//! rasterized.

use crate::core::captions::{active_segment, active_word, TimedSegment, WordSpan};
use crate::core::style::{BorderStyle, SubtitleStyle};
use crate::core::TimeMs;

/// Padding around the text inside an opaque box, in pixels
pub const BOX_PADDING: f32 = 8.0;

/// Box height relative to the font size
pub const LINE_HEIGHT_FACTOR: f32 = 1.2;

/// Font parameters for one draw call
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FontSpec {
    pub size_px: f32,
    pub bold: bool,
    pub italic: bool,
}

impl FontSpec {
    pub fn from_style(style: &SubtitleStyle) -> Self {
        Self {
            size_px: style.font_size as f32,
            bold: style.bold,
            italic: style.italic,
        }
    }
}

/// Drop shadow applied to a stroke
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShadowSpec {
    pub color: [u8; 4],
    pub blur: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

/// An RGBA drawing target
///
/// Text is anchored at `(x, y)` with `x` the horizontal centre and `y` the
/// bottom of the line box.
pub trait FrameSurface {
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    /// Resets every pixel to fully transparent
    fn clear(&mut self);

    /// Advance width of `text` in pixels
    fn measure_text(&mut self, text: &str, font: &FontSpec) -> f32;

    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: [u8; 4]);

    #[allow(clippy::too_many_arguments)]
    fn stroke_text(
        &mut self,
        text: &str,
        x: f32,
        y: f32,
        font: &FontSpec,
        line_width: f32,
        color: [u8; 4],
        shadow: Option<&ShadowSpec>,
    );

    fn fill_text(&mut self, text: &str, x: f32, y: f32, font: &FontSpec, color: [u8; 4]);

    /// Row-major RGBA8 pixels, `width * height * 4` bytes
    fn pixels(&self) -> &[u8];
}

/// Opacity of words other than the one being spoken
pub const INACTIVE_WORD_OPACITY: f64 = 0.3;

/// Horizontal padding of the active-word box, in pixels
pub const WORD_BOX_PADDING: f32 = 4.0;

/// Draws the subtitle active at `ts_ms`; returns the drawn segment's index
///
/// The surface is always cleared, so an instant without an active segment
/// yields a fully transparent frame. Segments carrying word spans are laid
/// out word by word with the spoken word emphasized.
pub fn draw_subtitle_frame<S: FrameSurface + ?Sized>(
    surface: &mut S,
    segments: &[TimedSegment],
    style: &SubtitleStyle,
    ts_ms: TimeMs,
) -> Option<usize> {
    surface.clear();

    let (index, segment) = active_segment(segments, ts_ms)?;
    if segment.text.trim().is_empty() {
        return Some(index);
    }

    let font = FontSpec::from_style(style);
    let x = surface.width() as f32 / 2.0;
    let y = surface.height() as f32 - style.margin_v as f32;

    match segment.words.as_deref() {
        Some(words) if !words.is_empty() => {
            let active = active_word(segment, ts_ms).map(|(i, _)| i);
            draw_words(surface, words, active, style, &font, x, y);
        }
        _ => {
            let width = surface.measure_text(&segment.text, &font);
            draw_line_box(surface, style, &font, x, y, width);
            stroke_outline(surface, &segment.text, x, y, style, &font, 1.0);
            surface.fill_text(&segment.text, x, y, &font, style.primary_color.to_rgba(1.0));
        }
    }

    Some(index)
}

/// One word placed on the line, anchored at its centre
struct PlacedWord<'a> {
    text: &'a str,
    center_x: f32,
    width: f32,
}

fn draw_words<S: FrameSurface + ?Sized>(
    surface: &mut S,
    words: &[WordSpan],
    active: Option<usize>,
    style: &SubtitleStyle,
    font: &FontSpec,
    x: f32,
    y: f32,
) {
    let space = surface.measure_text(" ", font);
    let widths: Vec<f32> = words
        .iter()
        .map(|word| surface.measure_text(&word.text, font))
        .collect();
    let line_width = widths.iter().sum::<f32>() + space * words.len().saturating_sub(1) as f32;

    let mut cursor = x - line_width / 2.0;
    let placed: Vec<PlacedWord> = words
        .iter()
        .zip(&widths)
        .map(|(word, &width)| {
            let word = PlacedWord {
                text: word.text.as_str(),
                center_x: cursor + width / 2.0,
                width,
            };
            cursor += width + space;
            word
        })
        .collect();

    draw_line_box(surface, style, font, x, y, line_width);

    let emphasis = &style.active_word;
    for (i, word) in placed.iter().enumerate() {
        let is_active = active == Some(i);
        let opacity = if is_active { 1.0 } else { INACTIVE_WORD_OPACITY };

        if is_active && emphasis.background {
            let height = font.size_px * LINE_HEIGHT_FACTOR;
            surface.fill_rect(
                word.center_x - word.width / 2.0 - WORD_BOX_PADDING,
                y - height,
                word.width + WORD_BOX_PADDING * 2.0,
                height,
                emphasis.background_color.to_rgba(1.0),
            );
        }

        let fill = if is_active && emphasis.text_style {
            if emphasis.stroke_width > 0.0 {
                surface.stroke_text(
                    word.text,
                    word.center_x,
                    y,
                    font,
                    emphasis.stroke_width as f32 * 2.0,
                    emphasis.stroke_color.to_rgba(1.0),
                    None,
                );
            }
            emphasis.text_color
        } else {
            stroke_outline(surface, word.text, word.center_x, y, style, font, opacity);
            style.primary_color
        };

        surface.fill_text(word.text, word.center_x, y, font, fill.to_rgba(opacity));
    }
}

/// Opaque box behind a line of `width` pixels, for box-styled subtitles
fn draw_line_box<S: FrameSurface + ?Sized>(
    surface: &mut S,
    style: &SubtitleStyle,
    font: &FontSpec,
    x: f32,
    y: f32,
    width: f32,
) {
    if style.border_style != BorderStyle::OpaqueBox {
        return;
    }
    let height = font.size_px * LINE_HEIGHT_FACTOR;
    surface.fill_rect(
        x - width / 2.0 - BOX_PADDING,
        y - height - BOX_PADDING,
        width + BOX_PADDING * 2.0,
        height + BOX_PADDING * 2.0,
        style.background_color.to_rgba(style.background_opacity),
    );
}

/// Glyph outline, with a drop shadow for shadow-styled subtitles
fn stroke_outline<S: FrameSurface + ?Sized>(
    surface: &mut S,
    text: &str,
    x: f32,
    y: f32,
    style: &SubtitleStyle,
    font: &FontSpec,
    opacity: f64,
) {
    if !style.border_style.strokes_text() {
        return;
    }
    let outline = style.outline_color.to_rgba(opacity);
    let shadow = (style.border_style == BorderStyle::Shadow && style.shadow > 0.0).then(|| ShadowSpec {
        color: outline,
        blur: style.shadow as f32 * 4.0,
        offset_x: style.outline_width as f32,
        offset_y: style.outline_width as f32,
    });

    surface.stroke_text(
        text,
        x,
        y,
        font,
        style.outline_width as f32 * 2.0,
        outline,
        shadow.as_ref(),
    );
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::style::find_preset;

    #[derive(Clone, Debug, PartialEq)]
    pub(crate) enum Op {
        Clear,
        Rect { x: f32, y: f32, w: f32, h: f32, color: [u8; 4] },
        Stroke { text: String, x: f32, y: f32, line_width: f32, shadow: Option<ShadowSpec> },
        Fill { text: String, x: f32, y: f32, color: [u8; 4] },
    }

    /// Records draw calls; every glyph measures 10px wide
    pub(crate) struct RecordingSurface {
        pub width: u32,
        pub height: u32,
        pub ops: Vec<Op>,
        pixels: Vec<u8>,
    }

    impl RecordingSurface {
        pub fn new(width: u32, height: u32) -> Self {
            Self {
                width,
                height,
                ops: Vec::new(),
                pixels: vec![0; (width * height * 4) as usize],
            }
        }
    }

    impl FrameSurface for RecordingSurface {
        fn width(&self) -> u32 {
            self.width
        }

        fn height(&self) -> u32 {
            self.height
        }

        fn clear(&mut self) {
            self.ops.clear();
            self.ops.push(Op::Clear);
        }

        fn measure_text(&mut self, text: &str, _font: &FontSpec) -> f32 {
            text.chars().count() as f32 * 10.0
        }

        fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: [u8; 4]) {
            self.ops.push(Op::Rect { x, y, w, h, color });
        }

        fn stroke_text(
            &mut self,
            text: &str,
            x: f32,
            y: f32,
            _font: &FontSpec,
            line_width: f32,
            _color: [u8; 4],
            shadow: Option<&ShadowSpec>,
        ) {
            self.ops.push(Op::Stroke {
                text: text.to_string(),
                x,
                y,
                line_width,
                shadow: shadow.copied(),
            });
        }

        fn fill_text(&mut self, text: &str, x: f32, y: f32, _font: &FontSpec, color: [u8; 4]) {
            self.ops.push(Op::Fill {
                text: text.to_string(),
                x,
                y,
                color,
            });
        }

        fn pixels(&self) -> &[u8] {
            &self.pixels
        }
    }

    fn segments() -> Vec<TimedSegment> {
        vec![TimedSegment::new(0, 1000, "Hi there")]
    }

    #[test]
    fn test_outline_style_strokes_then_fills() {
        let style = find_preset("tiktok").unwrap().style();
        let mut surface = RecordingSurface::new(640, 360);

        let drawn = draw_subtitle_frame(&mut surface, &segments(), &style, 500);
        assert_eq!(drawn, Some(0));

        assert_eq!(surface.ops.len(), 3);
        assert_eq!(surface.ops[0], Op::Clear);
        assert_eq!(
            surface.ops[1],
            Op::Stroke {
                text: "Hi there".to_string(),
                x: 320.0,
                y: 350.0,
                line_width: 2.0,
                shadow: None,
            }
        );
        assert!(matches!(&surface.ops[2], Op::Fill { color, .. } if *color == [255, 255, 255, 255]));
    }

    #[test]
    fn test_opaque_box_draws_background_without_stroke() {
        let mut style = find_preset("tiktok").unwrap().style();
        style.border_style = BorderStyle::OpaqueBox;
        style.font_size = 20.0;
        let mut surface = RecordingSurface::new(640, 360);

        draw_subtitle_frame(&mut surface, &segments(), &style, 500);

        // "Hi there" measures 80px; box height is 20 * 1.2 + 16
        assert_eq!(
            surface.ops[1],
            Op::Rect {
                x: 320.0 - 40.0 - 8.0,
                y: 350.0 - 24.0 - 8.0,
                w: 96.0,
                h: 40.0,
                color: [0, 0, 0, 128],
            }
        );
        assert!(matches!(surface.ops[2], Op::Fill { .. }));
        assert_eq!(surface.ops.len(), 3);
    }

    #[test]
    fn test_shadow_style_adds_shadow() {
        let mut style = find_preset("tiktok").unwrap().style();
        style.border_style = BorderStyle::Shadow;
        style.shadow = 2.0;
        style.outline_width = 3.0;
        let mut surface = RecordingSurface::new(640, 360);

        draw_subtitle_frame(&mut surface, &segments(), &style, 500);

        match &surface.ops[1] {
            Op::Stroke { line_width, shadow: Some(shadow), .. } => {
                assert_eq!(*line_width, 6.0);
                assert_eq!(shadow.blur, 8.0);
                assert_eq!(shadow.offset_x, 3.0);
                assert_eq!(shadow.offset_y, 3.0);
            }
            other => panic!("expected a shadowed stroke, got {:?}", other),
        }
    }

    #[test]
    fn test_no_active_segment_only_clears() {
        let style = find_preset("tiktok").unwrap().style();
        let mut surface = RecordingSurface::new(64, 64);

        assert_eq!(draw_subtitle_frame(&mut surface, &segments(), &style, 5000), None);
        assert_eq!(surface.ops, vec![Op::Clear]);
    }

    fn worded() -> Vec<TimedSegment> {
        vec![TimedSegment::new(0, 1000, "one two three").with_words(vec![
            WordSpan::new("one", 0.0, 300.0),
            WordSpan::new("two", 300.0, 600.0),
            WordSpan::new("three", 600.0, 1000.0),
        ])]
    }

    fn fills(surface: &RecordingSurface) -> Vec<(String, f32, [u8; 4])> {
        surface
            .ops
            .iter()
            .filter_map(|op| match op {
                Op::Fill { text, x, color, .. } => Some((text.clone(), *x, *color)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_words_are_laid_out_around_centre() {
        let style = find_preset("tiktok").unwrap().style();
        let mut surface = RecordingSurface::new(640, 360);

        draw_subtitle_frame(&mut surface, &worded(), &style, 100);

        // 30 + 10 + 30 + 10 + 50 = 130px wide, starting at 255
        let placed: Vec<(String, f32)> = fills(&surface)
            .into_iter()
            .map(|(text, x, _)| (text, x))
            .collect();
        assert_eq!(
            placed,
            vec![
                ("one".to_string(), 270.0),
                ("two".to_string(), 310.0),
                ("three".to_string(), 360.0),
            ]
        );
    }

    #[test]
    fn test_spoken_word_is_opaque_and_others_dimmed() {
        let style = find_preset("tiktok").unwrap().style();
        let mut surface = RecordingSurface::new(640, 360);

        draw_subtitle_frame(&mut surface, &worded(), &style, 450);

        let alphas: Vec<u8> = fills(&surface).iter().map(|(_, _, color)| color[3]).collect();
        assert_eq!(alphas, vec![77, 255, 77]);
    }

    #[test]
    fn test_frames_differ_as_the_spoken_word_moves() {
        let style = find_preset("highlight").unwrap().style();
        let mut early = RecordingSurface::new(640, 360);
        let mut late = RecordingSurface::new(640, 360);

        draw_subtitle_frame(&mut early, &worded(), &style, 100);
        draw_subtitle_frame(&mut late, &worded(), &style, 900);

        assert_ne!(early.ops, late.ops);
    }

    #[test]
    fn test_active_word_emphasis() {
        let mut style = find_preset("tiktok").unwrap().style();
        style.active_word.background = true;
        style.active_word.text_style = true;
        let mut surface = RecordingSurface::new(640, 360);

        draw_subtitle_frame(&mut surface, &worded(), &style, 450);

        let rects: Vec<&Op> = surface.ops.iter().filter(|op| matches!(op, Op::Rect { .. })).collect();
        assert_eq!(rects.len(), 1);
        match rects[0] {
            Op::Rect { x, w, color, .. } => {
                assert_eq!(*x, 310.0 - 15.0 - 4.0);
                assert_eq!(*w, 38.0);
                assert_eq!(*color, [0x00, 0x00, 0xFF, 255]);
            }
            other => panic!("expected a rect, got {:?}", other),
        }

        let active_stroke = surface
            .ops
            .iter()
            .find_map(|op| match op {
                Op::Stroke { text, line_width, .. } if text == "two" => Some(*line_width),
                _ => None,
            });
        assert_eq!(active_stroke, Some(6.0));

        let fills = fills(&surface);
        assert_eq!(fills[1].2, [0xFF, 0xD7, 0x00, 255]);
        assert_eq!(fills[0].2, [0xFF, 0xFF, 0xFF, 77]);
    }

    #[test]
    fn test_gap_between_words_dims_the_whole_line() {
        let style = find_preset("tiktok").unwrap().style();
        let segments = vec![TimedSegment::new(0, 1000, "a b").with_words(vec![
            WordSpan::new("a", 0.0, 200.0),
            WordSpan::new("b", 800.0, 1000.0),
        ])];
        let mut surface = RecordingSurface::new(640, 360);

        assert_eq!(draw_subtitle_frame(&mut surface, &segments, &style, 500), Some(0));
        assert!(fills(&surface).iter().all(|(_, _, color)| color[3] == 77));
    }
}
