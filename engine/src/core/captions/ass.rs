//! Styled Subtitle Markup (ASS v4.00+)
//!
//! Builds the complete styled document consumed by the video engine's
//! `subtitles` filter: script info, a single `Default` style derived from
//! the current [`SubtitleStyle`], and one dialogue line per segment.

use serde::{Deserialize, Serialize};

use super::{split_words, TimedSegment};
use crate::core::style::{flag, SubtitleStyle};
use crate::core::TimeMs;

/// Karaoke tag duration used when none is configured (centiseconds)
pub const DEFAULT_KARAOKE_CS: u32 = 35;

/// Script resolution the style sizes are expressed in
pub const DEFAULT_PLAY_RES: (u32, u32) = (384, 288);

const STYLE_FORMAT: &str = "Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding";

const EVENTS_FORMAT: &str =
    "Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text";

const SECONDARY_COLOUR: &str = "&H000000FF";

// =============================================================================
// Options
// =============================================================================

/// Per-word karaoke timing tags
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum KaraokeMode {
    /// Plain dialogue text
    Off,
    /// Every word is prefixed with `{\kN}`
    Fixed { centiseconds: u32 },
}

impl Default for KaraokeMode {
    fn default() -> Self {
        KaraokeMode::Fixed {
            centiseconds: DEFAULT_KARAOKE_CS,
        }
    }
}

/// Document-level options
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssOptions {
    pub play_res_x: u32,
    pub play_res_y: u32,
    pub karaoke: KaraokeMode,
}

impl Default for AssOptions {
    fn default() -> Self {
        Self {
            play_res_x: DEFAULT_PLAY_RES.0,
            play_res_y: DEFAULT_PLAY_RES.1,
            karaoke: KaraokeMode::default(),
        }
    }
}

// =============================================================================
// Document
// =============================================================================

/// A styled document builder bound to one style
#[derive(Clone, Debug)]
pub struct AssDocument<'a> {
    style: &'a SubtitleStyle,
    options: AssOptions,
}

impl<'a> AssDocument<'a> {
    pub fn new(style: &'a SubtitleStyle, options: AssOptions) -> Self {
        Self { style, options }
    }

    /// Renders the full document for the given segments
    pub fn render(&self, segments: &[TimedSegment]) -> String {
        let mut output = String::new();

        output.push_str("[Script Info]\n");
        output.push_str("ScriptType: v4.00+\n");
        output.push_str(&format!("PlayResX: {}\n", self.options.play_res_x));
        output.push_str(&format!("PlayResY: {}\n", self.options.play_res_y));
        output.push('\n');

        output.push_str("[V4+ Styles]\n");
        output.push_str(STYLE_FORMAT);
        output.push('\n');
        output.push_str(&self.style_line());
        output.push('\n');
        output.push('\n');

        output.push_str("[Events]\n");
        output.push_str(EVENTS_FORMAT);
        output.push('\n');

        for segment in segments {
            output.push_str(&self.dialogue_line(segment));
            output.push('\n');
        }

        output
    }

    /// The `Style: Default,...` record
    pub fn style_line(&self) -> String {
        let s = self.style;
        format!(
            "Style: Default,{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},0",
            s.font_name,
            s.font_size,
            s.primary_color.to_ass(),
            SECONDARY_COLOUR,
            s.outline_color.to_ass(),
            s.background_color.to_ass_with_alpha(s.background_opacity),
            flag(s.bold),
            flag(s.italic),
            flag(s.underline),
            flag(s.strike_out),
            s.scale_x,
            s.scale_y,
            s.spacing,
            s.angle,
            s.border_style.code(),
            s.outline_width,
            s.shadow,
            s.alignment.code(),
            s.margin_l,
            s.margin_r,
            s.margin_v,
        )
    }

    /// One `Dialogue:` line for a segment
    pub fn dialogue_line(&self, segment: &TimedSegment) -> String {
        format!(
            "Dialogue: 0,{},{},Default,,0,0,0,,{}",
            format_ass_time(segment.start_ms),
            format_ass_time(segment.end_ms),
            self.dialogue_text(&segment.text)
        )
    }

    fn dialogue_text(&self, text: &str) -> String {
        match self.options.karaoke {
            KaraokeMode::Off => text
                .lines()
                .collect::<Vec<_>>()
                .join("\\N"),
            KaraokeMode::Fixed { centiseconds } => text
                .lines()
                .map(|line| {
                    split_words(line)
                        .into_iter()
                        .map(|word| format!("{{\\k{}}}{}", centiseconds, word))
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .collect::<Vec<_>>()
                .join("\\N"),
        }
    }
}

/// Renders a styled document in one call
pub fn export_ass(segments: &[TimedSegment], style: &SubtitleStyle, options: AssOptions) -> String {
    AssDocument::new(style, options).render(segments)
}

/// Formats milliseconds as `H:MM:SS.cc` (hour unpadded, centiseconds truncated)
pub fn format_ass_time(ms: TimeMs) -> String {
    let centis = (ms % 1000) / 10;
    let total_secs = ms / 1000;
    let secs = total_secs % 60;
    let total_mins = total_secs / 60;
    let mins = total_mins % 60;
    let hours = total_mins / 60;

    format!("{}:{:02}:{:02}.{:02}", hours, mins, secs, centis)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::style::{find_preset, BorderStyle, HexColor};

    fn tiktok() -> SubtitleStyle {
        find_preset("tiktok").unwrap().style()
    }

    #[test]
    fn test_format_ass_time() {
        assert_eq!(format_ass_time(0), "0:00:00.00");
        assert_eq!(format_ass_time(3_723_004), "1:02:03.00");
        assert_eq!(format_ass_time(1_999), "0:00:01.99");
        assert_eq!(format_ass_time(59_995), "0:00:59.99");
        assert_eq!(format_ass_time(36_000_000), "10:00:00.00");
    }

    #[test]
    fn test_style_line_for_tiktok() {
        let style = tiktok();
        let doc = AssDocument::new(&style, AssOptions::default());

        assert_eq!(
            doc.style_line(),
            "Style: Default,Roboto Bold,14,&HFFFFFF&,&H000000FF,&H000000&,&H000000&80,0,0,0,0,100,100,0,0,1,1,0,2,10,10,10,0"
        );
    }

    #[test]
    fn test_style_line_has_23_fields() {
        let style = tiktok();
        let line = AssDocument::new(&style, AssOptions::default()).style_line();
        let fields = line.trim_start_matches("Style: ").split(',').count();
        assert_eq!(fields, 23);
    }

    #[test]
    fn test_style_line_reflects_changes() {
        let mut style = tiktok();
        style.primary_color = HexColor::parse("#FFAA00").unwrap();
        style.border_style = BorderStyle::OpaqueBox;
        style.bold = true;
        style.font_size = 22.5;

        let line = AssDocument::new(&style, AssOptions::default()).style_line();
        assert!(line.contains(",22.5,&H00AAFF&,"));
        assert!(line.contains(",1,0,0,0,100,100,0,0,3,"));
    }

    #[test]
    fn test_render_karaoke_dialogue() {
        let style = tiktok();
        let segments = vec![TimedSegment::new(1000, 2500, "Hello big world")];

        let doc = export_ass(&segments, &style, AssOptions::default());
        assert!(doc.contains(
            "Dialogue: 0,0:00:01.00,0:00:02.50,Default,,0,0,0,,{\\k35}Hello {\\k35}big {\\k35}world\n"
        ));
    }

    #[test]
    fn test_render_plain_dialogue() {
        let style = tiktok();
        let options = AssOptions {
            karaoke: KaraokeMode::Off,
            ..AssOptions::default()
        };
        let segments = vec![TimedSegment::new(0, 1000, "Plain text")];

        let doc = export_ass(&segments, &style, options);
        assert!(doc.ends_with("Dialogue: 0,0:00:00.00,0:00:01.00,Default,,0,0,0,,Plain text\n"));
    }

    #[test]
    fn test_render_custom_karaoke_duration() {
        let style = tiktok();
        let options = AssOptions {
            karaoke: KaraokeMode::Fixed { centiseconds: 50 },
            ..AssOptions::default()
        };
        let doc = export_ass(&[TimedSegment::new(0, 1000, "a b")], &style, options);
        assert!(doc.contains(",,{\\k50}a {\\k50}b\n"));
    }

    #[test]
    fn test_render_newline_becomes_line_break() {
        let style = tiktok();
        let options = AssOptions {
            karaoke: KaraokeMode::Off,
            ..AssOptions::default()
        };
        let doc = export_ass(&[TimedSegment::new(0, 1000, "top\nbottom")], &style, options);
        assert!(doc.contains(",,top\\Nbottom\n"));
    }

    #[test]
    fn test_render_empty_segments() {
        let style = tiktok();
        let doc = export_ass(&[], &style, AssOptions::default());

        assert!(doc.starts_with("[Script Info]\nScriptType: v4.00+\nPlayResX: 384\nPlayResY: 288\n"));
        assert!(doc.contains("[V4+ Styles]\n"));
        assert!(doc.ends_with(&format!("[Events]\n{}\n", EVENTS_FORMAT)));
        assert!(!doc.contains("Dialogue:"));
    }

    #[test]
    fn test_render_one_dialogue_per_segment_in_order() {
        let style = tiktok();
        let segments = vec![
            TimedSegment::new(5000, 6000, "later"),
            TimedSegment::new(0, 1000, "earlier"),
        ];

        let doc = export_ass(&segments, &style, AssOptions::default());
        let dialogues: Vec<&str> = doc.lines().filter(|l| l.starts_with("Dialogue:")).collect();
        assert_eq!(dialogues.len(), 2);
        assert!(dialogues[0].contains("later"));
        assert!(dialogues[1].contains("earlier"));
    }
}
