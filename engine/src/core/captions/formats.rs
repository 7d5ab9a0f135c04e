//! Caption Format Parsers and Exporters
//!
//! Supports the sequential SubRip dialect:
//! - parsing uploaded caption files into `TimedSegment`s
//! - exporting segments back as the simple markup dialect
//! - word splitting with linearly interpolated per-word timing
//!
//! # Example
//!
//! ```rust,ignore
//! use crate::core::captions::{parse_srt, export_srt, with_word_timing};
//!
//! let content = std::fs::read_to_string("subtitles.srt")?;
//! let segments = with_word_timing(parse_srt(&content));
//! let normalized = export_srt(&segments);
//! ```

use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use super::{TimedSegment, WordSpan};
use crate::core::TimeMs;

// =============================================================================
// SRT Parsing
// =============================================================================

fn srt_time_line() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(r"^(\d{2}):(\d{2}):(\d{2}),(\d{3}) --> (\d{2}):(\d{2}):(\d{2}),(\d{3})")
                .ok()
        })
        .as_ref()
}

/// Parses SRT (SubRip) content into timed segments
///
/// # SRT Format
///
/// ```text
/// 1
/// 00:00:01,000 --> 00:00:04,000
/// First caption text
///
/// 2
/// 00:00:05,500 --> 00:00:08,000
/// Second caption text
/// with multiple lines
/// ```
///
/// Blocks whose second line is not a time range are skipped. Parsing never
/// fails: malformed input yields an empty or partial list. Text lines of a
/// block are joined with a single space.
pub fn parse_srt(content: &str) -> Vec<TimedSegment> {
    let content = content.trim_start_matches('\u{feff}');
    let mut segments = Vec::new();
    let mut skipped = 0usize;

    for (block_index, block) in split_blocks(content).into_iter().enumerate() {
        match parse_block(&block) {
            Some(segment) => segments.push(segment),
            None => {
                skipped += 1;
                debug!(
                    "Skipping malformed SRT block #{} ({:?})",
                    block_index + 1,
                    block.first().copied().unwrap_or_default()
                );
            }
        }
    }

    if skipped > 0 {
        debug!(
            "Parsed {} SRT segments, skipped {} malformed blocks",
            segments.len(),
            skipped
        );
    }

    segments
}

/// Groups lines into blocks separated by one or more blank lines
fn split_blocks(content: &str) -> Vec<Vec<&str>> {
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in content.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }

    blocks
}

fn parse_block(lines: &[&str]) -> Option<TimedSegment> {
    if lines.len() < 2 {
        return None;
    }

    let caps = srt_time_line()?.captures(lines[1].trim())?;
    let field = |i: usize| -> Option<u64> { caps.get(i)?.as_str().parse().ok() };

    let start = to_ms(field(1)?, field(2)?, field(3)?, field(4)?);
    let end = to_ms(field(5)?, field(6)?, field(7)?, field(8)?);
    let text = lines[2..].join(" ");

    Some(TimedSegment::new(start, end, &text))
}

fn to_ms(hours: u64, minutes: u64, seconds: u64, millis: u64) -> TimeMs {
    hours * 3_600_000 + minutes * 60_000 + seconds * 1000 + millis
}

// =============================================================================
// SRT Export
// =============================================================================

/// Exports segments as the simple sequential dialect
pub fn export_srt(segments: &[TimedSegment]) -> String {
    let mut output = String::new();

    for (index, segment) in segments.iter().enumerate() {
        output.push_str(&format!("{}\n", index + 1));
        output.push_str(&format!(
            "{} --> {}\n",
            format_srt_timestamp(segment.start_ms),
            format_srt_timestamp(segment.end_ms)
        ));
        output.push_str(&segment.text);
        output.push_str("\n\n");
    }

    output
}

/// Formats milliseconds as an SRT timestamp (00:00:00,000)
pub fn format_srt_timestamp(ms: TimeMs) -> String {
    let millis = ms % 1000;
    let total_secs = ms / 1000;
    let secs = total_secs % 60;
    let total_mins = total_secs / 60;
    let mins = total_mins % 60;
    let hours = total_mins / 60;

    format!("{:02}:{:02}:{:02},{:03}", hours, mins, secs, millis)
}

// =============================================================================
// Word Timing
// =============================================================================

/// Splits caption text into words on whitespace, punctuation kept
pub fn split_words(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}

/// Splits a segment into words with linearly interpolated timing
///
/// Each word gets `(end - start) / word_count` milliseconds. The spans
/// partition `[start, end]` contiguously; the last span ends exactly at
/// `end`. This is a placeholder model with no alignment to actual speech.
pub fn interpolate_words(segment: &TimedSegment) -> Vec<WordSpan> {
    let words = split_words(&segment.text);
    if words.is_empty() {
        return Vec::new();
    }

    let start = segment.start_ms as f64;
    let end = segment.end_ms as f64;
    let count = words.len();
    let word_duration = (end - start) / count as f64;

    words
        .into_iter()
        .enumerate()
        .map(|(i, word)| {
            let word_start = start + i as f64 * word_duration;
            let word_end = if i + 1 == count {
                end
            } else {
                start + (i + 1) as f64 * word_duration
            };
            WordSpan::new(word, word_start, word_end)
        })
        .collect()
}

/// Attaches interpolated word spans to every segment
pub fn with_word_timing(segments: Vec<TimedSegment>) -> Vec<TimedSegment> {
    segments
        .into_iter()
        .map(|segment| {
            let words = interpolate_words(&segment);
            segment.with_words(words)
        })
        .collect()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // SRT Parsing Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_parse_srt_basic() {
        let srt = "1\n00:00:01,000 --> 00:00:04,000\nHello World\n\n2\n00:00:05,500 --> 00:00:08,000\nSecond caption\n";

        let segments = parse_srt(srt);
        assert_eq!(segments.len(), 2);

        assert_eq!(segments[0].start_ms, 1000);
        assert_eq!(segments[0].end_ms, 4000);
        assert_eq!(segments[0].text, "Hello World");

        assert_eq!(segments[1].start_ms, 5500);
        assert_eq!(segments[1].end_ms, 8000);
        assert_eq!(segments[1].text, "Second caption");
    }

    #[test]
    fn test_parse_srt_joins_lines_with_space() {
        let srt = "1\n00:00:00,000 --> 00:00:05,000\nLine one\nLine two\nLine three\n";

        let segments = parse_srt(srt);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text, "Line one Line two Line three");
    }

    #[test]
    fn test_parse_srt_absolute_offsets() {
        let srt = "7\n01:02:03,004 --> 10:00:00,999\nLate\n";

        let segments = parse_srt(srt);
        assert_eq!(segments[0].start_ms, 3_723_004);
        assert_eq!(segments[0].end_ms, 36_000_999);
    }

    #[test]
    fn test_parse_srt_skips_block_without_arrow() {
        let srt = "1\n00:00:01,000 --> 00:00:02,000\nkept one\n\n2\n00:00:03,000 00:00:04,000\ndropped\n\n3\n00:00:05,000 --> 00:00:06,000\nkept two\n";

        let segments = parse_srt(srt);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "kept one");
        assert_eq!(segments[1].text, "kept two");
    }

    #[test]
    fn test_parse_srt_skips_non_fixed_width_times() {
        let srt = "1\n0:00:01,000 --> 0:00:02,000\nshort hours\n\n2\n00:00:01.000 --> 00:00:02.000\ndot millis\n";
        assert!(parse_srt(srt).is_empty());
    }

    #[test]
    fn test_parse_srt_garbage_yields_empty() {
        assert!(parse_srt("").is_empty());
        assert!(parse_srt("not a caption file at all").is_empty());
        assert!(parse_srt("1\n\n\n").is_empty());
    }

    #[test]
    fn test_parse_srt_crlf_and_bom() {
        let srt = "\u{feff}1\r\n00:00:01,000 --> 00:00:02,000\r\nWindows line\r\n\r\n2\r\n00:00:02,000 --> 00:00:03,000\r\nNext\r\n";

        let segments = parse_srt(srt);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "Windows line");
        assert_eq!(segments[1].start_ms, 2000);
    }

    #[test]
    fn test_parse_srt_keeps_file_order() {
        let srt = "1\n00:00:05,000 --> 00:00:06,000\nlater\n\n2\n00:00:01,000 --> 00:00:02,000\nearlier\n";

        let segments = parse_srt(srt);
        assert_eq!(segments[0].text, "later");
        assert_eq!(segments[1].text, "earlier");
    }

    // -------------------------------------------------------------------------
    // SRT Export Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_format_srt_timestamp() {
        assert_eq!(format_srt_timestamp(0), "00:00:00,000");
        assert_eq!(format_srt_timestamp(1500), "00:00:01,500");
        assert_eq!(format_srt_timestamp(90_000), "00:01:30,000");
        assert_eq!(format_srt_timestamp(3_723_004), "01:02:03,004");
    }

    #[test]
    fn test_export_srt_layout() {
        let segments = vec![
            TimedSegment::new(1000, 4000, "Hello World"),
            TimedSegment::new(5500, 8000, "Second caption"),
        ];

        let srt = export_srt(&segments);
        assert_eq!(
            srt,
            "1\n00:00:01,000 --> 00:00:04,000\nHello World\n\n2\n00:00:05,500 --> 00:00:08,000\nSecond caption\n\n"
        );
    }

    #[test]
    fn test_srt_roundtrip() {
        let original = vec![
            TimedSegment::new(0, 1000, "a"),
            TimedSegment::new(1000, 2000, "b, with punctuation!"),
            TimedSegment::new(3_723_004, 3_725_000, "late line"),
        ];

        let parsed = parse_srt(&export_srt(&original));
        assert_eq!(parsed, original);
    }

    // -------------------------------------------------------------------------
    // Word Timing Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_split_words_keeps_punctuation() {
        assert_eq!(split_words("Hello,  world!\tok"), vec!["Hello,", "world!", "ok"]);
        assert!(split_words("   ").is_empty());
    }

    #[test]
    fn test_interpolate_words_partition() {
        let segment = TimedSegment::new(1000, 2000, "one two three");
        let words = interpolate_words(&segment);

        assert_eq!(words.len(), 3);
        assert_eq!(words[0].start_ms, 1000.0);
        assert_eq!(words[2].end_ms, 2000.0);
        for pair in words.windows(2) {
            assert_eq!(pair[0].end_ms, pair[1].start_ms);
        }
        assert!((words[0].end_ms - 1333.333).abs() < 0.001);
    }

    #[test]
    fn test_interpolate_words_count_matches_split() {
        let texts = ["single", "two words", "a b c d e f g", " padded  text "];
        for text in texts {
            let segment = TimedSegment::new(0, 999, text);
            let words = interpolate_words(&segment);
            assert_eq!(words.len(), text.split_whitespace().count());
            assert_eq!(words.first().map(|w| w.start_ms), Some(0.0));
            assert_eq!(words.last().map(|w| w.end_ms), Some(999.0));
        }
    }

    #[test]
    fn test_interpolate_words_empty_text() {
        let segment = TimedSegment::new(0, 1000, "");
        assert!(interpolate_words(&segment).is_empty());
    }

    #[test]
    fn test_with_word_timing_attaches_words() {
        let segments = with_word_timing(vec![
            TimedSegment::new(0, 1000, "a b"),
            TimedSegment::new(1000, 1500, "c"),
        ]);

        assert_eq!(segments[0].words.as_ref().map(Vec::len), Some(2));
        assert_eq!(segments[1].words.as_ref().map(Vec::len), Some(1));
    }
}
