//! Caption Data Models
//!
//! Defines data structures for timed subtitle segments.
//!
//! # Overview
//!
//! - `TimedSegment` is one cue of caption text with absolute millisecond bounds.
//! - `WordSpan` is one word of a segment with interpolated timing.
//! - `SubtitleTrack` owns the ordered segment list that the editor works on.

use serde::{Deserialize, Serialize};

use crate::core::{CoreError, CoreResult, TimeMs, TrackId};

// =============================================================================
// Word Span
// =============================================================================

/// A single word of a segment with its own time window
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordSpan {
    /// Word text (punctuation stays attached)
    pub text: String,
    /// Start time in milliseconds (fractional when interpolated)
    pub start_ms: f64,
    /// End time in milliseconds (fractional when interpolated)
    pub end_ms: f64,
}

impl WordSpan {
    pub fn new(text: &str, start_ms: f64, end_ms: f64) -> Self {
        Self {
            text: text.to_string(),
            start_ms,
            end_ms,
        }
    }

    /// Returns true if the timestamp falls inside the inclusive window
    pub fn contains(&self, ts_ms: f64) -> bool {
        ts_ms >= self.start_ms && ts_ms <= self.end_ms
    }
}

// =============================================================================
// Timed Segment
// =============================================================================

/// A timed span of caption text
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimedSegment {
    /// Start offset in milliseconds
    pub start_ms: TimeMs,
    /// End offset in milliseconds
    pub end_ms: TimeMs,
    /// Caption text
    pub text: String,
    /// Optional word-level spans
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub words: Option<Vec<WordSpan>>,
}

impl TimedSegment {
    /// Creates a segment without word spans
    pub fn new(start_ms: TimeMs, end_ms: TimeMs, text: &str) -> Self {
        Self {
            start_ms,
            end_ms,
            text: text.to_string(),
            words: None,
        }
    }

    /// Attaches word spans to this segment
    pub fn with_words(mut self, words: Vec<WordSpan>) -> Self {
        self.words = Some(words);
        self
    }

    /// Duration in milliseconds (zero if the bounds are inverted)
    pub fn duration_ms(&self) -> TimeMs {
        self.end_ms.saturating_sub(self.start_ms)
    }

    /// Returns true if the timestamp falls inside the inclusive window
    pub fn contains(&self, ts_ms: TimeMs) -> bool {
        ts_ms >= self.start_ms && ts_ms <= self.end_ms
    }

    /// Replaces the text and collapses word timing to one span over the segment
    pub fn set_text(&mut self, text: &str) {
        self.text = text.to_string();
        self.words = Some(vec![WordSpan::new(
            text,
            self.start_ms as f64,
            self.end_ms.max(self.start_ms) as f64,
        )]);
    }
}

// =============================================================================
// Subtitle Track
// =============================================================================

/// The ordered list of segments the editor is working on
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtitleTrack {
    /// Unique identifier
    pub id: TrackId,
    /// Display name
    pub name: String,
    /// Language code (e.g., "en", "ko", "ja")
    pub language: String,
    /// Segments in source order (never re-sorted)
    pub segments: Vec<TimedSegment>,
}

impl SubtitleTrack {
    /// Creates a new, empty track
    pub fn new(id: &str, name: &str, language: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            language: language.to_string(),
            segments: Vec::new(),
        }
    }

    /// Creates a track with auto-generated ID
    pub fn create(name: &str, language: &str) -> Self {
        Self::new(&ulid::Ulid::new().to_string(), name, language)
    }

    /// Replaces every segment at once
    pub fn replace_segments(&mut self, segments: Vec<TimedSegment>) {
        self.segments = segments;
    }

    /// Edits the text of one segment in place
    pub fn edit_text(&mut self, index: usize, text: &str) -> CoreResult<()> {
        let len = self.segments.len();
        let segment = self
            .segments
            .get_mut(index)
            .ok_or(CoreError::SegmentOutOfRange { index, len })?;
        segment.set_text(text);
        Ok(())
    }

    /// Returns the full text of all segments
    pub fn full_text(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Latest end offset across all segments
    pub fn end_ms(&self) -> TimeMs {
        self.segments.iter().map(|s| s.end_ms).max().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl Default for SubtitleTrack {
    fn default() -> Self {
        Self::create("Subtitles", "en")
    }
}

// =============================================================================
// Tests
// =============================================================================
