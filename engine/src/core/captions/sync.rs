//! Playback Sync
//!
//! Pure lookups from a playback timestamp to the segment and word on screen.
//! Nothing is cached between calls; callers pass the current segment list
//! on every tick.
//!
//! Bounds are inclusive. When two entries touch at a shared boundary the
//! instant belongs to the one that starts there: the scan prefers the first
//! half-open match `start <= ts < end` and falls back to the first inclusive
//! match only for `ts == end`.

use serde::Serialize;

use super::{TimedSegment, WordSpan};
use crate::core::TimeMs;

// =============================================================================
// Lookups
// =============================================================================

/// Finds the segment on screen at `ts_ms`, with its index
pub fn active_segment(segments: &[TimedSegment], ts_ms: TimeMs) -> Option<(usize, &TimedSegment)> {
    segments
        .iter()
        .enumerate()
        .find(|(_, s)| s.start_ms <= ts_ms && ts_ms < s.end_ms)
        .or_else(|| segments.iter().enumerate().find(|(_, s)| s.contains(ts_ms)))
}

/// Finds the word of `segment` being spoken at `ts_ms`, with its index
pub fn active_word(segment: &TimedSegment, ts_ms: TimeMs) -> Option<(usize, &WordSpan)> {
    let words = segment.words.as_deref()?;
    let ts = ts_ms as f64;

    words
        .iter()
        .enumerate()
        .find(|(_, w)| w.start_ms <= ts && ts < w.end_ms)
        .or_else(|| words.iter().enumerate().find(|(_, w)| w.contains(ts)))
}

/// Text to display at `ts_ms`, or an empty string between segments
pub fn display_text(segments: &[TimedSegment], ts_ms: TimeMs) -> String {
    active_segment(segments, ts_ms)
        .map(|(_, segment)| segment.text.clone())
        .unwrap_or_default()
}

/// The active word followed by the rest of its segment and the next segment
///
/// Drives the rolling word preview. Returns nothing when no segment is
/// active. Between the words of the active segment only the next segment's
/// words are returned.
pub fn upcoming_words(segments: &[TimedSegment], ts_ms: TimeMs) -> Vec<&WordSpan> {
    let Some((segment_index, segment)) = active_segment(segments, ts_ms) else {
        return Vec::new();
    };

    let mut upcoming: Vec<&WordSpan> = match (segment.words.as_deref(), active_word(segment, ts_ms)) {
        (Some(words), Some((from, _))) => words[from..].iter().collect(),
        _ => Vec::new(),
    };

    if let Some(next_words) = segments
        .get(segment_index + 1)
        .and_then(|next| next.words.as_deref())
    {
        upcoming.extend(next_words.iter());
    }

    upcoming
}

// =============================================================================
// Playback Frame
// =============================================================================

/// Everything the player needs to draw one tick
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackFrame {
    pub text: String,
    pub segment_index: Option<usize>,
    pub word_index: Option<usize>,
    /// Rolling preview text, see [`upcoming_words`]
    pub upcoming: Vec<String>,
}

/// Resolves segment and word for one timestamp
pub fn sync_at(segments: &[TimedSegment], ts_ms: TimeMs) -> PlaybackFrame {
    match active_segment(segments, ts_ms) {
        Some((segment_index, segment)) => PlaybackFrame {
            text: segment.text.clone(),
            segment_index: Some(segment_index),
            word_index: active_word(segment, ts_ms).map(|(i, _)| i),
            upcoming: upcoming_words(segments, ts_ms)
                .into_iter()
                .map(|word| word.text.clone())
                .collect(),
        },
        None => PlaybackFrame::default(),
    }
}

// =============================================================================
// Tests
// =============================================================================
