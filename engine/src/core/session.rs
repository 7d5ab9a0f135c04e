//! Editor Session
//!
//! Owns the state one editing session works on: the subtitle track, the
//! style, and the loaded video. All mutation goes through these methods;
//! everything else reads snapshots.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::core::captions::transcribe::{chunks_to_segments, TranscriptOutput};
use crate::core::captions::{
    export_ass, export_srt, parse_srt, sync_at, with_word_timing, AssOptions, PlaybackFrame,
    SubtitleTrack, TimedSegment,
};
use crate::core::render::{calculate_crop, AspectPreset, CropSettings, ExportRequest};
use crate::core::style::StyleController;
use crate::core::{CoreError, CoreResult, TimeMs, TimeSec, VideoInfo};

/// Player time in seconds to the millisecond used for lookups
///
/// Floors so that comparisons against whole-millisecond segment bounds give
/// the same answer as comparing the fractional time directly.
pub fn playback_ms(seconds: TimeSec) -> TimeMs {
    if !seconds.is_finite() || seconds <= 0.0 {
        return 0;
    }
    (seconds * 1000.0).floor() as TimeMs
}

/// State of one editing session
#[derive(Clone, Debug)]
pub struct EditorSession {
    track: SubtitleTrack,
    style: StyleController,
    video: Option<VideoInfo>,
    source: Option<PathBuf>,
    engine_ready: bool,
}

impl EditorSession {
    /// Creates an empty session styled with `preset`
    pub fn new(preset: &str) -> CoreResult<Self> {
        Ok(Self {
            track: SubtitleTrack::default(),
            style: StyleController::new(preset)?,
            video: None,
            source: None,
            engine_ready: false,
        })
    }

    // -------------------------------------------------------------------------
    // Subtitles
    // -------------------------------------------------------------------------

    /// Replaces the track with the segments parsed from SubRip text
    ///
    /// Returns the number of segments loaded.
    pub fn load_srt(&mut self, content: &str) -> usize {
        let segments = with_word_timing(parse_srt(content));
        if segments.is_empty() {
            warn!("No subtitle blocks found in input");
        }
        info!("Loaded {} subtitle segments", segments.len());
        self.track.replace_segments(segments);
        self.track.len()
    }

    /// Replaces the track with already-built segments
    pub fn set_segments(&mut self, segments: Vec<TimedSegment>) {
        self.track.replace_segments(segments);
    }

    /// Replaces the track with a recognizer's output
    pub fn apply_transcript(&mut self, output: &TranscriptOutput) -> usize {
        let segments = chunks_to_segments(&output.chunks);
        info!(
            "Applied transcript: {} chunks -> {} segments",
            output.chunks.len(),
            segments.len()
        );
        self.track.replace_segments(segments);
        self.track.len()
    }

    /// Edits one segment's text; its word timing collapses to one span
    pub fn edit_segment_text(&mut self, index: usize, text: &str) -> CoreResult<()> {
        self.track.edit_text(index, text)?;
        debug!("Edited segment {}", index);
        Ok(())
    }

    pub fn track(&self) -> &SubtitleTrack {
        &self.track
    }

    pub fn segments(&self) -> &[TimedSegment] {
        &self.track.segments
    }

    // -------------------------------------------------------------------------
    // Style
    // -------------------------------------------------------------------------

    pub fn style(&self) -> &StyleController {
        &self.style
    }

    pub fn style_mut(&mut self) -> &mut StyleController {
        &mut self.style
    }

    // -------------------------------------------------------------------------
    // Video
    // -------------------------------------------------------------------------

    /// Records the probed video and where it came from
    pub fn set_video(&mut self, info: VideoInfo, source: &Path) {
        info!(
            "Video loaded: {}x{} {:.2}s @ {} fps",
            info.width, info.height, info.duration_sec, info.fps
        );
        self.video = Some(info);
        self.source = Some(source.to_path_buf());
    }

    pub fn video(&self) -> Option<&VideoInfo> {
        self.video.as_ref()
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Crop rectangle of the loaded video for an aspect preset
    pub fn crop_for(&self, preset: AspectPreset) -> CoreResult<CropSettings> {
        let info = self
            .video
            .as_ref()
            .ok_or_else(|| CoreError::MissingPrerequisite("no video loaded".to_string()))?;
        Ok(calculate_crop(info, preset)?)
    }

    /// Marks whether the video engine finished loading
    pub fn set_engine_ready(&mut self, ready: bool) {
        self.engine_ready = ready;
    }

    pub fn engine_ready(&self) -> bool {
        self.engine_ready
    }

    // -------------------------------------------------------------------------
    // Export
    // -------------------------------------------------------------------------

    /// Checks everything an export needs before any work starts
    pub fn export_readiness(&self) -> CoreResult<()> {
        if self.video.is_none() || self.source.is_none() {
            return Err(CoreError::MissingPrerequisite("no video loaded".to_string()));
        }
        if self.track.is_empty() {
            return Err(CoreError::MissingPrerequisite(
                "no subtitles loaded".to_string(),
            ));
        }
        if !self.engine_ready {
            return Err(CoreError::MissingPrerequisite(
                "video engine not ready".to_string(),
            ));
        }
        Ok(())
    }

    /// Export request for the current state with default encode options
    pub fn export_request(&self) -> CoreResult<ExportRequest> {
        self.export_readiness()?;
        match (&self.video, &self.source) {
            (Some(video), Some(source)) => {
                let video_end_ms = (video.duration_sec * 1000.0).round() as TimeMs;
                if self.track.end_ms() > video_end_ms {
                    warn!(
                        "Subtitles run until {} ms but the video ends at {} ms",
                        self.track.end_ms(),
                        video_end_ms
                    );
                }
                Ok(ExportRequest::new(
                    source,
                    video.clone(),
                    self.track.segments.clone(),
                    self.style.current(),
                ))
            }
            _ => Err(CoreError::MissingPrerequisite("no video loaded".to_string())),
        }
    }

    /// What the player shows at `seconds`
    pub fn sync_at(&self, seconds: TimeSec) -> PlaybackFrame {
        sync_at(&self.track.segments, playback_ms(seconds))
    }

    pub fn build_ass(&self, options: AssOptions) -> String {
        export_ass(&self.track.segments, self.style.style(), options)
    }

    pub fn build_srt(&self) -> String {
        export_srt(&self.track.segments)
    }
}

impl Default for EditorSession {
    fn default() -> Self {
        Self {
            track: SubtitleTrack::default(),
            style: StyleController::default(),
            video: None,
            source: None,
            engine_ready: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::captions::transcribe::TranscriptChunk;
    use crate::core::style::HexColor;

    const SRT: &str = "1\n00:00:00,000 --> 00:00:01,000\nHello world\n\n2\n00:00:01,000 --> 00:00:02,000\nSecond line\n";

    fn ready_session() -> EditorSession {
        let mut session = EditorSession::default();
        session.load_srt(SRT);
        session.set_video(VideoInfo::new(1920, 1080, 2.0, 30.0), Path::new("/tmp/in.mp4"));
        session.set_engine_ready(true);
        session
    }

    #[test]
    fn test_playback_ms_floors() {
        assert_eq!(playback_ms(0.9999), 999);
        assert_eq!(playback_ms(1.0), 1000);
        assert_eq!(playback_ms(-3.0), 0);
        assert_eq!(playback_ms(f64::NAN), 0);
    }

    #[test]
    fn test_load_srt_replaces_track() {
        let mut session = EditorSession::default();
        assert_eq!(session.load_srt(SRT), 2);
        assert_eq!(session.segments()[0].words.as_ref().unwrap().len(), 2);

        assert_eq!(session.load_srt("garbage"), 0);
        assert!(session.segments().is_empty());
    }

    #[test]
    fn test_sync_at_boundary() {
        let session = ready_session();
        assert_eq!(session.sync_at(0.999).text, "Hello world");
        assert_eq!(session.sync_at(1.0).text, "Second line");
        assert_eq!(session.sync_at(2.0).text, "Second line");
        assert_eq!(session.sync_at(2.5), PlaybackFrame::default());
    }

    #[test]
    fn test_edit_segment_text() {
        let mut session = ready_session();
        session.edit_segment_text(1, "Changed text here").unwrap();
        let segment = &session.segments()[1];
        assert_eq!(segment.text, "Changed text here");
        assert_eq!(segment.words.as_ref().unwrap().len(), 1);

        assert!(matches!(
            session.edit_segment_text(5, "x"),
            Err(CoreError::SegmentOutOfRange { index: 5, len: 2 })
        ));
    }

    #[test]
    fn test_apply_transcript() {
        let mut session = EditorSession::default();
        let output = TranscriptOutput {
            text: "hi there".to_string(),
            chunks: vec![
                TranscriptChunk::new(0.0, Some(1.5), " hi there "),
                TranscriptChunk::new(1.5, None, "   "),
            ],
        };
        assert_eq!(session.apply_transcript(&output), 1);
        assert_eq!(session.segments()[0].start_ms, 0);
        assert_eq!(session.segments()[0].end_ms, 1500);
        assert_eq!(session.segments()[0].text, "hi there");
    }

    #[test]
    fn test_export_readiness() {
        let mut session = EditorSession::default();
        assert!(matches!(
            session.export_readiness(),
            Err(CoreError::MissingPrerequisite(_))
        ));

        session.set_video(VideoInfo::new(640, 360, 1.0, 30.0), Path::new("in.mp4"));
        assert!(session.export_readiness().is_err());

        session.load_srt(SRT);
        let err = session.export_readiness().unwrap_err();
        assert!(err.to_string().contains("engine"));

        session.set_engine_ready(true);
        assert!(session.engine_ready());
        assert!(session.export_readiness().is_ok());
        assert_eq!(session.video().map(|v| v.width), Some(640));
        assert_eq!(session.source(), Some(Path::new("in.mp4")));
        assert_eq!(session.track().len(), 2);

        let request = session.export_request().unwrap();
        assert_eq!(request.segments.len(), 2);
        assert_eq!(request.source, PathBuf::from("in.mp4"));
    }

    #[test]
    fn test_crop_requires_video() {
        let session = EditorSession::default();
        assert!(matches!(
            session.crop_for(AspectPreset::Vertical),
            Err(CoreError::MissingPrerequisite(_))
        ));

        let crop = ready_session().crop_for(AspectPreset::Vertical).unwrap();
        assert_eq!((crop.width, crop.height, crop.x, crop.y), (607, 1080, 656, 0));
    }

    #[test]
    fn test_build_markup_uses_current_style() {
        let mut session = ready_session();
        session.style_mut().set_primary_color(HexColor::rgb(255, 0, 0));

        let ass = session.build_ass(AssOptions::default());
        assert!(ass.contains("&H0000FF&"));
        assert!(ass.contains("{\\k35}Hello {\\k35}world"));

        let srt = session.build_srt();
        assert!(srt.starts_with("1\n00:00:00,000 --> 00:00:01,000\nHello world\n"));
    }
}
