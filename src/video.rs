//! The video being grabbed and its per-session results.
//!
//! A [`Video`] identifies the source file and carries everything a session
//! accumulates: progress, grabbed frame paths, color palette, and the time
//! range grabbed so far. The controller resets this state at the start of
//! every session.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::canvas::Size;
use crate::color::Palette;
use crate::configuration::ImageFormat;
use crate::error::GrabError;
use crate::progress::Progress;

/// A span of the video timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    /// Start, inclusive.
    pub start: Duration,
    /// End, exclusive.
    pub end: Duration,
}

impl TimeRange {
    /// Create a range.
    ///
    /// # Errors
    ///
    /// Returns [`GrabError::InvalidRange`] unless `start < end`.
    pub fn new(start: Duration, end: Duration) -> Result<Self, GrabError> {
        if start >= end {
            return Err(GrabError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// `end - start`.
    pub fn length(&self) -> Duration {
        self.end.saturating_sub(self.start)
    }
}

/// Which part of the video a session grabs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VideoRange {
    /// The whole timeline.
    #[default]
    Full,
    /// A user-selected excerpt.
    Excerpt(TimeRange),
}

/// A source video plus the results of its latest grab session.
///
/// # Example
///
/// ```
/// use std::time::Duration;
///
/// use framegrab::{Size, Video};
///
/// let video = Video::new("clips/MyVideo.mov", Duration::from_secs(20), Size::new(1920, 1080))
///     .with_export_directory("/tmp/grabs");
/// assert_eq!(video.title, "MyVideo");
/// assert_eq!(
///     video.grab_directory().unwrap(),
///     std::path::Path::new("/tmp/grabs/MyVideo"),
/// );
/// ```
#[derive(Debug, Clone)]
pub struct Video {
    /// Path of the source media file.
    pub path: PathBuf,
    /// Title used to name every produced file.
    pub title: String,
    /// Total duration.
    pub duration: Duration,
    /// Native frame size.
    pub resolution: Size,
    /// Portion of the timeline to grab.
    pub range: VideoRange,
    /// Where grabs and strips are written. Must be set before grabbing.
    pub export_directory: Option<PathBuf>,
    /// Size of the source file in bytes, if known.
    pub file_size: Option<u64>,
    progress: Progress,
    frames: Vec<PathBuf>,
    palette: Palette,
    grabbed_range: Option<TimeRange>,
}

impl Video {
    /// Describe the video at `path`.
    ///
    /// The title defaults to the file stem and the file size is read from
    /// disk when the file exists.
    pub fn new<P: AsRef<Path>>(path: P, duration: Duration, resolution: Size) -> Self {
        let path = path.as_ref().to_path_buf();
        let title = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Untitled".to_string());
        let file_size = fs::metadata(&path).ok().map(|metadata| metadata.len());

        Self {
            path,
            title,
            duration,
            resolution,
            range: VideoRange::Full,
            export_directory: None,
            file_size,
            progress: Progress::default(),
            frames: Vec::new(),
            palette: Palette::default(),
            grabbed_range: None,
        }
    }

    /// Override the title.
    #[must_use]
    pub fn with_title<S: Into<String>>(mut self, title: S) -> Self {
        self.title = title.into();
        self
    }

    /// Grab only `range` instead of the whole timeline.
    #[must_use]
    pub fn with_range(mut self, range: VideoRange) -> Self {
        self.range = range;
        self
    }

    /// Set the export directory.
    #[must_use]
    pub fn with_export_directory<P: Into<PathBuf>>(mut self, directory: P) -> Self {
        self.export_directory = Some(directory.into());
        self
    }

    /// Override the file size.
    #[must_use]
    pub fn with_file_size(mut self, bytes: u64) -> Self {
        self.file_size = Some(bytes);
        self
    }

    /// Attach frames grabbed earlier, e.g. to rebuild a summary from disk.
    #[must_use]
    pub fn with_frames(mut self, frames: Vec<PathBuf>) -> Self {
        self.frames = frames;
        self
    }

    /// Progress of the latest session.
    pub fn progress(&self) -> Progress {
        self.progress
    }

    /// Grabbed frame files, in grab order.
    pub fn frames(&self) -> &[PathBuf] {
        &self.frames
    }

    /// Color samples of the latest session.
    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Span from the range start to the last frame grabbed successfully.
    pub fn grabbed_range(&self) -> Option<TimeRange> {
        self.grabbed_range
    }

    /// The span a session will grab, validated against the duration.
    ///
    /// # Errors
    ///
    /// Returns [`GrabError::InvalidRange`] for an empty range, or
    /// [`GrabError::RangeOutOfBounds`] for an excerpt past the end.
    pub fn working_range(&self) -> Result<TimeRange, GrabError> {
        match self.range {
            VideoRange::Full => TimeRange::new(Duration::ZERO, self.duration),
            VideoRange::Excerpt(excerpt) => {
                let excerpt = TimeRange::new(excerpt.start, excerpt.end)?;
                if excerpt.end > self.duration {
                    return Err(GrabError::RangeOutOfBounds {
                        end: excerpt.end,
                        duration: self.duration,
                    });
                }
                Ok(excerpt)
            }
        }
    }

    /// Directory grabbed frames are written to: `<export>/<title>`.
    pub fn grab_directory(&self) -> Option<PathBuf> {
        self.export_directory
            .as_ref()
            .map(|directory| directory.join(&self.title))
    }

    /// Destination of the strip image: `<export>/<title>.Strip.<ext>`.
    pub fn strip_path(&self, format: ImageFormat) -> Option<PathBuf> {
        self.export_directory.as_ref().map(|directory| {
            directory.join(format!("{}.Strip.{}", self.title, format.extension()))
        })
    }

    /// Clear session results before a new grab.
    pub(crate) fn reset_session(&mut self, range: TimeRange, total: u64, color_capacity: usize) {
        self.progress = Progress::new(total);
        self.frames.clear();
        self.palette = Palette::new(color_capacity);
        self.grabbed_range = Some(TimeRange {
            start: range.start,
            end: range.start,
        });
    }

    pub(crate) fn progress_mut(&mut self) -> &mut Progress {
        &mut self.progress
    }

    pub(crate) fn palette_mut(&mut self) -> &mut Palette {
        &mut self.palette
    }

    pub(crate) fn push_frame(&mut self, path: PathBuf) {
        self.frames.push(path);
    }

    pub(crate) fn extend_grabbed_range(&mut self, timecode: Duration) {
        if let Some(range) = self.grabbed_range.as_mut() {
            range.end = range.end.max(timecode);
        }
    }

    pub(crate) fn reset_progress(&mut self) {
        self.progress = Progress::default();
    }
}
