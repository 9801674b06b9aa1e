//! Error types for the `framegrab` crate.
//!
//! This module defines [`GrabError`], the unified error type returned by all
//! fallible operations in the crate. Errors carry a human-readable
//! description through [`Display`](std::fmt::Display) and an optional
//! [`failure_reason`](GrabError::failure_reason) suited for a second line in
//! an alert.

use std::{io::Error as IoError, path::PathBuf, time::Duration};

#[cfg(feature = "ffmpeg")]
use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use thiserror::Error;

/// The unified error type for all `framegrab` operations.
///
/// Every public method that can fail returns `Result<T, GrabError>`.
/// Variants carry enough context to diagnose the problem without needing
/// additional logging at the call site.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GrabError {
    /// No export directory has been chosen for the video.
    #[error("No export directory selected for \"{title}\"")]
    MissingExportDirectory {
        /// Title of the video the action was requested for.
        title: String,
    },

    /// A grab period of zero was provided.
    #[error("Grab period must be greater than zero")]
    InvalidPeriod,

    /// A range's start value is greater than or equal to its end value.
    #[error("Invalid range: start ({start:?}) must be less than end ({end:?})")]
    InvalidRange {
        /// The start of the range.
        start: Duration,
        /// The end of the range.
        end: Duration,
    },

    /// The selected range ends past the end of the video.
    #[error("Range end {end:?} exceeds the video duration {duration:?}")]
    RangeOutOfBounds {
        /// The end of the requested range.
        end: Duration,
        /// The video duration.
        duration: Duration,
    },

    /// The frame extractor reported a failure.
    #[error("Failed to grab frames: {0}")]
    ExtractionFailed(String),

    /// The media file could not be opened.
    #[error("Failed to open media file at {path}: {reason}")]
    FileOpen {
        /// Path of the media file.
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The file does not contain a video stream.
    #[error("No video stream found in file")]
    NoVideoStream,

    /// A video frame could not be decoded.
    #[error("Failed to decode video frame: {0}")]
    VideoDecodeError(String),

    /// An error originating from the FFmpeg libraries.
    #[cfg(feature = "ffmpeg")]
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// A strip was requested for an empty color sequence.
    #[error("Cannot build a strip from an empty color sequence")]
    EmptyPalette,

    /// The summary builder found no usable frame images.
    #[error("No images found to build the summary")]
    NoImagesFound,

    /// The requested output format cannot be encoded.
    #[error("Unsupported image format: {0}")]
    UnsupportedImageFormat(String),

    /// The video reports a zero-sized resolution and no fallback exists.
    #[error("Invalid resolution {width}x{height}")]
    InvalidResolution {
        /// Reported width.
        width: u32,
        /// Reported height.
        height: u32,
    },

    /// Preferences could not be parsed or hold an invalid value.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// An error from the `image` crate while decoding or encoding.
    #[error("Image processing error: {0}")]
    ImageError(#[from] ImageError),

    /// The operation was cancelled.
    #[error("Operation cancelled")]
    Cancelled,

    /// The controller task is no longer running.
    #[error("Grab controller has shut down")]
    ControllerClosed,

    /// Something went wrong that has no useful description for a user.
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl GrabError {
    /// A short explanation of why the operation failed, if one is known.
    pub fn failure_reason(&self) -> Option<String> {
        match self {
            GrabError::MissingExportDirectory { .. } => {
                Some("Choose an export directory before grabbing frames.".to_string())
            }
            GrabError::InvalidPeriod => Some("Set a period of at least one millisecond.".to_string()),
            GrabError::InvalidRange { .. } | GrabError::RangeOutOfBounds { .. } => {
                Some("Select a time range inside the video.".to_string())
            }
            GrabError::FileOpen { reason, .. } => Some(reason.clone()),
            GrabError::IoError(error) => Some(error.kind().to_string()),
            GrabError::UnsupportedImageFormat(_) => {
                Some("Pick JPEG, PNG, TIFF or BMP as the export format.".to_string())
            }
            GrabError::NoImagesFound => {
                Some("The grabbed frames could not be read back from disk.".to_string())
            }
            _ => None,
        }
    }

    /// Whether this error should be shown to a user.
    ///
    /// Errors that return `false` are logged by the controller and otherwise
    /// swallowed.
    pub fn is_user_facing(&self) -> bool {
        !matches!(
            self,
            GrabError::Unexpected(_) | GrabError::Cancelled | GrabError::ControllerClosed
        )
    }
}

#[cfg(feature = "ffmpeg")]
impl From<FfmpegError> for GrabError {
    fn from(error: FfmpegError) -> Self {
        GrabError::FfmpegError(error.to_string())
    }
}
