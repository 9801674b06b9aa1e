//! Internal utility functions.
//!
//! Atomic file writes shared by the image builders, plus pixel-data and
//! timestamp helpers for the FFmpeg extractor.

use std::{io::Write, path::Path};

#[cfg(feature = "ffmpeg")]
use std::time::Duration;

#[cfg(feature = "ffmpeg")]
use ffmpeg_next::{Rational, frame::Video as VideoFrame};
use tempfile::NamedTempFile;

use crate::error::GrabError;

/// Write `bytes` to `destination` all-or-nothing.
///
/// The data goes to a temporary file in the destination's directory, which
/// is then renamed over the destination. On failure the temporary file is
/// removed and the destination is left untouched.
pub(crate) fn write_atomically(destination: &Path, bytes: &[u8]) -> Result<(), GrabError> {
    let directory = match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file = NamedTempFile::new_in(directory)?;
    file.write_all(bytes)?;
    file.as_file().sync_all()?;
    file.persist(destination).map_err(|error| error.error)?;
    Ok(())
}

/// Copy pixel data from an FFmpeg video frame into a tightly-packed RGB buffer.
///
/// FFmpeg frames frequently carry per-row padding (stride > width × 3).
/// This function strips that padding so the result can be passed directly to
/// [`image::RgbImage::from_raw`].
#[cfg(feature = "ffmpeg")]
pub(crate) fn frame_to_rgb_buffer(video_frame: &VideoFrame, width: u32, height: u32) -> Vec<u8> {
    let stride = video_frame.stride(0);
    let expected_stride = (width as usize) * 3;
    let data = video_frame.data(0);

    if stride == expected_stride {
        data[..expected_stride * (height as usize)].to_vec()
    } else {
        let mut buffer = Vec::with_capacity(expected_stride * (height as usize));
        for row in 0..(height as usize) {
            let row_start = row * stride;
            buffer.extend_from_slice(&data[row_start..row_start + expected_stride]);
        }
        buffer
    }
}

/// Convert a [`Duration`] to a timestamp in the stream's time base.
#[cfg(feature = "ffmpeg")]
pub(crate) fn duration_to_stream_timestamp(duration: Duration, time_base: Rational) -> i64 {
    let seconds = duration.as_secs_f64();
    let numerator = time_base.numerator() as f64;
    let denominator = time_base.denominator() as f64;
    (seconds * denominator / numerator) as i64
}

/// Rescale a PTS value from stream time base to a [`Duration`].
#[cfg(feature = "ffmpeg")]
pub(crate) fn pts_to_duration(pts: i64, time_base: Rational) -> Duration {
    let seconds = pts as f64 * time_base.numerator() as f64 / time_base.denominator() as f64;
    Duration::from_secs_f64(seconds.max(0.0))
}
