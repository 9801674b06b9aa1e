//! Timecode formatting and frame file naming.
//!
//! Grabbed frames are named `<title>.HH.MM.SS.mmm.<ext>`. The summary
//! builder reads the first three dot-separated components after the title
//! back into an `HH:MM:SS` label.

use std::{path::Path, time::Duration};

use crate::configuration::ImageFormat;

/// Shortest usable grab period. File tokens resolve milliseconds, so
/// anything shorter would give two grabs the same file name.
pub const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Format a duration as `HH:MM:SS`, truncating sub-second parts.
///
/// ```
/// use std::time::Duration;
///
/// assert_eq!(framegrab::timecode::format_clock(Duration::from_secs(6300)), "01:45:00");
/// ```
pub fn format_clock(duration: Duration) -> String {
    let total = duration.as_secs();
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

/// Dot-separated `HH.MM.SS.mmm` token used inside frame file names.
pub fn file_token(timecode: Duration) -> String {
    let total = timecode.as_secs();
    format!(
        "{:02}.{:02}.{:02}.{:03}",
        total / 3600,
        (total % 3600) / 60,
        total % 60,
        timecode.subsec_millis()
    )
}

/// File name of the frame grabbed at `timecode`.
pub fn frame_file_name(title: &str, timecode: Duration, format: ImageFormat) -> String {
    format!("{title}.{}.{}", file_token(timecode), format.extension())
}

/// Recover an `HH:MM:SS` label from a frame file name.
///
/// The extension and the leading `title.` are removed; the first three
/// remaining dot-separated components become the label. Returns `None` if
/// fewer than three components remain.
///
/// ```
/// use framegrab::timecode::label_from_file_name;
///
/// assert_eq!(
///     label_from_file_name("MyVideo.01.45.00.00.jpeg", "MyVideo").as_deref(),
///     Some("01:45:00"),
/// );
/// assert_eq!(label_from_file_name("MyVideo.badtoken.jpeg", "MyVideo"), None);
/// ```
pub fn label_from_file_name<P: AsRef<Path>>(path: P, title: &str) -> Option<String> {
    let stem = path.as_ref().file_stem()?.to_str()?;

    let token = match stem.strip_prefix(title).and_then(|rest| rest.strip_prefix('.')) {
        Some(rest) => rest,
        None => stem.split_once('.')?.1,
    };

    let mut components = token.split('.');
    let hours = components.next()?;
    let minutes = components.next()?;
    let seconds = components.next()?;
    Some(format!("{hours}:{minutes}:{seconds}"))
}

/// Number of grabs taken every `period` across `length`, the first at zero.
///
/// A 20 s range at a 5 s period yields 4 grabs (0, 5, 10, 15). Returns 0
/// for a zero period.
pub fn expected_frame_count(length: Duration, period: Duration) -> u64 {
    let period_nanos = period.as_nanos();
    if period_nanos == 0 {
        return 0;
    }
    length.as_nanos().div_ceil(period_nanos) as u64
}

/// Human-readable byte count using decimal units, e.g. `12.3 MB`.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["bytes", "KB", "MB", "GB", "TB"];
    if bytes < 1000 {
        return format!("{bytes} bytes");
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}
