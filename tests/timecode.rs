//! Timecode formatting, frame naming and frame count tests.

use std::{path::PathBuf, time::Duration};

use framegrab::{
    GrabRequest, ImageFormat, TimeRange,
    timecode::{
        MIN_PERIOD, expected_frame_count, file_token, format_clock, format_file_size,
        frame_file_name, label_from_file_name,
    },
};

#[test]
fn clock_format() {
    assert_eq!(format_clock(Duration::ZERO), "00:00:00");
    assert_eq!(format_clock(Duration::from_millis(65_900)), "00:01:05");
    assert_eq!(format_clock(Duration::from_secs(36_000)), "10:00:00");
}

#[test]
fn file_token_keeps_milliseconds() {
    assert_eq!(file_token(Duration::from_millis(3_723_045)), "01.02.03.045");
}

#[test]
fn frame_names_round_trip_to_labels() {
    let timecode = Duration::from_secs(6300);
    let name = frame_file_name("MyVideo", timecode, ImageFormat::Png);
    assert_eq!(name, "MyVideo.01.45.00.000.png");
    assert_eq!(
        label_from_file_name(&name, "MyVideo").as_deref(),
        Some("01:45:00")
    );
}

#[test]
fn label_without_title_prefix_splits_at_first_dot() {
    assert_eq!(
        label_from_file_name("Renamed.00.10.00.000.jpeg", "MyVideo").as_deref(),
        Some("00:10:00")
    );
}

#[test]
fn label_needs_three_components() {
    assert_eq!(label_from_file_name("MyVideo.00.10.jpeg", "MyVideo"), None);
    assert_eq!(label_from_file_name("MyVideo.jpeg", "MyVideo"), None);
}

#[test]
fn frame_count_covers_the_range() {
    let period = Duration::from_secs(5);
    assert_eq!(expected_frame_count(Duration::from_secs(20), period), 4);
    assert_eq!(expected_frame_count(Duration::from_secs(21), period), 5);
    assert_eq!(expected_frame_count(Duration::from_secs(1), period), 1);
    assert_eq!(expected_frame_count(Duration::ZERO, period), 0);
    assert_eq!(expected_frame_count(Duration::from_secs(20), Duration::ZERO), 0);
}

#[test]
fn file_sizes_use_decimal_units() {
    assert_eq!(format_file_size(999), "999 bytes");
    assert_eq!(format_file_size(1_500), "1.5 KB");
    assert_eq!(format_file_size(12_300_000), "12.3 MB");
    assert_eq!(format_file_size(2_000_000_000), "2.0 GB");
}

// ── Grab timecodes ─────────────────────────────────────────────────

fn request(start: Duration, period: Duration, expected_frames: u64) -> GrabRequest {
    GrabRequest {
        source: PathBuf::from("MyVideo.mp4"),
        title: "MyVideo".to_string(),
        range: TimeRange::new(start, Duration::from_secs(3600)).unwrap(),
        period,
        format: ImageFormat::Jpeg,
        jpeg_quality: 90,
        output_directory: PathBuf::from("grabs"),
        expected_frames,
    }
}

#[test]
fn minimum_period_gives_distinct_file_names() {
    let request = request(Duration::ZERO, MIN_PERIOD, 3);
    let names: Vec<String> = request
        .timecodes()
        .map(|timecode| frame_file_name(&request.title, timecode, request.format))
        .collect();
    assert_eq!(
        names,
        vec![
            "MyVideo.00.00.00.000.jpeg",
            "MyVideo.00.00.00.001.jpeg",
            "MyVideo.00.00.00.002.jpeg",
        ]
    );

    // Below the minimum, two grabs share a name.
    assert_eq!(
        frame_file_name("MyVideo", Duration::ZERO, ImageFormat::Jpeg),
        frame_file_name("MyVideo", Duration::from_micros(500), ImageFormat::Jpeg),
    );
}

#[test]
fn timecodes_do_not_wrap_at_large_indexes() {
    let start = Duration::from_secs(1);
    let request = request(start, Duration::from_nanos(1), (1 << 32) + 1);

    assert_eq!(request.timecodes().next(), Some(start));
    assert_eq!(
        request.timecodes().next_back(),
        Some(start + Duration::from_nanos(1 << 32))
    );
    assert_eq!(
        request.timecode_at(3 << 32),
        start + Duration::from_nanos(3 << 32)
    );
}
