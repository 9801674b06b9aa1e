//! Summary grid layout and rendering tests.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use framegrab::{
    Canvas, Color, GrabError, GridLayout, ImageFormat, Rect, Size, SummaryBuilder, TextStyle,
    Video,
    summary::{CELL_WIDTH, header_lines},
    timecode::label_from_file_name,
};
use image::{DynamicImage, Rgb, RgbImage};

/// Records draw calls instead of rasterizing them.
#[derive(Default)]
struct RecordingCanvas {
    size: Size,
    texts: Vec<(Rect, String)>,
    images: Vec<Rect>,
}

impl Canvas for RecordingCanvas {
    fn create(size: Size) -> Self {
        Self {
            size,
            ..Self::default()
        }
    }

    fn size(&self) -> Size {
        self.size
    }

    fn fill(&mut self, _rect: Rect, _color: Color) {}

    fn draw_text(&mut self, rect: Rect, text: &str, _style: &TextStyle) {
        self.texts.push((rect, text.to_string()));
    }

    fn draw_image(&mut self, _image: &DynamicImage, rect: Rect) {
        self.images.push(rect);
    }

    fn encode(&self, _format: ImageFormat, _jpeg_quality: u8) -> Result<Vec<u8>, GrabError> {
        Ok(Vec::new())
    }
}

fn frame_image() -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(32, 18, Rgb([90, 60, 30])))
}

fn write_frames(directory: &Path, title: &str, count: u64, width: u32, height: u32) -> Vec<PathBuf> {
    (0..count)
        .map(|index| {
            let path = directory.join(format!("{title}.00.00.{:02}.000.png", index * 5));
            RgbImage::from_pixel(width, height, Rgb([index as u8 * 20, 100, 150]))
                .save(&path)
                .unwrap();
            path
        })
        .collect()
}

// ── Labels ─────────────────────────────────────────────────────────

#[test]
fn label_from_timecoded_name() {
    assert_eq!(
        label_from_file_name("MyVideo.01.45.00.00.jpeg", "MyVideo").as_deref(),
        Some("01:45:00")
    );
}

#[test]
fn label_from_bad_token_is_none() {
    assert_eq!(label_from_file_name("MyVideo.badtoken.jpeg", "MyVideo"), None);
}

#[test]
fn label_with_dotted_title() {
    assert_eq!(
        label_from_file_name("/grabs/My.Video.00.00.05.000.png", "My.Video").as_deref(),
        Some("00:00:05")
    );
}

// ── Layout ─────────────────────────────────────────────────────────

#[test]
fn seven_frames_make_three_rows() {
    let layout = GridLayout::new(7, 16.0 / 9.0);
    assert_eq!(layout.columns, 3);
    assert_eq!(layout.rows, 3);
    assert_eq!(layout.cell, Size::new(CELL_WIDTH, 225));
    assert_eq!(layout.canvas, Size::new(1240, 865));
}

#[test]
fn cells_run_left_to_right_then_down() {
    let layout = GridLayout::new(7, 16.0 / 9.0);
    assert_eq!(layout.cell_rect(0), Rect::new(10, 110, 400, 225));
    assert_eq!(layout.cell_rect(2), Rect::new(830, 110, 400, 225));
    assert_eq!(layout.cell_rect(4), Rect::new(420, 345, 400, 225));
    assert_eq!(layout.cell_rect(6), Rect::new(10, 580, 400, 225));
}

#[test]
fn cells_stay_inside_canvas() {
    let layout = GridLayout::new(10, 4.0 / 3.0);
    for index in 0..10 {
        let rect = layout.cell_rect(index);
        assert!(rect.right() <= layout.canvas.width);
        assert!(rect.bottom() <= layout.canvas.height);
        let label = layout.label_rect(rect);
        assert!(label.x >= rect.x && label.right() <= rect.right());
        assert!(label.y >= rect.y && label.bottom() <= rect.bottom());
    }
}

// ── Header ─────────────────────────────────────────────────────────

#[test]
fn header_describes_video() {
    let video = Video::new("MyVideo.mov", Duration::from_secs(6300), Size::new(1920, 1080))
        .with_file_size(12_300_000);
    assert_eq!(
        header_lines(&video),
        vec![
            "Resolution: 1920\u{00d7}1080".to_string(),
            "Duration: 01:45:00".to_string(),
            "File size: 12.3 MB".to_string(),
            "Title: MyVideo".to_string(),
        ]
    );
}

// ── Rendering ──────────────────────────────────────────────────────

#[test]
fn unlabelled_frame_is_still_drawn() {
    let video = Video::new("MyVideo.mp4", Duration::from_secs(20), Size::new(1920, 1080))
        .with_frames(vec![
            PathBuf::from("MyVideo.00.00.00.000.png"),
            PathBuf::from("MyVideo.badtoken.png"),
            PathBuf::from("MyVideo.00.00.10.000.png"),
        ]);
    let layout = GridLayout::new(3, 16.0 / 9.0);
    let cells = vec![Some(frame_image()), Some(frame_image()), Some(frame_image())];

    let mut canvas = RecordingCanvas::create(layout.canvas);
    SummaryBuilder::render(&mut canvas, &layout, &video, &cells);

    assert_eq!(
        canvas.images,
        vec![layout.cell_rect(0), layout.cell_rect(1), layout.cell_rect(2)]
    );
    let labels: Vec<&str> = canvas
        .texts
        .iter()
        .filter(|(rect, _)| rect.y >= layout.cell_rect(0).y)
        .map(|(_, text)| text.as_str())
        .collect();
    assert_eq!(labels, vec!["00:00:00", "00:00:10"]);
}

#[test]
fn missing_cell_keeps_its_position() {
    let video = Video::new("MyVideo.mp4", Duration::from_secs(20), Size::new(1920, 1080))
        .with_frames(vec![
            PathBuf::from("MyVideo.00.00.00.000.png"),
            PathBuf::from("MyVideo.00.00.05.000.png"),
        ]);
    let layout = GridLayout::new(2, 16.0 / 9.0);
    let cells = vec![None, Some(frame_image())];

    let mut canvas = RecordingCanvas::create(layout.canvas);
    SummaryBuilder::render(&mut canvas, &layout, &video, &cells);

    assert_eq!(canvas.images, vec![layout.cell_rect(1)]);
}

#[test]
fn header_is_drawn_above_the_grid() {
    let video = Video::new("MyVideo.mp4", Duration::from_secs(20), Size::new(640, 360))
        .with_frames(vec![PathBuf::from("MyVideo.00.00.00.000.png")]);
    let layout = GridLayout::new(1, 16.0 / 9.0);

    let mut canvas = RecordingCanvas::create(layout.canvas);
    SummaryBuilder::render(&mut canvas, &layout, &video, &[Some(frame_image())]);

    let header: Vec<&(Rect, String)> = canvas
        .texts
        .iter()
        .filter(|(rect, _)| rect.bottom() <= layout.cell_rect(0).y)
        .collect();
    assert_eq!(header.len(), 4);
    assert!(header[3].1.ends_with("MyVideo"));
}

// ── Writing ────────────────────────────────────────────────────────

#[test]
fn writes_jpeg_beside_first_frame() {
    let directory = tempfile::tempdir().unwrap();
    let frames = write_frames(directory.path(), "MyVideo", 7, 64, 36);
    let video = Video::new("MyVideo.mp4", Duration::from_secs(35), Size::new(1920, 1080))
        .with_frames(frames);

    let summary = SummaryBuilder::new().create_summary_image(&video).unwrap();

    assert_eq!(summary, directory.path().join("MyVideo.jpeg"));
    assert_eq!(SummaryBuilder::summary_path(&video), Some(summary.clone()));
    assert_eq!(image::image_dimensions(&summary).unwrap(), (1240, 865));
    assert_eq!(
        image::ImageFormat::from_path(&summary).unwrap(),
        image::ImageFormat::Jpeg
    );
}

#[test]
fn unknown_resolution_uses_first_frame() {
    let directory = tempfile::tempdir().unwrap();
    let frames = write_frames(directory.path(), "Square", 2, 50, 50);
    let video = Video::new("Square.mp4", Duration::from_secs(10), Size::new(0, 0))
        .with_frames(frames);

    let summary = SummaryBuilder::new().create_summary_image(&video).unwrap();
    assert_eq!(image::image_dimensions(&summary).unwrap(), (1240, 570));
}

#[test]
fn unreadable_frames_are_skipped() {
    let directory = tempfile::tempdir().unwrap();
    let mut frames = write_frames(directory.path(), "MyVideo", 1, 64, 36);
    let broken = directory.path().join("MyVideo.00.00.05.000.png");
    std::fs::write(&broken, b"garbage").unwrap();
    frames.push(broken);
    let video = Video::new("MyVideo.mp4", Duration::from_secs(10), Size::new(1920, 1080))
        .with_frames(frames);

    let summary = SummaryBuilder::new().create_summary_image(&video).unwrap();
    assert!(summary.exists());
}

#[test]
fn no_frames_is_an_error() {
    let video = Video::new("MyVideo.mp4", Duration::from_secs(10), Size::new(1920, 1080));
    let result = SummaryBuilder::new().create_summary_image(&video);
    assert!(matches!(result, Err(GrabError::NoImagesFound)));
}

#[test]
fn all_frames_unreadable_is_an_error() {
    let directory = tempfile::tempdir().unwrap();
    let broken = directory.path().join("MyVideo.00.00.00.000.png");
    std::fs::write(&broken, b"garbage").unwrap();
    let video = Video::new("MyVideo.mp4", Duration::from_secs(10), Size::new(1920, 1080))
        .with_frames(vec![broken]);

    let result = SummaryBuilder::new().create_summary_image(&video);
    assert!(matches!(result, Err(GrabError::NoImagesFound)));
    assert!(!directory.path().join("MyVideo.jpeg").exists());
}
