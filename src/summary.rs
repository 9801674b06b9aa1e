//! Summary grid rendering.
//!
//! A summary is a single JPEG contact sheet: a header describing the video
//! followed by every grabbed frame in a three-column grid, each cell labelled
//! with its timecode.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use framegrab::{Size, SummaryBuilder, Video};
//!
//! let video = Video::new("MyVideo.mp4", Duration::from_secs(20), Size::new(1920, 1080))
//!     .with_frames(vec![
//!         "/tmp/grabs/MyVideo/MyVideo.00.00.00.000.jpeg".into(),
//!         "/tmp/grabs/MyVideo/MyVideo.00.00.05.000.jpeg".into(),
//!     ]);
//! let summary = SummaryBuilder::new().create_summary_image(&video)?;
//! println!("Summary written to {}", summary.display());
//! # Ok::<(), framegrab::GrabError>(())
//! ```

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use fontdue::Font;
use image::{DynamicImage, imageops::FilterType};

use crate::canvas::{Canvas, RasterCanvas, Rect, Size, TextStyle, load_font};
use crate::color::Color;
use crate::configuration::{GrabOptions, ImageFormat};
use crate::error::GrabError;
use crate::timecode::{format_clock, format_file_size, label_from_file_name};
use crate::utilities::write_atomically;
use crate::video::Video;

/// Number of columns in the grid.
pub const COLUMNS: u32 = 3;
/// Width of one grid cell in pixels.
pub const CELL_WIDTH: u32 = 400;
/// Height of the header band.
pub const HEADER_HEIGHT: u32 = 100;
/// Height of the footer band.
pub const FOOTER_HEIGHT: u32 = 50;
/// Gap between cells and around the canvas edge.
pub const MARGIN: u32 = 10;
/// JPEG quality of the summary image.
pub const SUMMARY_JPEG_QUALITY: u8 = 70;

const BACKGROUND: Color = Color::rgb(24, 24, 24);
const LABEL_BACKGROUND: Color = Color::rgb(0, 0, 0);
const HEADER_TEXT_SIZE: f32 = 16.0;
const LABEL_TEXT_SIZE: f32 = 16.0;
const LABEL_WIDTH: u32 = 90;
const LABEL_HEIGHT: u32 = 22;
const LABEL_INSET: u32 = 6;

/// Geometry of a summary grid.
///
/// Cells run left to right, top to bottom. The canvas is
/// `MARGIN + HEADER + rows * (cell + MARGIN) + FOOTER` tall and
/// `MARGIN + COLUMNS * (cell + MARGIN)` wide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLayout {
    /// Number of columns.
    pub columns: u32,
    /// Number of rows.
    pub rows: u32,
    /// Size of every cell.
    pub cell: Size,
    /// Size of the whole canvas.
    pub canvas: Size,
}

impl GridLayout {
    /// Layout for `image_count` cells of the given width/height ratio.
    ///
    /// A non-finite or non-positive `aspect_ratio` is treated as 16:9.
    pub fn new(image_count: usize, aspect_ratio: f64) -> Self {
        let aspect_ratio = if aspect_ratio.is_finite() && aspect_ratio > 0.0 {
            aspect_ratio
        } else {
            16.0 / 9.0
        };
        let cell_height = ((CELL_WIDTH as f64 / aspect_ratio).round() as u32).max(1);
        let rows = (image_count as u32).div_ceil(COLUMNS);

        let width = MARGIN + COLUMNS * (CELL_WIDTH + MARGIN);
        let height = MARGIN + HEADER_HEIGHT + rows * (cell_height + MARGIN) + FOOTER_HEIGHT;

        Self {
            columns: COLUMNS,
            rows,
            cell: Size::new(CELL_WIDTH, cell_height),
            canvas: Size::new(width, height),
        }
    }

    /// Rectangle of cell `index`.
    pub fn cell_rect(&self, index: usize) -> Rect {
        let column = index as u32 % self.columns;
        let row = index as u32 / self.columns;
        Rect::new(
            MARGIN + column * (self.cell.width + MARGIN),
            MARGIN + HEADER_HEIGHT + row * (self.cell.height + MARGIN),
            self.cell.width,
            self.cell.height,
        )
    }

    /// Rectangle of header line `line`, top line first.
    pub fn header_line_rect(&self, line: usize, line_count: usize) -> Rect {
        let line_height = HEADER_HEIGHT / line_count.max(1) as u32;
        Rect::new(
            MARGIN,
            MARGIN + line as u32 * line_height,
            self.canvas.width.saturating_sub(2 * MARGIN),
            line_height,
        )
    }

    /// Rectangle of the timecode label inside `cell`.
    pub fn label_rect(&self, cell: Rect) -> Rect {
        let width = LABEL_WIDTH.min(cell.width);
        let height = LABEL_HEIGHT.min(cell.height);
        Rect::new(
            cell.x + LABEL_INSET.min(cell.width - width),
            (cell.bottom() - height).saturating_sub(LABEL_INSET).max(cell.y),
            width,
            height,
        )
    }
}

/// Lines printed in the summary header.
pub fn header_lines(video: &Video) -> Vec<String> {
    let file_size = video
        .file_size
        .map(format_file_size)
        .unwrap_or_else(|| "unknown".to_string());
    vec![
        format!(
            "Resolution: {}\u{00d7}{}",
            video.resolution.width, video.resolution.height
        ),
        format!("Duration: {}", format_clock(video.duration)),
        format!("File size: {file_size}"),
        format!("Title: {}", video.title),
    ]
}

/// Renders grabbed frames into a summary grid.
#[derive(Clone, Default)]
pub struct SummaryBuilder {
    font: Option<Arc<Font>>,
}

impl SummaryBuilder {
    /// A builder without a font; text draws only its background.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `font` for the header and labels.
    #[must_use]
    pub fn with_font(mut self, font: Arc<Font>) -> Self {
        self.font = Some(font);
        self
    }

    /// A builder using the font configured in `options`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured font cannot be loaded.
    pub fn from_options(options: &GrabOptions) -> Result<Self, GrabError> {
        let font = options.font_path.as_deref().map(load_font).transpose()?;
        Ok(Self { font })
    }

    /// Where [`create_summary_image`](Self::create_summary_image) writes for
    /// `video`: `<title>.jpeg` beside the first frame.
    pub fn summary_path(video: &Video) -> Option<PathBuf> {
        let first = video.frames().first()?;
        let directory = first.parent().unwrap_or_else(|| Path::new(""));
        Some(directory.join(format!("{}.{}", video.title, ImageFormat::Jpeg.extension())))
    }

    /// Render the summary for `video` and write it beside its first frame.
    ///
    /// Frames that cannot be read leave their cell empty. Returns the path
    /// of the written image.
    ///
    /// # Errors
    ///
    /// - [`GrabError::NoImagesFound`] if `video` has no frames or none can
    ///   be read.
    /// - [`GrabError::IoError`] / [`GrabError::ImageError`] if the summary
    ///   cannot be encoded or written.
    pub fn create_summary_image(&self, video: &Video) -> Result<PathBuf, GrabError> {
        let destination = Self::summary_path(video).ok_or(GrabError::NoImagesFound)?;
        let frames = video.frames();

        let aspect_ratio = match video.resolution.aspect_ratio() {
            Some(ratio) => ratio,
            None => first_readable_aspect_ratio(frames).ok_or(GrabError::NoImagesFound)?,
        };
        let layout = GridLayout::new(frames.len(), aspect_ratio);

        log::debug!(
            "Building summary of {} frames ({}x{}) at {}",
            frames.len(),
            layout.canvas.width,
            layout.canvas.height,
            destination.display()
        );

        let cells = load_cells(frames, layout.cell);
        if cells.iter().all(Option::is_none) {
            return Err(GrabError::NoImagesFound);
        }

        let mut canvas = RasterCanvas::create(layout.canvas).with_font(self.font.clone());
        Self::render(&mut canvas, &layout, video, &cells);
        let bytes = canvas.encode(ImageFormat::Jpeg, SUMMARY_JPEG_QUALITY)?;
        write_atomically(&destination, &bytes)?;
        Ok(destination)
    }

    /// Draw the header and every loaded cell of `video` onto `canvas`.
    ///
    /// `cells[i]` is the image for `video.frames()[i]`; `None` leaves the
    /// cell empty. A frame whose file name carries no timecode is drawn
    /// without a label.
    pub fn render<C: Canvas>(
        canvas: &mut C,
        layout: &GridLayout,
        video: &Video,
        cells: &[Option<DynamicImage>],
    ) {
        let size = canvas.size();
        canvas.fill(Rect::new(0, 0, size.width, size.height), BACKGROUND);

        let lines = header_lines(video);
        let header_style = TextStyle::new(HEADER_TEXT_SIZE, Color::WHITE);
        for (index, line) in lines.iter().enumerate() {
            canvas.draw_text(layout.header_line_rect(index, lines.len()), line, &header_style);
        }

        let label_style =
            TextStyle::new(LABEL_TEXT_SIZE, Color::WHITE).with_background(LABEL_BACKGROUND);
        for (index, (frame, cell)) in video.frames().iter().zip(cells).enumerate() {
            let Some(image) = cell else {
                continue;
            };
            let rect = layout.cell_rect(index);
            canvas.draw_image(image, rect);

            match label_from_file_name(frame, &video.title) {
                Some(label) => canvas.draw_text(layout.label_rect(rect), &label, &label_style),
                None => log::debug!("No timecode in {}, drawing without label", frame.display()),
            }
        }
    }
}

fn first_readable_aspect_ratio(frames: &[PathBuf]) -> Option<f64> {
    frames.iter().find_map(|frame| {
        let (width, height) = image::image_dimensions(frame).ok()?;
        Size::new(width, height).aspect_ratio()
    })
}

fn load_cell(frame: &Path, cell: Size) -> Option<DynamicImage> {
    match image::open(frame) {
        Ok(image) => Some(image.resize_to_fill(cell.width, cell.height, FilterType::Triangle)),
        Err(error) => {
            log::warn!("Skipping unreadable frame {}: {error}", frame.display());
            None
        }
    }
}

#[cfg(feature = "rayon")]
fn load_cells(frames: &[PathBuf], cell: Size) -> Vec<Option<DynamicImage>> {
    use ::rayon::iter::{IntoParallelRefIterator, ParallelIterator};

    frames.par_iter().map(|frame| load_cell(frame, cell)).collect()
}

#[cfg(not(feature = "rayon"))]
fn load_cells(frames: &[PathBuf], cell: Size) -> Vec<Option<DynamicImage>> {
    frames.iter().map(|frame| load_cell(frame, cell)).collect()
}
