//! Color strip rendering.
//!
//! A strip paints a session's color sequence across one image, first color
//! on the left.
//!
//! # Example
//!
//! ```no_run
//! use framegrab::{Color, ImageFormat, Size, StripBuilder, StripMode};
//!
//! let colors = [Color::rgb(200, 30, 30), Color::rgb(30, 200, 30), Color::rgb(30, 30, 200)];
//! StripBuilder::create(
//!     "MyVideo.Strip.png",
//!     &colors,
//!     Size::new(1280, 128),
//!     StripMode::Linear,
//!     ImageFormat::Png,
//! )?;
//! # Ok::<(), framegrab::GrabError>(())
//! ```

use std::path::Path;

use crate::canvas::{Canvas, RasterCanvas, Rect, Size};
use crate::color::Color;
use crate::configuration::{ImageFormat, StripMode};
use crate::error::GrabError;
use crate::utilities::write_atomically;

/// JPEG quality used by [`StripBuilder::create`].
pub const DEFAULT_STRIP_JPEG_QUALITY: u8 = 90;

/// Renders color sequences into strip images.
pub struct StripBuilder;

impl StripBuilder {
    /// Render `colors` into a strip of `size` and write it to `destination`.
    ///
    /// The write is atomic: on failure nothing is left at `destination`.
    ///
    /// # Errors
    ///
    /// - [`GrabError::EmptyPalette`] if `colors` is empty.
    /// - [`GrabError::InvalidResolution`] if `size` has a zero dimension.
    /// - [`GrabError::UnsupportedImageFormat`] if `format` cannot be encoded.
    /// - [`GrabError::IoError`] if the file cannot be written.
    pub fn create<P: AsRef<Path>>(
        destination: P,
        colors: &[Color],
        size: Size,
        mode: StripMode,
        format: ImageFormat,
    ) -> Result<(), GrabError> {
        Self::create_with_quality(
            destination,
            colors,
            size,
            mode,
            format,
            DEFAULT_STRIP_JPEG_QUALITY,
        )
    }

    /// Like [`create`](StripBuilder::create) with an explicit JPEG quality.
    pub fn create_with_quality<P: AsRef<Path>>(
        destination: P,
        colors: &[Color],
        size: Size,
        mode: StripMode,
        format: ImageFormat,
        jpeg_quality: u8,
    ) -> Result<(), GrabError> {
        let destination = destination.as_ref();
        if size.is_empty() {
            return Err(GrabError::InvalidResolution {
                width: size.width,
                height: size.height,
            });
        }
        // Fail before drawing anything if the format cannot be encoded.
        format.to_image_format()?;

        log::debug!(
            "Building {:?} strip of {} colors ({}x{}) at {}",
            mode,
            colors.len(),
            size.width,
            size.height,
            destination.display()
        );

        let mut canvas = RasterCanvas::create(size);
        Self::render(&mut canvas, colors, mode)?;
        let bytes = canvas.encode(format, jpeg_quality)?;
        write_atomically(destination, &bytes)
    }

    /// Paint `colors` over the whole of `canvas`.
    ///
    /// # Errors
    ///
    /// Returns [`GrabError::EmptyPalette`] if `colors` is empty.
    pub fn render<C: Canvas>(
        canvas: &mut C,
        colors: &[Color],
        mode: StripMode,
    ) -> Result<(), GrabError> {
        if colors.is_empty() {
            return Err(GrabError::EmptyPalette);
        }
        let size = canvas.size();

        match mode {
            StripMode::Linear => {
                for (index, color) in colors.iter().enumerate() {
                    let (start, end) = band_bounds(index, colors.len(), size.width);
                    if end > start {
                        canvas.fill(Rect::new(start, 0, end - start, size.height), *color);
                    }
                }
            }
            StripMode::Gradient => {
                for x in 0..size.width {
                    let color = gradient_color(colors, x, size.width);
                    canvas.fill(Rect::new(x, 0, 1, size.height), color);
                }
            }
        }
        Ok(())
    }
}

/// Horizontal pixel span `[start, end)` of band `index` out of `count`
/// across `width`.
///
/// Bands tile the width exactly; their widths differ by at most one pixel.
pub fn band_bounds(index: usize, count: usize, width: u32) -> (u32, u32) {
    if count == 0 {
        return (0, 0);
    }
    let width = width as u64;
    let count = count as u64;
    let index = index as u64;
    let start = index * width / count;
    let end = (index + 1) * width / count;
    (start as u32, end as u32)
}

fn gradient_color(colors: &[Color], x: u32, width: u32) -> Color {
    if colors.len() == 1 || width <= 1 {
        return colors[0];
    }
    let segments = (colors.len() - 1) as f64;
    let position = x as f64 / (width - 1) as f64 * segments;
    let index = (position.floor() as usize).min(colors.len() - 2);
    colors[index].lerp(colors[index + 1], position - index as f64)
}
