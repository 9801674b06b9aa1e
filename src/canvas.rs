//! Drawing surface used by the strip and summary builders.
//!
//! Builders only talk to the [`Canvas`] trait, so the layout logic does not
//! depend on a particular rasterizer. [`RasterCanvas`] is the bundled backend:
//! an RGBA buffer from the `image` crate with text rasterized by `fontdue`.

use std::{fs, io::Cursor, path::Path, sync::Arc};

use fontdue::{
    Font, FontSettings,
    layout::{CoordinateSystem, Layout, LayoutSettings, TextStyle as GlyphRun},
};
use image::{
    DynamicImage, Rgba, RgbaImage,
    codecs::jpeg::JpegEncoder,
    imageops::{self, FilterType},
};

use crate::color::Color;
use crate::configuration::ImageFormat;
use crate::error::GrabError;

/// Width and height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Size {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Size {
    /// Create a size.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// `true` if either dimension is zero.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Width divided by height, or `None` for an empty size.
    pub fn aspect_ratio(&self) -> Option<f64> {
        if self.is_empty() {
            None
        } else {
            Some(self.width as f64 / self.height as f64)
        }
    }
}

/// An axis-aligned rectangle in canvas pixels, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Rect {
    /// Create a rectangle.
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Exclusive right edge.
    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.width)
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.height)
    }
}

/// How a run of text is drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    /// Font size in pixels.
    pub size: f32,
    /// Glyph color.
    pub color: Color,
    /// Fill painted behind the text rectangle, if any.
    pub background: Option<Color>,
}

impl TextStyle {
    /// Plain text of `size` pixels in `color`.
    pub fn new(size: f32, color: Color) -> Self {
        Self {
            size,
            color,
            background: None,
        }
    }

    /// Paint `color` behind the text rectangle.
    #[must_use]
    pub fn with_background(mut self, color: Color) -> Self {
        self.background = Some(color);
        self
    }
}

/// Minimal 2D drawing capability.
pub trait Canvas {
    /// Create an opaque black canvas of `size`.
    fn create(size: Size) -> Self
    where
        Self: Sized;

    /// Canvas dimensions.
    fn size(&self) -> Size;

    /// Fill `rect` with a solid color. Parts outside the canvas are clipped.
    fn fill(&mut self, rect: Rect, color: Color);

    /// Draw `text` inside `rect`.
    fn draw_text(&mut self, rect: Rect, text: &str, style: &TextStyle);

    /// Draw `image` scaled to cover `rect` (aspect fill, centered crop).
    fn draw_image(&mut self, image: &DynamicImage, rect: Rect);

    /// Encode the canvas. `jpeg_quality` is only used for JPEG.
    fn encode(&self, format: ImageFormat, jpeg_quality: u8) -> Result<Vec<u8>, GrabError>;
}

/// Load a TrueType/OpenType font for [`RasterCanvas`] text.
///
/// # Errors
///
/// Returns [`GrabError::IoError`] if the file cannot be read, or
/// [`GrabError::Configuration`] if it is not a usable font.
pub fn load_font<P: AsRef<Path>>(path: P) -> Result<Arc<Font>, GrabError> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    let font = Font::from_bytes(bytes, FontSettings::default()).map_err(|error| {
        GrabError::Configuration(format!("failed to parse font {}: {error}", path.display()))
    })?;
    Ok(Arc::new(font))
}

/// [`Canvas`] backed by an in-memory RGBA image.
pub struct RasterCanvas {
    image: RgbaImage,
    font: Option<Arc<Font>>,
}

impl RasterCanvas {
    /// Attach a font for [`draw_text`](Canvas::draw_text).
    #[must_use]
    pub fn with_font(mut self, font: Option<Arc<Font>>) -> Self {
        self.font = font;
        self
    }

    /// The pixels drawn so far.
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    fn blend(&mut self, x: u32, y: u32, color: Color, coverage: u8) {
        if x >= self.image.width() || y >= self.image.height() || coverage == 0 {
            return;
        }
        let alpha = coverage as u32;
        let pixel = self.image.get_pixel_mut(x, y);
        let source = color.to_array();
        for channel in 0..3 {
            let background = pixel.0[channel] as u32;
            let foreground = source[channel] as u32;
            pixel.0[channel] = ((foreground * alpha + background * (255 - alpha)) / 255) as u8;
        }
    }
}

impl Canvas for RasterCanvas {
    fn create(size: Size) -> Self {
        Self {
            image: RgbaImage::from_pixel(size.width, size.height, Rgba([0, 0, 0, 255])),
            font: None,
        }
    }

    fn size(&self) -> Size {
        Size::new(self.image.width(), self.image.height())
    }

    fn fill(&mut self, rect: Rect, color: Color) {
        let right = rect.right().min(self.image.width());
        let bottom = rect.bottom().min(self.image.height());
        let pixel = color.to_rgba();
        for y in rect.y..bottom {
            for x in rect.x..right {
                self.image.put_pixel(x, y, pixel);
            }
        }
    }

    fn draw_text(&mut self, rect: Rect, text: &str, style: &TextStyle) {
        if let Some(background) = style.background {
            self.fill(rect, background);
        }
        let Some(font) = self.font.clone() else {
            log::debug!("No font loaded, skipping text \"{text}\"");
            return;
        };
        if text.is_empty() {
            return;
        }

        let padding = (style.size / 4.0).round();
        let mut layout = Layout::new(CoordinateSystem::PositiveYDown);
        layout.reset(&LayoutSettings {
            x: rect.x as f32 + padding,
            y: rect.y as f32,
            max_width: Some(rect.width as f32),
            max_height: Some(rect.height as f32),
            ..LayoutSettings::default()
        });
        layout.append(&[font.as_ref()], &GlyphRun::new(text, style.size, 0));

        for glyph in layout.glyphs() {
            if glyph.width == 0 || glyph.height == 0 {
                continue;
            }
            let (_, bitmap) = font.rasterize_config(glyph.key);
            let origin_x = glyph.x.round() as i64;
            let origin_y = glyph.y.round() as i64;
            for row in 0..glyph.height {
                for column in 0..glyph.width {
                    let x = origin_x + column as i64;
                    let y = origin_y + row as i64;
                    if x < rect.x as i64
                        || y < rect.y as i64
                        || x >= rect.right() as i64
                        || y >= rect.bottom() as i64
                    {
                        continue;
                    }
                    let coverage = bitmap[row * glyph.width + column];
                    self.blend(x as u32, y as u32, style.color, coverage);
                }
            }
        }
    }

    fn draw_image(&mut self, image: &DynamicImage, rect: Rect) {
        if rect.width == 0 || rect.height == 0 {
            return;
        }
        let scaled = image
            .resize_to_fill(rect.width, rect.height, FilterType::Triangle)
            .to_rgba8();
        imageops::overlay(&mut self.image, &scaled, rect.x as i64, rect.y as i64);
    }

    fn encode(&self, format: ImageFormat, jpeg_quality: u8) -> Result<Vec<u8>, GrabError> {
        encode_image(
            &DynamicImage::ImageRgba8(self.image.clone()),
            format,
            jpeg_quality,
        )
    }
}

/// Encode `image` in `format`. `jpeg_quality` is only used for JPEG.
///
/// JPEG and BMP drop the alpha channel.
pub(crate) fn encode_image(
    image: &DynamicImage,
    format: ImageFormat,
    jpeg_quality: u8,
) -> Result<Vec<u8>, GrabError> {
    match format {
        ImageFormat::Jpeg => {
            let rgb = image.to_rgb8();
            let mut bytes = Vec::new();
            JpegEncoder::new_with_quality(&mut bytes, jpeg_quality.clamp(1, 100))
                .encode_image(&rgb)?;
            Ok(bytes)
        }
        ImageFormat::Bmp => {
            let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
            let mut cursor = Cursor::new(Vec::new());
            rgb.write_to(&mut cursor, image::ImageFormat::Bmp)?;
            Ok(cursor.into_inner())
        }
        other => {
            let encoder_format = other.to_image_format()?;
            let mut cursor = Cursor::new(Vec::new());
            image.write_to(&mut cursor, encoder_format)?;
            Ok(cursor.into_inner())
        }
    }
}
