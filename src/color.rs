//! Color sampling of grabbed frames.
//!
//! Each grabbed frame is reduced to one averaged [`Color`]. Samples are kept
//! in a [`Palette`] in frame arrival order, up to a fixed capacity.

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    path::Path,
    time::Duration,
};

use image::{DynamicImage, Rgba};

use crate::error::GrabError;

/// An opaque 8-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color {
    /// Red channel.
    pub red: u8,
    /// Green channel.
    pub green: u8,
    /// Blue channel.
    pub blue: u8,
}

impl Color {
    /// Pure black.
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    /// Pure white.
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    /// Create a color from its channels.
    pub const fn rgb(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    /// Channels as `[r, g, b]`.
    pub fn to_array(self) -> [u8; 3] {
        [self.red, self.green, self.blue]
    }

    /// Opaque RGBA pixel.
    pub fn to_rgba(self) -> Rgba<u8> {
        Rgba([self.red, self.green, self.blue, 255])
    }

    /// Linear blend: `t = 0.0` gives `self`, `t = 1.0` gives `other`.
    pub fn lerp(self, other: Color, t: f64) -> Color {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Color::rgb(
            mix(self.red, other.red),
            mix(self.green, other.green),
            mix(self.blue, other.blue),
        )
    }
}

impl Display for Color {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "#{:02x}{:02x}{:02x}", self.red, self.green, self.blue)
    }
}

/// One averaged color and the frame it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorSample {
    /// Averaged color of the frame.
    pub color: Color,
    /// Zero-based index of the frame within its session.
    pub frame_index: u64,
    /// Position of the frame in the video.
    pub timecode: Duration,
}

/// Color samples in arrival order with a fixed capacity.
///
/// Once full, further samples are rejected; existing samples are never
/// reordered or evicted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    samples: Vec<ColorSample>,
    capacity: usize,
}

impl Palette {
    /// Create an empty palette holding at most `capacity` samples.
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    /// Append a sample. Returns `false` if the palette is full.
    pub fn push(&mut self, sample: ColorSample) -> bool {
        if self.samples.len() >= self.capacity {
            log::debug!(
                "Palette full ({} samples), dropping frame {}",
                self.capacity,
                sample.frame_index
            );
            return false;
        }
        self.samples.push(sample);
        true
    }

    /// Remove every sample, keeping the capacity.
    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Maximum number of samples.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of samples held.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// `true` if no sample has been appended.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Samples, oldest first.
    pub fn samples(&self) -> &[ColorSample] {
        &self.samples
    }

    /// Just the colors, oldest first.
    pub fn colors(&self) -> Vec<Color> {
        self.samples.iter().map(|sample| sample.color).collect()
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::new(100)
    }
}

/// Average RGB color of every pixel in `image`.
///
/// Returns black for an empty image.
pub fn average_color(image: &DynamicImage) -> Color {
    let rgb = image.to_rgb8();
    let count = (rgb.width() as u64) * (rgb.height() as u64);
    if count == 0 {
        return Color::BLACK;
    }

    let mut sums = [0_u64; 3];
    for pixel in rgb.pixels() {
        sums[0] += pixel.0[0] as u64;
        sums[1] += pixel.0[1] as u64;
        sums[2] += pixel.0[2] as u64;
    }

    let channel = |sum: u64| ((sum + count / 2) / count) as u8;
    Color::rgb(channel(sums[0]), channel(sums[1]), channel(sums[2]))
}

/// Turns grabbed frame files into palette samples.
///
/// Stateless; the controller owns the palette and awaits each aggregation
/// before it publishes the matching progress update, which keeps appends in
/// frame order.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColorAggregator;

impl ColorAggregator {
    /// Create an aggregator.
    pub fn new() -> Self {
        Self
    }

    /// Load the frame at `path` and compute its average color.
    ///
    /// # Errors
    ///
    /// Returns [`GrabError::ImageError`] or [`GrabError::IoError`] if the
    /// image cannot be read.
    pub fn sample(
        &self,
        frame_index: u64,
        timecode: Duration,
        path: &Path,
    ) -> Result<ColorSample, GrabError> {
        let image = image::open(path)?;
        Ok(ColorSample {
            color: average_color(&image),
            frame_index,
            timecode,
        })
    }

    /// Sample the frame at `path` and append it to `palette`.
    ///
    /// An unreadable frame is logged and skipped: nothing is appended and
    /// `false` is returned. The same holds when the palette is full.
    pub fn append_average_color(
        &self,
        palette: &mut Palette,
        frame_index: u64,
        timecode: Duration,
        path: &Path,
    ) -> bool {
        let sample = self.sample(frame_index, timecode, path);
        self.record(palette, frame_index, path, sample)
    }

    /// Append the outcome of [`sample`](Self::sample) to `palette`.
    ///
    /// This is the second half of
    /// [`append_average_color`](Self::append_average_color), for callers
    /// that sample on another thread: a failed sample is logged and
    /// skipped, and `false` is returned when nothing was appended.
    pub fn record(
        &self,
        palette: &mut Palette,
        frame_index: u64,
        path: &Path,
        sample: Result<ColorSample, GrabError>,
    ) -> bool {
        match sample {
            Ok(sample) => palette.push(sample),
            Err(error) => {
                log::warn!(
                    "Skipping color for frame {} ({}): {error}",
                    frame_index,
                    path.display()
                );
                false
            }
        }
    }
}
