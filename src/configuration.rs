//! Grab preferences.
//!
//! [`GrabOptions`] is a builder that carries the read-only preferences a
//! session needs: grab period, export format, palette size, strip geometry.
//! It can also be loaded from a JSON preferences file.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//!
//! use framegrab::{GrabOptions, ImageFormat, StripMode};
//!
//! let options = GrabOptions::new()
//!     .with_period(Duration::from_secs(2))
//!     .with_format(ImageFormat::Png)
//!     .with_color_count(64)
//!     .with_strip_mode(StripMode::Gradient);
//! assert_eq!(options.color_count, 64);
//! ```

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    fs,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use serde::Deserialize;

use crate::canvas::Size;
use crate::error::GrabError;
use crate::timecode::MIN_PERIOD;

/// Export format for grabbed frames and generated strips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// JPEG. This is the default.
    #[default]
    Jpeg,
    /// Lossless PNG.
    Png,
    /// TIFF.
    Tiff,
    /// Windows bitmap.
    Bmp,
    /// HEIF. Selectable, but the raster backend cannot encode it.
    Heif,
}

impl ImageFormat {
    /// File extension without the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Png => "png",
            ImageFormat::Tiff => "tiff",
            ImageFormat::Bmp => "bmp",
            ImageFormat::Heif => "heic",
        }
    }

    /// Parse a file extension (`jpg`, `jpeg`, `png`, ...), case-insensitive.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            "png" => Some(ImageFormat::Png),
            "tif" | "tiff" => Some(ImageFormat::Tiff),
            "bmp" => Some(ImageFormat::Bmp),
            "heic" | "heif" => Some(ImageFormat::Heif),
            _ => None,
        }
    }

    /// Map to the `image` crate's encoder format.
    pub(crate) fn to_image_format(self) -> Result<image::ImageFormat, GrabError> {
        match self {
            ImageFormat::Jpeg => Ok(image::ImageFormat::Jpeg),
            ImageFormat::Png => Ok(image::ImageFormat::Png),
            ImageFormat::Tiff => Ok(image::ImageFormat::Tiff),
            ImageFormat::Bmp => Ok(image::ImageFormat::Bmp),
            ImageFormat::Heif => Err(GrabError::UnsupportedImageFormat(
                self.extension().to_string(),
            )),
        }
    }
}

impl Display for ImageFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.extension())
    }
}

impl FromStr for ImageFormat {
    type Err = GrabError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ImageFormat::from_extension(value)
            .ok_or_else(|| GrabError::UnsupportedImageFormat(value.to_string()))
    }
}

/// How colors are painted into a strip image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StripMode {
    /// One equal-width vertical band per color, first color leftmost.
    #[default]
    Linear,
    /// A smooth horizontal blend through every color in order.
    Gradient,
}

impl FromStr for StripMode {
    type Err = GrabError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "linear" | "bands" => Ok(StripMode::Linear),
            "gradient" => Ok(StripMode::Gradient),
            other => Err(GrabError::Configuration(format!(
                "unknown strip mode: {other}"
            ))),
        }
    }
}

/// Preferences for a grab session.
///
/// All fields have defaults; see [`GrabOptions::new`].
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct GrabOptions {
    /// Interval between successive grabs.
    pub period: Duration,
    /// Format of grabbed frames and of the strip image.
    pub format: ImageFormat,
    /// JPEG quality (1-100) for grabbed frames and JPEG strips.
    pub jpeg_quality: u8,
    /// Maximum number of color samples kept per session.
    pub color_count: usize,
    /// Pixel size of the strip image.
    pub strip_size: Size,
    /// Strip layout.
    pub strip_mode: StripMode,
    /// Ask the coordinator to reveal the export directory once a session
    /// completes.
    pub open_directory_after_completion: bool,
    /// TrueType/OpenType font used for summary text. No text glyphs are
    /// drawn without one.
    pub font_path: Option<PathBuf>,
}

impl Default for GrabOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl GrabOptions {
    /// Default preferences: 5 s period, JPEG at quality 90, 100 colors,
    /// 1280×128 linear strip, no auto-open, no font.
    pub fn new() -> Self {
        Self {
            period: Duration::from_secs(5),
            format: ImageFormat::Jpeg,
            jpeg_quality: 90,
            color_count: 100,
            strip_size: Size::new(1280, 128),
            strip_mode: StripMode::Linear,
            open_directory_after_completion: false,
            font_path: None,
        }
    }

    /// Set the grab period.
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Set the export format.
    pub fn with_format(mut self, format: ImageFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the JPEG quality, clamped to `1..=100`.
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    /// Set the palette capacity. Clamped to a minimum of 1.
    pub fn with_color_count(mut self, count: usize) -> Self {
        self.color_count = count.max(1);
        self
    }

    /// Set the strip image size in pixels.
    pub fn with_strip_size(mut self, size: Size) -> Self {
        self.strip_size = size;
        self
    }

    /// Set the strip layout.
    pub fn with_strip_mode(mut self, mode: StripMode) -> Self {
        self.strip_mode = mode;
        self
    }

    /// Reveal the export directory after a session completes.
    pub fn with_open_directory_after_completion(mut self, open: bool) -> Self {
        self.open_directory_after_completion = open;
        self
    }

    /// Use the font at `path` for summary text.
    pub fn with_font_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.font_path = Some(path.into());
        self
    }

    /// Parse preferences from JSON. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`GrabError::Configuration`] on malformed JSON, unknown keys,
    /// or out-of-range values.
    ///
    /// # Example
    ///
    /// ```
    /// use framegrab::{GrabOptions, StripMode};
    ///
    /// let options = GrabOptions::from_json_str(
    ///     r#"{ "period_seconds": 2.5, "strip_mode": "gradient" }"#,
    /// )?;
    /// assert_eq!(options.period.as_millis(), 2500);
    /// assert_eq!(options.strip_mode, StripMode::Gradient);
    /// # Ok::<(), framegrab::GrabError>(())
    /// ```
    pub fn from_json_str(json: &str) -> Result<Self, GrabError> {
        let file: PreferencesFile = serde_json::from_str(json)
            .map_err(|error| GrabError::Configuration(error.to_string()))?;
        file.into_options()
    }

    /// Read preferences from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`GrabError::IoError`] if the file cannot be read, or the
    /// errors of [`from_json_str`](GrabOptions::from_json_str).
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, GrabError> {
        let path = path.as_ref();
        log::debug!("Loading preferences from {}", path.display());
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}

/// On-disk shape of the preferences file.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct PreferencesFile {
    period_seconds: Option<f64>,
    format: Option<ImageFormat>,
    jpeg_quality: Option<u8>,
    color_count: Option<usize>,
    strip_width: Option<u32>,
    strip_height: Option<u32>,
    strip_mode: Option<StripMode>,
    open_directory_after_completion: Option<bool>,
    font_path: Option<PathBuf>,
}

impl PreferencesFile {
    fn into_options(self) -> Result<GrabOptions, GrabError> {
        let mut options = GrabOptions::new();

        if let Some(seconds) = self.period_seconds {
            let period = Duration::try_from_secs_f64(seconds)
                .ok()
                .filter(|period| *period >= MIN_PERIOD)
                .ok_or_else(|| {
                    GrabError::Configuration(format!(
                        "period_seconds must be at least 0.001, got {seconds}"
                    ))
                })?;
            options = options.with_period(period);
        }
        if let Some(format) = self.format {
            options = options.with_format(format);
        }
        if let Some(quality) = self.jpeg_quality {
            if quality == 0 || quality > 100 {
                return Err(GrabError::Configuration(format!(
                    "jpeg_quality must be within 1..=100, got {quality}"
                )));
            }
            options = options.with_jpeg_quality(quality);
        }
        if let Some(count) = self.color_count {
            if count == 0 {
                return Err(GrabError::Configuration(
                    "color_count must be greater than zero".to_string(),
                ));
            }
            options = options.with_color_count(count);
        }

        let width = self.strip_width.unwrap_or(options.strip_size.width);
        let height = self.strip_height.unwrap_or(options.strip_size.height);
        if width == 0 || height == 0 {
            return Err(GrabError::Configuration(format!(
                "strip size must be non-zero, got {width}x{height}"
            )));
        }
        options = options.with_strip_size(Size::new(width, height));

        if let Some(mode) = self.strip_mode {
            options = options.with_strip_mode(mode);
        }
        if let Some(open) = self.open_directory_after_completion {
            options = options.with_open_directory_after_completion(open);
        }
        if let Some(path) = self.font_path {
            options = options.with_font_path(path);
        }

        Ok(options)
    }
}
