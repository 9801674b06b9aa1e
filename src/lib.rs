//! # framegrab
//!
//! Grab still frames from a video at a fixed period, collect a color palette
//! from them, and render two composite images: a color **strip** and a
//! **summary** contact sheet.
//!
//! A [`GrabController`] drives one session at a time through the
//! ready → grabbing → paused → complete / canceled state machine. Frames come
//! from a [`FrameExtractor`]; the crate ships [`FfmpegExtractor`] (feature
//! `ffmpeg`), and any other source can be plugged in by implementing the
//! trait. Everything the controller does is published as a
//! [`SessionEvent`].
//!
//! ## Quick Start
//!
//! ### Grab a Video
//!
//! ```no_run
//! # #[cfg(feature = "ffmpeg")]
//! # async fn example() -> Result<(), framegrab::GrabError> {
//! use std::sync::Arc;
//!
//! use framegrab::{
//!     ExtractorFactory, FfmpegExtractor, FrameExtractor, GrabController, GrabOptions,
//!     GrabState, SessionEvent, probe_video,
//! };
//!
//! let video = probe_video("input.mp4")?.with_export_directory("grabs");
//! let factory: Arc<dyn ExtractorFactory> =
//!     Arc::new(|| Box::new(FfmpegExtractor::new()) as Box<dyn FrameExtractor>);
//! let controller = GrabController::spawn(video, GrabOptions::new(), factory)?;
//!
//! let mut events = controller.subscribe();
//! controller.toggle().await?;
//! while let Ok(event) = events.recv().await {
//!     match event {
//!         SessionEvent::StripCreated(path) => println!("strip: {}", path.display()),
//!         SessionEvent::SummaryCreated(path) => println!("summary: {}", path.display()),
//!         SessionEvent::StateChanged(GrabState::Complete { .. } | GrabState::Canceled) => break,
//!         _ => {}
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ### Render a Strip
//!
//! ```no_run
//! use framegrab::{Color, ImageFormat, Size, StripBuilder, StripMode};
//!
//! let colors = [Color::rgb(10, 20, 30), Color::rgb(200, 180, 40)];
//! StripBuilder::create(
//!     "Strip.png",
//!     &colors,
//!     Size::new(1280, 128),
//!     StripMode::Gradient,
//!     ImageFormat::Png,
//! )
//! .unwrap();
//! ```
//!
//! ## Output Layout
//!
//! For a video titled `MyVideo` exported to `out/`:
//!
//! - frames: `out/MyVideo/MyVideo.HH.MM.SS.mmm.<ext>`
//! - summary: `out/MyVideo/MyVideo.jpeg`
//! - strip: `out/MyVideo.Strip.<ext>`
//!
//! ### Optional Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `ffmpeg` | `FfmpegExtractor` and `probe_video`, decoding through FFmpeg |
//! | `rayon` | Summary frames are loaded and scaled on rayon threads |
//! | `cli` | The `framegrab` command-line tool (implies `ffmpeg`) |
//! | `full` | Enables all of the above |
//!
//! ## Requirements
//!
//! The `ffmpeg` feature needs the FFmpeg development libraries installed on
//! your system.

pub mod canvas;
pub mod color;
pub mod configuration;
pub mod controller;
pub mod error;
pub mod extractor;
#[cfg(feature = "ffmpeg")]
pub mod ffmpeg;
pub mod notification;
pub mod progress;
pub mod state;
pub mod strip;
pub mod summary;
pub mod timecode;
mod utilities;
pub mod video;

pub use canvas::{Canvas, RasterCanvas, Rect, Size, TextStyle, load_font};
pub use color::{Color, ColorAggregator, ColorSample, Palette, average_color};
pub use configuration::{GrabOptions, ImageFormat, StripMode};
pub use controller::{EventStream, GrabController};
pub use error::GrabError;
pub use extractor::{
    ExtractorEvent, ExtractorFactory, ExtractorSink, FrameExtractor, GrabRequest,
};
#[cfg(feature = "ffmpeg")]
pub use ffmpeg::{FfmpegExtractor, FfmpegLogLevel, probe_video, set_ffmpeg_log_level};
pub use notification::{Coordinator, GrabReport, SessionEvent};
pub use progress::{CancellationToken, Progress};
pub use state::{GrabState, ToggleAction};
pub use strip::StripBuilder;
pub use summary::{GridLayout, SummaryBuilder};
pub use video::{TimeRange, Video, VideoRange};
