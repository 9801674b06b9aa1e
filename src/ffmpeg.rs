//! In-process frame extraction through FFmpeg.
//!
//! [`FfmpegExtractor`] implements [`FrameExtractor`] by decoding the source
//! on a dedicated thread: for every timecode it seeks to the nearest
//! keyframe, decodes forward to the first frame at or past the timecode,
//! and writes that frame to the output directory. [`probe_video`] reads the
//! duration and resolution needed to build a [`Video`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use framegrab::{FfmpegExtractor, FrameExtractor, GrabController, GrabOptions, probe_video};
//!
//! # async fn example() -> Result<(), framegrab::GrabError> {
//! let video = probe_video("input.mp4")?.with_export_directory("grabs");
//! let controller = GrabController::spawn(
//!     video,
//!     GrabOptions::new(),
//!     Arc::new(|| Box::new(FfmpegExtractor::new()) as Box<dyn FrameExtractor>),
//! )?;
//! controller.toggle().await?;
//! # Ok(())
//! # }
//! ```
//!
//! FFmpeg prints its own diagnostics to stderr independently of the `log`
//! crate; use [`set_ffmpeg_log_level`] to tune them.

use std::{
    path::{Path, PathBuf},
    str::FromStr,
    sync::{Arc, Condvar, Mutex, PoisonError},
    thread::{self, JoinHandle},
    time::Duration,
};

use ffmpeg_next::{
    Rational,
    codec::context::Context as CodecContext,
    decoder::Video as VideoDecoder,
    format::{Pixel, context::Input},
    frame::Video as VideoFrame,
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
    util::log::Level,
};
use image::{DynamicImage, RgbImage};

use crate::canvas::{Size, encode_image};
use crate::error::GrabError;
use crate::extractor::{ExtractorSink, FrameExtractor, GrabRequest};
use crate::progress::{CancellationToken, Progress};
use crate::timecode::frame_file_name;
use crate::utilities::{
    duration_to_stream_timestamp, frame_to_rgb_buffer, pts_to_duration, write_atomically,
};
use crate::video::Video;

/// How long a paused worker sleeps between cancellation checks.
const PAUSE_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// FFmpeg internal log verbosity level.
///
/// Setting a level causes FFmpeg to suppress all messages below that
/// severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FfmpegLogLevel {
    /// Print no output at all.
    Quiet,
    /// Unrecoverable errors only.
    Fatal,
    /// Recoverable errors.
    Error,
    /// Warnings (FFmpeg's default).
    Warning,
    /// Informational messages.
    Info,
    /// Debugging messages.
    Debug,
}

impl FfmpegLogLevel {
    fn to_ffmpeg_level(self) -> Level {
        match self {
            FfmpegLogLevel::Quiet => Level::Quiet,
            FfmpegLogLevel::Fatal => Level::Fatal,
            FfmpegLogLevel::Error => Level::Error,
            FfmpegLogLevel::Warning => Level::Warning,
            FfmpegLogLevel::Info => Level::Info,
            FfmpegLogLevel::Debug => Level::Debug,
        }
    }
}

impl FromStr for FfmpegLogLevel {
    type Err = GrabError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "quiet" => Ok(FfmpegLogLevel::Quiet),
            "fatal" => Ok(FfmpegLogLevel::Fatal),
            "error" => Ok(FfmpegLogLevel::Error),
            "warning" | "warn" => Ok(FfmpegLogLevel::Warning),
            "info" => Ok(FfmpegLogLevel::Info),
            "debug" => Ok(FfmpegLogLevel::Debug),
            other => Err(GrabError::Configuration(format!(
                "unknown FFmpeg log level: {other}"
            ))),
        }
    }
}

/// Set FFmpeg's own stderr verbosity. Does not affect the `log` crate.
pub fn set_ffmpeg_log_level(level: FfmpegLogLevel) {
    ffmpeg_next::util::log::set_level(level.to_ffmpeg_level());
}

/// Open `path` and describe it as a [`Video`].
///
/// # Errors
///
/// Returns [`GrabError::FileOpen`] if the file cannot be opened, or
/// [`GrabError::NoVideoStream`] if it has no video.
pub fn probe_video<P: AsRef<Path>>(path: P) -> Result<Video, GrabError> {
    let path = path.as_ref();
    let input = open_input(path)?;

    let duration_microseconds = input.duration();
    let duration = if duration_microseconds > 0 {
        Duration::from_micros(duration_microseconds as u64)
    } else {
        Duration::ZERO
    };

    let stream = input
        .streams()
        .best(Type::Video)
        .ok_or(GrabError::NoVideoStream)?;
    let decoder = CodecContext::from_parameters(stream.parameters())
        .and_then(|context| context.decoder().video())
        .map_err(|error| GrabError::FileOpen {
            path: path.to_path_buf(),
            reason: format!("Failed to create video decoder: {error}"),
        })?;

    log::debug!(
        "Probed {}: {:?}, {}x{}",
        path.display(),
        duration,
        decoder.width(),
        decoder.height()
    );
    Ok(Video::new(
        path,
        duration,
        Size::new(decoder.width(), decoder.height()),
    ))
}

fn open_input(path: &Path) -> Result<Input, GrabError> {
    ffmpeg_next::init().map_err(|error| GrabError::FileOpen {
        path: path.to_path_buf(),
        reason: format!("FFmpeg initialisation failed: {error}"),
    })?;
    ffmpeg_next::format::input(&path).map_err(|error| GrabError::FileOpen {
        path: path.to_path_buf(),
        reason: error.to_string(),
    })
}

/// Pause gate and cancel flag shared with the worker thread.
#[derive(Debug, Default)]
struct Control {
    token: CancellationToken,
    paused: Mutex<bool>,
    wake: Condvar,
}

impl Control {
    fn set_paused(&self, paused: bool) {
        *self.paused.lock().unwrap_or_else(PoisonError::into_inner) = paused;
        self.wake.notify_all();
    }

    /// Block while paused. Acknowledges the pause and the resume through
    /// `sink`.
    fn wait_while_paused(&self, sink: &ExtractorSink) {
        let mut paused = self.paused.lock().unwrap_or_else(PoisonError::into_inner);
        if !*paused {
            return;
        }
        sink.paused();
        while *paused && !self.token.is_cancelled() {
            paused = self
                .wake
                .wait_timeout(paused, PAUSE_POLL_INTERVAL)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        if !self.token.is_cancelled() {
            sink.resumed();
        }
    }
}

/// [`FrameExtractor`] that decodes with FFmpeg on a worker thread.
#[derive(Debug, Default)]
pub struct FfmpegExtractor {
    control: Arc<Control>,
    worker: Option<JoinHandle<()>>,
}

impl FfmpegExtractor {
    /// Create an idle extractor.
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrameExtractor for FfmpegExtractor {
    fn start(&mut self, request: GrabRequest, sink: ExtractorSink) -> Result<(), GrabError> {
        if self.worker.is_some() {
            return Err(GrabError::Unexpected(
                "FFmpeg extractor started twice".to_string(),
            ));
        }

        let control = Arc::clone(&self.control);
        let worker = thread::Builder::new()
            .name(format!("framegrab-{}", request.title))
            .spawn(move || match grab_frames(&request, &sink, &control) {
                Ok(progress) => {
                    sink.completed(progress);
                }
                Err(GrabError::Cancelled) => {
                    log::debug!("Extraction of \"{}\" cancelled", request.title);
                    sink.canceled();
                }
                Err(error) => {
                    sink.failed(error);
                }
            })?;
        self.worker = Some(worker);
        Ok(())
    }

    fn pause(&mut self) {
        self.control.set_paused(true);
    }

    fn resume(&mut self) {
        self.control.set_paused(false);
    }

    fn cancel(&mut self) {
        self.control.token.cancel();
        self.control.set_paused(false);
    }
}

impl Drop for FfmpegExtractor {
    fn drop(&mut self) {
        // The worker notices at its next frame boundary; it is not joined.
        self.control.token.cancel();
        self.control.set_paused(false);
    }
}

/// Decoder state for one open video stream.
struct StreamDecoder {
    input: Input,
    decoder: VideoDecoder,
    scaler: ScalingContext,
    stream_index: usize,
    time_base: Rational,
    width: u32,
    height: u32,
}

impl StreamDecoder {
    fn open(path: &Path) -> Result<Self, GrabError> {
        let input = open_input(path)?;
        let (stream_index, time_base, parameters) = {
            let stream = input
                .streams()
                .best(Type::Video)
                .ok_or(GrabError::NoVideoStream)?;
            (stream.index(), stream.time_base(), stream.parameters())
        };

        let decoder = CodecContext::from_parameters(parameters)?.decoder().video()?;
        let (width, height) = (decoder.width(), decoder.height());
        let scaler = ScalingContext::get(
            decoder.format(),
            width,
            height,
            Pixel::RGB24,
            width,
            height,
            ScalingFlags::BILINEAR,
        )?;

        Ok(Self {
            input,
            decoder,
            scaler,
            stream_index,
            time_base,
            width,
            height,
        })
    }

    /// Decode the first frame at or after `timecode`.
    fn frame_at(&mut self, timecode: Duration) -> Result<DynamicImage, GrabError> {
        let position = duration_to_stream_timestamp(timecode, Rational::new(1, 1_000_000));
        self.input.seek(position, ..position)?;
        self.decoder.flush();

        let mut decoded_frame = VideoFrame::empty();
        let mut rgb_frame = VideoFrame::empty();

        for (stream, packet) in self.input.packets() {
            if stream.index() != self.stream_index {
                continue;
            }
            self.decoder.send_packet(&packet)?;
            while self.decoder.receive_frame(&mut decoded_frame).is_ok() {
                if frame_time(&decoded_frame, self.time_base) >= timecode {
                    self.scaler.run(&decoded_frame, &mut rgb_frame)?;
                    return convert_frame_to_image(&rgb_frame, self.width, self.height);
                }
            }
        }

        // Near the end of the stream the last decoded frame stands in for a
        // timecode that falls between it and the container duration.
        self.decoder.send_eof()?;
        let mut last_frame = None;
        while self.decoder.receive_frame(&mut decoded_frame).is_ok() {
            self.scaler.run(&decoded_frame, &mut rgb_frame)?;
            let image = convert_frame_to_image(&rgb_frame, self.width, self.height)?;
            if frame_time(&decoded_frame, self.time_base) >= timecode {
                return Ok(image);
            }
            last_frame = Some(image);
        }

        last_frame.ok_or_else(|| {
            GrabError::VideoDecodeError(format!("Could not locate a frame at {timecode:?}"))
        })
    }
}

fn frame_time(frame: &VideoFrame, time_base: Rational) -> Duration {
    let pts = frame.timestamp().or_else(|| frame.pts()).unwrap_or(0);
    pts_to_duration(pts, time_base)
}

/// Worker body: grab every timecode of `request`.
fn grab_frames(
    request: &GrabRequest,
    sink: &ExtractorSink,
    control: &Control,
) -> Result<Progress, GrabError> {
    sink.calculating();
    let mut stream = StreamDecoder::open(&request.source)?;
    std::fs::create_dir_all(&request.output_directory)?;

    let total = request.expected_frames;
    sink.started(Progress::new(total));
    log::debug!(
        "Grabbing {} frames of \"{}\" every {:?}",
        total,
        request.title,
        request.period
    );

    let mut grabbed = 0_u64;
    for timecode in request.timecodes() {
        control.wait_while_paused(sink);
        if control.token.is_cancelled() || sink.is_closed() {
            return Err(GrabError::Cancelled);
        }

        let image = stream.frame_at(timecode)?;
        let path = frame_path(&request.output_directory, request, timecode);
        let bytes = encode_image(&image, request.format, request.jpeg_quality)?;
        write_atomically(&path, &bytes)?;

        grabbed += 1;
        sink.frame_ready(Progress::with_current(grabbed, total), timecode, path);
    }

    Ok(Progress::with_current(grabbed, total))
}

fn frame_path(directory: &Path, request: &GrabRequest, timecode: Duration) -> PathBuf {
    directory.join(frame_file_name(&request.title, timecode, request.format))
}

/// Convert a scaled RGB24 video frame to an [`image::DynamicImage`].
fn convert_frame_to_image(
    rgb_frame: &VideoFrame,
    width: u32,
    height: u32,
) -> Result<DynamicImage, GrabError> {
    let buffer = frame_to_rgb_buffer(rgb_frame, width, height);
    let rgb_image = RgbImage::from_raw(width, height, buffer).ok_or_else(|| {
        GrabError::VideoDecodeError(
            "Failed to construct RGB image from decoded frame data".to_string(),
        )
    })?;
    Ok(DynamicImage::ImageRgb8(rgb_image))
}
