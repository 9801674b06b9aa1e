//! Frame extractor contract.
//!
//! An extractor runs on its own execution context and reports back through
//! an [`ExtractorSink`]. The controller owns at most one extractor at a time
//! and creates each one through an [`ExtractorFactory`].
//!
//! # Example
//!
//! ```
//! use framegrab::{ExtractorSink, FrameExtractor, GrabError, GrabRequest, Progress};
//!
//! /// Reports an empty session straight away.
//! struct NothingToGrab;
//!
//! impl FrameExtractor for NothingToGrab {
//!     fn start(&mut self, _request: GrabRequest, sink: ExtractorSink) -> Result<(), GrabError> {
//!         sink.completed(Progress::new(0));
//!         Ok(())
//!     }
//!     fn pause(&mut self) {}
//!     fn resume(&mut self) {}
//!     fn cancel(&mut self) {}
//! }
//! ```

use std::{path::PathBuf, time::Duration};

use tokio::sync::mpsc::UnboundedSender;

use crate::configuration::ImageFormat;
use crate::error::GrabError;
use crate::progress::Progress;
use crate::video::TimeRange;

const NANOS_PER_SECOND: u128 = 1_000_000_000;

/// Everything an extractor needs to run one session.
#[derive(Debug, Clone, PartialEq)]
pub struct GrabRequest {
    /// Source media file.
    pub source: PathBuf,
    /// Title used to name grabbed files.
    pub title: String,
    /// Portion of the timeline to grab.
    pub range: TimeRange,
    /// Interval between grabs.
    pub period: Duration,
    /// Format of the grabbed frames.
    pub format: ImageFormat,
    /// JPEG quality for JPEG frames.
    pub jpeg_quality: u8,
    /// Directory grabbed frames are written to.
    pub output_directory: PathBuf,
    /// Frames the controller expects: one per period across the range.
    pub expected_frames: u64,
}

impl GrabRequest {
    /// The timecodes to grab: `range.start + k * period` for every expected
    /// frame.
    pub fn timecodes(&self) -> impl DoubleEndedIterator<Item = Duration> + '_ {
        (0..self.expected_frames).map(move |index| self.timecode_at(index))
    }

    /// Timecode of grab `index`, computed in nanoseconds so large indexes
    /// never wrap.
    pub fn timecode_at(&self, index: u64) -> Duration {
        let offset = self.period.as_nanos().saturating_mul(u128::from(index));
        let offset = Duration::new(
            u64::try_from(offset / NANOS_PER_SECOND).unwrap_or(u64::MAX),
            (offset % NANOS_PER_SECOND) as u32,
        );
        self.range.start.saturating_add(offset)
    }
}

/// A report from an extractor.
#[derive(Debug)]
#[non_exhaustive]
pub enum ExtractorEvent {
    /// The frame count is still being computed.
    Calculating,
    /// Extraction began; carries the (possibly revised) expected total.
    Started(Progress),
    /// The extractor acknowledged a pause.
    Paused,
    /// The extractor acknowledged a resume.
    Resumed,
    /// A frame was written to `path`.
    FrameReady {
        /// Progress including this frame.
        progress: Progress,
        /// Position of the frame in the video.
        timecode: Duration,
        /// Where the frame image was written.
        path: PathBuf,
    },
    /// No more frames will be produced.
    Completed(Progress),
    /// The extractor stopped after a cancel request.
    Canceled,
    /// The extractor hit an error and stopped.
    Failed(GrabError),
}

/// An [`ExtractorEvent`] tagged with the session that produced it.
#[derive(Debug)]
pub(crate) struct Envelope {
    pub(crate) session: u64,
    pub(crate) event: ExtractorEvent,
}

/// Where an extractor delivers its events.
///
/// Sends never block and may be made from any thread. Events from a session
/// the controller has already dropped are discarded on arrival.
#[derive(Debug, Clone)]
pub struct ExtractorSink {
    session: u64,
    sender: UnboundedSender<Envelope>,
}

impl ExtractorSink {
    pub(crate) fn new(session: u64, sender: UnboundedSender<Envelope>) -> Self {
        Self { session, sender }
    }

    /// Deliver an event. Returns `false` if the controller has shut down.
    pub fn send(&self, event: ExtractorEvent) -> bool {
        self.sender
            .send(Envelope {
                session: self.session,
                event,
            })
            .is_ok()
    }

    /// `true` once the controller has shut down.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Report that the frame count is still being computed.
    pub fn calculating(&self) -> bool {
        self.send(ExtractorEvent::Calculating)
    }

    /// Report that extraction began.
    pub fn started(&self, progress: Progress) -> bool {
        self.send(ExtractorEvent::Started(progress))
    }

    /// Acknowledge a pause.
    pub fn paused(&self) -> bool {
        self.send(ExtractorEvent::Paused)
    }

    /// Acknowledge a resume.
    pub fn resumed(&self) -> bool {
        self.send(ExtractorEvent::Resumed)
    }

    /// Report a frame written to `path`.
    pub fn frame_ready(&self, progress: Progress, timecode: Duration, path: PathBuf) -> bool {
        self.send(ExtractorEvent::FrameReady {
            progress,
            timecode,
            path,
        })
    }

    /// Report that no more frames will be produced.
    pub fn completed(&self, progress: Progress) -> bool {
        self.send(ExtractorEvent::Completed(progress))
    }

    /// Acknowledge a cancel.
    pub fn canceled(&self) -> bool {
        self.send(ExtractorEvent::Canceled)
    }

    /// Report a failure.
    pub fn failed(&self, error: GrabError) -> bool {
        self.send(ExtractorEvent::Failed(error))
    }
}

/// A source of grabbed frames.
///
/// `start` must return promptly and do its work elsewhere. `pause`,
/// `resume` and `cancel` are requests; acknowledgements arrive through the
/// sink.
pub trait FrameExtractor: Send {
    /// Begin extracting frames for `request`, reporting to `sink`.
    ///
    /// # Errors
    ///
    /// Returns an error if extraction cannot be started at all.
    fn start(&mut self, request: GrabRequest, sink: ExtractorSink) -> Result<(), GrabError>;

    /// Request a pause.
    fn pause(&mut self);

    /// Request a resume.
    fn resume(&mut self);

    /// Request a cancel.
    fn cancel(&mut self);
}

/// Creates a fresh extractor for each session.
///
/// Implemented for any `Fn() -> Box<dyn FrameExtractor>` closure.
pub trait ExtractorFactory: Send + Sync {
    /// Build an extractor for a new session.
    fn create(&self) -> Box<dyn FrameExtractor>;
}

impl<F> ExtractorFactory for F
where
    F: Fn() -> Box<dyn FrameExtractor> + Send + Sync,
{
    fn create(&self) -> Box<dyn FrameExtractor> {
        self()
    }
}
