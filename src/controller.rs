//! Grab session controller.
//!
//! [`GrabController`] is a handle to a single tokio task that owns the
//! video, the session state machine and the live extractor. Handle methods
//! and extractor events are both messages to that task, so every state
//! change is applied, and published as a [`SessionEvent`], in one total
//! order.
//!
//! For each grabbed frame the controller awaits the frame's color sample
//! before it publishes the matching progress, so a subscriber never sees
//! progress that is ahead of the palette.
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(feature = "ffmpeg")]
//! # async fn example() -> Result<(), framegrab::GrabError> {
//! use std::sync::Arc;
//!
//! use framegrab::{
//!     ExtractorFactory, FfmpegExtractor, FrameExtractor, GrabController, GrabOptions,
//!     SessionEvent, probe_video,
//! };
//!
//! let video = probe_video("input.mp4")?.with_export_directory("/tmp/grabs");
//! let factory: Arc<dyn ExtractorFactory> =
//!     Arc::new(|| Box::new(FfmpegExtractor::new()) as Box<dyn FrameExtractor>);
//! let controller = GrabController::spawn(video, GrabOptions::new(), factory)?;
//!
//! let mut events = controller.subscribe();
//! controller.toggle().await?;
//! while let Ok(event) = events.recv().await {
//!     if let SessionEvent::GrabFinished(report) = event {
//!         println!("Grabbed {} frames", report.shots);
//!         break;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

use std::{
    path::PathBuf,
    pin::Pin,
    sync::{Arc, Weak},
    task::{Context, Poll},
    time::{Duration, Instant},
};

use tokio::{
    sync::{
        broadcast,
        mpsc::{self, UnboundedReceiver, UnboundedSender},
        oneshot,
    },
    task::JoinHandle,
};
use tokio_stream::{
    Stream,
    wrappers::{BroadcastStream, errors::BroadcastStreamRecvError},
};

use crate::color::ColorAggregator;
use crate::configuration::GrabOptions;
use crate::error::GrabError;
use crate::extractor::{
    Envelope, ExtractorEvent, ExtractorFactory, ExtractorSink, FrameExtractor, GrabRequest,
};
use crate::notification::{Coordinator, GrabReport, Publisher, SessionEvent};
use crate::progress::Progress;
use crate::state::{GrabState, ToggleAction};
use crate::strip::StripBuilder;
use crate::summary::SummaryBuilder;
use crate::timecode::{MIN_PERIOD, expected_frame_count};
use crate::video::Video;

/// Events buffered per subscriber before the slowest one starts lagging.
const EVENT_CHANNEL_CAPACITY: usize = 256;

enum Command {
    Toggle(oneshot::Sender<Result<GrabState, GrabError>>),
    Start {
        period: Duration,
        reply: oneshot::Sender<Result<GrabState, GrabError>>,
    },
    Pause(oneshot::Sender<GrabState>),
    Resume(oneshot::Sender<GrabState>),
    Cancel(oneshot::Sender<GrabState>),
    SetVideo(Box<Video>, oneshot::Sender<()>),
    SetExportDirectory(PathBuf, oneshot::Sender<()>),
    SetCoordinator(Weak<dyn Coordinator>),
    State(oneshot::Sender<GrabState>),
    Video(oneshot::Sender<Box<Video>>),
    InProgress(oneshot::Sender<bool>),
    Timecode(oneshot::Sender<Option<Duration>>),
    Shutdown(oneshot::Sender<()>),
}

/// Handle to a running grab session controller.
///
/// Dropping the handle stops the controller task and cancels any live
/// extractor.
pub struct GrabController {
    commands: UnboundedSender<Command>,
    events: broadcast::Sender<SessionEvent>,
    task: JoinHandle<()>,
}

impl GrabController {
    /// Start a controller for `video` on the current tokio runtime.
    ///
    /// `factory` builds one extractor per session.
    ///
    /// # Errors
    ///
    /// Returns an error if the font named in `options` cannot be loaded.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn spawn(
        video: Video,
        options: GrabOptions,
        factory: Arc<dyn ExtractorFactory>,
    ) -> Result<Self, GrabError> {
        let summary_builder = SummaryBuilder::from_options(&options)?;
        let (command_sender, command_receiver) = mpsc::unbounded_channel();
        let (envelope_sender, envelope_receiver) = mpsc::unbounded_channel();
        let (event_sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let actor = SessionActor {
            video,
            options,
            factory,
            summary_builder,
            aggregator: ColorAggregator::new(),
            state: GrabState::Ready,
            in_progress: false,
            session: None,
            next_session_id: 1,
            envelope_sender,
            publisher: Publisher::new(event_sender.clone()),
        };
        let task = tokio::spawn(actor.run(command_receiver, envelope_receiver));

        Ok(Self {
            commands: command_sender,
            events: event_sender,
            task,
        })
    }

    /// Send host requests to `coordinator`. It is held weakly.
    #[must_use]
    pub fn with_coordinator(self, coordinator: &Arc<dyn Coordinator>) -> Self {
        let _ = self
            .commands
            .send(Command::SetCoordinator(Arc::downgrade(coordinator)));
        self
    }

    /// Receive every event published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Like [`subscribe`](Self::subscribe), as a [`Stream`].
    pub fn events(&self) -> EventStream {
        EventStream {
            inner: BroadcastStream::new(self.events.subscribe()),
        }
    }

    /// Start, pause or resume depending on the current state.
    ///
    /// Ignored while the frame count is being calculated.
    ///
    /// # Errors
    ///
    /// Returns [`GrabError::MissingExportDirectory`] if the video has no
    /// export directory, or any error from [`start_grab`](Self::start_grab).
    pub async fn toggle(&self) -> Result<GrabState, GrabError> {
        self.request(Command::Toggle).await?
    }

    /// Start a new session grabbing one frame every `period`.
    ///
    /// Any live session is canceled first and the video's previous results
    /// are cleared.
    ///
    /// # Errors
    ///
    /// - [`GrabError::MissingExportDirectory`] if the video has no export
    ///   directory.
    /// - [`GrabError::InvalidPeriod`] if `period` is shorter than
    ///   [`MIN_PERIOD`](crate::timecode::MIN_PERIOD).
    /// - [`GrabError::InvalidRange`] / [`GrabError::RangeOutOfBounds`] if
    ///   the video's range is unusable.
    /// - [`GrabError::ExtractionFailed`] if the extractor refuses to start.
    pub async fn start_grab(&self, period: Duration) -> Result<GrabState, GrabError> {
        self.request(|reply| Command::Start { period, reply }).await?
    }

    /// Ask the extractor to pause. Only has an effect while grabbing.
    pub async fn pause_grab(&self) -> Result<GrabState, GrabError> {
        self.request(Command::Pause).await
    }

    /// Ask the extractor to resume. Only has an effect while paused.
    pub async fn resume_grab(&self) -> Result<GrabState, GrabError> {
        self.request(Command::Resume).await
    }

    /// Cancel the session. Always ends in [`GrabState::Canceled`].
    pub async fn cancel_grab(&self) -> Result<GrabState, GrabError> {
        self.request(Command::Cancel).await
    }

    /// Replace the video, canceling any live session.
    pub async fn set_video(&self, video: Video) -> Result<(), GrabError> {
        self.request(|reply| Command::SetVideo(Box::new(video), reply)).await
    }

    /// Set the directory grabs, strips and summaries are written under.
    pub async fn set_export_directory<P: Into<PathBuf>>(
        &self,
        directory: P,
    ) -> Result<(), GrabError> {
        let directory = directory.into();
        self.request(|reply| Command::SetExportDirectory(directory, reply)).await
    }

    /// The current state.
    pub async fn state(&self) -> Result<GrabState, GrabError> {
        self.request(Command::State).await
    }

    /// A snapshot of the video, including progress, frames and palette.
    pub async fn video(&self) -> Result<Video, GrabError> {
        self.request(Command::Video).await.map(|video| *video)
    }

    /// `true` while frames are being produced.
    pub async fn is_in_progress(&self) -> Result<bool, GrabError> {
        self.request(Command::InProgress).await
    }

    /// Position of the most recent frame of the live session, if any.
    pub async fn timecode(&self) -> Result<Option<Duration>, GrabError> {
        self.request(Command::Timecode).await
    }

    /// Cancel any live session and stop the controller task.
    pub async fn shutdown(self) -> Result<(), GrabError> {
        self.request(Command::Shutdown).await?;
        self.task
            .await
            .map_err(|error| GrabError::Unexpected(error.to_string()))
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, GrabError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .map_err(|_| GrabError::ControllerClosed)?;
        response.await.map_err(|_| GrabError::ControllerClosed)
    }
}

/// A stream of [`SessionEvent`]s from a [`GrabController`].
///
/// A subscriber that falls too far behind skips the events it missed.
pub struct EventStream {
    inner: BroadcastStream<SessionEvent>,
}

impl Stream for EventStream {
    type Item = SessionEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(event))) => return Poll::Ready(Some(event)),
                Poll::Ready(Some(Err(BroadcastStreamRecvError::Lagged(skipped)))) => {
                    log::warn!("Event subscriber lagged, skipped {skipped} events");
                }
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

struct Session {
    id: u64,
    extractor: Box<dyn FrameExtractor>,
    period: Duration,
    timecode: Duration,
    started_at: Instant,
}

struct SessionActor {
    video: Video,
    options: GrabOptions,
    factory: Arc<dyn ExtractorFactory>,
    summary_builder: SummaryBuilder,
    aggregator: ColorAggregator,
    state: GrabState,
    in_progress: bool,
    session: Option<Session>,
    next_session_id: u64,
    envelope_sender: UnboundedSender<Envelope>,
    publisher: Publisher,
}

impl SessionActor {
    async fn run(
        mut self,
        mut commands: UnboundedReceiver<Command>,
        mut envelopes: UnboundedReceiver<Envelope>,
    ) {
        loop {
            tokio::select! {
                biased;
                command = commands.recv() => match command {
                    Some(Command::Shutdown(reply)) => {
                        self.drop_session();
                        let _ = reply.send(());
                        break;
                    }
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                Some(envelope) = envelopes.recv() => self.handle_envelope(envelope).await,
            }
        }
        self.drop_session();
        log::debug!("Grab controller for {} stopped", self.video.title);
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Toggle(reply) => {
                let result = self.toggle();
                let _ = reply.send(result);
            }
            Command::Start { period, reply } => {
                let result = self.start_grab(period);
                let _ = reply.send(result);
            }
            Command::Pause(reply) => {
                self.pause_grab();
                let _ = reply.send(self.state);
            }
            Command::Resume(reply) => {
                self.resume_grab();
                let _ = reply.send(self.state);
            }
            Command::Cancel(reply) => {
                self.cancel_grab();
                let _ = reply.send(self.state);
            }
            Command::SetVideo(video, reply) => {
                self.drop_session();
                self.video = *video;
                self.set_in_progress(false);
                self.set_state(GrabState::Ready);
                let _ = reply.send(());
            }
            Command::SetExportDirectory(directory, reply) => {
                self.video.export_directory = Some(directory);
                let _ = reply.send(());
            }
            Command::SetCoordinator(coordinator) => self.publisher.set_coordinator(coordinator),
            Command::State(reply) => {
                let _ = reply.send(self.state);
            }
            Command::Video(reply) => {
                let _ = reply.send(Box::new(self.video.clone()));
            }
            Command::InProgress(reply) => {
                let _ = reply.send(self.in_progress);
            }
            Command::Timecode(reply) => {
                let _ = reply.send(self.session.as_ref().map(|session| session.timecode));
            }
            Command::Shutdown(reply) => {
                let _ = reply.send(());
            }
        }
    }

    fn toggle(&mut self) -> Result<GrabState, GrabError> {
        self.ensure_export_directory()?;
        match self.state.toggle_action() {
            ToggleAction::Start => self.start_grab(self.options.period),
            ToggleAction::Resume => {
                self.resume_grab();
                Ok(self.state)
            }
            ToggleAction::Pause => {
                self.pause_grab();
                Ok(self.state)
            }
            ToggleAction::Ignore => {
                log::debug!("Toggle ignored while {}", self.state);
                Ok(self.state)
            }
        }
    }

    fn ensure_export_directory(&self) -> Result<(), GrabError> {
        if self.video.export_directory.is_some() {
            return Ok(());
        }
        let title = self.video.title.clone();
        self.publisher
            .publish(SessionEvent::Error(Arc::new(GrabError::MissingExportDirectory {
                title: title.clone(),
            })));
        if let Some(coordinator) = self.publisher.coordinator() {
            coordinator.request_export_directory(&title);
        }
        Err(GrabError::MissingExportDirectory { title })
    }

    fn start_grab(&mut self, period: Duration) -> Result<GrabState, GrabError> {
        self.ensure_export_directory()?;
        if period < MIN_PERIOD {
            return Err(GrabError::InvalidPeriod);
        }
        let range = self.video.working_range()?;
        let output_directory =
            self.video
                .grab_directory()
                .ok_or_else(|| GrabError::MissingExportDirectory {
                    title: self.video.title.clone(),
                })?;

        self.drop_session();
        let expected_frames = expected_frame_count(range.length(), period);
        self.video
            .reset_session(range, expected_frames, self.options.color_count);

        let id = self.next_session_id;
        self.next_session_id += 1;
        let request = GrabRequest {
            source: self.video.path.clone(),
            title: self.video.title.clone(),
            range,
            period,
            format: self.options.format,
            jpeg_quality: self.options.jpeg_quality,
            output_directory,
            expected_frames,
        };
        log::debug!(
            "Starting session {id} for {}: {expected_frames} frames every {period:?}",
            self.video.title
        );

        let mut extractor = self.factory.create();
        let sink = ExtractorSink::new(id, self.envelope_sender.clone());
        if let Err(error) = extractor.start(request, sink) {
            let message = error.to_string();
            self.publisher.error(error);
            self.video.reset_progress();
            self.set_in_progress(false);
            self.set_state(GrabState::Canceled);
            return Err(GrabError::ExtractionFailed(message));
        }

        self.session = Some(Session {
            id,
            extractor,
            period,
            timecode: range.start,
            started_at: Instant::now(),
        });
        self.set_in_progress(true);
        self.set_state(GrabState::Grabbing);
        self.publish_progress();
        Ok(self.state)
    }

    fn pause_grab(&mut self) {
        if !matches!(self.state, GrabState::Grabbing | GrabState::Calculating) {
            return;
        }
        if let Some(session) = self.session.as_mut() {
            session.extractor.pause();
            self.set_in_progress(false);
            self.set_state(GrabState::Pause);
        }
    }

    fn resume_grab(&mut self) {
        if self.state != GrabState::Pause {
            return;
        }
        if let Some(session) = self.session.as_mut() {
            session.extractor.resume();
            self.set_in_progress(true);
            self.set_state(GrabState::Grabbing);
        }
    }

    fn cancel_grab(&mut self) {
        if self.drop_session() {
            log::debug!("Canceled grab of {}", self.video.title);
        }
        self.set_in_progress(false);
        self.set_state(GrabState::Canceled);
    }

    /// Cancel and forget the live extractor. Returns `true` if there was one.
    fn drop_session(&mut self) -> bool {
        match self.session.take() {
            Some(mut session) => {
                session.extractor.cancel();
                true
            }
            None => false,
        }
    }

    async fn handle_envelope(&mut self, envelope: Envelope) {
        let Envelope { session, event } = envelope;
        if self.session.as_ref().map(|live| live.id) != Some(session) {
            log::debug!("Ignoring {event:?} from stale session {session}");
            return;
        }

        match event {
            ExtractorEvent::Calculating => {
                if self.state == GrabState::Grabbing {
                    self.set_state(GrabState::Calculating);
                }
            }
            ExtractorEvent::Started(progress) => {
                self.video.progress_mut().merge(progress);
                if self.state == GrabState::Calculating {
                    self.set_state(GrabState::Grabbing);
                }
                self.publish_progress();
            }
            ExtractorEvent::Paused => log::debug!("Extractor paused"),
            ExtractorEvent::Resumed => log::debug!("Extractor resumed"),
            ExtractorEvent::FrameReady {
                progress,
                timecode,
                path,
            } => self.frame_ready(progress, timecode, path).await,
            ExtractorEvent::Completed(progress) => {
                self.video.progress_mut().merge(progress);
                self.finish().await;
            }
            ExtractorEvent::Canceled => {
                self.session = None;
                self.set_in_progress(false);
                self.set_state(GrabState::Canceled);
            }
            ExtractorEvent::Failed(error) => self.fail(error),
        }
    }

    async fn frame_ready(&mut self, progress: Progress, timecode: Duration, path: PathBuf) {
        let aggregator = self.aggregator;
        let frame_index = self.video.frames().len() as u64;
        let sample_path = path.clone();
        let sample = tokio::task::spawn_blocking(move || {
            aggregator.sample(frame_index, timecode, &sample_path)
        })
        .await
        .unwrap_or_else(|error| Err(GrabError::Unexpected(error.to_string())));

        self.aggregator
            .record(self.video.palette_mut(), frame_index, &path, sample);

        self.video.extend_grabbed_range(timecode);
        self.video.push_frame(path);
        self.video.progress_mut().merge(progress);
        if let Some(session) = self.session.as_mut() {
            session.timecode = timecode;
        }

        self.publish_progress();
        self.publisher.publish(SessionEvent::Timecode(timecode));

        if self.video.progress().is_complete() {
            self.finish().await;
        }
    }

    /// Build the strip and summary and complete the session.
    async fn finish(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        drop(session.extractor);
        let shots = self.video.progress().current();
        log::debug!("Session {} finished with {shots} shots", session.id);

        let strip = self.build_strip().await;
        let summary = self.build_summary().await;

        self.set_in_progress(false);
        self.set_state(GrabState::Complete { shots });
        self.publisher
            .publish(SessionEvent::GrabFinished(GrabReport {
                title: self.video.title.clone(),
                shots,
                period_seconds: session.period.as_secs_f64(),
                palette_len: self.video.palette().len(),
                elapsed_seconds: session.started_at.elapsed().as_secs_f64(),
                strip,
                summary,
            }));

        if self.options.open_directory_after_completion {
            if let (Some(coordinator), Some(directory)) = (
                self.publisher.coordinator(),
                self.video.export_directory.as_deref(),
            ) {
                coordinator.open_directory(directory);
            }
        }
    }

    async fn build_strip(&mut self) -> Option<PathBuf> {
        let colors = self.video.palette().colors();
        if colors.is_empty() {
            log::warn!("No colors collected for {}, skipping strip", self.video.title);
            return None;
        }
        let destination = self.video.strip_path(self.options.format)?;
        let size = self.options.strip_size;
        let mode = self.options.strip_mode;
        let format = self.options.format;
        let quality = self.options.jpeg_quality;

        let target = destination.clone();
        let result = tokio::task::spawn_blocking(move || {
            StripBuilder::create_with_quality(&target, &colors, size, mode, format, quality)
        })
        .await
        .unwrap_or_else(|error| Err(GrabError::Unexpected(error.to_string())));

        match result {
            Ok(()) => {
                self.publisher
                    .publish(SessionEvent::StripCreated(destination.clone()));
                Some(destination)
            }
            Err(error) => {
                self.publisher.error(error);
                None
            }
        }
    }

    async fn build_summary(&mut self) -> Option<PathBuf> {
        let builder = self.summary_builder.clone();
        let video = self.video.clone();
        let result = tokio::task::spawn_blocking(move || builder.create_summary_image(&video))
            .await
            .unwrap_or_else(|error| Err(GrabError::Unexpected(error.to_string())));

        match result {
            Ok(path) => {
                self.publisher
                    .publish(SessionEvent::SummaryCreated(path.clone()));
                Some(path)
            }
            Err(error) => {
                self.publisher.error(error);
                None
            }
        }
    }

    fn fail(&mut self, error: GrabError) {
        log::debug!("Extractor failed for {}: {error}", self.video.title);
        self.publisher.error(error);
        self.drop_session();
        self.video.reset_progress();
        self.set_in_progress(false);
        self.set_state(GrabState::Canceled);
    }

    fn publish_progress(&self) {
        self.publisher.publish(SessionEvent::Progress {
            progress: self.video.progress(),
            palette_len: self.video.palette().len(),
        });
    }

    fn set_state(&mut self, state: GrabState) {
        if self.state != state {
            log::debug!("State {} -> {}", self.state, state);
            self.state = state;
            self.publisher.publish(SessionEvent::StateChanged(state));
        }
    }

    fn set_in_progress(&mut self, in_progress: bool) {
        if self.in_progress != in_progress {
            self.in_progress = in_progress;
            self.publisher
                .publish(SessionEvent::Activity { in_progress });
        }
    }
}
