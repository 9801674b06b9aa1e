//! Session notifications.
//!
//! Everything a controller makes observable goes out as a [`SessionEvent`] on
//! one broadcast channel, in the order it happened. An optional
//! [`Coordinator`] receives the few requests that need a host application:
//! showing an error, asking for an export directory and opening a folder.

use std::{
    path::{Path, PathBuf},
    sync::{Arc, Weak},
    time::Duration,
};

use serde::Serialize;
use tokio::sync::broadcast;

use crate::error::GrabError;
use crate::progress::Progress;
use crate::state::GrabState;

/// Summary of a finished session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrabReport {
    /// Title of the grabbed video.
    pub title: String,
    /// Frames grabbed.
    pub shots: u64,
    /// Grab period in seconds.
    pub period_seconds: f64,
    /// Colors in the palette at completion.
    pub palette_len: usize,
    /// Wall time from start to finish in seconds.
    pub elapsed_seconds: f64,
    /// Strip image, if one was written.
    pub strip: Option<PathBuf>,
    /// Summary image, if one was written.
    pub summary: Option<PathBuf>,
}

/// An observable change in a grab session.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum SessionEvent {
    /// The controller moved to a new state.
    StateChanged(GrabState),
    /// Whether an operation is in flight changed.
    Activity {
        /// `true` while frames are being produced.
        in_progress: bool,
    },
    /// Progress moved. `palette_len` already includes this frame's color.
    Progress {
        /// Progress after the frame.
        progress: Progress,
        /// Colors collected so far.
        palette_len: usize,
    },
    /// Position of the most recent frame.
    Timecode(Duration),
    /// A strip image was written.
    StripCreated(PathBuf),
    /// A summary image was written.
    SummaryCreated(PathBuf),
    /// The session completed.
    GrabFinished(GrabReport),
    /// Something went wrong.
    Error(Arc<GrabError>),
}

/// Host application hooks.
///
/// Controllers hold their coordinator weakly; hooks are skipped once it has
/// been dropped.
pub trait Coordinator: Send + Sync {
    /// Show `error` to the user.
    fn present_error(&self, error: &GrabError);

    /// Ask the user to choose an export directory for `title`.
    fn request_export_directory(&self, title: &str);

    /// Reveal `directory` to the user.
    fn open_directory(&self, directory: &Path);
}

/// Publishes session events in order and forwards errors to the coordinator.
pub(crate) struct Publisher {
    sender: broadcast::Sender<SessionEvent>,
    coordinator: Option<Weak<dyn Coordinator>>,
}

impl Publisher {
    pub(crate) fn new(sender: broadcast::Sender<SessionEvent>) -> Self {
        Self {
            sender,
            coordinator: None,
        }
    }

    pub(crate) fn set_coordinator(&mut self, coordinator: Weak<dyn Coordinator>) {
        self.coordinator = Some(coordinator);
    }

    pub(crate) fn coordinator(&self) -> Option<Arc<dyn Coordinator>> {
        self.coordinator.as_ref().and_then(Weak::upgrade)
    }

    /// Send `event` to every subscriber. Having none is not an error.
    pub(crate) fn publish(&self, event: SessionEvent) {
        let _ = self.sender.send(event);
    }

    /// Surface `error`: publish it and have the coordinator present it.
    /// Errors that are not user-facing are only logged.
    pub(crate) fn error(&self, error: GrabError) {
        if !error.is_user_facing() {
            log::error!("Unexpected grab failure: {error}");
            return;
        }
        if let Some(coordinator) = self.coordinator() {
            coordinator.present_error(&error);
        }
        self.publish(SessionEvent::Error(Arc::new(error)));
    }
}
