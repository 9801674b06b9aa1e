//! Grab session states and the toggle transition table.

use std::fmt::{Display, Formatter, Result as FmtResult};

/// Where a grab session stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GrabState {
    /// No session has run yet.
    #[default]
    Ready,
    /// The extractor is still working out how many frames it will produce.
    Calculating,
    /// Frames are being grabbed.
    Grabbing,
    /// Grabbing is paused and can be resumed.
    Pause,
    /// The session finished after grabbing `shots` frames.
    Complete {
        /// Number of frames grabbed.
        shots: u64,
    },
    /// The session was canceled or aborted by an error.
    Canceled,
}

/// What a toggle does from a given state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleAction {
    /// Start a new session.
    Start,
    /// Resume a paused session.
    Resume,
    /// Pause the running session.
    Pause,
    /// Do nothing.
    Ignore,
}

impl GrabState {
    /// The action a toggle triggers in this state.
    ///
    /// ```
    /// use framegrab::{GrabState, ToggleAction};
    ///
    /// assert_eq!(GrabState::Ready.toggle_action(), ToggleAction::Start);
    /// assert_eq!(GrabState::Grabbing.toggle_action(), ToggleAction::Pause);
    /// assert_eq!(GrabState::Calculating.toggle_action(), ToggleAction::Ignore);
    /// ```
    pub fn toggle_action(self) -> ToggleAction {
        match self {
            GrabState::Ready | GrabState::Complete { .. } | GrabState::Canceled => {
                ToggleAction::Start
            }
            GrabState::Pause => ToggleAction::Resume,
            GrabState::Grabbing => ToggleAction::Pause,
            GrabState::Calculating => ToggleAction::Ignore,
        }
    }

    /// The state a toggle leads to.
    pub fn toggled(self) -> GrabState {
        match self.toggle_action() {
            ToggleAction::Start | ToggleAction::Resume => GrabState::Grabbing,
            ToggleAction::Pause => GrabState::Pause,
            ToggleAction::Ignore => self,
        }
    }

    /// `true` while a session holds a live extractor.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            GrabState::Calculating | GrabState::Grabbing | GrabState::Pause
        )
    }
}

impl Display for GrabState {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            GrabState::Ready => f.write_str("ready"),
            GrabState::Calculating => f.write_str("calculating"),
            GrabState::Grabbing => f.write_str("grabbing"),
            GrabState::Pause => f.write_str("paused"),
            GrabState::Complete { shots } => write!(f, "complete ({shots} shots)"),
            GrabState::Canceled => f.write_str("canceled"),
        }
    }
}
