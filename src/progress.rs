//! Grab progress and cancellation.
//!
//! [`Progress`] is the `(current, total)` pair published by the controller
//! while a session runs. [`CancellationToken`] is the cooperative stop flag
//! used by extractors running on their own threads.
//!
//! # Example
//!
//! ```
//! use framegrab::Progress;
//!
//! let mut progress = Progress::new(4);
//! progress.advance_to(9);
//! assert_eq!(progress.current(), 4);
//! assert!(progress.is_complete());
//! ```

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

/// Number of grabs done versus expected.
///
/// `current` never exceeds `total`. The total can only grow: an extractor
/// that recalculates its frame count mid-session may raise it, but a lower
/// figure is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Progress {
    current: u64,
    total: u64,
}

impl Progress {
    /// Create progress at zero out of `total`.
    pub fn new(total: u64) -> Self {
        Self { current: 0, total }
    }

    /// Create progress with an explicit current value, clamped to `total`.
    pub fn with_current(current: u64, total: u64) -> Self {
        Self {
            current: current.min(total),
            total,
        }
    }

    /// Items processed so far.
    pub fn current(&self) -> u64 {
        self.current
    }

    /// Items expected in total.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Move `current` to `value`, clamped to the total.
    pub fn advance_to(&mut self, value: u64) {
        self.current = value.min(self.total);
    }

    /// Raise the total. Returns `true` if the total changed.
    pub fn revise_total(&mut self, total: u64) -> bool {
        if total > self.total {
            log::debug!("Progress total revised {} -> {}", self.total, total);
            self.total = total;
            true
        } else {
            false
        }
    }

    /// Fold a report from the extractor into this progress.
    ///
    /// The reported total may raise ours; the reported current is clamped
    /// and never moves `current` backwards.
    pub fn merge(&mut self, reported: Progress) {
        self.revise_total(reported.total);
        self.advance_to(reported.current.max(self.current));
    }

    /// `true` once every expected item has been processed.
    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.current == self.total
    }

    /// Completion ratio in `0.0..=1.0`, or `0.0` when the total is unknown.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.current as f64 / self.total as f64
        }
    }
}

/// Cooperative cancellation token backed by an [`AtomicBool`].
///
/// Clone this token and share it between threads; call
/// [`cancel`](CancellationToken::cancel) from any thread to stop the
/// associated extraction before its next frame.
///
/// # Example
///
/// ```
/// use framegrab::CancellationToken;
///
/// let token = CancellationToken::new();
/// assert!(!token.is_cancelled());
///
/// token.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new, non-cancelled token.
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation. All clones observe it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Check whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}
