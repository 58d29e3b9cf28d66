//! Cooperative cancellation for parsing.
//!
//! The parser polls a cancellation token at the start of every
//! non-leaf production and on every iteration of comma-separated
//! element loops. A token that reports cancellation raises a
//! [Cancelled] error that speculative readers re-raise without
//! suppression.

use std::fmt;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Mutex;
use std::time::Duration;
use std::time::Instant;

use crate::error::Cancelled;

/// A cooperative stop signal polled at safe points.
pub trait CancellationToken: fmt::Debug + Send + Sync {
    /// Determines if the operation has been cancelled.
    ///
    /// Polling may have side effects (e.g. advancing a poll counter).
    fn is_cancelled(&self) -> bool;

    /// Requests cancellation with the given reason.
    fn cancel(&self, reason: &str);

    /// Gets the reason the operation was cancelled, if it was.
    fn reason(&self) -> Option<String>;

    /// Raises a [Cancelled] error if the operation has been cancelled.
    fn throw_if_cancelled(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled::new(
                self.reason().unwrap_or_else(|| "cancelled".to_string()),
            ))
        } else {
            Ok(())
        }
    }
}

/// A cancellation token that never cancels.
#[derive(Debug, Default)]
pub struct NoOpCancellationToken;

impl CancellationToken for NoOpCancellationToken {
    fn is_cancelled(&self) -> bool {
        false
    }

    fn cancel(&self, _reason: &str) {}

    fn reason(&self) -> Option<String> {
        None
    }
}

/// A cancellation token that cancels after a fixed number of polls.
///
/// Each call to `is_cancelled` counts as one poll.
#[derive(Debug)]
pub struct CounterCancellationToken {
    /// The number of polls after which the token cancels.
    limit: usize,
    /// The number of polls observed so far.
    polls: AtomicUsize,
    /// Whether cancellation was requested explicitly.
    cancelled: AtomicBool,
    /// The reason cancellation was requested, if it was.
    reason: Mutex<Option<String>>,
}

impl CounterCancellationToken {
    /// Creates a token that cancels after the given number of polls.
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            polls: AtomicUsize::new(0),
            cancelled: AtomicBool::new(false),
            reason: Mutex::new(None),
        }
    }

    /// Gets the number of polls observed so far.
    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::Relaxed)
    }
}

impl CancellationToken for CounterCancellationToken {
    fn is_cancelled(&self) -> bool {
        let polls = self.polls.fetch_add(1, Ordering::Relaxed) + 1;
        polls >= self.limit || self.cancelled.load(Ordering::Relaxed)
    }

    fn cancel(&self, reason: &str) {
        *self.reason.lock().expect("reason lock should not be poisoned") =
            Some(reason.to_string());
        self.cancelled.store(true, Ordering::Relaxed);
    }

    fn reason(&self) -> Option<String> {
        let reason = self
            .reason
            .lock()
            .expect("reason lock should not be poisoned")
            .clone();
        reason.or_else(|| Some(format!("poll limit of {limit} reached", limit = self.limit)))
    }
}

/// A cancellation token that cancels after a wall-clock deadline.
#[derive(Debug)]
pub struct TimedCancellationToken {
    /// The instant after which the token cancels.
    deadline: Instant,
    /// Whether cancellation was requested explicitly.
    cancelled: AtomicBool,
    /// The reason cancellation was requested, if it was.
    reason: Mutex<Option<String>>,
}

impl TimedCancellationToken {
    /// Creates a token that cancels after the given number of
    /// milliseconds.
    pub fn new(milliseconds: u64) -> Self {
        Self {
            deadline: Instant::now() + Duration::from_millis(milliseconds),
            cancelled: AtomicBool::new(false),
            reason: Mutex::new(None),
        }
    }
}

impl CancellationToken for TimedCancellationToken {
    fn is_cancelled(&self) -> bool {
        Instant::now() >= self.deadline || self.cancelled.load(Ordering::Relaxed)
    }

    fn cancel(&self, reason: &str) {
        *self.reason.lock().expect("reason lock should not be poisoned") =
            Some(reason.to_string());
        self.cancelled.store(true, Ordering::Relaxed);
    }

    fn reason(&self) -> Option<String> {
        let reason = self
            .reason
            .lock()
            .expect("reason lock should not be poisoned")
            .clone();
        reason.or_else(|| Some("deadline exceeded".to_string()))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn no_op_never_cancels() {
        let token = NoOpCancellationToken;
        assert!(!token.is_cancelled());
        assert!(token.throw_if_cancelled().is_ok());
    }

    #[test]
    fn counter_counts_polls() {
        let token = CounterCancellationToken::new(3);
        assert!(!token.is_cancelled());
        assert!(!token.is_cancelled());
        assert!(token.is_cancelled());
        assert_eq!(token.polls(), 3);
        assert!(token.throw_if_cancelled().is_err());
    }

    #[test]
    fn explicit_cancel_carries_reason() {
        let token = CounterCancellationToken::new(usize::MAX);
        token.cancel("host shut down");
        assert!(token.is_cancelled());
        let error = token.throw_if_cancelled().expect_err("should be cancelled");
        assert_eq!(error.reason(), "host shut down");
    }
}
