//! Completion signals.
//!
//! An [`Event`] is a waitable, manually-reset binary signal. Every
//! [`Environment`](crate::Environment) owns exactly one; resource
//! collaborators set it when the operation they started on behalf of the
//! environment finishes, and the scheduler blocks on the whole set with
//! [`wait_any`].

use crate::sys::{self, RawEvent, RawSignal};

use std::io;
use std::time::Duration;

/// A waitable, manually-reset signal.
///
/// `Event` is `Send + Sync`: collaborators are free to set it from any
/// thread, while waiting and resetting are done by the thread driving the
/// scheduler.
pub struct Event {
    raw: RawEvent,
}

impl Event {
    /// Creates a new, unset event.
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            raw: RawEvent::new()?,
        })
    }

    /// Sets the event. It stays set until [`reset`](Self::reset).
    pub fn set(&self) -> io::Result<()> {
        self.raw.set()
    }

    /// Clears the event.
    pub fn reset(&self) -> io::Result<()> {
        self.raw.reset()
    }

    /// Tells whether the event is set, without waiting.
    pub fn is_set(&self) -> io::Result<bool> {
        Ok(sys::wait_any(&[self.raw.raw()], Some(Duration::ZERO))?.is_some())
    }

    /// Blocks until the event is set or `timeout` elapses.
    ///
    /// Returns `false` on timeout. The event is not reset.
    pub fn wait(&self, timeout: Option<Duration>) -> io::Result<bool> {
        Ok(sys::wait_any(&[self.raw.raw()], timeout)?.is_some())
    }

    pub(crate) fn raw(&self) -> RawSignal {
        self.raw.raw()
    }
}

impl std::fmt::Debug for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Event").finish_non_exhaustive()
    }
}

/// Blocks until at least one of `events` is set, or `timeout` elapses.
///
/// - `None` waits forever.
/// - `Some(Duration::ZERO)` polls without blocking.
///
/// Returns the index of a set event (the lowest one when several are set),
/// or `None` on timeout. Events are not reset.
///
/// # Errors
///
/// Fails with [`io::ErrorKind::InvalidInput`] when `events` is empty, or
/// when the platform cannot watch that many events at once.
pub fn wait_any(events: &[&Event], timeout: Option<Duration>) -> io::Result<Option<usize>> {
    if events.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "wait_any called with no signals",
        ));
    }

    let raw: Vec<RawSignal> = events.iter().map(|event| event.raw()).collect();

    sys::wait_any(&raw, timeout)
}
