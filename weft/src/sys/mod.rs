//! Platform-specific signal primitives.
//!
//! This module provides a unified interface over the waitable,
//! manually-reset event objects offered by each operating system:
//!
//! - `eventfd(2)` on Linux,
//! - a non-blocking self-pipe on other Unix targets,
//! - manual-reset event objects on Windows.
//!
//! The concrete implementation is selected at compile time
//! depending on the target operating system. Both backends expose the
//! same `RawEvent` type and `wait_any` function.

use std::time::Duration;

#[cfg(unix)]
mod unix;

#[cfg(windows)]
mod windows;

#[cfg(unix)]
pub(crate) use unix::{RawEvent, RawSignal, wait_any};

#[cfg(windows)]
pub(crate) use windows::{RawEvent, RawSignal, wait_any};

/// Converts a timeout to whole milliseconds, rounding up.
///
/// Rounding down would turn a 100µs wait into a non-blocking poll.
pub(crate) fn millis_ceil(timeout: Duration) -> u128 {
    timeout.as_nanos().div_ceil(1_000_000)
}
