//! Windows backend.
//!
//! A signal is a manual-reset event object. Waiting on several signals
//! is a single `WaitForMultipleObjects` call, which reports an event
//! that is still set from a previous tick without blocking.

use super::millis_ceil;

use std::io;
use std::ptr;
use std::time::Duration;

use windows_sys::Win32::Foundation::{CloseHandle, HANDLE, WAIT_FAILED, WAIT_OBJECT_0, WAIT_TIMEOUT};
use windows_sys::Win32::System::Threading::{
    CreateEventW, INFINITE, MAXIMUM_WAIT_OBJECTS, ResetEvent, SetEvent, WaitForMultipleObjects,
};

/// Raw identifier handed to [`wait_any`].
pub(crate) type RawSignal = HANDLE;

/// A manual-reset Win32 event object.
pub(crate) struct RawEvent(HANDLE);

unsafe impl Send for RawEvent {}
unsafe impl Sync for RawEvent {}

impl RawEvent {
    /// Creates an unset, manual-reset, non-inheritable event.
    pub(crate) fn new() -> io::Result<Self> {
        let handle = unsafe { CreateEventW(ptr::null(), 1, 0, ptr::null()) };

        if handle.is_null() {
            return Err(io::Error::last_os_error());
        }

        Ok(Self(handle))
    }

    /// Sets the event.
    pub(crate) fn set(&self) -> io::Result<()> {
        if unsafe { SetEvent(self.0) } == 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(())
    }

    /// Clears the event.
    pub(crate) fn reset(&self) -> io::Result<()> {
        if unsafe { ResetEvent(self.0) } == 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(())
    }

    /// Returns the handle to wait on.
    pub(crate) fn raw(&self) -> RawSignal {
        self.0
    }
}

impl Drop for RawEvent {
    fn drop(&mut self) {
        unsafe { CloseHandle(self.0) };
    }
}

/// Blocks until one of `signals` is set or `timeout` elapses.
///
/// Returns the index of the lowest set signal, or `None` on timeout.
/// At most `MAXIMUM_WAIT_OBJECTS` (64) signals can be watched at once.
pub(crate) fn wait_any(signals: &[RawSignal], timeout: Option<Duration>) -> io::Result<Option<usize>> {
    if signals.len() > MAXIMUM_WAIT_OBJECTS as usize {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "cannot wait on {} signals at once (limit is {MAXIMUM_WAIT_OBJECTS})",
                signals.len()
            ),
        ));
    }

    let timeout_ms = timeout
        .map(|t| millis_ceil(t).min((INFINITE - 1) as u128) as u32)
        .unwrap_or(INFINITE);

    let rc = unsafe {
        WaitForMultipleObjects(signals.len() as u32, signals.as_ptr(), 0, timeout_ms)
    };

    if rc == WAIT_TIMEOUT {
        return Ok(None);
    }

    if rc == WAIT_FAILED {
        return Err(io::Error::last_os_error());
    }

    let index = rc.wrapping_sub(WAIT_OBJECT_0) as usize;
    if index < signals.len() {
        return Ok(Some(index));
    }

    Err(io::Error::other(format!("unexpected wait status {rc:#x}")))
}
