//! Unix backend.
//!
//! A signal is a file descriptor that polls readable while the signal
//! is set. On Linux this is an `eventfd`; elsewhere it is the read end
//! of a non-blocking pipe whose write end is kept alongside it.
//!
//! Waiting on several signals is a single `poll(2)` call, which is
//! level-triggered: a signal that was set during a previous tick and
//! not yet reset is reported again without blocking.

use super::millis_ceil;

use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::time::{Duration, Instant};

/// Raw identifier handed to [`wait_any`].
pub(crate) type RawSignal = RawFd;

/// A manually-reset event backed by a pollable descriptor.
pub(crate) struct RawEvent {
    /// Descriptor that is readable while the event is set.
    reader: OwnedFd,

    /// Write end of the self-pipe.
    #[cfg(not(target_os = "linux"))]
    writer: OwnedFd,
}

impl RawEvent {
    /// Creates an unset event.
    #[cfg(target_os = "linux")]
    pub(crate) fn new() -> io::Result<Self> {
        let fd = unsafe { libc::eventfd(0, libc::EFD_NONBLOCK | libc::EFD_CLOEXEC) };
        if fd < 0 {
            return Err(io::Error::last_os_error());
        }

        let reader = unsafe { OwnedFd::from_raw_fd(fd) };

        Ok(Self { reader })
    }

    /// Creates an unset event.
    #[cfg(not(target_os = "linux"))]
    pub(crate) fn new() -> io::Result<Self> {
        let mut fds = [0 as libc::c_int; 2];

        if unsafe { libc::pipe(fds.as_mut_ptr()) } < 0 {
            return Err(io::Error::last_os_error());
        }

        let reader = unsafe { OwnedFd::from_raw_fd(fds[0]) };
        let writer = unsafe { OwnedFd::from_raw_fd(fds[1]) };

        for fd in [&reader, &writer] {
            sys_set_nonblocking_cloexec(fd.as_raw_fd())?;
        }

        Ok(Self { reader, writer })
    }

    /// Sets the event. Setting an already-set event is a no-op.
    pub(crate) fn set(&self) -> io::Result<()> {
        #[cfg(target_os = "linux")]
        let rc = {
            let value: u64 = 1;
            unsafe {
                libc::write(
                    self.reader.as_raw_fd(),
                    &value as *const u64 as *const libc::c_void,
                    8,
                )
            }
        };

        #[cfg(not(target_os = "linux"))]
        let rc = {
            let byte = [1u8];
            unsafe { libc::write(self.writer.as_raw_fd(), byte.as_ptr().cast(), 1) }
        };

        if rc < 0 {
            let err = io::Error::last_os_error();

            // Counter saturated or pipe full: the event is already set.
            if err.kind() == io::ErrorKind::WouldBlock {
                return Ok(());
            }

            return Err(err);
        }

        Ok(())
    }

    /// Clears the event by draining the descriptor.
    pub(crate) fn reset(&self) -> io::Result<()> {
        let mut buffer = [0u8; 64];

        loop {
            let rc = unsafe {
                libc::read(
                    self.reader.as_raw_fd(),
                    buffer.as_mut_ptr().cast(),
                    buffer.len(),
                )
            };

            if rc > 0 {
                continue;
            }

            if rc == 0 {
                return Ok(());
            }

            let err = io::Error::last_os_error();

            match err.kind() {
                io::ErrorKind::WouldBlock => return Ok(()),
                io::ErrorKind::Interrupted => continue,
                _ => return Err(err),
            }
        }
    }

    /// Returns the descriptor to poll on.
    pub(crate) fn raw(&self) -> RawSignal {
        self.reader.as_raw_fd()
    }
}

/// Blocks until one of `signals` is set or `timeout` elapses.
///
/// Returns the index of the first set signal in slice order, or `None`
/// on timeout. `None` as the timeout waits forever.
pub(crate) fn wait_any(signals: &[RawSignal], timeout: Option<Duration>) -> io::Result<Option<usize>> {
    let mut fds: Vec<libc::pollfd> = signals
        .iter()
        .map(|&fd| libc::pollfd {
            fd,
            events: libc::POLLIN,
            revents: 0,
        })
        .collect();

    let deadline = timeout.map(|t| Instant::now() + t);

    loop {
        let timeout_ms = match deadline {
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                millis_ceil(remaining).min(i32::MAX as u128) as libc::c_int
            }
            None => -1,
        };

        let rc = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, timeout_ms) };

        if rc < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return Err(err);
        }

        if rc == 0 {
            return Ok(None);
        }

        let ready = libc::POLLIN | libc::POLLERR | libc::POLLHUP | libc::POLLNVAL;

        return Ok(fds.iter().position(|fd| fd.revents & ready != 0));
    }
}

/// Puts a descriptor in non-blocking, close-on-exec mode.
#[cfg(not(target_os = "linux"))]
fn sys_set_nonblocking_cloexec(fd: RawFd) -> io::Result<()> {
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 {
        return Err(io::Error::last_os_error());
    }

    if unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) } < 0 {
        return Err(io::Error::last_os_error());
    }

    if unsafe { libc::fcntl(fd, libc::F_SETFD, libc::FD_CLOEXEC) } < 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(())
}
