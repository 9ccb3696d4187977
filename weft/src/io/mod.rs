//! Asynchronous operations driven by completion signals.
//!
//! A task suspends on exactly one thing: its environment's signal. Resource
//! collaborators build on that:
//!
//! 1. [`Completion::begin`] reserves the environment's completion record
//!    and returns a [`Ticket`],
//! 2. the operation is started and the ticket handed to whatever finishes
//!    it (a helper thread, an OS callback, ...),
//! 3. the task awaits [`signaled`], which suspends it until the ticket
//!    reports and sets the signal,
//! 4. the task collects the outcome with [`Completion::take`].
//!
//! [`submit`] runs these steps for any [`Operation`]. [`AsyncHandle`] and
//! [`pipe`] are the collaborators shipped with the crate.

mod blocking;
mod completion;
mod handle;
mod pipe;

pub(crate) use blocking::offload;

pub use completion::{Completion, Ticket, Transfer};
pub use handle::AsyncHandle;
pub use pipe::pipe;

use crate::error::{Error, Result};
use crate::runtime::context;
use crate::task::Task;

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

/// An asynchronous operation that reports through a [`Ticket`].
pub trait Operation: 'static {
    /// Value produced from a successful completion.
    type Output: 'static;

    /// Short name used in errors and thread names.
    fn name(&self) -> &'static str;

    /// Starts the operation.
    ///
    /// The ticket must eventually be completed (or dropped, if the
    /// operation is cancelled). An `Err` means the operation never
    /// started; the ticket is then discarded.
    fn initiate(&mut self, ticket: Ticket) -> io::Result<()>;

    /// Turns the reported transfer into the operation's output.
    fn finish(self, transfer: Transfer) -> Result<Self::Output>;
}

/// Wraps an operation into a task.
///
/// Awaiting the task starts the operation, suspends until it completes and
/// returns its output. Failures surface as [`Error::Initiate`] when the
/// operation could not be started, and as [`Error::Complete`] when it
/// reported an error (or was cancelled).
pub fn submit<O: Operation>(mut op: O) -> Task<O::Output> {
    Task::new(async move {
        let completion = completion();
        let ticket = completion.begin();

        if let Err(source) = op.initiate(ticket) {
            completion.abandon();
            return Err(Error::Initiate {
                op: op.name(),
                source,
            });
        }

        signaled().await;

        let transfer = completion.take().map_err(|source| Error::Complete {
            op: op.name(),
            source,
        })?;

        op.finish(transfer)
    })
}

/// Returns the completion record of the calling task's environment.
///
/// # Panics
///
/// Panics if called outside of a task body.
pub fn completion() -> Completion {
    let (env, _) = context::current().expect("io::completion called outside of a task");
    env.completion().clone()
}

/// Suspends the calling task until its environment's signal is set.
///
/// This is the only suspension point of the runtime: everything else a
/// task awaits is either a nested task or built on top of this.
///
/// # Panics
///
/// Panics when polled outside of a task body, or by a task that is not the
/// current leaf of its environment.
pub fn signaled() -> Signaled {
    Signaled { parked: false }
}

/// Future returned by [`signaled`].
#[derive(Debug)]
#[must_use = "futures do nothing unless awaited"]
pub struct Signaled {
    parked: bool,
}

impl Future for Signaled {
    type Output = ();

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        // The environment only polls a parked task again once the signal
        // fired.
        if this.parked {
            return Poll::Ready(());
        }

        let (env, id) = context::current().expect("io::signaled awaited outside of a task");
        env.await_signal(id);
        this.parked = true;

        Poll::Pending
    }
}
