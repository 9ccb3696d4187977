use super::JoinHandle;
use super::state::{Outcome, TaskState};
use crate::error::Result;
use crate::runtime::builder::UnconsumedErrors;
use crate::runtime::context;
use crate::runtime::environment::Cascade;

use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

/// Type-erased task body as stored in an environment's arena.
///
/// The body writes the task's result into its slot and reports only the
/// outcome, so the arena can hold tasks of any result type.
pub(crate) type Body = Pin<Box<dyn Future<Output = Outcome>>>;

/// Identifier of a task inside its environment.
///
/// Identifiers are arena indices: they are unique among the live tasks of
/// one environment and may be reused once a finished nested task has been
/// collected by its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(pub(crate) usize);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

/// Result slot shared between a task's body, its handles and the arena.
pub(crate) struct Slot<T> {
    id: Cell<Option<TaskId>>,
    state: Cell<TaskState>,
    result: RefCell<Option<Result<T>>>,
    policy: Cell<UnconsumedErrors>,
}

impl<T> Slot<T> {
    fn new() -> Self {
        Self {
            id: Cell::new(None),
            state: Cell::new(TaskState::NotStarted),
            result: RefCell::new(None),
            policy: Cell::new(UnconsumedErrors::default()),
        }
    }

    pub(crate) fn id(&self) -> Option<TaskId> {
        self.id.get()
    }

    pub(crate) fn state(&self) -> TaskState {
        self.state.get()
    }

    fn store(&self, result: Result<T>) {
        *self.result.borrow_mut() = Some(result);
    }

    /// Moves the result out of the slot.
    ///
    /// # Panics
    ///
    /// Panics if the task has not finished, or if the result was already
    /// taken.
    pub(crate) fn take(&self) -> Result<T> {
        let state = self.state.get();
        if !state.is_done() {
            panic!("get_result called on a task that has not finished (it is {state})");
        }

        self.result
            .borrow_mut()
            .take()
            .expect("task result already taken")
    }
}

impl<T> Drop for Slot<T> {
    fn drop(&mut self) {
        if let Some(Err(error)) = self.result.get_mut().take() {
            self.policy.get().report(&error);
        }
    }
}

/// The untyped view of a [`Slot`] kept by the environment.
pub(crate) trait Header {
    fn state(&self) -> TaskState;

    fn set_state(&self, state: TaskState);

    /// Records the arena slot and the environment's policy.
    fn bind(&self, id: TaskId, policy: UnconsumedErrors);
}

impl<T> Header for Slot<T> {
    fn state(&self) -> TaskState {
        self.state.get()
    }

    fn set_state(&self, state: TaskState) {
        self.state.set(state);
    }

    fn bind(&self, id: TaskId, policy: UnconsumedErrors) {
        self.id.set(Some(id));
        self.policy.set(policy);
    }
}

/// A resumable computation producing a `Result<T>`.
///
/// A task wraps an `async` body. The body does not run when the task is
/// created: it starts the moment the task is bound to an environment, and
/// then runs synchronously until its first suspension point or until it
/// returns.
///
/// A task is bound in one of two ways:
///
/// - as a **root**, through [`Environment::attach`](crate::Environment::attach)
///   or [`SchedulerBuilder::spawn`](crate::SchedulerBuilder::spawn);
/// - as a **nested** task, by `.await`ing it from inside another task. The
///   child joins the parent's environment, becomes the current leaf, and
///   runs immediately. If it finishes without suspending, the parent
///   continues within the same step.
///
/// A task suspends only on [`io::signaled`](crate::io::signaled) or on a
/// nested task. Awaiting any other kind of future from a task body is a
/// contract violation.
///
/// # Examples
///
/// ```rust,ignore
/// let child = Task::new(async { Ok(21) });
///
/// let parent = Task::new(async move {
///     let half = child.await?;
///     Ok(half * 2)
/// });
/// ```
pub struct Task<T> {
    slot: Rc<Slot<T>>,

    /// The body, until the task is bound.
    body: Option<Body>,

    /// Set while the task is bound as a nested task and not yet collected.
    adopted: bool,
}

impl<T: 'static> Task<T> {
    /// Creates a task from an `async` body.
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = Result<T>> + 'static,
    {
        let slot = Rc::new(Slot::new());
        let writer = slot.clone();

        let body: Body = Box::pin(async move {
            let result = future.await;

            let outcome = if result.is_ok() {
                Outcome::Success
            } else {
                Outcome::Error
            };

            writer.store(result);
            outcome
        });

        Self {
            slot,
            body: Some(body),
            adopted: false,
        }
    }

    /// Identifier of the task inside its environment, once bound.
    pub fn id(&self) -> Option<TaskId> {
        self.slot.id()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> TaskState {
        self.slot.state()
    }

    /// Returns `true` once the body has returned.
    pub fn is_done(&self) -> bool {
        self.slot.state().is_done()
    }

    /// Returns a handle through which the result can be read later.
    ///
    /// Useful to keep access to a task that is handed over to a scheduler
    /// with [`Scheduler::new`](crate::Scheduler::new).
    pub fn join_handle(&self) -> JoinHandle<T> {
        JoinHandle::new(self.slot.clone())
    }

    /// Takes the task's result.
    ///
    /// # Panics
    ///
    /// Panics if the task has not finished, or if the result was already
    /// taken (by a previous call, by `.await`, or through a handle).
    pub fn get_result(&self) -> Result<T> {
        self.slot.take()
    }

    /// Splits an unbound task into its body and result slot.
    ///
    /// # Panics
    ///
    /// Panics if the task has already been bound.
    pub(crate) fn into_parts(mut self) -> (Body, Rc<Slot<T>>) {
        let body = self
            .body
            .take()
            .expect("task is already bound to an environment");

        (body, self.slot)
    }
}

impl<T: 'static> Future for Task<T> {
    type Output = Result<T>;

    /// Runs the await protocol.
    ///
    /// On the first poll the child is adopted by the awaiting task's
    /// environment and run until it suspends or finishes. The awaiting task
    /// is polled again only once the child has finished.
    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        let (env, parent) =
            context::current().expect("a task can only be awaited from inside another task");

        if let Some(body) = this.body.take() {
            let id = env.adopt(body, this.slot.clone(), parent);
            this.adopted = true;

            if env.run(id, Cascade::Stop).is_pending() {
                return Poll::Pending;
            }
        } else if !this.slot.state().is_done() {
            panic!("{parent} was resumed while its nested task is still {}", this.slot.state());
        }

        if this.adopted {
            this.adopted = false;
            if let Some(id) = this.slot.id() {
                env.release(id);
            }
        }

        Poll::Ready(this.slot.take())
    }
}

impl<T> fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("state", &self.slot.state())
            .field("id", &self.slot.id())
            .finish()
    }
}
