use super::builder::{Root, UnconsumedErrors};
use super::context;
use super::task::{Body, Header, JoinHandle, Task, TaskId, TaskState};
use crate::error::Result;
use crate::io::Completion;
use crate::signal::Event;
use crate::utils::Slab;

use log::{debug, trace};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

/// Whether a finishing task hands control back to its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Cascade {
    /// Resume the parent in the same step. Used when the leaf is resumed by
    /// the environment: its parent is suspended, waiting on it.
    Up,

    /// Return to the caller. Used when a task runs inline from the poll of
    /// its parent (or is a root being started): the caller is the parent.
    Stop,
}

/// A task of the chain, as stored in the arena.
struct Node {
    /// `None` while the body is being polled and once it has returned.
    body: Option<Body>,
    header: Rc<dyn Header>,
    parent: Option<TaskId>,

    /// The task parked itself on the environment's signal.
    awaiting_signal: bool,
}

/// State shared between an [`Environment`] and the frames of its running
/// tasks.
pub(crate) struct EnvCore {
    signal: Arc<Event>,
    completion: Completion,

    /// The innermost suspended task of the chain.
    current: Cell<Option<TaskId>>,

    root: Cell<Option<TaskId>>,
    tasks: RefCell<Slab<Node>>,
    policy: UnconsumedErrors,
}

impl EnvCore {
    pub(crate) fn current(&self) -> Option<TaskId> {
        self.current.get()
    }

    pub(crate) fn completion(&self) -> &Completion {
        &self.completion
    }

    fn insert(&self, body: Body, header: Rc<dyn Header>, parent: Option<TaskId>) -> TaskId {
        let node = Node {
            body: Some(body),
            header: header.clone(),
            parent,
            awaiting_signal: false,
        };

        let id = TaskId(self.tasks.borrow_mut().insert(node));
        header.bind(id, self.policy);

        id
    }

    /// Moves the current leaf from `expected` to `next`.
    ///
    /// # Panics
    ///
    /// Panics when the recorded leaf is not `expected`: two call sites are
    /// driving the same chain.
    pub(crate) fn update_current(&self, expected: Option<TaskId>, next: Option<TaskId>) {
        let current = self.current.get();

        if current != expected {
            panic!(
                "nonlinear use of environment: expected current leaf {}, found {}",
                Leaf(expected),
                Leaf(current),
            );
        }

        self.current.set(next);
        trace!("current leaf {} -> {}", Leaf(current), Leaf(next));
    }

    /// Binds `body` as a nested task of `parent` and makes it the leaf.
    pub(crate) fn adopt(&self, body: Body, header: Rc<dyn Header>, parent: TaskId) -> TaskId {
        let id = self.insert(body, header, Some(parent));
        self.update_current(Some(parent), Some(id));

        id
    }

    /// Drops a finished nested task from the arena.
    pub(crate) fn release(&self, id: TaskId) {
        let node = self.tasks.borrow_mut().remove(id.0);
        debug_assert!(node.header.state().is_done());
    }

    /// Records that the leaf `id` parks on the signal.
    pub(crate) fn await_signal(&self, id: TaskId) {
        self.update_current(Some(id), Some(id));
        self.tasks.borrow_mut().get_mut(id.0).awaiting_signal = true;
    }

    /// Resumes `id` until it suspends or finishes.
    ///
    /// With [`Cascade::Up`], every finished task resumes its parent, up to
    /// the next suspension or the end of the chain.
    ///
    /// # Panics
    ///
    /// Panics if `id` is neither suspended nor freshly bound.
    pub(crate) fn run(self: &Rc<Self>, mut id: TaskId, cascade: Cascade) -> Poll<()> {
        let mut cx = Context::from_waker(Waker::noop());

        loop {
            let mut body = {
                let mut tasks = self.tasks.borrow_mut();
                let node = tasks.get_mut(id.0);

                let state = node.header.state();
                assert!(state.is_resumable(), "cannot resume {id}: it is {state}");

                node.awaiting_signal = false;
                node.header.set_state(TaskState::Running);
                node.body.take().expect("resumable task without a body")
            };

            let poll = context::enter(self.clone(), id, || body.as_mut().poll(&mut cx));

            let outcome = match poll {
                Poll::Pending => {
                    let mut tasks = self.tasks.borrow_mut();
                    self.check_suspension(&tasks, id);

                    let node = tasks.get_mut(id.0);
                    node.body = Some(body);
                    node.header.set_state(TaskState::Suspended);

                    return Poll::Pending;
                }
                Poll::Ready(outcome) => outcome,
            };

            drop(body);

            let parent = {
                let tasks = self.tasks.borrow();
                let node = tasks.get(id.0);
                node.header.set_state(TaskState::Done(outcome));
                node.parent
            };

            self.update_current(Some(id), parent);
            trace!("{id} finished: {}", TaskState::Done(outcome));

            match (parent, cascade) {
                (Some(parent), Cascade::Up) => id = parent,
                _ => return Poll::Ready(()),
            }
        }
    }

    /// A task may only return `Pending` when it parked on the signal, or
    /// when it awaits a nested task that did.
    fn check_suspension(&self, tasks: &Slab<Node>, id: TaskId) {
        let leaf = self.current.get();

        if leaf == Some(id) {
            assert!(
                tasks.get(id.0).awaiting_signal,
                "{id} suspended without awaiting its environment's signal"
            );
            return;
        }

        let mut cursor = leaf.and_then(|leaf| tasks.get(leaf.0).parent);
        while let Some(ancestor) = cursor {
            if ancestor == id {
                return;
            }
            cursor = tasks.get(ancestor.0).parent;
        }

        panic!(
            "{id} suspended but the current leaf {} does not descend from it",
            Leaf(leaf)
        );
    }
}

impl Drop for EnvCore {
    /// Tears the chain down, leaf first.
    ///
    /// A pending operation is cancelled before any suspended body is
    /// dropped, so nothing can report into a task that no longer exists.
    fn drop(&mut self) {
        let Some(leaf) = self.current.get() else {
            return;
        };

        if self.completion.cancel() {
            debug!("cancelled the pending operation of {leaf} on teardown");
        }

        let tasks = self.tasks.get_mut();
        let mut bodies = Vec::new();
        let mut cursor = Some(leaf);

        while let Some(id) = cursor {
            let node = tasks.get_mut(id.0);
            bodies.extend(node.body.take());
            cursor = node.parent;
        }

        drop(bodies);
    }
}

/// Binds one completion signal to one chain of nested tasks.
///
/// An environment owns:
///
/// - an [`Event`], the only thing its tasks ever suspend on,
/// - a [`Completion`] record that resource collaborators report into,
/// - the arena of the chain's tasks and the current leaf: the innermost
///   task, suspended on the signal.
///
/// Environments are normally created by a
/// [`Scheduler`](crate::Scheduler), but can be driven by hand with
/// [`attach`](Self::attach) and [`step`](Self::step).
///
/// # Examples
///
/// ```rust,ignore
/// let env = Environment::new()?;
///
/// let handle = env.attach(Task::new(async {
///     weft::io::signaled().await;
///     Ok(7)
/// }));
///
/// env.signal().set()?;
/// env.step()?;
///
/// assert!(env.done());
/// assert_eq!(handle.get_result()?, 7);
/// ```
pub struct Environment {
    core: Rc<EnvCore>,
}

impl Environment {
    /// Creates an environment with the default [`UnconsumedErrors`] policy.
    pub fn new() -> Result<Self> {
        Self::with_policy(UnconsumedErrors::default())
    }

    /// Creates an environment whose tasks follow `policy`.
    pub fn with_policy(policy: UnconsumedErrors) -> Result<Self> {
        let signal = Arc::new(Event::new()?);
        let completion = Completion::new(signal.clone());

        Ok(Self {
            core: Rc::new(EnvCore {
                signal,
                completion,
                current: Cell::new(None),
                root: Cell::new(None),
                tasks: RefCell::new(Slab::new(4)),
                policy,
            }),
        })
    }

    /// Makes `task` the root of this environment and starts it.
    ///
    /// The task runs until its first suspension or until it returns. The
    /// returned handle reads its result once it is done.
    ///
    /// # Panics
    ///
    /// Panics if a root was already attached, or if the task is bound.
    pub fn attach<T: 'static>(&self, task: Task<T>) -> JoinHandle<T> {
        let (body, slot) = task.into_parts();
        let handle = JoinHandle::new(slot.clone());

        self.attach_root(Root {
            body,
            slot: slot as Rc<dyn Header>,
        });

        handle
    }

    pub(crate) fn attach_root(&self, root: Root) {
        assert!(
            self.core.root.get().is_none(),
            "environment already has a task chain attached"
        );

        let id = self.core.insert(root.body, root.slot, None);
        self.core.root.set(Some(id));
        self.core.update_current(None, Some(id));

        debug!("attached root {id}");

        let _ = self.core.run(id, Cascade::Stop);
    }

    /// Moves the current leaf from `expected` to `next`.
    ///
    /// This is the primitive the runtime uses to hand control between a
    /// task and its nested tasks. It is exposed for drivers built on top of
    /// environments; normal code never calls it.
    ///
    /// # Panics
    ///
    /// Panics with "nonlinear use" when the recorded leaf is not
    /// `expected`.
    pub fn update_current(&self, expected: Option<TaskId>, next: Option<TaskId>) {
        self.core.update_current(expected, next);
    }

    /// The innermost suspended task, or `None` once the chain finished.
    pub fn current(&self) -> Option<TaskId> {
        self.core.current()
    }

    /// Services the signal.
    ///
    /// Does nothing when the chain is finished or the signal is not set.
    /// Otherwise resets the signal and resumes the current leaf; finished
    /// tasks resume their parents until a task suspends again or the root
    /// returns.
    ///
    /// Returns `true` if a task was resumed.
    pub fn step(&self) -> Result<bool> {
        let Some(leaf) = self.core.current() else {
            return Ok(false);
        };

        if self.core.tasks.borrow().get(leaf.0).header.state().is_done() {
            return Ok(false);
        }

        if !self.core.signal.is_set()? {
            return Ok(false);
        }

        self.core.signal.reset()?;
        trace!("resuming {leaf}");

        let _ = self.core.run(leaf, Cascade::Up);

        Ok(true)
    }

    /// Returns `true` once the root task has finished.
    pub fn done(&self) -> bool {
        self.core.current().is_none()
    }

    /// The signal this environment's tasks suspend on.
    pub fn signal(&self) -> &Event {
        &self.core.signal
    }

    /// The record operations of this environment report into.
    ///
    /// Cloning it out is how a pending operation gets cancelled from
    /// outside the chain.
    pub fn completion(&self) -> Completion {
        self.core.completion().clone()
    }

    /// State of a live task of this environment.
    pub fn state_of(&self, id: TaskId) -> Option<TaskState> {
        let tasks = self.core.tasks.borrow();

        tasks
            .contains(id.0)
            .then(|| tasks.get(id.0).header.state())
    }

    /// Number of tasks alive in the arena: the root plus every nested task
    /// that has not been collected by its parent.
    pub fn task_count(&self) -> usize {
        self.core.tasks.borrow().len()
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("current", &self.core.current())
            .field("root", &self.core.root.get())
            .finish_non_exhaustive()
    }
}

/// Displays an optional leaf.
struct Leaf(Option<TaskId>);

impl fmt::Display for Leaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(id) => id.fmt(f),
            None => f.write_str("none"),
        }
    }
}
