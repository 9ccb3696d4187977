use super::environment::Environment;
use super::scheduler::Scheduler;
use super::task::{Body, Header, JoinHandle, Task};
use crate::error::{Error, Result};

use std::rc::Rc;
use std::thread;

/// What to do when a task finished with an error that nobody read.
///
/// The check runs when the last reference to the task's result slot goes
/// away: the task handle, its [`JoinHandle`] and its environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnconsumedErrors {
    /// Drop the error silently.
    Ignore,

    /// Report the error with `log::warn!`.
    #[default]
    Log,

    /// Panic. While the thread is already unwinding, the error is logged
    /// instead so that the process is not aborted.
    Panic,
}

impl UnconsumedErrors {
    pub(crate) fn report(self, error: &Error) {
        match self {
            UnconsumedErrors::Ignore => {}
            UnconsumedErrors::Log => {
                log::warn!("task finished with an error that was never consumed: {error}");
            }
            UnconsumedErrors::Panic if !thread::panicking() => {
                panic!("task finished with an error that was never consumed: {error}");
            }
            UnconsumedErrors::Panic => {
                log::error!("task finished with an error that was never consumed: {error}");
            }
        }
    }
}

/// A root task waiting for its environment.
pub(crate) struct Root {
    pub(crate) body: Body,
    pub(crate) slot: Rc<dyn Header>,
}

/// Builder for configuring and creating a scheduler.
///
/// `SchedulerBuilder` collects the root tasks and the runtime options.
/// Roots do not run until [`build`](Self::build): building creates one
/// environment per root and starts each root in spawn order.
///
/// # Examples
///
/// ```rust,ignore
/// let mut builder = Scheduler::builder().unconsumed_errors(UnconsumedErrors::Panic);
///
/// let answer = builder.spawn(Task::new(async { Ok(42) }));
/// let greeting = builder.spawn(Task::new(async { Ok("ready") }));
///
/// let mut scheduler = builder.build()?;
/// scheduler.run()?;
///
/// assert_eq!(answer.get_result()?, 42);
/// ```
pub struct SchedulerBuilder {
    /// Roots, in spawn order.
    roots: Vec<Root>,

    /// Policy applied to every task driven by the scheduler.
    unconsumed_errors: UnconsumedErrors,
}

impl SchedulerBuilder {
    /// Creates a builder with no roots and the default policy.
    pub fn new() -> Self {
        Self {
            roots: Vec::new(),
            unconsumed_errors: UnconsumedErrors::default(),
        }
    }

    /// Sets the policy for errors that are never read.
    pub fn unconsumed_errors(mut self, policy: UnconsumedErrors) -> Self {
        self.unconsumed_errors = policy;
        self
    }

    /// Adds a root task.
    ///
    /// The returned handle reads the root's result once it is done.
    ///
    /// # Panics
    ///
    /// Panics if the task is already bound to an environment.
    pub fn spawn<T: 'static>(&mut self, task: Task<T>) -> JoinHandle<T> {
        let (body, slot) = task.into_parts();
        let handle = JoinHandle::new(slot.clone());

        self.roots.push(Root {
            body,
            slot: slot as Rc<dyn Header>,
        });

        handle
    }

    /// Number of roots spawned so far.
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    /// Returns `true` if no root was spawned.
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Creates the environments, attaches one root to each and starts them.
    ///
    /// Roots that finish without suspending are done when this returns.
    pub fn build(self) -> Result<Scheduler> {
        let mut environments = Vec::with_capacity(self.roots.len());

        for root in self.roots {
            let env = Environment::with_policy(self.unconsumed_errors)?;
            env.attach_root(root);
            environments.push(env);
        }

        Ok(Scheduler::from_environments(environments))
    }
}

impl Default for SchedulerBuilder {
    /// Creates a default `SchedulerBuilder`.
    fn default() -> Self {
        Self::new()
    }
}
