use super::builder::SchedulerBuilder;
use super::environment::Environment;
use super::task::{JoinHandle, Task};
use crate::error::Result;
use crate::signal::{self, Event};

use log::{debug, trace};
use std::time::Duration;

/// Drives independent task chains to completion.
///
/// `Scheduler` owns a fixed set of environments, one per root task, built
/// by [`SchedulerBuilder`]. Every scheduling tick is one call to
/// [`wait_any`](Self::wait_any), the only blocking call of the runtime,
/// followed by one [`step`](Self::step) over all environments.
///
/// Environments never interact: each one resumes its own chain when its
/// own signal is set. Chains whose signals are set together advance in the
/// same tick, so `N` chains suspending `kᵢ` times each finish in at least
/// `max(kᵢ)` and at most `Σkᵢ` ticks.
///
/// # Examples
///
/// ```rust,ignore
/// let (mut scheduler, handles) = Scheduler::new([
///     Task::new(async { sleep(Duration::from_millis(5)).await?; Ok(1) }),
///     Task::new(async { Ok(2) }),
/// ])?;
///
/// scheduler.run()?;
///
/// assert_eq!(handles[0].get_result()?, 1);
/// ```
pub struct Scheduler {
    environments: Vec<Environment>,

    /// Number of `wait_any` calls so far.
    ticks: usize,
}

impl Scheduler {
    /// Returns a builder to configure a new scheduler.
    pub fn builder() -> SchedulerBuilder {
        SchedulerBuilder::new()
    }

    /// Creates a scheduler over tasks sharing one result type, with the
    /// default options.
    ///
    /// Handles are returned in the order the tasks were given.
    pub fn new<T, I>(tasks: I) -> Result<(Self, Vec<JoinHandle<T>>)>
    where
        T: 'static,
        I: IntoIterator<Item = Task<T>>,
    {
        let mut builder = SchedulerBuilder::new();
        let handles: Vec<_> = tasks.into_iter().map(|task| builder.spawn(task)).collect();

        Ok((builder.build()?, handles))
    }

    pub(crate) fn from_environments(environments: Vec<Environment>) -> Self {
        debug!(
            "scheduler started with {} environment(s), {} already done",
            environments.len(),
            environments.iter().filter(|env| env.done()).count()
        );

        Self {
            environments,
            ticks: 0,
        }
    }

    /// Number of environments, finished ones included.
    pub fn len(&self) -> usize {
        self.environments.len()
    }

    /// Returns `true` if the scheduler drives no environment at all.
    pub fn is_empty(&self) -> bool {
        self.environments.is_empty()
    }

    /// The environment at `index`, in spawn order.
    pub fn environment(&self, index: usize) -> Option<&Environment> {
        self.environments.get(index)
    }

    /// All environments, in spawn order.
    pub fn environments(&self) -> &[Environment] {
        &self.environments
    }

    /// Number of scheduling ticks so far, counted as `wait_any` calls.
    pub fn ticks(&self) -> usize {
        self.ticks
    }

    /// Blocks until the signal of an unfinished environment is set.
    ///
    /// - `None` waits forever.
    /// - `Some(Duration::ZERO)` polls without blocking.
    ///
    /// Returns the index of a signaled environment, or `None` on timeout.
    /// Signals already set return immediately, and nothing is reset.
    ///
    /// Finished environments are not waited on; when every environment is
    /// done, returns `None` without blocking.
    pub fn wait_any(&mut self, timeout: Option<Duration>) -> Result<Option<usize>> {
        self.ticks += 1;

        let (indices, signals): (Vec<usize>, Vec<&Event>) = self
            .environments
            .iter()
            .enumerate()
            .filter(|(_, env)| !env.done())
            .map(|(index, env)| (index, env.signal()))
            .unzip();

        if signals.is_empty() {
            return Ok(None);
        }

        let signaled = signal::wait_any(&signals, timeout)?.map(|position| indices[position]);
        trace!("tick {}: signaled environment {:?}", self.ticks, signaled);

        Ok(signaled)
    }

    /// Steps every environment, in spawn order.
    ///
    /// Returns how many of them resumed a task.
    pub fn step(&self) -> Result<usize> {
        let mut resumed = 0;

        for env in &self.environments {
            if env.step()? {
                resumed += 1;
            }
        }

        Ok(resumed)
    }

    /// Returns `true` once every root task has finished.
    pub fn done(&self) -> bool {
        self.environments.iter().all(Environment::done)
    }

    /// Runs until every root task has finished.
    ///
    /// Each iteration waits for a signal, then steps all environments.
    pub fn run(&mut self) -> Result<()> {
        while !self.done() {
            self.wait_any(None)?;
            self.step()?;
        }

        debug!("scheduler finished after {} tick(s)", self.ticks);

        Ok(())
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("environments", &self.environments)
            .field("ticks", &self.ticks)
            .finish()
    }
}
