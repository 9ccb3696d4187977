use crate::runtime::environment::EnvCore;
use crate::runtime::task::TaskId;

use std::cell::RefCell;
use std::rc::Rc;

/// The task whose body is executing on this thread, and its environment.
struct Frame {
    env: Rc<EnvCore>,
    task: TaskId,
}

thread_local! {
    /// Thread-local frame of the running task.
    ///
    /// This is set by the environment around every poll of a task body and
    /// allows nested tasks, signal waits and resource collaborators to reach
    /// the environment without explicit parameter passing.
    static CURRENT: RefCell<Option<Frame>> = const { RefCell::new(None) };
}

/// Restores the previous frame, also when a task body panics.
struct Restore(Option<Frame>);

impl Drop for Restore {
    fn drop(&mut self) {
        let previous = self.0.take();
        let ours = CURRENT.with(|cell| cell.replace(previous));

        // Dropped outside of the borrow: this may release the last
        // reference to an environment.
        drop(ours);
    }
}

/// Runs `f` with `task` of `env` installed as the running task.
///
/// Frames nest: a task awaiting a nested task enters the child's frame
/// and gets its own frame back when the child suspends or finishes.
pub(crate) fn enter<R>(env: Rc<EnvCore>, task: TaskId, f: impl FnOnce() -> R) -> R {
    let previous = CURRENT.with(|cell| cell.replace(Some(Frame { env, task })));
    let _restore = Restore(previous);

    f()
}

/// Returns the environment and identifier of the running task.
pub(crate) fn current() -> Option<(Rc<EnvCore>, TaskId)> {
    CURRENT.with(|cell| {
        cell.borrow()
            .as_ref()
            .map(|frame| (frame.env.clone(), frame.task))
    })
}
