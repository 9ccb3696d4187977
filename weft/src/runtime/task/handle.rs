use super::core::{Slot, TaskId};
use super::state::TaskState;
use crate::error::Result;

use std::fmt;
use std::rc::Rc;

/// A handle to the result of a root task.
///
/// Returned when a task is attached to an environment or spawned into a
/// scheduler. The handle does not keep the task running or cancel it when
/// dropped; it only gives access to the result once the task is done.
///
/// Root tasks that finish without suspending are done as soon as they are
/// attached, so their result can be read before the scheduler runs.
pub struct JoinHandle<T> {
    slot: Rc<Slot<T>>,
}

impl<T> JoinHandle<T> {
    pub(crate) fn new(slot: Rc<Slot<T>>) -> Self {
        Self { slot }
    }

    /// Identifier of the task inside its environment, once bound.
    pub fn id(&self) -> Option<TaskId> {
        self.slot.id()
    }

    /// Current lifecycle state of the task.
    pub fn state(&self) -> TaskState {
        self.slot.state()
    }

    /// Returns `true` once the task has finished.
    pub fn is_done(&self) -> bool {
        self.slot.state().is_done()
    }

    /// Takes the task's result: the produced value, or the error it
    /// finished with.
    ///
    /// # Panics
    ///
    /// Panics if the task has not finished yet, or if the result was
    /// already taken.
    pub fn get_result(&self) -> Result<T> {
        self.slot.take()
    }
}

impl<T> fmt::Debug for JoinHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JoinHandle")
            .field("id", &self.slot.id())
            .field("state", &self.slot.state())
            .finish()
    }
}
