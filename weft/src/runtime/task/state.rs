use std::fmt;

/// How a finished task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The body returned `Ok`.
    Success,

    /// The body returned `Err`.
    Error,
}

/// Lifecycle state of a task.
///
/// ```text
/// NotStarted -> Running -> Suspended -> Running -> ... -> Done(Success | Error)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Created but not yet bound to an environment.
    NotStarted,

    /// The body is executing on the driving thread.
    Running,

    /// The body is parked, either on its environment's signal or on a
    /// nested task.
    Suspended,

    /// The body returned. The result is waiting in the task's slot.
    Done(Outcome),
}

impl TaskState {
    /// Returns `true` once the body has returned.
    pub fn is_done(self) -> bool {
        matches!(self, TaskState::Done(_))
    }

    /// States a task may be resumed from.
    pub(crate) fn is_resumable(self) -> bool {
        matches!(self, TaskState::NotStarted | TaskState::Suspended)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskState::NotStarted => f.write_str("not started"),
            TaskState::Running => f.write_str("running"),
            TaskState::Suspended => f.write_str("suspended"),
            TaskState::Done(Outcome::Success) => f.write_str("done"),
            TaskState::Done(Outcome::Error) => f.write_str("failed"),
        }
    }
}
