//! Task primitives.
//!
//! This module defines the resumable unit of computation driven by the
//! runtime:
//!
//! - [`Task`], an `async` body bound to an environment,
//! - [`JoinHandle`], read access to a root task's result,
//! - [`TaskState`] and [`Outcome`], the task state machine,
//! - [`current`] and [`current_leaf`], introspection from inside a body.

mod core;
mod handle;
mod state;

pub(crate) use self::core::{Body, Header};

pub use self::core::{Task, TaskId};
pub use handle::JoinHandle;
pub use state::{Outcome, TaskState};

use crate::runtime::context;

/// Returns the identifier of the task whose body is currently executing,
/// or `None` outside of any task.
pub fn current() -> Option<TaskId> {
    context::current().map(|(_, id)| id)
}

/// Returns the current leaf of the environment the calling task belongs
/// to, or `None` outside of any task.
///
/// From inside a running body this is the calling task itself: a task only
/// runs while it is the leaf of its chain.
pub fn current_leaf() -> Option<TaskId> {
    context::current().and_then(|(env, _)| env.current())
}
