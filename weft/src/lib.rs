//! # Weft
//!
//! **Weft** is a single-threaded runtime that multiplexes asynchronous I/O
//! over OS completion signals.
//!
//! Unlike readiness-based runtimes, Weft never polls a future to learn
//! whether it can make progress. Every chain of nested tasks is bound to
//! one [`Environment`], and every environment owns exactly one waitable
//! completion signal. A task suspends only by waiting on that signal (or
//! on a nested task that does), so the whole runtime blocks in a single
//! place: one "wait for any signal" call per scheduling tick.
//!
//! The crate is built around three pieces:
//!
//! - [`Task`], a resumable computation written as an `async` body,
//! - [`Environment`], one signal plus one chain of nested tasks and its
//!   current leaf,
//! - [`Scheduler`], which drives many environments with one blocking wait
//!   per tick.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use weft::{Scheduler, Task};
//! use std::time::Duration;
//!
//! fn main() -> weft::Result<()> {
//!     let (mut scheduler, handles) = Scheduler::new([
//!         Task::new(async {
//!             weft::time::sleep(Duration::from_millis(100)).await?;
//!             Ok("slept")
//!         }),
//!         Task::new(async { Ok("ready") }),
//!     ])?;
//!
//!     scheduler.run()?;
//!
//!     for handle in handles {
//!         println!("{}", handle.get_result()?);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`io`]: Completion records, operations and async handles
//! - [`signal`]: Waitable, manually-reset completion signals
//! - [`task`]: Tasks, handles and their state machine
//! - [`time`]: Sleeping on a timer completion
//! - [`error`]: The error type delivered through task results

mod runtime;
mod sys;
mod utils;

pub mod error;
pub mod io;
pub mod signal;
pub mod time;

pub use error::{Error, Result};
pub use runtime::builder::{SchedulerBuilder, UnconsumedErrors};
pub use runtime::environment::Environment;
pub use runtime::scheduler::Scheduler;
pub use runtime::task;
pub use task::{JoinHandle, Task, TaskId, TaskState};
