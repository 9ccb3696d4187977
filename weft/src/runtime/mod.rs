//! Core runtime components.
//!
//! This module contains the task / environment / scheduler triad:
//!
//! - tasks, resumable computations that suspend only on their
//!   environment's signal or on a nested task,
//! - environments, each binding one chain of nested tasks to one
//!   completion signal and tracking the chain's current leaf,
//! - the scheduler, which drives any number of environments with one
//!   blocking wait per tick.

pub(crate) mod builder;
pub(crate) mod context;
pub(crate) mod environment;
pub(crate) mod scheduler;

pub mod task;
