//! Time utilities.
//!
//! The runtime has no timer of its own: a sleep is one more operation whose
//! completion sets the environment's signal.
//!
//! It includes:
//! - [`sleep`] for suspending a task for a fixed duration.

mod sleep;

#[doc(inline)]
pub use sleep::sleep;
