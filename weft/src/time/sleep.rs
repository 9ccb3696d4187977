use crate::error::Result;
use crate::io::{self, Operation, Ticket, Transfer};
use crate::task::Task;

use std::thread;
use std::time::{Duration, Instant};

/// Creates a task that completes after the given duration.
///
/// The timer runs on a helper thread and sets the environment's signal
/// when the deadline is reached. A zero duration still suspends once.
///
/// Cancelling the environment's pending operation ends the sleep early
/// with a cancelled [`Error::Complete`](crate::Error::Complete).
///
/// # Examples
///
/// ```rust,ignore
/// use std::time::Duration;
///
/// sleep(Duration::from_millis(10)).await?;
/// ```
pub fn sleep(duration: Duration) -> Task<()> {
    io::submit(Sleep { duration })
}

/// A timer operation.
struct Sleep {
    duration: Duration,
}

impl Operation for Sleep {
    type Output = ();

    fn name(&self) -> &'static str {
        "sleep"
    }

    fn initiate(&mut self, ticket: Ticket) -> std::io::Result<()> {
        let deadline = Instant::now() + self.duration;

        io::offload(self.name(), ticket, move || {
            // `thread::sleep` may wake early.
            let mut now = Instant::now();
            while now < deadline {
                thread::sleep(deadline - now);
                now = Instant::now();
            }

            Ok(Transfer::empty())
        })
    }

    fn finish(self, _transfer: Transfer) -> Result<()> {
        Ok(())
    }
}
