use super::{Ticket, Transfer};

use log::trace;
use std::io;
use std::thread;

/// Runs `work` on a helper thread and reports its outcome through `ticket`.
///
/// Fails only if the thread cannot be spawned, in which case the ticket is
/// dropped without reporting.
pub(crate) fn offload<F>(name: &'static str, ticket: Ticket, work: F) -> io::Result<()>
where
    F: FnOnce() -> io::Result<Transfer> + Send + 'static,
{
    thread::Builder::new()
        .name(format!("weft-{name}"))
        .spawn(move || {
            let result = work();

            if !ticket.complete(result) {
                trace!("discarded stale {name} completion");
            }
        })?;

    Ok(())
}
