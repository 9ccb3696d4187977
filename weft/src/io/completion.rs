use crate::signal::Event;

use std::fmt;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Outcome of a finished operation.
#[derive(Debug, Default)]
pub struct Transfer {
    /// Number of bytes moved by the operation.
    pub bytes: usize,

    /// Set when a read hit the end of the stream.
    pub eof: bool,

    /// The buffer handed to the operation, given back on completion.
    pub buffer: Vec<u8>,
}

impl Transfer {
    /// A completion that moved no data.
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Bookkeeping for the single operation an environment may have in flight.
struct Record {
    /// Incremented every time an operation starts or is cancelled. A
    /// ticket whose generation no longer matches is stale.
    generation: u64,

    /// An operation has been started and has not reported back yet.
    in_flight: bool,

    /// The reported outcome, until it is taken.
    result: Option<io::Result<Transfer>>,
}

struct Shared {
    signal: Arc<Event>,
    record: Mutex<Record>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Record> {
        self.record.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn raise(&self) {
        if let Err(err) = self.signal.set() {
            log::error!("failed to set completion signal: {err}");
        }
    }
}

/// The location an environment's operations report their outcome into.
///
/// Every environment owns one completion record, bound to its signal. A
/// resource collaborator starts an operation with [`begin`](Self::begin),
/// hands the returned [`Ticket`] to whatever performs the work, and the
/// ticket stores the outcome and sets the signal when the work is done.
/// The suspended task then collects the outcome with
/// [`take`](Self::take).
///
/// `Completion` is cheap to clone and can be shared across threads, which
/// is how other code cancels an environment's pending operation.
#[derive(Clone)]
pub struct Completion {
    shared: Arc<Shared>,
}

impl Completion {
    pub(crate) fn new(signal: Arc<Event>) -> Self {
        Self {
            shared: Arc::new(Shared {
                signal,
                record: Mutex::new(Record {
                    generation: 0,
                    in_flight: false,
                    result: None,
                }),
            }),
        }
    }

    /// Marks an operation as started and returns the ticket it reports
    /// through.
    ///
    /// Any outcome left over from a previous operation is discarded.
    ///
    /// # Panics
    ///
    /// Panics if another operation is already in flight: an environment
    /// drives a single chain and its leaf cannot have two pending
    /// operations.
    pub fn begin(&self) -> Ticket {
        let mut record = self.shared.lock();

        assert!(
            !record.in_flight,
            "an operation is already pending on this environment"
        );

        record.generation += 1;
        record.in_flight = true;
        record.result = None;

        Ticket {
            shared: self.shared.clone(),
            generation: record.generation,
        }
    }

    /// Forgets an operation that failed to start.
    ///
    /// Its ticket becomes stale and the signal is left untouched.
    pub fn abandon(&self) {
        let mut record = self.shared.lock();

        if record.in_flight {
            record.generation += 1;
            record.in_flight = false;
        }
    }

    /// Cancels the operation in flight, if any.
    ///
    /// The outcome becomes an [`io::ErrorKind::Interrupted`] error and the
    /// signal is set, so the suspended task resumes on the next step and
    /// observes the failure through its normal result path. A late report
    /// from the cancelled operation is discarded.
    ///
    /// Returns `false` when nothing was in flight.
    pub fn cancel(&self) -> bool {
        {
            let mut record = self.shared.lock();

            if !record.in_flight {
                return false;
            }

            record.generation += 1;
            record.in_flight = false;
            record.result = Some(Err(io::Error::new(
                io::ErrorKind::Interrupted,
                "operation cancelled",
            )));
        }

        self.shared.raise();
        true
    }

    /// Returns `true` while an operation is in flight.
    pub fn is_pending(&self) -> bool {
        self.shared.lock().in_flight
    }

    /// Takes the reported outcome. Never blocks.
    ///
    /// Each outcome can be taken once. When nothing was reported (the
    /// signal was set by something other than a ticket), a
    /// [`io::ErrorKind::Other`] error is returned.
    pub fn take(&self) -> io::Result<Transfer> {
        self.shared
            .lock()
            .result
            .take()
            .unwrap_or_else(|| Err(io::Error::other("no completion was reported")))
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let record = self.shared.lock();

        f.debug_struct("Completion")
            .field("generation", &record.generation)
            .field("in_flight", &record.in_flight)
            .field("ready", &record.result.is_some())
            .finish()
    }
}

/// Permission to report the outcome of one operation.
///
/// A ticket is `Send`: it is typically moved to the thread or callback
/// that finishes the operation.
pub struct Ticket {
    shared: Arc<Shared>,
    generation: u64,
}

impl Ticket {
    /// Stores the outcome and sets the environment's signal.
    ///
    /// Returns `false`, without touching the signal, if the operation was
    /// cancelled or abandoned in the meantime.
    pub fn complete(self, result: io::Result<Transfer>) -> bool {
        {
            let mut record = self.shared.lock();

            if !record.in_flight || record.generation != self.generation {
                return false;
            }

            record.in_flight = false;
            record.result = Some(result);
        }

        self.shared.raise();
        true
    }
}

impl fmt::Debug for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ticket")
            .field("generation", &self.generation)
            .finish()
    }
}
