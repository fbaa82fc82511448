use std::io;

use derive_more::Display;
use thiserror::Error;

/// Errors that can occur when running a computation strategy.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The operating system refused to provide a resource the strategy needs, typically because
    /// a process-wide or system-wide limit was reached.
    ///
    /// Any resources acquired before the failure have been released by the time this is returned.
    #[error("failed to acquire {resource}: {source}")]
    ResourceExhaustion {
        /// The kind of resource that could not be acquired.
        resource: Resource,

        /// The underlying operating system error.
        source: io::Error,
    },

    /// A worker did not complete its assigned range. The result of the strategy is unusable.
    #[error("worker {worker} failed: {exit}")]
    WorkerFailure {
        /// Index of the worker, matching the index of its range in the partition.
        worker: usize,

        /// How the worker ended.
        exit: WorkerExit,
    },

    /// Reading results from a worker failed for a reason other than the worker ending early.
    #[error("I/O error while collecting results of worker {worker}: {source}")]
    Io {
        /// Index of the worker whose results were being collected.
        worker: usize,

        /// The underlying I/O error.
        source: io::Error,
    },

    /// The inputs did not satisfy the requirements of the operation. Detected before any worker
    /// is started.
    #[error("precondition violated: {0}")]
    PreconditionViolation(Precondition),
}

/// A kind of operating system resource used by the computation strategies.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum Resource {
    /// An anonymous memory mapping shared with worker processes.
    #[display("shared memory")]
    SharedMemory,

    /// A named channel used to stream results from a worker process.
    #[display("channel")]
    Channel,

    /// A worker process.
    #[display("worker process")]
    Process,

    /// A worker thread.
    #[display("worker thread")]
    Thread,
}

/// Describes how a worker that did not succeed came to an end.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum WorkerExit {
    /// The worker process exited with a nonzero exit code.
    #[display("exited with code {_0}")]
    Exited(i32),

    /// The worker process was terminated by a signal.
    #[display("terminated by signal {_0}")]
    Signaled(i32),

    /// The worker thread panicked.
    #[display("panicked")]
    Panicked,

    /// The worker process exited cleanly but its channel ended before all values arrived.
    #[display("closed its channel after {received} of {expected} values")]
    ChannelClosed {
        /// Number of values received before the channel ended.
        received: usize,

        /// Number of values the worker was responsible for.
        expected: usize,
    },
}

/// A requirement on the inputs of an operation that was not met.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum Precondition {
    /// The operation requires at least one element.
    #[display("input must not be empty")]
    EmptyInput,

    /// Two sequences that must have equal length did not.
    #[display("sequence lengths differ ({left} vs {right})")]
    LengthMismatch {
        /// Length of the first sequence.
        left: usize,

        /// Length of the second sequence.
        right: usize,
    },

    /// The worker count must be in `1..=len`.
    #[display("worker count {workers} is not in 1..={len}")]
    WorkerCount {
        /// The requested worker count.
        workers: usize,

        /// The number of elements to distribute between the workers.
        len: usize,
    },
}

impl From<Precondition> for Error {
    fn from(value: Precondition) -> Self {
        Self::PreconditionViolation(value)
    }
}

/// A specialized `Result` type for strategy operations, returning the crate's
/// [`Error`] type as the error value.
pub type Result<T> = std::result::Result<T, Error>;
