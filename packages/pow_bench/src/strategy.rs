use std::fmt::Debug;

use derive_more::Display;

use crate::{Operands, Result};

/// A way of computing `bases[i]^exponents[i]` for every index of an operand pair.
///
/// Every strategy produces the same values (within floating point tolerance), they differ only
/// in how the work is divided and how the workers hand back their results.
pub trait Strategy: Debug {
    /// Which of the strategies this is.
    fn kind(&self) -> StrategyKind;

    /// Computes the transform of `operands`, returning a result buffer owned by the caller.
    ///
    /// Blocks until every worker has finished. There is no timeout: a worker that never finishes
    /// blocks the caller forever.
    ///
    /// # Errors
    ///
    /// * [`Error::PreconditionViolation`][crate::Error::PreconditionViolation] if the strategy's
    ///   worker count does not fit the operands. Detected before any worker starts.
    /// * [`Error::ResourceExhaustion`][crate::Error::ResourceExhaustion] if the operating system
    ///   refuses a resource the strategy needs.
    /// * [`Error::WorkerFailure`][crate::Error::WorkerFailure] if any worker ends abnormally.
    fn compute(&self, operands: &Operands) -> Result<Box<[f64]>>;
}

/// Identifies a strategy in reports and logs.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum StrategyKind {
    /// Single thread, index order. The reference result.
    #[display("serial")]
    Sequential,

    /// Worker processes writing into shared memory.
    #[display("shared memory")]
    SharedMemory,

    /// Worker processes streaming results through named channels.
    #[display("message passing")]
    MessagePassing,

    /// Worker threads writing into a shared buffer.
    #[display("threads")]
    Threads,
}
