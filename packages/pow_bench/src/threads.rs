use std::thread;

use crate::transform::apply;
use crate::{Error, Operands, Partition, Resource, Result, Strategy, StrategyKind, WorkerExit};

/// Computes the transform in worker threads of the current process, all writing into one
/// result buffer.
///
/// Each thread receives shared references to its ranges of the operands and an exclusive
/// reference to its range of the result buffer. The ranges are disjoint, so the threads never
/// need to synchronize with each other. Joining the threads is both the signal that the
/// results are complete and the point where their resources are reclaimed.
///
/// # Example
///
/// ```
/// use pow_bench::{Operands, Strategy, Threads};
///
/// let operands = Operands::new(vec![2.0, 3.0, 4.0], vec![2.0, 2.0, 2.0]).unwrap();
/// let result = Threads::new(3).compute(&operands).unwrap();
///
/// assert_eq!(&*result, &[4.0, 9.0, 16.0]);
/// ```
#[derive(Debug)]
pub struct Threads {
    workers: usize,
    fault: Option<usize>,
}

impl Threads {
    /// Creates the strategy with `workers` worker threads.
    #[must_use]
    pub fn new(workers: usize) -> Self {
        Self {
            workers,
            fault: None,
        }
    }

    /// Makes worker `worker` panic before it writes any of its results.
    #[doc(hidden)]
    #[must_use]
    pub fn with_fault(mut self, worker: usize) -> Self {
        self.fault = Some(worker);
        self
    }

    /// The number of worker threads.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }
}

impl Strategy for Threads {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Threads
    }

    fn compute(&self, operands: &Operands) -> Result<Box<[f64]>> {
        let partition = Partition::plan(operands.len(), self.workers)?;

        let mut result = vec![0.0; operands.len()].into_boxed_slice();

        thread::scope(|scope| {
            let inputs = partition
                .split(operands.bases())
                .zip(partition.split(operands.exponents()));

            let mut handles = Vec::with_capacity(partition.workers());

            for (worker, (out, (bases, exponents))) in partition
                .split_mut(&mut result)
                .into_iter()
                .zip(inputs)
                .enumerate()
            {
                let crash = self.fault == Some(worker);

                // If this fails, the scope still joins the threads spawned so far.
                let handle = thread::Builder::new()
                    .name(format!("pow-worker-{worker}"))
                    .spawn_scoped(scope, move || {
                        assert!(!crash, "injected fault in worker {worker}");

                        apply(bases, exponents, out);
                    })
                    .map_err(|source| Error::ResourceExhaustion {
                        resource: Resource::Thread,
                        source,
                    })?;

                handles.push(handle);
            }

            let mut first_failure = None;

            // Every handle is joined, so a panic in one thread never escapes the scope.
            for (worker, handle) in handles.into_iter().enumerate() {
                if handle.join().is_err() {
                    tracing::debug!(worker, "worker thread panicked");
                    first_failure.get_or_insert(Error::WorkerFailure {
                        worker,
                        exit: WorkerExit::Panicked,
                    });
                }
            }

            first_failure.map_or(Ok(()), Err)
        })?;

        Ok(result)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use static_assertions::assert_impl_all;

    use super::*;
    use crate::{Precondition, Sequential};

    assert_impl_all!(Threads: Send, Sync);

    #[test]
    fn matches_sequential() {
        let operands = Operands::generate_with_seed(1000, 11).unwrap();

        let expected = Sequential.compute(&operands).unwrap();
        let actual = Threads::new(8).compute(&operands).unwrap();

        assert_eq!(expected, actual);
    }

    #[test]
    fn one_thread_per_element() {
        let operands = Operands::new(vec![2.0, 3.0, 4.0], vec![2.0, 2.0, 2.0]).unwrap();

        let result = Threads::new(3).compute(&operands).unwrap();

        assert_eq!(&*result, &[4.0, 9.0, 16.0]);
    }

    #[test]
    fn rejects_more_workers_than_elements() {
        let operands = Operands::new(vec![1.0; 2], vec![1.0; 2]).unwrap();

        assert!(matches!(
            Threads::new(3).compute(&operands),
            Err(Error::PreconditionViolation(Precondition::WorkerCount {
                workers: 3,
                len: 2
            }))
        ));
    }

    #[test]
    fn panicking_worker_is_reported() {
        let operands = Operands::generate_with_seed(64, 11).unwrap();

        let result = Threads::new(4).with_fault(3).compute(&operands);

        assert!(matches!(
            result,
            Err(Error::WorkerFailure {
                worker: 3,
                exit: WorkerExit::Panicked
            })
        ));
    }
}
