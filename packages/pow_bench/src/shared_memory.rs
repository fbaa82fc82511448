use crate::pal::{self, BindingsFacade};
use crate::process::WorkerGroup;
use crate::shared_region::SharedRegion;
use crate::transform::apply;
use crate::{Operands, Partition, Result, Strategy, StrategyKind};

/// Computes the transform in worker processes that write directly into memory shared with the
/// parent.
///
/// The parent maps one anonymous shared region large enough for the whole result, then forks one
/// worker per range of the [`Partition`]. Each worker writes only its own range of the region and
/// exits. Once all workers have been waited for, the parent copies the region into the result
/// buffer and releases the mapping. No locking is involved because the ranges are disjoint.
///
/// # Example
///
/// ```
/// use pow_bench::{Operands, SharedMemory, Strategy};
///
/// let operands = Operands::new(vec![2.0, 3.0, 4.0], vec![2.0, 2.0, 2.0]).unwrap();
/// let result = SharedMemory::new(3).compute(&operands).unwrap();
///
/// assert_eq!(&*result, &[4.0, 9.0, 16.0]);
/// ```
#[derive(Debug)]
pub struct SharedMemory {
    workers: usize,
    fault: Option<usize>,
    bindings: BindingsFacade,
}

impl SharedMemory {
    /// Creates the strategy with `workers` worker processes.
    ///
    /// The worker count is validated against the operands on each [`compute()`][Strategy::compute].
    #[must_use]
    pub fn new(workers: usize) -> Self {
        Self {
            workers,
            fault: None,
            bindings: BindingsFacade::target(),
        }
    }

    /// Makes worker `worker` crash before it writes any of its results.
    #[doc(hidden)]
    #[must_use]
    pub fn with_fault(mut self, worker: usize) -> Self {
        self.fault = Some(worker);
        self
    }

    #[cfg(test)]
    fn with_bindings(mut self, bindings: BindingsFacade) -> Self {
        self.bindings = bindings;
        self
    }

    /// The number of worker processes.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }
}

impl Strategy for SharedMemory {
    fn kind(&self) -> StrategyKind {
        StrategyKind::SharedMemory
    }

    fn compute(&self, operands: &Operands) -> Result<Box<[f64]>> {
        let partition = Partition::plan(operands.len(), self.workers)?;

        let mut region = SharedRegion::new(operands.len(), self.bindings.clone())?;

        {
            // Declared after the region, so on failure the workers are gone before it is unmapped.
            let mut workers = WorkerGroup::new(&self.bindings, partition.workers());

            let inputs = partition
                .split(operands.bases())
                .zip(partition.split(operands.exponents()));

            for (worker, (out, (bases, exponents))) in partition
                .split_mut(region.as_mut_slice())
                .into_iter()
                .zip(inputs)
                .enumerate()
            {
                let crash = self.fault == Some(worker);

                workers.spawn(move || {
                    if crash {
                        pal::crash_worker();
                    }

                    apply(bases, exponents, out);
                    Ok(())
                })?;
            }

            workers.reap_all()?;
        }

        tracing::debug!(workers = partition.workers(), "all shared memory workers finished");

        Ok(region.to_boxed_slice())
    }
}
