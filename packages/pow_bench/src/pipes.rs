use std::env;
use std::path::{Path, PathBuf};
#[cfg(test)]
use std::sync::{Arc, Mutex};
use std::time::Duration;
#[cfg(test)]
use std::time::Instant;

use crate::channel::{Channel, Interference, next_run_id, stream_results};
use crate::pal::BindingsFacade;
use crate::process::WorkerGroup;
use crate::{Error, Operands, Partition, Result, Strategy, StrategyKind, WorkerExit};

/// Computes the transform in worker processes that stream their results back to the parent
/// through one named channel per worker.
///
/// For each range of the [`Partition`], the parent creates a channel and then forks the worker
/// that owns it. Each worker computes its range in index order and writes every value to its
/// channel as soon as it has it. The worker processes share no memory with the parent, the
/// channels are the only way results come back.
///
/// The parent drains the channels strictly in worker order: it waits for all values of worker 0,
/// then for worker 1 and so on, even if a later worker has long finished. After draining a
/// channel, the parent removes it and waits for the worker process to exit.
///
/// Channel names combine the process ID with a per-invocation counter, so concurrent invocations
/// never share a channel, whether they run in this process or in another one.
///
/// # Example
///
/// ```
/// use pow_bench::{Operands, Pipes, Strategy};
///
/// let operands = Operands::new(vec![2.0, 3.0, 4.0], vec![2.0, 2.0, 2.0]).unwrap();
/// let result = Pipes::new(3).compute(&operands).unwrap();
///
/// assert_eq!(&*result, &[4.0, 9.0, 16.0]);
/// ```
#[derive(Debug)]
pub struct Pipes {
    workers: usize,
    channel_dir: PathBuf,
    fault: Option<usize>,
    stall: Option<(usize, Duration)>,
    bindings: BindingsFacade,

    // Worker index and time of every fully drained channel, in drain order.
    #[cfg(test)]
    drained: Arc<Mutex<Vec<(usize, Instant)>>>,
}

impl Pipes {
    /// Creates the strategy with `workers` worker processes, placing the channels in the
    /// temporary directory of the operating system.
    #[must_use]
    pub fn new(workers: usize) -> Self {
        Self {
            workers,
            channel_dir: env::temp_dir(),
            fault: None,
            stall: None,
            bindings: BindingsFacade::target(),
            #[cfg(test)]
            drained: Arc::default(),
        }
    }

    /// Places the channels in `dir` instead of the temporary directory.
    ///
    /// The directory must exist and be on a filesystem that supports named pipes.
    #[must_use]
    pub fn with_channel_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.channel_dir = dir.into();
        self
    }

    /// Makes worker `worker` crash after connecting to its channel but before it sends any
    /// results.
    #[doc(hidden)]
    #[must_use]
    pub fn with_fault(mut self, worker: usize) -> Self {
        self.fault = Some(worker);
        self
    }

    /// Makes worker `worker` wait for `duration` after connecting to its channel but before it
    /// sends any results.
    #[doc(hidden)]
    #[must_use]
    pub fn with_stall(mut self, worker: usize, duration: Duration) -> Self {
        self.stall = Some((worker, duration));
        self
    }

    fn interference(&self, worker: usize) -> Option<Interference> {
        if self.fault == Some(worker) {
            return Some(Interference::Crash);
        }

        self.stall.and_then(|(stalled, duration)| {
            (stalled == worker).then_some(Interference::Stall(duration))
        })
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

    /// The directory in which the channels are created.
    #[must_use]
    pub fn channel_dir(&self) -> &Path {
        &self.channel_dir
    }
}

impl Strategy for Pipes {
    fn kind(&self) -> StrategyKind {
        StrategyKind::MessagePassing
    }

    fn compute(&self, operands: &Operands) -> Result<Box<[f64]>> {
        let partition = Partition::plan(operands.len(), self.workers)?;
        let run = next_run_id();

        let mut channels = Vec::with_capacity(partition.workers());

        // Declared after the channels, so on failure the workers are gone before the channels are
        // removed.
        let mut workers = WorkerGroup::new(&self.bindings, partition.workers());

        let inputs = partition
            .split(operands.bases())
            .zip(partition.split(operands.exponents()));

        for (worker, (bases, exponents)) in inputs.enumerate() {
            let channel = Channel::create(&self.channel_dir, run, worker, &self.bindings)?;
            let interference = self.interference(worker);

            workers.spawn(|| stream_results(channel.c_path(), bases, exponents, interference))?;

            channels.push(channel);
        }

        let mut result = vec![0.0; operands.len()].into_boxed_slice();
        let mut first_failure = None;

        for (worker, (channel, out)) in channels
            .into_iter()
            .zip(partition.split_mut(&mut result))
            .enumerate()
        {
            let expected = out.len();
            let drained = channel.drain_into(out);

            // The read end is already closed, this removes the filesystem entry.
            drop(channel);

            #[cfg(test)]
            self.drained
                .lock()
                .expect("drain log is never poisoned")
                .push((worker, Instant::now()));

            let received = match drained {
                Ok(received) => received,
                Err(source) => {
                    // The worker may be blocked forever on its end of the channel. Returning
                    // drops the worker group, which kills every worker not yet reaped.
                    return Err(Error::Io { worker, source });
                }
            };

            let failure = match workers.reap(worker) {
                Err(error) => Some(error),
                Ok(()) if received < expected => Some(Error::WorkerFailure {
                    worker,
                    exit: WorkerExit::ChannelClosed { received, expected },
                }),
                Ok(()) => None,
            };

            if let Some(error) = failure {
                tracing::debug!(worker, %error, "message passing worker failed");
                first_failure.get_or_insert(error);
            }
        }

        match first_failure {
            Some(error) => Err(error),
            None => Ok(result),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::fs;
    use std::io;

    use static_assertions::assert_impl_all;

    use super::*;
    use crate::pal::{Bindings, BuildTargetBindings, Forked, MockBindings};
    use crate::{Precondition, Resource, Sequential};

    assert_impl_all!(Pipes: Send, Sync);

    fn entries(dir: &Path) -> usize {
        fs::read_dir(dir).unwrap().count()
    }

    #[test]
    fn rejects_bad_worker_count_before_creating_channels() {
        let mut bindings = MockBindings::new();
        bindings.expect_mkfifo().never();
        bindings.expect_fork().never();

        let strategy = Pipes::new(0).with_bindings(BindingsFacade::from_mock(bindings));
        let operands = Operands::new(vec![1.0; 3], vec![1.0; 3]).unwrap();

        assert!(matches!(
            strategy.compute(&operands),
            Err(Error::PreconditionViolation(Precondition::WorkerCount {
                workers: 0,
                len: 3
            }))
        ));
    }

    #[cfg(not(miri))]
    #[test]
    fn spawn_failure_removes_channels_and_kills_workers() {
        let dir = tempfile::tempdir().unwrap();

        let mut bindings = MockBindings::new();
        bindings
            .expect_mkfifo()
            .times(2)
            .returning(|path| BuildTargetBindings.mkfifo(path));

        let mut forks = 0;
        bindings.expect_fork().times(2).returning(move || {
            forks += 1;
            if forks == 1 {
                Ok(Forked::Parent { child: 55 })
            } else {
                Err(io::Error::from_raw_os_error(libc::EAGAIN))
            }
        });
        bindings
            .expect_kill()
            .withf(|child| *child == 55)
            .times(1)
            .returning(|_| Ok(()));
        bindings
            .expect_wait()
            .withf(|child| *child == 55)
            .times(1)
            .returning(|_| Ok(libc::SIGKILL));

        let strategy = Pipes::new(3)
            .with_channel_dir(dir.path())
            .with_bindings(BindingsFacade::from_mock(bindings));
        let operands = Operands::new(vec![1.0; 6], vec![1.0; 6]).unwrap();

        assert!(matches!(
            strategy.compute(&operands),
            Err(Error::ResourceExhaustion {
                resource: Resource::Process,
                ..
            })
        ));

        assert_eq!(entries(dir.path()), 0);
    }

    #[cfg(not(miri))]
    #[test]
    fn channel_creation_failure_is_resource_exhaustion() {
        let strategy = Pipes::new(2).with_channel_dir("/nonexistent/pow_bench/channels");
        let operands = Operands::new(vec![1.0; 4], vec![1.0; 4]).unwrap();

        assert!(matches!(
            strategy.compute(&operands),
            Err(Error::ResourceExhaustion {
                resource: Resource::Channel,
                ..
            })
        ));
    }

    #[cfg(not(miri))]
    #[test]
    fn matches_sequential_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let operands = Operands::generate_with_seed(1000, 5).unwrap();

        let expected = Sequential.compute(&operands).unwrap();
        let actual = Pipes::new(6)
            .with_channel_dir(dir.path())
            .compute(&operands)
            .unwrap();

        assert_eq!(expected, actual);
        assert_eq!(entries(dir.path()), 0);
    }

    #[cfg(not(miri))]
    #[test]
    fn slow_first_worker_holds_up_later_channels() {
        const STALL: Duration = Duration::from_millis(300);

        let dir = tempfile::tempdir().unwrap();
        let operands = Operands::generate_with_seed(400, 5).unwrap();

        let strategy = Pipes::new(4)
            .with_channel_dir(dir.path())
            .with_stall(0, STALL);

        let started = Instant::now();
        let result = strategy.compute(&operands).unwrap();

        assert_eq!(result, Sequential.compute(&operands).unwrap());

        let drained = strategy.drained.lock().unwrap();
        let order = drained.iter().map(|(worker, _)| *worker).collect::<Vec<_>>();
        assert_eq!(order, [0, 1, 2, 3]);

        // Worker 1 was ready at once, but its channel is only read after worker 0 has finished.
        let (_, worker_1_drained) = drained[1];
        assert!(worker_1_drained.duration_since(started) >= STALL);

        assert_eq!(entries(dir.path()), 0);
    }

    #[cfg(not(miri))]
    #[test]
    fn crashed_worker_is_reported_and_others_are_drained() {
        let dir = tempfile::tempdir().unwrap();
        let operands = Operands::generate_with_seed(100, 5).unwrap();

        let result = Pipes::new(4)
            .with_channel_dir(dir.path())
            .with_fault(1)
            .compute(&operands);

        assert!(matches!(
            result,
            Err(Error::WorkerFailure {
                worker: 1,
                exit: WorkerExit::Signaled(libc::SIGKILL)
            })
        ));
        assert_eq!(entries(dir.path()), 0);
    }
}
