use std::io;
use std::panic::{self, AssertUnwindSafe};

use crate::pal::{self, Bindings, BindingsFacade, Forked, Pid};
use crate::{Error, Resource, Result, WorkerExit};

/// Exit code of a worker process whose body panicked.
pub(crate) const PANIC_EXIT_CODE: i32 = 101;

/// The worker processes of one strategy invocation, indexed by worker.
///
/// Every spawned worker is eventually waited for. Workers still running when the group is
/// dropped (which only happens on a failure path) are killed first, so no worker outlives the
/// strategy invocation that started it.
#[derive(Debug)]
pub(crate) struct WorkerGroup<'b> {
    bindings: &'b BindingsFacade,

    // `None` once the worker has been reaped.
    children: Vec<Option<Pid>>,
}

impl<'b> WorkerGroup<'b> {
    pub(crate) fn new(bindings: &'b BindingsFacade, capacity: usize) -> Self {
        Self {
            bindings,
            children: Vec::with_capacity(capacity),
        }
    }

    /// Starts the next worker as a new process that runs `body` and then exits.
    ///
    /// The worker is assigned the next free index. `body` runs only in the worker process and must
    /// not allocate, take locks or log: the parent may have had other threads holding those when
    /// it forked. It never returns to the caller's stack frame, the worker process exits with
    /// code 0 if `body` returns `Ok`, nonzero otherwise.
    pub(crate) fn spawn<F>(&mut self, body: F) -> Result<()>
    where
        F: FnOnce() -> io::Result<()>,
    {
        let worker = self.children.len();

        match self.bindings.fork() {
            Ok(Forked::Child) => {
                let code = match panic::catch_unwind(AssertUnwindSafe(body)) {
                    Ok(Ok(())) => 0,
                    Ok(Err(_)) => libc::EXIT_FAILURE,
                    Err(_) => PANIC_EXIT_CODE,
                };

                pal::exit_worker(code)
            }
            Ok(Forked::Parent { child }) => {
                tracing::debug!(worker, child, "spawned worker process");
                self.children.push(Some(child));
                Ok(())
            }
            Err(source) => Err(Error::ResourceExhaustion {
                resource: Resource::Process,
                source,
            }),
        }
    }

    /// Waits for one worker to terminate and checks that it succeeded.
    ///
    /// Reaping an already reaped worker is a no-op.
    pub(crate) fn reap(&mut self, worker: usize) -> Result<()> {
        let Some(slot) = self.children.get_mut(worker) else {
            return Ok(());
        };

        let Some(child) = *slot else {
            return Ok(());
        };

        // The worker stays in the group until it is reaped, so a failed wait leaves it to drop().
        let status = self
            .bindings
            .wait(child)
            .map_err(|source| Error::Io { worker, source })?;

        *slot = None;

        match decode_wait_status(status) {
            None => {
                tracing::debug!(worker, child, "worker process succeeded");
                Ok(())
            }
            Some(exit) => {
                tracing::debug!(worker, child, %exit, "worker process failed");
                Err(Error::WorkerFailure { worker, exit })
            }
        }
    }

    /// Waits for every worker that has not been reaped yet, in worker order.
    ///
    /// All workers are reaped even if some of them failed. The failure of the lowest-indexed
    /// failed worker is returned.
    pub(crate) fn reap_all(&mut self) -> Result<()> {
        let mut first_failure = None;

        for worker in 0..self.children.len() {
            if let Err(error) = self.reap(worker) {
                first_failure.get_or_insert(error);
            }
        }

        first_failure.map_or(Ok(()), Err)
    }
}

impl Drop for WorkerGroup<'_> {
    fn drop(&mut self) {
        for (worker, child) in self.children.iter_mut().enumerate() {
            let Some(child) = child.take() else {
                continue;
            };

            tracing::warn!(worker, child, "killing abandoned worker process");

            // The worker may have exited already, in which case killing fails but waiting works.
            if let Err(error) = self.bindings.kill(child) {
                tracing::debug!(worker, child, %error, "failed to kill worker process");
            }

            if let Err(error) = self.bindings.wait(child) {
                tracing::warn!(worker, child, %error, "failed to reap worker process");
            }
        }
    }
}

/// Translates a raw wait status into how the worker ended, `None` meaning success.
pub(crate) fn decode_wait_status(status: i32) -> Option<WorkerExit> {
    if libc::WIFEXITED(status) {
        match libc::WEXITSTATUS(status) {
            0 => None,
            code => Some(WorkerExit::Exited(code)),
        }
    } else if libc::WIFSIGNALED(status) {
        Some(WorkerExit::Signaled(libc::WTERMSIG(status)))
    } else {
        // We never wait with WUNTRACED or WCONTINUED, so the kernel does not report anything
        // else. Treat it as a failure carrying the raw status.
        Some(WorkerExit::Exited(status))
    }
}
