use std::ffi::{CStr, CString};
use std::fs::{self, File};
use std::io::{self, BufReader, Read, Write};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use crate::pal::{self, Bindings};
use crate::transform::power;
use crate::{Error, Resource, Result};

const VALUE_SIZE: usize = size_of::<f64>();

// Enough for a few thousand values per read() call.
const READ_BUFFER_SIZE: usize = 64 * 1024;

static NEXT_RUN: AtomicU64 = AtomicU64::new(0);

/// Returns an identifier that no other channel set in this process has used.
///
/// Combined with the process ID in channel names, this keeps concurrent runs (in this process or
/// in any other) from ever opening each other's channels.
pub(crate) fn next_run_id() -> u64 {
    NEXT_RUN.fetch_add(1, Ordering::Relaxed)
}

/// A named, unidirectional byte stream carrying the results of one worker process to the parent.
///
/// The filesystem entry exists from creation until the channel is dropped.
#[derive(Debug)]
pub(crate) struct Channel {
    path: PathBuf,

    // The same path, prepared before forking so the worker does not need to allocate.
    c_path: CString,
}

impl Channel {
    /// Creates the channel of `worker` for invocation `run` inside `dir`.
    pub(crate) fn create(
        dir: &Path,
        run: u64,
        worker: usize,
        bindings: &impl Bindings,
    ) -> Result<Self> {
        let path = dir.join(format!("pow_bench-{}-{run}-{worker}", process::id()));

        let c_path = CString::new(path.as_os_str().as_bytes()).map_err(|error| {
            Error::ResourceExhaustion {
                resource: Resource::Channel,
                source: io::Error::new(io::ErrorKind::InvalidInput, error),
            }
        })?;

        bindings
            .mkfifo(&c_path)
            .map_err(|source| Error::ResourceExhaustion {
                resource: Resource::Channel,
                source,
            })?;

        tracing::debug!(worker, path = %path.display(), "created channel");

        Ok(Self { path, c_path })
    }

    #[cfg(test)]
    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn c_path(&self) -> &CStr {
        &self.c_path
    }

    /// Reads values from the channel into `out` until it is full or the writer goes away.
    ///
    /// Blocks until the writer has opened its end. Returns the number of values received, which
    /// is less than `out.len()` only if the writer closed the stream early.
    pub(crate) fn drain_into(&self, out: &mut [f64]) -> io::Result<usize> {
        let file = File::open(&self.path)?;
        let mut reader = BufReader::with_capacity(READ_BUFFER_SIZE, file);

        for (received, slot) in out.iter_mut().enumerate() {
            let mut bytes = [0_u8; VALUE_SIZE];

            match reader.read_exact(&mut bytes) {
                Ok(()) => *slot = f64::from_ne_bytes(bytes),
                Err(error) if error.kind() == io::ErrorKind::UnexpectedEof => return Ok(received),
                Err(error) => return Err(error),
            }
        }

        Ok(out.len())
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "removed channel"),
            Err(error) => {
                tracing::warn!(path = %self.path.display(), %error, "failed to remove channel");
            }
        }
    }
}

/// Something a worker is told to do to itself after connecting to its channel.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Interference {
    /// Die before sending anything.
    Crash,

    /// Wait this long before sending anything.
    Stall(Duration),
}

/// Worker side: computes `bases[i]^exponents[i]` in index order, writing every value to the
/// channel at `path` as soon as it is produced.
///
/// Runs inside a forked worker process, so it performs no allocation.
pub(crate) fn stream_results(
    path: &CStr,
    bases: &[f64],
    exponents: &[f64],
    interference: Option<Interference>,
) -> io::Result<()> {
    let mut channel = pal::open_for_writing(path)?;

    match interference {
        Some(Interference::Crash) => pal::crash_worker(),
        Some(Interference::Stall(duration)) => thread::sleep(duration),
        None => {}
    }

    for (base, exponent) in bases.iter().zip(exponents) {
        channel.write_all(&power(*base, *exponent).to_ne_bytes())?;
    }

    Ok(())
}
