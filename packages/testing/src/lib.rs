#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(coverage_nightly, coverage(off))] // This is all test code, no need to test it.

//! Private helpers for the pow_bench tests and benchmarks.

use std::env;
use std::fs;
use std::panic;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

/// How long a test may run before [`with_watchdog`] gives up on it.
///
/// Generous because the process-based strategies fork a worker per range and the test machine
/// may be running many such tests at once.
pub const WATCHDOG_TIMEOUT: Duration = Duration::from_secs(60);

/// Runs a test on a separate thread and fails it if it does not finish within
/// [`WATCHDOG_TIMEOUT`].
///
/// None of the strategies has a timeout of its own, so a lost worker would otherwise hang the
/// whole test binary. A test that hangs is reported as a panic and the thread running it is
/// abandoned.
///
/// When the `MUTATION_TESTING` environment variable is set to "1", the watchdog is disabled and
/// the test runs directly on the calling thread, so mutation testing can detect hanging mutations
/// with its own timeout.
///
/// # Panics
///
/// Panics if the test exceeds the timeout or if the test itself panics.
///
/// # Example
///
/// ```rust
/// use testing::with_watchdog;
///
/// let sum = with_watchdog(|| 2 + 2);
/// assert_eq!(sum, 4);
/// ```
pub fn with_watchdog<F, R>(test_fn: F) -> R
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    if env::var("MUTATION_TESTING").as_deref() == Ok("1") {
        return test_fn();
    }

    let (tx, rx) = mpsc::channel();

    let test_handle = thread::spawn(move || {
        // If this fails, the watchdog has already given up on us.
        drop(tx.send(test_fn()));
    });

    match rx.recv_timeout(WATCHDOG_TIMEOUT) {
        Ok(result) => {
            test_handle.join().expect("test thread already sent its result");
            result
        }
        Err(mpsc::RecvTimeoutError::Timeout) => {
            panic!("test did not finish within {WATCHDOG_TIMEOUT:?}, a worker is probably hung");
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => match test_handle.join() {
            Ok(()) => panic!("test thread exited without sending its result"),
            Err(e) => panic::resume_unwind(e),
        },
    }
}

/// Lists the entries of `dir`, sorted by path.
///
/// Used to check that a strategy left no channels behind in its channel directory.
///
/// # Panics
///
/// Panics if the directory cannot be read.
#[must_use]
pub fn dir_entries(dir: &Path) -> Vec<PathBuf> {
    let mut entries = fs::read_dir(dir)
        .expect("channel directory must be readable")
        .map(|entry| entry.expect("directory entry must be readable").path())
        .collect::<Vec<_>>();

    entries.sort();
    entries
}

/// Asserts that `dir` has no entries, listing them if it does.
///
/// # Panics
///
/// Panics if the directory is not empty or cannot be read.
pub fn assert_dir_empty(dir: &Path) {
    let entries = dir_entries(dir);

    assert!(
        entries.is_empty(),
        "expected {} to be empty but found {entries:?}",
        dir.display()
    );
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::fs::File;

    use super::*;

    #[test]
    fn watchdog_returns_result() {
        assert_eq!(with_watchdog(|| "done"), "done");
    }

    #[test]
    #[should_panic(expected = "boom")]
    fn watchdog_forwards_panic() {
        with_watchdog::<_, ()>(|| panic!("boom"));
    }

    #[test]
    fn lists_entries_sorted() {
        let dir = tempfile::tempdir().unwrap();
        File::create(dir.path().join("b")).unwrap();
        File::create(dir.path().join("a")).unwrap();

        assert_eq!(
            dir_entries(dir.path()),
            [dir.path().join("a"), dir.path().join("b")]
        );
    }

    #[test]
    fn empty_dir_passes() {
        let dir = tempfile::tempdir().unwrap();

        assert_dir_empty(dir.path());
    }

    #[test]
    #[should_panic(expected = "to be empty")]
    fn leftover_entry_fails() {
        let dir = tempfile::tempdir().unwrap();
        File::create(dir.path().join("leftover")).unwrap();

        assert_dir_empty(dir.path());
    }
}
