use std::ffi::CStr;
use std::fs::File;
use std::io;
use std::os::fd::{FromRawFd, OwnedFd};
use std::ptr::{self, NonNull};

use crate::pal::{Bindings, Forked, Pid, RegionAddress};

/// FFI bindings that target the real operating system that the build is targeting.
///
/// You would only use different bindings in PAL unit tests that need to use mock bindings.
/// Even then, whenever possible, unit tests should use real bindings for maximum realism.
#[derive(Debug, Default)]
pub(crate) struct BuildTargetBindings;

fn region_bytes(len: usize) -> io::Result<usize> {
    len.checked_mul(size_of::<f64>())
        .ok_or_else(|| io::Error::from(io::ErrorKind::OutOfMemory))
}

// Real OS bindings are excluded from coverage measurement because:
// 1. They are tested via integration tests running on the actual operating system.
// 2. Error paths require OS-level failures that are impractical to trigger in tests.
#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg_attr(test, mutants::skip)]
impl Bindings for BuildTargetBindings {
    fn map_shared(&self, len: usize) -> io::Result<RegionAddress> {
        let bytes = region_bytes(len)?;

        // SAFETY: Anonymous mapping at an address of the kernel's choosing, no file descriptor
        // involved, so there is nothing we could invalidate.
        let address = unsafe {
            libc::mmap(
                ptr::null_mut(),
                bytes,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };

        if address == libc::MAP_FAILED {
            return Err(io::Error::last_os_error());
        }

        let ptr = NonNull::new(address.cast::<f64>())
            .ok_or_else(|| io::Error::other("mmap() returned a null address"))?;

        Ok(RegionAddress { ptr, len })
    }

    fn unmap(&self, region: RegionAddress) -> io::Result<()> {
        let bytes = region_bytes(region.len)?;

        // SAFETY: `RegionAddress` is only created by `map_shared()` with the same length and
        // is consumed here, so the range is a live mapping we own and it is unmapped only once.
        let result = unsafe { libc::munmap(region.ptr.as_ptr().cast(), bytes) };

        if result == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }

    fn fork(&self) -> io::Result<Forked> {
        // SAFETY: The child only runs code that is safe to run after a fork in a multithreaded
        // process: it does not allocate, take locks or log before calling `exit_worker()`.
        let result = unsafe { libc::fork() };

        match result {
            -1 => Err(io::Error::last_os_error()),
            0 => Ok(Forked::Child),
            child => Ok(Forked::Parent { child }),
        }
    }

    fn wait(&self, child: Pid) -> io::Result<i32> {
        let mut status = 0;

        loop {
            // SAFETY: No safety requirements beyond passing valid arguments.
            let result = unsafe { libc::waitpid(child, &raw mut status, 0) };

            if result == child {
                return Ok(status);
            }

            let error = io::Error::last_os_error();

            if error.kind() != io::ErrorKind::Interrupted {
                return Err(error);
            }
        }
    }

    fn kill(&self, child: Pid) -> io::Result<()> {
        // SAFETY: No safety requirements beyond passing valid arguments.
        let result = unsafe { libc::kill(child, libc::SIGKILL) };

        if result == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }

    fn mkfifo(&self, path: &CStr) -> io::Result<()> {
        // SAFETY: The path is a valid NUL-terminated string that outlives the call.
        let result = unsafe { libc::mkfifo(path.as_ptr(), 0o600) };

        if result == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }
}

/// Opens an existing channel for writing. Blocks until a reader opens the other end.
///
/// Safe to call in a forked worker: performs no allocation.
#[cfg_attr(coverage_nightly, coverage(off))]
pub(crate) fn open_for_writing(path: &CStr) -> io::Result<File> {
    loop {
        // SAFETY: The path is a valid NUL-terminated string that outlives the call.
        let fd = unsafe { libc::open(path.as_ptr(), libc::O_WRONLY | libc::O_CLOEXEC) };

        if fd >= 0 {
            // SAFETY: We just opened the descriptor, nothing else owns it.
            let owned = unsafe { OwnedFd::from_raw_fd(fd) };
            return Ok(File::from(owned));
        }

        let error = io::Error::last_os_error();

        if error.kind() != io::ErrorKind::Interrupted {
            return Err(error);
        }
    }
}

/// Terminates the current (worker) process without running destructors, atexit handlers or
/// flushing stdio buffers inherited from the parent.
#[cfg_attr(coverage_nightly, coverage(off))]
pub(crate) fn exit_worker(code: i32) -> ! {
    // SAFETY: No safety requirements, the process ends here.
    unsafe { libc::_exit(code) }
}

/// Terminates the current (worker) process as if it crashed.
#[cfg_attr(coverage_nightly, coverage(off))]
pub(crate) fn crash_worker() -> ! {
    // SAFETY: No safety requirements, SIGKILL cannot be caught so the process ends here.
    unsafe {
        libc::raise(libc::SIGKILL);
    }

    // Unreachable in practice, here to satisfy the type system.
    exit_worker(libc::EXIT_FAILURE)
}
