use std::ffi::CStr;
use std::fmt::Debug;
use std::io;
use std::ptr::NonNull;

/// Process identifier as used by the operating system.
pub(crate) type Pid = libc::pid_t;

/// Which side of a `fork()` the caller ended up on.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Forked {
    /// The original process, with the identifier of the new child.
    Parent { child: Pid },

    /// The new child process.
    Child,
}

/// Address of an anonymous shared mapping holding `len` `f64` values.
///
/// Only the bindings can create one, by mapping memory. Passing it back to
/// [`Bindings::unmap()`] consumes it, so a mapping cannot be released twice.
#[derive(Debug)]
pub(crate) struct RegionAddress {
    pub(super) ptr: NonNull<f64>,
    pub(super) len: usize,
}

impl RegionAddress {
    pub(crate) fn as_ptr(&self) -> *mut f64 {
        self.ptr.as_ptr()
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }
}

// SAFETY: The address refers to a process-wide mapping, not to thread-local data. It carries no
// access rights by itself, all access goes through `SharedRegion`, which follows borrow rules.
unsafe impl Send for RegionAddress {}
// SAFETY: See above, there is no interior state that could be mutated through a shared reference.
unsafe impl Sync for RegionAddress {}

/// Bindings for FFI calls into the operating system.
///
/// All PAL FFI calls made by the parent side must go through this trait, enabling them to be
/// mocked.
#[cfg_attr(test, mockall::automock)]
pub(crate) trait Bindings: Debug + Send + Sync + 'static {
    /// Maps a zero-filled anonymous region of `len` values, shared with any process forked
    /// after this call.
    fn map_shared(&self, len: usize) -> io::Result<RegionAddress>;

    /// Releases a region obtained from `map_shared()`.
    fn unmap(&self, region: RegionAddress) -> io::Result<()>;

    // fork()
    fn fork(&self) -> io::Result<Forked>;

    /// Blocks until the child terminates, returning the raw wait status.
    fn wait(&self, child: Pid) -> io::Result<i32>;

    // kill() with SIGKILL
    fn kill(&self, child: Pid) -> io::Result<()>;

    // mkfifo() with owner-only permissions
    fn mkfifo(&self, path: &CStr) -> io::Result<()>;
}
