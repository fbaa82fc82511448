use std::ffi::CStr;
use std::fmt::{self, Debug};
use std::io;
#[cfg(test)]
use std::sync::Arc;

#[cfg(test)]
use crate::pal::MockBindings;
use crate::pal::{Bindings, BuildTargetBindings, Forked, Pid, RegionAddress};

/// Enum to hide the real/mock choice behind a single wrapper type.
#[derive(Clone)]
pub(crate) enum BindingsFacade {
    Target(&'static BuildTargetBindings),

    #[cfg(test)]
    Mock(Arc<MockBindings>),
}

// Facade types are trivial pass-through layers - not worth testing.
#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg_attr(test, mutants::skip)]
impl BindingsFacade {
    pub(crate) const fn target() -> Self {
        Self::Target(&BuildTargetBindings)
    }

    #[cfg(test)]
    pub(crate) fn from_mock(mock: MockBindings) -> Self {
        Self::Mock(Arc::new(mock))
    }
}

// Facade types are trivial pass-through layers - not worth testing.
#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg_attr(test, mutants::skip)]
impl Bindings for BindingsFacade {
    fn map_shared(&self, len: usize) -> io::Result<RegionAddress> {
        match self {
            Self::Target(bindings) => bindings.map_shared(len),
            #[cfg(test)]
            Self::Mock(mock) => mock.map_shared(len),
        }
    }

    fn unmap(&self, region: RegionAddress) -> io::Result<()> {
        match self {
            Self::Target(bindings) => bindings.unmap(region),
            #[cfg(test)]
            Self::Mock(mock) => mock.unmap(region),
        }
    }

    fn fork(&self) -> io::Result<Forked> {
        match self {
            Self::Target(bindings) => bindings.fork(),
            #[cfg(test)]
            Self::Mock(mock) => mock.fork(),
        }
    }

    fn wait(&self, child: Pid) -> io::Result<i32> {
        match self {
            Self::Target(bindings) => bindings.wait(child),
            #[cfg(test)]
            Self::Mock(mock) => mock.wait(child),
        }
    }

    fn kill(&self, child: Pid) -> io::Result<()> {
        match self {
            Self::Target(bindings) => bindings.kill(child),
            #[cfg(test)]
            Self::Mock(mock) => mock.kill(child),
        }
    }

    fn mkfifo(&self, path: &CStr) -> io::Result<()> {
        match self {
            Self::Target(bindings) => bindings.mkfifo(path),
            #[cfg(test)]
            Self::Mock(mock) => mock.mkfifo(path),
        }
    }
}

#[cfg_attr(coverage_nightly, coverage(off))] // No API contract to test.
impl Debug for BindingsFacade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Target(inner) => inner.fmt(f),
            #[cfg(test)]
            Self::Mock(inner) => inner.fmt(f),
        }
    }
}

// Facade types are trivial pass-through layers - not worth testing.
#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg_attr(test, mutants::skip)]
impl Default for BindingsFacade {
    fn default() -> Self {
        Self::target()
    }
}
