use std::slice;

use crate::pal::{Bindings, BindingsFacade, RegionAddress};
use crate::{Error, Resource, Result};

/// A block of `f64` values in anonymous shared memory.
///
/// Worker processes forked while the region is alive write into the same physical memory that
/// the owner sees, without copying. The mapping is released exactly once, when the region is
/// dropped, whichever path the owner leaves by.
#[derive(Debug)]
pub(crate) struct SharedRegion {
    // Always `Some` until dropped.
    address: Option<RegionAddress>,
    bindings: BindingsFacade,
}

impl SharedRegion {
    pub(crate) fn new(len: usize, bindings: BindingsFacade) -> Result<Self> {
        let address = bindings
            .map_shared(len)
            .map_err(|source| Error::ResourceExhaustion {
                resource: Resource::SharedMemory,
                source,
            })?;

        tracing::debug!(len, "mapped shared region");

        Ok(Self {
            address: Some(address),
            bindings,
        })
    }

    fn address(&self) -> &RegionAddress {
        self.address
            .as_ref()
            .expect("address is only taken in drop()")
    }

    pub(crate) fn as_slice(&self) -> &[f64] {
        let address = self.address();

        // SAFETY: The mapping is `len` values long, zero-filled on creation (a valid f64) and
        // stays mapped for the lifetime of `self`. Worker processes only write to it while the
        // owner is blocked waiting for them, never while a borrow handed out here is in use.
        unsafe { slice::from_raw_parts(address.as_ptr(), address.len()) }
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [f64] {
        let address = self.address();

        // SAFETY: As for `as_slice()`, plus `&mut self` guarantees no other borrow exists in
        // this process.
        unsafe { slice::from_raw_parts_mut(address.as_ptr(), address.len()) }
    }

    /// Copies the contents into memory owned by the caller.
    pub(crate) fn to_boxed_slice(&self) -> Box<[f64]> {
        Box::from(self.as_slice())
    }
}

impl Drop for SharedRegion {
    fn drop(&mut self) {
        let Some(address) = self.address.take() else {
            return;
        };

        // Nothing better to do than report it, the mapping is gone with the process anyway.
        if let Err(error) = self.bindings.unmap(address) {
            tracing::warn!(%error, "failed to unmap shared region");
        }
    }
}
