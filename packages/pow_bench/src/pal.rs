//! Platform Abstraction Layer (PAL). All operating system calls made by the parent side of the
//! strategies go through the [`Bindings`] trait, so unit tests can replace them with mocks.
//!
//! Code that runs inside a forked worker process cannot be mocked (the mock would not survive
//! the fork in any meaningful way) and uses the free functions of the `real` module directly.

mod abstractions;
pub(crate) use abstractions::*;

mod facade;
pub(crate) use facade::*;

mod real;
pub(crate) use real::*;
