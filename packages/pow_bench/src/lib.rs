#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Compares ways of parallelizing a large element-wise transform on a Unix system.
//!
//! The transform raises every base to its exponent, `result[i] = bases[i]^exponents[i]`. There
//! are four [`Strategy`] implementations of it:
//!
//! * [`Sequential`] computes everything on the calling thread. Its result is the reference.
//! * [`SharedMemory`] forks worker processes that write into an anonymous memory mapping shared
//!   with the parent.
//! * [`Pipes`] forks worker processes that stream their results back through one named channel
//!   per worker.
//! * [`Threads`] spawns worker threads that write into disjoint ranges of one result buffer.
//!
//! The parallel strategies split the work with [`Partition`], which hands every worker an equal
//! share and gives the remainder to the last worker. Results are compared against the reference
//! with [`verify()`].
//!
//! # Running the benchmark
//!
//! [`run_benchmark()`] runs all the strategies one after another on the same operands and reports
//! how long each took and whether its result matched the reference:
//!
//! ```
//! use pow_bench::{BenchmarkConfig, Operands, run_benchmark};
//!
//! let config = BenchmarkConfig::new(10_000, 4);
//! let operands = Operands::generate(config.len()).unwrap();
//!
//! let report = run_benchmark(&config, &operands).unwrap();
//! println!("{report}");
//! ```
//!
//! The `pow_bench` binary does the same with command line arguments.
//!
//! # Failure handling
//!
//! A strategy either returns a complete result or an [`Error`]. Workers that crash, exit with an
//! error or disconnect early are reported as [`Error::WorkerFailure`]. Whatever the outcome, all
//! workers have exited and all shared memory and channels have been released by the time
//! [`Strategy::compute()`] returns.
//!
//! No operation has a timeout. A worker that hangs makes its strategy hang.

mod benchmark;
mod channel;
mod error;
mod operands;
mod pal;
mod partition;
mod pipes;
mod process;
mod sequential;
mod shared_memory;
mod shared_region;
mod strategy;
mod threads;
mod transform;
mod verify;

pub use benchmark::*;
pub use error::*;
pub use operands::*;
pub use partition::*;
pub use pipes::*;
pub use sequential::*;
pub use shared_memory::*;
pub use strategy::*;
pub use threads::*;
pub use transform::*;
pub use verify::*;
