use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::{
    Operands, Pipes, Precondition, Result, Sequential, SharedMemory, Strategy, StrategyKind,
    Threads, Verification, verify,
};

/// Number of operand pairs used when the caller does not choose.
pub const DEFAULT_LEN: usize = 12_113_513;

/// Number of workers each parallel strategy uses when the caller does not choose.
pub const DEFAULT_WORKERS: usize = 8;

/// Parameters of a benchmark run.
///
/// # Example
///
/// ```
/// use pow_bench::{BenchmarkConfig, DEFAULT_LEN};
///
/// let config = BenchmarkConfig::default();
/// assert_eq!(config.len(), DEFAULT_LEN);
///
/// let config = BenchmarkConfig::new(1000, 4);
/// assert_eq!(config.workers(), 4);
/// ```
#[derive(Clone, Debug)]
pub struct BenchmarkConfig {
    len: usize,
    workers: usize,
    channel_dir: PathBuf,
    fault: Option<(StrategyKind, usize)>,
}

impl BenchmarkConfig {
    /// Creates a configuration for `len` operand pairs and `workers` workers per parallel
    /// strategy. Channels go to the temporary directory of the operating system.
    #[must_use]
    pub fn new(len: usize, workers: usize) -> Self {
        Self {
            len,
            workers,
            channel_dir: env::temp_dir(),
            fault: None,
        }
    }

    /// Places the channels of the message passing strategy in `dir`.
    #[must_use]
    pub fn with_channel_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.channel_dir = dir.into();
        self
    }

    /// Makes worker `worker` of the `kind` strategy fail.
    #[doc(hidden)]
    #[must_use]
    pub fn with_fault(mut self, kind: StrategyKind, worker: usize) -> Self {
        self.fault = Some((kind, worker));
        self
    }

    /// Number of operand pairs to generate.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the configuration asks for zero operand pairs, which no strategy accepts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of workers per parallel strategy.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Directory for the channels of the message passing strategy.
    #[must_use]
    pub fn channel_dir(&self) -> &Path {
        &self.channel_dir
    }

    fn fault_for(&self, kind: StrategyKind) -> Option<usize> {
        self.fault
            .and_then(|(faulty, worker)| (faulty == kind).then_some(worker))
    }

    fn parallel_strategies(&self) -> Vec<Box<dyn Strategy>> {
        let mut shared_memory = SharedMemory::new(self.workers);
        if let Some(worker) = self.fault_for(StrategyKind::SharedMemory) {
            shared_memory = shared_memory.with_fault(worker);
        }

        let mut pipes = Pipes::new(self.workers).with_channel_dir(&self.channel_dir);
        if let Some(worker) = self.fault_for(StrategyKind::MessagePassing) {
            pipes = pipes.with_fault(worker);
        }

        let mut threads = Threads::new(self.workers);
        if let Some(worker) = self.fault_for(StrategyKind::Threads) {
            threads = threads.with_fault(worker);
        }

        vec![Box::new(shared_memory), Box::new(pipes), Box::new(threads)]
    }
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self::new(DEFAULT_LEN, DEFAULT_WORKERS)
    }
}

/// Timing and outcome of one parallel strategy.
#[derive(Debug)]
pub struct EngineReport {
    kind: StrategyKind,
    elapsed: Duration,
    outcome: Result<Verification>,
}

impl EngineReport {
    /// Which strategy this report is about.
    #[must_use]
    pub fn kind(&self) -> StrategyKind {
        self.kind
    }

    /// Wall-clock time the strategy took, including worker startup and teardown.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// The verification result, or the error the strategy failed with.
    #[must_use]
    pub fn outcome(&self) -> &Result<Verification> {
        &self.outcome
    }

    /// Whether the strategy completed and its results matched the reference.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, Ok(Verification::Match))
    }
}

impl fmt::Display for EngineReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Parallel ({}) calculation time: {:.6} seconds",
            self.kind,
            self.elapsed.as_secs_f64()
        )?;

        match &self.outcome {
            Ok(Verification::Match) => write!(
                f,
                "Results match between serial and {} calculation.",
                self.kind
            ),
            Ok(Verification::Mismatch {
                index,
                expected,
                actual,
            }) => write!(
                f,
                "Mismatch at index {index} in {} calculation (expected {expected}, got {actual})",
                self.kind
            ),
            Err(error) => write!(f, "Parallel ({}) calculation failed: {error}", self.kind),
        }
    }
}

/// Timings of the reference computation and of every parallel strategy, in the order they ran.
#[derive(Debug)]
pub struct BenchmarkReport {
    reference_elapsed: Duration,
    engines: Vec<EngineReport>,
}

impl BenchmarkReport {
    /// Wall-clock time of the sequential reference computation.
    #[must_use]
    pub fn reference_elapsed(&self) -> Duration {
        self.reference_elapsed
    }

    /// Reports of the parallel strategies, in the order they ran.
    #[must_use]
    pub fn engines(&self) -> &[EngineReport] {
        &self.engines
    }

    /// The report of the `kind` strategy, if it ran.
    #[must_use]
    pub fn engine(&self, kind: StrategyKind) -> Option<&EngineReport> {
        self.engines.iter().find(|engine| engine.kind == kind)
    }

    /// Whether every parallel strategy completed and matched the reference.
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.engines.iter().all(EngineReport::succeeded)
    }
}

impl fmt::Display for BenchmarkReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Serial calculation time: {:.6} seconds",
            self.reference_elapsed.as_secs_f64()
        )?;

        for engine in &self.engines {
            write!(f, "\n{engine}")?;
        }

        Ok(())
    }
}

/// Computes the reference result sequentially, then runs each parallel strategy on the same
/// operands and verifies its result against the reference.
///
/// The strategies run strictly one after another so their timings do not interfere. A strategy
/// that fails is recorded in its [`EngineReport`] and does not stop the strategies after it.
///
/// # Errors
///
/// Returns [`Precondition::LengthMismatch`] if `operands` do not have the length the configuration
/// asks for, and the reference computation's error if it fails. Failures of the parallel strategies
/// are part of the returned report.
///
/// # Example
///
/// ```
/// use pow_bench::{BenchmarkConfig, Operands, run_benchmark};
///
/// let config = BenchmarkConfig::new(100, 4);
/// let operands = Operands::generate_with_seed(config.len(), 1).unwrap();
///
/// let report = run_benchmark(&config, &operands).unwrap();
/// assert!(report.all_succeeded());
/// ```
pub fn run_benchmark(config: &BenchmarkConfig, operands: &Operands) -> Result<BenchmarkReport> {
    if config.len() != operands.len() {
        return Err(Precondition::LengthMismatch {
            left: config.len(),
            right: operands.len(),
        }
        .into());
    }

    tracing::info!(len = operands.len(), "starting serial calculation");

    let started = Instant::now();
    let reference = Sequential.compute(operands)?;
    let reference_elapsed = started.elapsed();

    tracing::info!(elapsed = ?reference_elapsed, "serial calculation finished");

    let engines = config
        .parallel_strategies()
        .iter()
        .map(|strategy| run_engine(strategy.as_ref(), operands, &reference))
        .collect();

    Ok(BenchmarkReport {
        reference_elapsed,
        engines,
    })
}

fn run_engine(strategy: &dyn Strategy, operands: &Operands, reference: &[f64]) -> EngineReport {
    let kind = strategy.kind();

    tracing::info!(engine = %kind, "starting parallel calculation");

    let started = Instant::now();
    let computed = strategy.compute(operands);
    let elapsed = started.elapsed();

    let outcome = computed.and_then(|result| verify(reference, &result));

    match &outcome {
        Ok(Verification::Match) => {
            tracing::info!(engine = %kind, ?elapsed, "parallel calculation matches");
        }
        Ok(verification) => {
            tracing::warn!(engine = %kind, ?elapsed, %verification, "parallel calculation differs");
        }
        Err(error) => {
            tracing::error!(engine = %kind, ?elapsed, %error, "parallel calculation failed");
        }
    }

    EngineReport {
        kind,
        elapsed,
        outcome,
    }
}
