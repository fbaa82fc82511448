//! Integration tests for running the whole benchmark.

#![cfg(all(unix, not(miri)))]

use pow_bench::{
    BenchmarkConfig, Error, Operands, StrategyKind, Verification, WorkerExit, run_benchmark,
};
use testing::{assert_dir_empty, with_watchdog};

#[test]
fn every_strategy_matches_reference() {
    with_watchdog(|| {
        let dir = tempfile::tempdir().unwrap();
        let config = BenchmarkConfig::new(10_000, 8).with_channel_dir(dir.path());
        let operands = Operands::generate_with_seed(config.len(), 10).unwrap();

        let report = run_benchmark(&config, &operands).unwrap();

        assert!(report.all_succeeded(), "{report}");
        assert_eq!(report.engines().len(), 3);

        let printed = report.to_string();
        assert!(printed.starts_with("Serial calculation time: "));
        for kind in ["shared memory", "message passing", "threads"] {
            assert!(printed.contains(&format!("Parallel ({kind}) calculation time: ")));
            assert!(printed.contains(&format!(
                "Results match between serial and {kind} calculation."
            )));
        }

        assert_dir_empty(dir.path());
    });
}

#[test]
fn failed_strategy_does_not_stop_later_ones() {
    with_watchdog(|| {
        let dir = tempfile::tempdir().unwrap();
        let config = BenchmarkConfig::new(1_000, 4)
            .with_channel_dir(dir.path())
            .with_fault(StrategyKind::SharedMemory, 1);
        let operands = Operands::generate_with_seed(config.len(), 11).unwrap();

        let report = run_benchmark(&config, &operands).unwrap();

        assert!(!report.all_succeeded());

        let shared_memory = report.engine(StrategyKind::SharedMemory).unwrap();
        assert!(matches!(
            shared_memory.outcome(),
            Err(Error::WorkerFailure {
                worker: 1,
                exit: WorkerExit::Signaled(libc::SIGKILL)
            })
        ));

        for kind in [StrategyKind::MessagePassing, StrategyKind::Threads] {
            let engine = report.engine(kind).unwrap();
            assert!(
                matches!(engine.outcome(), Ok(Verification::Match)),
                "{engine}"
            );
        }

        assert_dir_empty(dir.path());
    });
}

#[test]
fn invalid_worker_count_is_reported_per_strategy() {
    with_watchdog(|| {
        let dir = tempfile::tempdir().unwrap();
        let config = BenchmarkConfig::new(4, 5).with_channel_dir(dir.path());
        let operands = Operands::generate_with_seed(config.len(), 12).unwrap();

        let report = run_benchmark(&config, &operands).unwrap();

        assert!(
            report
                .engines()
                .iter()
                .all(|engine| matches!(engine.outcome(), Err(Error::PreconditionViolation(_))))
        );

        assert_dir_empty(dir.path());
    });
}
