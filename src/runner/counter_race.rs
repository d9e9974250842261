use std::sync::Arc;

use log::{debug, info};

use crate::config::CounterConfig;
use crate::cpu::current_cpu;
use crate::error::{ExperimentError, Result};
use crate::oneshot;
use crate::strategy::Counter;

use super::spawn;

/// What one worker saw of the shared counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    /// Counter value before the worker's first increment.
    pub initial: u64,
    /// Counter value right after the worker's last increment.
    pub end: u64,
    /// CPU the worker started on, where the OS reports it.
    pub cpu: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterRun {
    pub strategy: &'static str,
    /// One entry per worker, in spawn order.
    pub snapshots: Vec<Snapshot>,
    /// Counter value once every worker reported back.
    pub total: u64,
    /// Value the counter would reach if no increment got lost.
    pub expected: u64,
}

impl CounterRun {
    pub fn lost_updates(&self) -> u64 {
        // The counter wraps, so the distance is measured modulo 2^64 too.
        self.expected.wrapping_sub(self.total)
    }
}

/// Runs `config.threads` detached workers that each increment one shared
/// counter `config.iterations` times.
///
/// Workers are never joined. Each one hands its snapshot back through a
/// one-shot channel, and the total is read only after every snapshot arrived.
pub fn run_counter_race<C>(config: &CounterConfig) -> Result<CounterRun>
where
    C: Counter + 'static,
{
    config.validate()?;
    info!(
        "counter race ({}): {} threads x {} increments",
        C::NAME,
        config.threads,
        config.iterations
    );

    let counter = Arc::new(C::new(config.initial));
    let mut receivers = Vec::with_capacity(config.threads);
    for _ in 0..config.threads {
        let (sender, receiver) = oneshot::channel();
        let counter = Arc::clone(&counter);
        let iterations = config.iterations;
        // Dropping the handle detaches the thread.
        spawn("counter", move || {
            let cpu = current_cpu();
            let initial = counter.value();
            for _ in 0..iterations {
                counter.increment();
            }
            let end = counter.value();
            sender.send(Snapshot { initial, end, cpu });
        })?;
        receivers.push(receiver);
    }

    let mut snapshots = Vec::with_capacity(config.threads);
    for (id, receiver) in receivers.into_iter().enumerate() {
        let snapshot = receiver
            .receive()
            .map_err(|_| ExperimentError::WorkerLost { role: "counter" })?;
        debug!(
            "thread {id}: {} -> {} on cpu {:?}",
            snapshot.initial, snapshot.end, snapshot.cpu
        );
        snapshots.push(snapshot);
    }

    // Every worker's last increment happens before its send, and every send
    // happens before the receive above, so this read races with nothing.
    let total = counter.value();
    let run = CounterRun {
        strategy: C::NAME,
        snapshots,
        total,
        expected: config.initial.wrapping_add(config.expected_increments()),
    };
    info!(
        "counter race ({}): total {}, {} updates lost",
        C::NAME,
        run.total,
        run.lost_updates()
    );
    Ok(run)
}

#[test]
fn fetch_add_reaches_the_exact_total() {
    use crate::strategy::FetchAddCounter;
    let config = CounterConfig::default()
        .with_threads(4)
        .with_iterations(100_000);
    let run = run_counter_race::<FetchAddCounter>(&config).unwrap();
    assert_eq!(run.total, 400_000);
    assert_eq!(run.lost_updates(), 0);
    assert_eq!(run.snapshots.len(), 4);
    for snapshot in &run.snapshots {
        assert!(snapshot.initial <= snapshot.end);
        assert!(snapshot.end - snapshot.initial >= 100_000);
    }
}

#[test]
fn racy_counters_never_overshoot() {
    use crate::strategy::{LoadStoreCounter, RacyCounter};
    let config = CounterConfig::default()
        .with_threads(4)
        .with_iterations(100_000);
    for _ in 0..5 {
        let racy = run_counter_race::<RacyCounter>(&config).unwrap();
        assert!(racy.total <= 400_000);
        let load_store = run_counter_race::<LoadStoreCounter>(&config).unwrap();
        assert!(load_store.total <= 400_000);
        assert_eq!(load_store.expected, 400_000);
    }
}

#[test]
fn zero_threads_is_rejected_before_spawning() {
    use crate::error::ConfigError;
    use crate::strategy::CasCounter;
    let config = CounterConfig::default().with_threads(0);
    assert!(matches!(
        run_counter_race::<CasCounter>(&config),
        Err(ExperimentError::Config(ConfigError::NoThreads { .. }))
    ));
}

#[test]
fn counter_wraps_past_the_maximum() {
    use crate::strategy::{CasCounter, FetchAddCounter};
    let config = CounterConfig::default()
        .with_threads(2)
        .with_iterations(1)
        .with_initial(u64::MAX - 1);
    let run = run_counter_race::<FetchAddCounter>(&config).unwrap();
    assert_eq!(run.total, 0);
    assert_eq!(run.expected, 0);
    assert_eq!(run.lost_updates(), 0);

    let run = run_counter_race::<CasCounter>(&config.with_iterations(3)).unwrap();
    assert_eq!(run.total, 4);
    assert_eq!(run.lost_updates(), 0);
}
