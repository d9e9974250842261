use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use log::{debug, info, warn};

use crate::config::StoreBufferConfig;
use crate::error::{ExperimentError, Result};
use crate::oneshot;
use crate::strategy::StoreBufferOrdering;

use super::spawn;
use super::spin::Spin;

/// Two independent flag sequences. Trial `i` uses `x[i]` and `y[i]` only.
struct DualFlagPair {
    x: Vec<AtomicUsize>,
    y: Vec<AtomicUsize>,
}

impl DualFlagPair {
    fn new(slots: usize) -> Self {
        let zeroed = || -> Vec<AtomicUsize> { (0..slots).map(|_| AtomicUsize::new(0)).collect() };
        Self {
            x: zeroed(),
            y: zeroed(),
        }
    }

    fn flags(&self, flag: Flag) -> (&[AtomicUsize], &[AtomicUsize]) {
        match flag {
            Flag::X => (self.x.as_slice(), self.y.as_slice()),
            Flag::Y => (self.y.as_slice(), self.x.as_slice()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Flag {
    X,
    Y,
}

impl Flag {
    fn writer(self) -> &'static str {
        match self {
            Flag::X => "writer-x",
            Flag::Y => "writer-y",
        }
    }

    fn reader(self) -> &'static str {
        match self {
            Flag::X => "reader-x-then-y",
            Flag::Y => "reader-y-then-x",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreBufferRun {
    pub ordering: StoreBufferOrdering,
    /// Per trial: the reader waiting on `x` found `y` still unset.
    pub x_then_y: Vec<bool>,
    /// Per trial: the reader waiting on `y` found `x` still unset.
    pub y_then_x: Vec<bool>,
}

impl StoreBufferRun {
    /// Trials where the two readers disagree on which write came first. No
    /// single interleaving of the two writes explains such a trial.
    pub fn inconsistent_slots(&self) -> usize {
        self.x_then_y
            .iter()
            .zip(&self.y_then_x)
            .filter(|&(&xy, &yx)| xy && yx)
            .count()
    }

    pub fn is_consistent(&self) -> bool {
        self.inconsistent_slots() == 0
    }
}

/// Two joined writers set `x[i]` and `y[i]` for every trial, while two
/// detached readers wait for one flag and then check the other.
pub fn run_store_buffer_race(
    ordering: StoreBufferOrdering,
    config: &StoreBufferConfig,
) -> Result<StoreBufferRun> {
    config.validate()?;
    info!("store buffer race ({ordering:?}): {} trials", config.slots);

    let pair = Arc::new(DualFlagPair::new(config.slots));

    let mut receivers = Vec::with_capacity(2);
    for flag in [Flag::X, Flag::Y] {
        let (sender, receiver) = oneshot::channel();
        let pair = Arc::clone(&pair);
        let spin_limit = config.spin_limit;
        spawn(flag.reader(), move || {
            sender.send(read_flags(&pair, flag, ordering, spin_limit));
        })?;
        receivers.push((flag, receiver));
    }

    let mut writers = Vec::with_capacity(2);
    for flag in [Flag::X, Flag::Y] {
        let pair = Arc::clone(&pair);
        let writer = spawn(flag.writer(), move || write_flags(&pair, flag, ordering))?;
        writers.push((flag, writer));
    }
    for (flag, writer) in writers {
        writer
            .join()
            .map_err(|_| ExperimentError::WorkerLost { role: flag.writer() })?;
    }

    let mut orders = Vec::with_capacity(2);
    for (flag, receiver) in receivers {
        orders.push(
            receiver
                .receive()
                .map_err(|_| ExperimentError::WorkerLost { role: flag.reader() })??,
        );
    }
    let y_then_x = orders.pop().unwrap_or_default();
    let x_then_y = orders.pop().unwrap_or_default();

    let run = StoreBufferRun {
        ordering,
        x_then_y,
        y_then_x,
    };
    match run.inconsistent_slots() {
        0 => info!("store buffer race ({ordering:?}): consistent"),
        n => warn!("store buffer race ({ordering:?}): {n} inconsistent trials"),
    }
    Ok(run)
}

fn write_flags(pair: &DualFlagPair, flag: Flag, ordering: StoreBufferOrdering) {
    let (own, _) = pair.flags(flag);
    for slot in own {
        slot.store(1, ordering.store_ordering());
    }
    debug!("{} set {} flags", flag.writer(), own.len());
}

fn read_flags(
    pair: &DualFlagPair,
    flag: Flag,
    ordering: StoreBufferOrdering,
    spin_limit: Option<u64>,
) -> Result<Vec<bool>> {
    let (own, other) = pair.flags(flag);
    let mut spin = Spin::new(flag.reader(), spin_limit);
    let mut orders = Vec::with_capacity(own.len());
    for (mine, theirs) in own.iter().zip(other) {
        let mut seen = mine.load(ordering.load_ordering());
        while seen == 0 {
            spin.again()?;
            seen = mine.load(ordering.load_ordering());
        }
        spin.progressed();
        let other_seen = theirs.load(ordering.load_ordering());
        orders.push(seen > other_seen);
    }
    Ok(orders)
}

#[test]
fn sequential_consistency_is_always_consistent() {
    let config = StoreBufferConfig::default().with_slots(100_000);
    for _ in 0..3 {
        let run = run_store_buffer_race(StoreBufferOrdering::SeqCst, &config).unwrap();
        assert_eq!(run.x_then_y.len(), 100_000);
        assert_eq!(run.y_then_x.len(), 100_000);
        assert!(run.is_consistent());
    }
}

#[test]
fn release_acquire_run_completes() {
    let config = StoreBufferConfig::default().with_slots(50_000);
    let run = run_store_buffer_race(StoreBufferOrdering::ReleaseAcquire, &config).unwrap();
    assert_eq!(run.x_then_y.len(), 50_000);
    assert!(run.inconsistent_slots() <= 50_000);
}

#[test]
fn detects_readers_that_disagree() {
    let run = StoreBufferRun {
        ordering: StoreBufferOrdering::ReleaseAcquire,
        x_then_y: vec![true, false, true, true],
        y_then_x: vec![false, false, true, true],
    };
    assert_eq!(run.inconsistent_slots(), 2);
    assert!(!run.is_consistent());
}

#[test]
fn reader_without_a_writer_hits_the_spin_limit() {
    let pair = DualFlagPair::new(1);
    assert!(matches!(
        read_flags(&pair, Flag::X, StoreBufferOrdering::SeqCst, Some(1_000)),
        Err(ExperimentError::SpinLimit {
            role: "reader-x-then-y",
            spins: 1_000
        })
    ));
}

#[test]
fn readers_that_saw_opposite_orders_are_reported() {
    use std::sync::atomic::Ordering::Relaxed;
    let ordering = StoreBufferOrdering::ReleaseAcquire;

    // x visible to its reader while y still looks unset.
    let pair = DualFlagPair::new(1);
    pair.x[0].store(1, Relaxed);
    let x_then_y = read_flags(&pair, Flag::X, ordering, Some(1_000)).unwrap();
    assert_eq!(x_then_y, [true]);

    // And the other way round for the y reader.
    let pair = DualFlagPair::new(1);
    pair.y[0].store(1, Relaxed);
    let y_then_x = read_flags(&pair, Flag::Y, ordering, Some(1_000)).unwrap();
    assert_eq!(y_then_x, [true]);

    let run = StoreBufferRun {
        ordering,
        x_then_y,
        y_then_x,
    };
    assert_eq!(run.inconsistent_slots(), 1);
}

#[test]
fn reader_that_saw_both_writes_reports_no_order() {
    use std::sync::atomic::Ordering::Relaxed;
    let pair = DualFlagPair::new(1);
    pair.x[0].store(1, Relaxed);
    pair.y[0].store(1, Relaxed);
    assert_eq!(
        read_flags(&pair, Flag::X, StoreBufferOrdering::SeqCst, Some(1_000)).unwrap(),
        [false]
    );
}
