use std::sync::atomic::Ordering::Relaxed;
use std::sync::atomic::{AtomicU8, AtomicUsize};
use std::sync::Arc;

use log::{debug, info, trace};

use crate::config::PublishConfig;
use crate::error::{ExperimentError, Result};
use crate::oneshot;
use crate::strategy::PublishOrdering;

use super::spin::Spin;
use super::{spawn, Echo};

/// Slots the writer fills in order, plus the position of the newest one.
struct SlotTable {
    // Relaxed atomics rather than plain bytes: a stale read is what we want
    // to observe, undefined behaviour is not.
    slots: Vec<AtomicU8>,
    position: AtomicUsize,
}

impl SlotTable {
    fn new(len: usize) -> Self {
        Self {
            slots: (0..len).map(|_| AtomicU8::new(0)).collect(),
            position: AtomicUsize::new(0),
        }
    }

    fn last(&self) -> usize {
        self.slots.len() - 1
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRun {
    pub ordering: PublishOrdering,
    /// The reader saw a position whose slot was still empty.
    pub saw_stale_read: bool,
    pub stale_reads: u64,
    pub reads: u64,
}

struct ReaderOutcome {
    reads: u64,
    stale_reads: u64,
}

/// One joined writer fills the slots and publishes each position, one
/// detached reader follows the published position and checks the slot it
/// names has been filled.
pub fn run_publish_race(
    ordering: PublishOrdering,
    config: &PublishConfig,
    echo: Echo,
) -> Result<PublishRun> {
    config.validate()?;
    info!(
        "publish race ({ordering:?}): {} publications",
        config.iterations
    );

    let table = Arc::new(SlotTable::new(config.iterations));

    let (sender, receiver) = oneshot::channel();
    {
        let table = Arc::clone(&table);
        let spin_limit = config.spin_limit;
        spawn("reader", move || {
            sender.send(read_slots(&table, ordering, spin_limit, echo));
        })?;
    }
    let writer = {
        let table = Arc::clone(&table);
        spawn("writer", move || write_slots(&table, ordering))?
    };

    writer
        .join()
        .map_err(|_| ExperimentError::WorkerLost { role: "writer" })?;
    let outcome = receiver
        .receive()
        .map_err(|_| ExperimentError::WorkerLost { role: "reader" })??;

    let run = PublishRun {
        ordering,
        saw_stale_read: outcome.stale_reads > 0,
        stale_reads: outcome.stale_reads,
        reads: outcome.reads,
    };
    info!(
        "publish race ({ordering:?}): {} reads, {} stale",
        run.reads, run.stale_reads
    );
    Ok(run)
}

fn write_slots(table: &SlotTable, ordering: PublishOrdering) {
    for (i, slot) in table.slots.iter().enumerate() {
        slot.store(1, Relaxed);
        ordering.publish(&table.position, i);
    }
    debug!("writer published {} positions", table.slots.len());
}

fn read_slots(
    table: &SlotTable,
    ordering: PublishOrdering,
    spin_limit: Option<u64>,
    echo: Echo,
) -> Result<ReaderOutcome> {
    let mut spin = Spin::new("reader", spin_limit);
    let mut outcome = ReaderOutcome {
        reads: 0,
        stale_reads: 0,
    };
    let mut newest = 0;
    loop {
        let position = ordering.consume(&table.position);
        if position == newest {
            spin.again()?;
        } else {
            spin.progressed();
            newest = position;
        }
        // Nothing published yet, or slot 0 which we cannot tell apart from that.
        if position == 0 {
            continue;
        }

        let value = table.slots[position].load(Relaxed);
        echo.line(format_args!("{position}: {value}"));
        outcome.reads += 1;
        if value == 0 {
            trace!("position {position} published before its slot was filled");
            outcome.stale_reads += 1;
        }

        if position >= table.last() {
            return Ok(outcome);
        }
    }
}

#[test]
fn release_acquire_never_reads_an_empty_slot() {
    let config = PublishConfig::default().with_iterations(200_000);
    for ordering in [PublishOrdering::ReleaseAcquire, PublishOrdering::Fenced] {
        let run = run_publish_race(ordering, &config, Echo::Silent).unwrap();
        assert!(!run.saw_stale_read, "{ordering:?} read a stale slot");
        assert_eq!(run.stale_reads, 0);
        assert!(run.reads >= 1);
    }
}

#[test]
fn relaxed_publication_terminates() {
    let config = PublishConfig::default().with_iterations(50_000);
    let run = run_publish_race(PublishOrdering::Relaxed, &config, Echo::Silent).unwrap();
    assert_eq!(run.saw_stale_read, run.stale_reads > 0);
    assert!(run.stale_reads <= run.reads);
}

#[test]
fn single_slot_is_rejected() {
    use crate::error::ConfigError;
    let config = PublishConfig::default().with_iterations(1);
    assert!(matches!(
        run_publish_race(PublishOrdering::Relaxed, &config, Echo::Silent),
        Err(ExperimentError::Config(ConfigError::TooFewIterations { .. }))
    ));
}

#[test]
fn reader_without_a_writer_hits_the_spin_limit() {
    let table = SlotTable::new(4);
    let outcome = read_slots(&table, PublishOrdering::ReleaseAcquire, Some(500), Echo::Silent);
    assert!(matches!(
        outcome,
        Err(ExperimentError::SpinLimit { role: "reader", spins: 500 })
    ));
}

#[test]
fn reader_flags_a_position_published_before_its_slot() {
    let table = SlotTable::new(3);
    table.position.store(2, Relaxed);
    let outcome =
        read_slots(&table, PublishOrdering::Relaxed, Some(1_000), Echo::Silent).unwrap();
    assert_eq!(outcome.reads, 1);
    assert_eq!(outcome.stale_reads, 1);
}

#[test]
fn reader_accepts_a_filled_slot() {
    let table = SlotTable::new(3);
    table.slots[2].store(1, Relaxed);
    table.position.store(2, Relaxed);
    let outcome =
        read_slots(&table, PublishOrdering::Relaxed, Some(1_000), Echo::Silent).unwrap();
    assert_eq!(outcome.reads, 1);
    assert_eq!(outcome.stale_reads, 0);
}
