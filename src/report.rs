use std::fmt;

use crate::runner::{CounterRun, PointerRun, PublishRun, StoreBufferRun};

/// The outcome of any experiment, ready to be printed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
    Counter(CounterRun),
    Pointer(PointerRun),
    Publish(PublishRun),
    StoreBuffer(StoreBufferRun),
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Report::Counter(run) => fmt::Display::fmt(run, f),
            Report::Pointer(run) => fmt::Display::fmt(run, f),
            Report::Publish(run) => fmt::Display::fmt(run, f),
            Report::StoreBuffer(run) => fmt::Display::fmt(run, f),
        }
    }
}

impl fmt::Display for CounterRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, snapshot) in self.snapshots.iter().enumerate() {
            writeln!(f, "Thread {i}:")?;
            writeln!(f, "  initial val: {}", snapshot.initial)?;
            writeln!(f, "  end val: {}", snapshot.end)?;
            if let Some(cpu) = snapshot.cpu {
                writeln!(f, "  cpu: {cpu}")?;
            }
        }
        writeln!(f)?;
        writeln!(f, "Total: {}", self.total)?;
        if self.lost_updates() > 0 {
            writeln!(f, "Lost updates: {}", self.lost_updates())?;
        }
        Ok(())
    }
}

impl fmt::Display for PointerRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "The reader thread stopped at sum {} after {} reads.",
            self.last_sum, self.reads
        )?;
        writeln!(f, "Final sum: {}", self.final_sum)
    }
}

impl fmt::Display for PublishRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.saw_stale_read {
            writeln!(
                f,
                "The reader thread loaded zero. ({} of {} reads)",
                self.stale_reads, self.reads
            )
        } else {
            writeln!(f, "The reader thread loaded only one.")
        }
    }
}

impl fmt::Display for StoreBufferRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inconsistent_slots() {
            0 => writeln!(f, "The reader threads loaded only consistent data."),
            n => writeln!(
                f,
                "The reader threads loaded inconsistent data. ({n} of {} trials)",
                self.x_then_y.len()
            ),
        }
    }
}

#[test]
fn counter_report_lists_every_thread() {
    use crate::runner::Snapshot;
    let run = CounterRun {
        strategy: "fetch-add",
        snapshots: vec![
            Snapshot {
                initial: 0,
                end: 7,
                cpu: Some(2),
            },
            Snapshot {
                initial: 3,
                end: 10,
                cpu: None,
            },
        ],
        total: 10,
        expected: 10,
    };
    assert_eq!(
        run.to_string(),
        "Thread 0:\n  initial val: 0\n  end val: 7\n  cpu: 2\n\
         Thread 1:\n  initial val: 3\n  end val: 10\n\nTotal: 10\n"
    );
}

#[test]
fn counter_report_mentions_lost_updates() {
    let run = CounterRun {
        strategy: "w/o atomics",
        snapshots: Vec::new(),
        total: 6,
        expected: 10,
    };
    assert!(Report::Counter(run).to_string().ends_with("Total: 6\nLost updates: 4\n"));
}

#[test]
fn verdicts() {
    use crate::strategy::{PublishOrdering, StoreBufferOrdering};
    let clean = PublishRun {
        ordering: PublishOrdering::ReleaseAcquire,
        saw_stale_read: false,
        stale_reads: 0,
        reads: 12,
    };
    assert_eq!(clean.to_string(), "The reader thread loaded only one.\n");

    let stale = PublishRun {
        ordering: PublishOrdering::Relaxed,
        saw_stale_read: true,
        stale_reads: 2,
        reads: 12,
    };
    assert_eq!(
        stale.to_string(),
        "The reader thread loaded zero. (2 of 12 reads)\n"
    );

    let consistent = StoreBufferRun {
        ordering: StoreBufferOrdering::SeqCst,
        x_then_y: vec![true, false],
        y_then_x: vec![false, true],
    };
    assert_eq!(
        consistent.to_string(),
        "The reader threads loaded only consistent data.\n"
    );

    let inconsistent = StoreBufferRun {
        ordering: StoreBufferOrdering::ReleaseAcquire,
        x_then_y: vec![true, true],
        y_then_x: vec![false, true],
    };
    assert_eq!(
        inconsistent.to_string(),
        "The reader threads loaded inconsistent data. (1 of 2 trials)\n"
    );
}
