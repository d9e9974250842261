use std::marker::PhantomData;
use std::sync::atomic::Ordering::Relaxed;
use std::sync::atomic::{AtomicPtr, AtomicUsize};
use std::thread;

use log::{debug, info};

use crate::config::PointerConfig;
use crate::error::{ExperimentError, Result};
use crate::strategy::PublishOrdering;

use super::spin::Spin;
use super::{spawn_failed, Echo};

/// The record published through the pointer.
///
/// `sum` is only ever written by the writer thread. It is a relaxed atomic so
/// the reader's concurrent read is not itself a data race; all ordering under
/// test comes from how the pointer is loaded and stored.
#[derive(Debug, Default)]
pub struct Record {
    pub sum: AtomicUsize,
}

/// Owns one heap allocation and shares it through an atomic pointer.
///
/// The pointer always refers to the allocation made in [`PublishedPointer::new`];
/// "publishing" stores that same pointer again with the chosen ordering. The
/// allocation is freed on drop, and `&self` borrows keep every reader alive
/// strictly inside that lifetime.
pub struct PublishedPointer<T> {
    ptr: AtomicPtr<T>,
    // Send/Sync follow T, like for Box<T>.
    _owns: PhantomData<Box<T>>,
}

impl<T> PublishedPointer<T> {
    pub fn new(value: T) -> Self {
        Self {
            ptr: AtomicPtr::new(Box::into_raw(Box::new(value))),
            _owns: PhantomData,
        }
    }

    /// Consume the pointer, mutate through it, publish it again.
    pub fn update<R>(&self, ordering: PublishOrdering, f: impl FnOnce(&T) -> R) -> R {
        let target = ordering.consume(&self.ptr);
        // Safety: the pointer is the live allocation owned by `self`.
        let out = f(unsafe { &*target });
        ordering.publish(&self.ptr, target);
        out
    }

    /// Consume the pointer and read through it.
    pub fn read<R>(&self, ordering: PublishOrdering, f: impl FnOnce(&T) -> R) -> R {
        let target = ordering.consume(&self.ptr);
        // Safety: as in `update`.
        f(unsafe { &*target })
    }
}

impl<T> Drop for PublishedPointer<T> {
    fn drop(&mut self) {
        // Exclusive access: no thread can still be reading through the pointer.
        drop(unsafe { Box::from_raw(*self.ptr.get_mut()) });
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointerRun {
    pub ordering: PublishOrdering,
    /// Number of times the reader dereferenced the pointer.
    pub reads: u64,
    /// The sum the reader saw when it stopped.
    pub last_sum: usize,
    /// The sum after both threads were joined.
    pub final_sum: usize,
}

/// A writer bumps `sum` through the published pointer `config.iterations`
/// times while a reader keeps reading through it until it sees the final sum.
///
/// Both threads are scoped, so the record can only be freed once both of them
/// are done with it.
pub fn run_pointer_publish(
    ordering: PublishOrdering,
    config: &PointerConfig,
    echo: Echo,
) -> Result<PointerRun> {
    config.validate()?;
    info!(
        "pointer publish ({ordering:?}): {} updates",
        config.iterations
    );

    let pointer = PublishedPointer::new(Record::default());
    let iterations = config.iterations;
    let spin_limit = config.spin_limit;

    let (reads, last_sum) = thread::scope(|s| {
        // The writer goes first: a reader whose writer failed to spawn would
        // never stop, and the scope joins it before returning the error.
        let writer = thread::Builder::new()
            .name("writer".to_owned())
            .spawn_scoped(s, || write_sum(&pointer, ordering, iterations))
            .map_err(|source| spawn_failed("writer", source))?;
        let reader = thread::Builder::new()
            .name("reader".to_owned())
            .spawn_scoped(s, || read_sum(&pointer, ordering, iterations, spin_limit, echo))
            .map_err(|source| spawn_failed("reader", source))?;

        writer
            .join()
            .map_err(|_| ExperimentError::WorkerLost { role: "writer" })?;
        reader
            .join()
            .map_err(|_| ExperimentError::WorkerLost { role: "reader" })?
    })?;

    let final_sum = pointer.read(PublishOrdering::Relaxed, |r| r.sum.load(Relaxed));
    drop(pointer);

    let run = PointerRun {
        ordering,
        reads,
        last_sum,
        final_sum,
    };
    info!(
        "pointer publish ({ordering:?}): reader stopped at {} after {} reads",
        run.last_sum, run.reads
    );
    Ok(run)
}

fn write_sum(pointer: &PublishedPointer<Record>, ordering: PublishOrdering, iterations: usize) {
    for _ in 0..iterations {
        pointer.update(ordering, |record| {
            // Single writer, so load + store does not lose updates here.
            let sum = record.sum.load(Relaxed);
            record.sum.store(sum + 1, Relaxed);
        });
    }
    debug!("writer finished {iterations} updates");
}

fn read_sum(
    pointer: &PublishedPointer<Record>,
    ordering: PublishOrdering,
    iterations: usize,
    spin_limit: Option<u64>,
    echo: Echo,
) -> Result<(u64, usize)> {
    let mut spin = Spin::new("reader", spin_limit);
    let mut reads = 0;
    let mut previous = None;
    loop {
        let sum = pointer.read(ordering, |record| record.sum.load(Relaxed));
        reads += 1;
        echo.line(format_args!("sum: {sum}"));
        if sum >= iterations {
            return Ok((reads, sum));
        }
        if previous == Some(sum) {
            spin.again()?;
        } else {
            spin.progressed();
            previous = Some(sum);
        }
    }
}

#[test]
fn reader_follows_the_writer_to_the_end() {
    for ordering in [PublishOrdering::Relaxed, PublishOrdering::ReleaseAcquire] {
        let config = PointerConfig::default().with_iterations(100_000);
        let run = run_pointer_publish(ordering, &config, Echo::Silent).unwrap();
        assert_eq!(run.last_sum, 100_000);
        assert_eq!(run.final_sum, 100_000);
        assert!(run.reads >= 1);
    }
}

#[test]
fn writer_finishes_without_a_reader() {
    let pointer = PublishedPointer::new(Record::default());
    thread::scope(|s| {
        s.spawn(|| write_sum(&pointer, PublishOrdering::ReleaseAcquire, 10_000));
    });
    assert_eq!(pointer.read(PublishOrdering::Relaxed, |r| r.sum.load(Relaxed)), 10_000);
}

#[test]
fn zero_updates_finish_immediately() {
    let config = PointerConfig::default().with_iterations(0);
    let run = run_pointer_publish(PublishOrdering::ReleaseAcquire, &config, Echo::Silent).unwrap();
    assert_eq!(run.reads, 1);
    assert_eq!(run.final_sum, 0);
}

#[test]
fn record_is_freed_with_the_pointer() {
    static NUM_DROPS: AtomicUsize = AtomicUsize::new(0);

    struct DetectDrop;

    impl Drop for DetectDrop {
        fn drop(&mut self) {
            NUM_DROPS.fetch_add(1, Relaxed);
        }
    }

    let pointer = PublishedPointer::new(DetectDrop);
    thread::scope(|s| {
        s.spawn(|| pointer.read(PublishOrdering::ReleaseAcquire, |_| ()));
    });
    assert_eq!(NUM_DROPS.load(Relaxed), 0);
    drop(pointer);
    assert_eq!(NUM_DROPS.load(Relaxed), 1);
}
