use std::sync::atomic::Ordering::{self, Acquire, Relaxed, Release, SeqCst};
use std::sync::atomic::{fence, AtomicPtr, AtomicUsize};

/// Something a writer can publish and a reader can poll: a position marker or
/// a pointer to the record being shared.
pub trait Signal {
    type Value: Copy;

    fn load_with(&self, order: Ordering) -> Self::Value;

    fn store_with(&self, value: Self::Value, order: Ordering);
}

impl Signal for AtomicUsize {
    type Value = usize;

    fn load_with(&self, order: Ordering) -> usize {
        AtomicUsize::load(self, order)
    }

    fn store_with(&self, value: usize, order: Ordering) {
        AtomicUsize::store(self, value, order)
    }
}

impl<T> Signal for AtomicPtr<T> {
    type Value = *mut T;

    fn load_with(&self, order: Ordering) -> *mut T {
        AtomicPtr::load(self, order)
    }

    fn store_with(&self, value: *mut T, order: Ordering) {
        AtomicPtr::store(self, value, order)
    }
}

/// How the writer announces that data is ready and how the reader picks the
/// announcement up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOrdering {
    /// Relaxed on both sides. Nothing orders the data with the signal.
    Relaxed,
    /// Release store paired with an Acquire load.
    ReleaseAcquire,
    /// Relaxed accesses with standalone fences around them. Same guarantee as
    /// `ReleaseAcquire`, expressed with fences.
    Fenced,
}

impl PublishOrdering {
    pub fn store_ordering(self) -> Ordering {
        match self {
            PublishOrdering::ReleaseAcquire => Release,
            PublishOrdering::Relaxed | PublishOrdering::Fenced => Relaxed,
        }
    }

    pub fn load_ordering(self) -> Ordering {
        match self {
            PublishOrdering::ReleaseAcquire => Acquire,
            PublishOrdering::Relaxed | PublishOrdering::Fenced => Relaxed,
        }
    }

    /// Call after the data write.
    pub fn publish<S: Signal>(self, signal: &S, value: S::Value) {
        if self == PublishOrdering::Fenced {
            // Everything before the fence happens before whatever an Acquire
            // (fence) observes from the store below.
            fence(Release);
        }
        signal.store_with(value, self.store_ordering());
    }

    /// Call before the data read.
    pub fn consume<S: Signal>(self, signal: &S) -> S::Value {
        let value = signal.load_with(self.load_ordering());
        if self == PublishOrdering::Fenced {
            fence(Acquire);
        }
        value
    }
}

/// Orderings for the two flag writers and two readers of the store buffer race.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBufferOrdering {
    /// Release stores, Acquire loads. Two readers may disagree about which
    /// of two independent writes happened first.
    ReleaseAcquire,
    /// SeqCst everywhere: a single total order all threads agree on.
    SeqCst,
}

impl StoreBufferOrdering {
    pub fn store_ordering(self) -> Ordering {
        match self {
            StoreBufferOrdering::ReleaseAcquire => Release,
            StoreBufferOrdering::SeqCst => SeqCst,
        }
    }

    pub fn load_ordering(self) -> Ordering {
        match self {
            StoreBufferOrdering::ReleaseAcquire => Acquire,
            StoreBufferOrdering::SeqCst => SeqCst,
        }
    }
}

#[test]
fn orderings_pair_up() {
    assert_eq!(PublishOrdering::Relaxed.store_ordering(), Relaxed);
    assert_eq!(PublishOrdering::ReleaseAcquire.store_ordering(), Release);
    assert_eq!(PublishOrdering::ReleaseAcquire.load_ordering(), Acquire);
    assert_eq!(PublishOrdering::Fenced.load_ordering(), Relaxed);
    assert_eq!(StoreBufferOrdering::SeqCst.load_ordering(), SeqCst);
}

#[test]
fn release_acquire_publication_makes_the_data_visible() {
    use std::thread;
    let data = AtomicUsize::new(0);
    let ready = AtomicUsize::new(0);
    for ordering in [PublishOrdering::ReleaseAcquire, PublishOrdering::Fenced] {
        data.store(0, Relaxed);
        ready.store(0, Relaxed);
        thread::scope(|s| {
            s.spawn(|| {
                data.store(123, Relaxed);
                ordering.publish(&ready, 1);
            });
            while ordering.consume(&ready) == 0 {
                std::hint::spin_loop();
            }
            assert_eq!(data.load(Relaxed), 123);
        });
    }
}

#[test]
fn pointers_are_signals_too() {
    let mut record = 7u32;
    let ptr = AtomicPtr::new(std::ptr::null_mut());
    PublishOrdering::ReleaseAcquire.publish(&ptr, &mut record as *mut u32);
    let seen = PublishOrdering::ReleaseAcquire.consume(&ptr);
    assert_eq!(unsafe { *seen }, 7);
}
