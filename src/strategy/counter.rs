use std::cell::UnsafeCell;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering::Relaxed;

/// A shared integer that several threads increment at once.
///
/// Implementations differ only in how the read-modify-write is carried out,
/// and therefore in whether concurrent increments can get lost. All of them
/// wrap around at `u64::MAX`, like `fetch_add` does.
pub trait Counter: Send + Sync {
    const NAME: &'static str;

    fn new(initial: u64) -> Self;

    fn increment(&self);

    fn value(&self) -> u64;
}

/// Plain load, plain store, no synchronization at all.
///
/// This is a data race on purpose: it is the hazard the experiment shows.
/// Volatile accesses keep the compiler from collapsing the whole loop into a
/// single `+= n`, which would hide the lost updates.
pub struct RacyCounter {
    value: UnsafeCell<u64>,
}

// Not actually safe to share. The experiment needs it to be.
unsafe impl Sync for RacyCounter {}

impl Counter for RacyCounter {
    const NAME: &'static str = "w/o atomics";

    fn new(initial: u64) -> Self {
        Self {
            value: UnsafeCell::new(initial),
        }
    }

    fn increment(&self) {
        let current = unsafe { self.value.get().read_volatile() };
        unsafe { self.value.get().write_volatile(current.wrapping_add(1)) };
    }

    fn value(&self) -> u64 {
        unsafe { self.value.get().read_volatile() }
    }
}

/// Atomic load followed by an atomic store.
///
/// Each access is atomic, but another thread can store between our load and
/// our store, and that store is then overwritten.
pub struct LoadStoreCounter {
    value: AtomicU64,
}

impl Counter for LoadStoreCounter {
    const NAME: &'static str = "atomic load/store";

    fn new(initial: u64) -> Self {
        Self {
            value: AtomicU64::new(initial),
        }
    }

    fn increment(&self) {
        let current = self.value.load(Relaxed);
        self.value.store(current.wrapping_add(1), Relaxed);
    }

    fn value(&self) -> u64 {
        self.value.load(Relaxed)
    }
}

/// Compare-and-exchange retry loop.
pub struct CasCounter {
    value: AtomicU64,
}

impl Counter for CasCounter {
    const NAME: &'static str = "compare-and-swap";

    fn new(initial: u64) -> Self {
        Self {
            value: AtomicU64::new(initial),
        }
    }

    fn increment(&self) {
        let mut current = self.value.load(Relaxed);
        // The _weak version may fail spuriously, which the loop absorbs.
        // On failure we retry with the value that beat us.
        while let Err(observed) =
            self.value
                .compare_exchange_weak(current, current.wrapping_add(1), Relaxed, Relaxed)
        {
            current = observed;
        }
    }

    fn value(&self) -> u64 {
        self.value.load(Relaxed)
    }
}

/// A single atomic fetch-and-add.
pub struct FetchAddCounter {
    value: AtomicU64,
}

impl Counter for FetchAddCounter {
    const NAME: &'static str = "fetch-add";

    fn new(initial: u64) -> Self {
        Self {
            value: AtomicU64::new(initial),
        }
    }

    fn increment(&self) {
        // Relaxed is enough: only the total modification order of this one
        // variable matters, no other memory is published through it.
        self.value.fetch_add(1, Relaxed);
    }

    fn value(&self) -> u64 {
        self.value.load(Relaxed)
    }
}

#[test]
fn single_thread_increments_are_never_lost() {
    fn bump<C: Counter>() -> u64 {
        let c = C::new(10);
        for _ in 0..1000 {
            c.increment();
        }
        c.value()
    }

    assert_eq!(bump::<RacyCounter>(), 1010);
    assert_eq!(bump::<LoadStoreCounter>(), 1010);
    assert_eq!(bump::<CasCounter>(), 1010);
    assert_eq!(bump::<FetchAddCounter>(), 1010);
}

#[test]
fn cas_loop_does_not_lose_updates_under_contention() {
    use std::thread;
    let c = CasCounter::new(0);
    thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                for _ in 0..50_000 {
                    c.increment();
                }
            });
        }
    });
    assert_eq!(c.value(), 200_000);
}

#[test]
fn every_variant_wraps_at_the_top() {
    fn bump<C: Counter>() -> u64 {
        let c = C::new(u64::MAX - 1);
        for _ in 0..3 {
            c.increment();
        }
        c.value()
    }

    assert_eq!(bump::<RacyCounter>(), 1);
    assert_eq!(bump::<LoadStoreCounter>(), 1);
    assert_eq!(bump::<CasCounter>(), 1);
    assert_eq!(bump::<FetchAddCounter>(), 1);
}
