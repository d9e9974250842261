//! A single-use channel that carries one worker result back to the runner.
//!
//! Workers are detached, so the runner never joins them. Instead it blocks in
//! [`Receiver::receive`] until the worker either sends its result or drops the
//! sender without sending (which only happens when the worker panicked).

use atomic_wait::{wait, wake_one};
use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering::{Acquire, Relaxed, Release};
use std::sync::Arc;

/// Nothing sent yet.
const EMPTY: u32 = 0;
/// `message` holds an initialized value.
const READY: u32 = 1;
/// Sender dropped without sending.
const DISCONNECTED: u32 = 2;
/// The receiver moved the message out.
const TAKEN: u32 = 3;

pub struct Sender<T> {
    slot: Arc<Slot<T>>,
}

pub struct Receiver<T> {
    slot: Arc<Slot<T>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Disconnected;

struct Slot<T> {
    message: UnsafeCell<MaybeUninit<T>>,
    state: AtomicU32,
}

unsafe impl<T> Sync for Slot<T> where T: Send {}

pub fn channel<T>() -> (Sender<T>, Receiver<T>) {
    let slot = Arc::new(Slot {
        message: UnsafeCell::new(MaybeUninit::uninit()),
        state: AtomicU32::new(EMPTY),
    });
    (Sender { slot: slot.clone() }, Receiver { slot })
}

impl<T> Sender<T> {
    // Taking `self` by value means there can only ever be one send.
    pub fn send(self, message: T) {
        unsafe { (*self.slot.message.get()).write(message) };
        // Everything written to the message happens before the receiver's
        // Acquire load that observes READY.
        self.slot.state.store(READY, Release);
        wake_one(&self.slot.state);
    }
}

impl<T> Drop for Sender<T> {
    fn drop(&mut self) {
        // Only the sender moves the state away from EMPTY, so this fails
        // exactly when `send` already ran.
        if self
            .slot
            .state
            .compare_exchange(EMPTY, DISCONNECTED, Release, Relaxed)
            .is_ok()
        {
            wake_one(&self.slot.state);
        }
    }
}

impl<T> Receiver<T> {
    #[cfg(test)]
    fn is_ready(&self) -> bool {
        self.slot.state.load(Relaxed) == READY
    }

    /// Blocks until the sender either sends or goes away.
    pub fn receive(self) -> Result<T, Disconnected> {
        loop {
            match self.slot.state.load(Acquire) {
                READY => {
                    // Safety: READY was observed with Acquire, so the write
                    // in `send` is visible, and we are the only receiver.
                    let message = unsafe { (*self.slot.message.get()).assume_init_read() };
                    self.slot.state.store(TAKEN, Relaxed);
                    return Ok(message);
                }
                DISCONNECTED => return Err(Disconnected),
                // Returns immediately if the state already moved on, and
                // spurious wake-ups just go around the loop again.
                state => wait(&self.slot.state, state),
            }
        }
    }
}

impl<T> Drop for Slot<T> {
    // The last Arc is gone, so nobody else can touch the slot anymore.
    fn drop(&mut self) {
        if *self.state.get_mut() == READY {
            unsafe { self.message.get_mut().assume_init_drop() }
        }
    }
}

#[test]
fn delivers_across_a_detached_thread() {
    use std::thread;
    let (sender, receiver) = channel();
    thread::spawn(move || {
        sender.send((1u64, 2u64));
    });
    assert_eq!(receiver.receive(), Ok((1, 2)));
}

#[test]
fn reports_a_sender_that_never_sent() {
    use std::thread;
    let (sender, receiver) = channel::<u64>();
    let worker = thread::spawn(move || {
        let _sender = sender;
        panic!("worker died");
    });
    assert!(worker.join().is_err());
    assert_eq!(receiver.receive(), Err(Disconnected));
}

#[test]
fn drops_a_message_nobody_received() {
    use std::sync::atomic::AtomicUsize;
    static NUM_DROPS: AtomicUsize = AtomicUsize::new(0);

    struct DetectDrop;

    impl Drop for DetectDrop {
        fn drop(&mut self) {
            NUM_DROPS.fetch_add(1, Relaxed);
        }
    }

    let (sender, receiver) = channel();
    sender.send(DetectDrop);
    assert!(receiver.is_ready());
    assert_eq!(NUM_DROPS.load(Relaxed), 0);
    drop(receiver);
    assert_eq!(NUM_DROPS.load(Relaxed), 1);
}
