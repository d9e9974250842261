//! The memory-ordering disciplines under test.

pub mod counter;
pub mod publish;

pub use counter::{CasCounter, Counter, FetchAddCounter, LoadStoreCounter, RacyCounter};
pub use publish::{PublishOrdering, Signal, StoreBufferOrdering};
