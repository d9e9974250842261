//! # Memory ordering experiments
//!
//! Small multi-threaded experiments that make memory-ordering hazards visible:
//! lost updates on a shared counter, publishing data without release/acquire,
//! and two readers disagreeing about the order of two independent writes.
//!
//! Each experiment family has a binary that offers a menu of modes:
//!
//! - `counter-race`: plain, atomic load/store, compare-and-swap and fetch-add
//!   increments from four threads.
//! - `pointer-publish`: a writer updates a record and republishes its pointer
//!   while a reader follows it.
//! - `publish-race`: a writer fills slots and publishes their position, with
//!   relaxed, release/acquire or fenced orderings.
//! - `store-buffer-race`: two writers, two readers, and a check that the
//!   readers agree on a single order.
//!
//! **Important note:** Run with optimizations turned on, i.e., in the *Release* profile.
//!
//! ```shell
//! cargo run --release --bin counter-race
//! ```
//!
//! Without optimization the races are much harder to hit. Reorderings that
//! x86-64 forbids (it is strongly ordered) may only show up on ARM64.
//!
//! Set `ORDLAB_LOG=debug` to see what the runner is doing.

pub mod cli;
pub mod config;
pub mod cpu;
pub mod error;
pub mod mode;
pub mod oneshot;
pub mod report;
pub mod runner;
pub mod strategy;

pub use config::{CounterConfig, PointerConfig, PublishConfig, StoreBufferConfig};
pub use error::{ConfigError, ExperimentError};
pub use mode::{CounterMode, Mode, PointerMode, PublishMode, StoreBufferMode};
pub use report::Report;
pub use runner::Echo;
