//! Spawns the worker threads of each experiment and collects what they saw.

use std::fmt;
use std::io;
use std::thread::{self, JoinHandle};

use crate::error::{ExperimentError, Result};

pub mod counter_race;
pub mod pointer_publish;
pub mod publish_race;
mod spin;
pub mod store_buffer;

pub use counter_race::{run_counter_race, CounterRun, Snapshot};
pub use pointer_publish::{run_pointer_publish, PointerRun, PublishedPointer, Record};
pub use publish_race::{run_publish_race, PublishRun};
pub use store_buffer::{run_store_buffer_race, StoreBufferRun};

/// Where readers print every value they observe.
///
/// This is the experiment's visible output, separate from logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Echo {
    #[default]
    Silent,
    Stdout,
}

impl Echo {
    pub fn line(self, args: fmt::Arguments<'_>) {
        if self == Echo::Stdout {
            println!("{args}");
        }
    }
}

/// Spawns a named OS thread.
pub(crate) fn spawn<F, T>(role: &'static str, f: F) -> Result<JoinHandle<T>>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    thread::Builder::new()
        .name(role.to_owned())
        .spawn(f)
        .map_err(|source| spawn_failed(role, source))
}

pub(crate) fn spawn_failed(role: &'static str, source: io::Error) -> ExperimentError {
    ExperimentError::Spawn { role, source }
}
