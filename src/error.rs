use std::io;
use std::num::ParseIntError;

use thiserror::Error;

/// Problems with the selected mode or run parameters.
///
/// All of these are raised before the first worker thread is spawned.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not parse {input:?} as a mode number: {source}")]
    Unparsable {
        input: String,
        #[source]
        source: ParseIntError,
    },
    #[error("{family}: there is no mode {index}, pick one of 0..={max}")]
    UnknownMode {
        family: &'static str,
        index: i64,
        max: i64,
    },
    #[error("{family}: mode {index} ({name}) is not implemented")]
    Unimplemented {
        family: &'static str,
        index: i64,
        name: &'static str,
    },
    #[error("{family}: at least one worker thread is required")]
    NoThreads { family: &'static str },
    #[error("{family}: needs at least {required} iterations, got {got}")]
    TooFewIterations {
        family: &'static str,
        required: usize,
        got: usize,
    },
}

#[derive(Debug, Error)]
pub enum ExperimentError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The worker dropped its result sender without sending, i.e. it panicked.
    #[error("the {role} thread exited without reporting a result")]
    WorkerLost { role: &'static str },
    #[error("the {role} thread gave up after spinning {spins} times")]
    SpinLimit { role: &'static str, spins: u64 },
    #[error("failed to spawn the {role} thread")]
    Spawn {
        role: &'static str,
        #[source]
        source: io::Error,
    },
}

pub type Result<T, E = ExperimentError> = std::result::Result<T, E>;
