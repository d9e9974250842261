//! Run parameters for every experiment family.
//!
//! The defaults are the sizes the experiments were designed around: large
//! enough that a race or a reordering has a realistic chance of showing up
//! on a multi-core machine. Tests shrink them with the `with_*` builders.

use crate::error::ConfigError;

pub const COUNTER_THREADS: usize = 4;
pub const COUNTER_ITERATIONS: usize = 25_000_000;
pub const POINTER_ITERATIONS: usize = 1_000_000;
pub const PUBLISH_ITERATIONS: usize = 1_000_000;
pub const STORE_BUFFER_SLOTS: usize = 3_000_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterConfig {
    pub threads: usize,
    /// Increments performed by each thread.
    pub iterations: usize,
    /// Value the shared counter starts at.
    pub initial: u64,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            threads: COUNTER_THREADS,
            iterations: COUNTER_ITERATIONS,
            initial: 0,
        }
    }
}

impl CounterConfig {
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_initial(mut self, initial: u64) -> Self {
        self.initial = initial;
        self
    }

    /// Total number of increments requested across all threads, modulo 2^64.
    pub fn expected_increments(&self) -> u64 {
        (self.threads as u64).wrapping_mul(self.iterations as u64)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.threads == 0 {
            return Err(ConfigError::NoThreads {
                family: "counter race",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointerConfig {
    /// Number of times the writer bumps the record and republishes it.
    pub iterations: usize,
    pub spin_limit: Option<u64>,
}

impl Default for PointerConfig {
    fn default() -> Self {
        Self {
            iterations: POINTER_ITERATIONS,
            spin_limit: None,
        }
    }
}

impl PointerConfig {
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_spin_limit(mut self, spin_limit: u64) -> Self {
        self.spin_limit = Some(spin_limit);
        self
    }

    // The reader stops at `sum >= iterations`, which already holds for zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishConfig {
    /// Number of slots, which is also the number of publications.
    pub iterations: usize,
    pub spin_limit: Option<u64>,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            iterations: PUBLISH_ITERATIONS,
            spin_limit: None,
        }
    }
}

impl PublishConfig {
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_spin_limit(mut self, spin_limit: u64) -> Self {
        self.spin_limit = Some(spin_limit);
        self
    }

    /// The reader ignores position 0 and stops at `iterations - 1`, so with
    /// fewer than two slots it would never see a position it accepts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.iterations < 2 {
            return Err(ConfigError::TooFewIterations {
                family: "publish race",
                required: 2,
                got: self.iterations,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreBufferConfig {
    /// Number of independent trials, one slot in each flag sequence per trial.
    pub slots: usize,
    pub spin_limit: Option<u64>,
}

impl Default for StoreBufferConfig {
    fn default() -> Self {
        Self {
            slots: STORE_BUFFER_SLOTS,
            spin_limit: None,
        }
    }
}

impl StoreBufferConfig {
    pub fn with_slots(mut self, slots: usize) -> Self {
        self.slots = slots;
        self
    }

    pub fn with_spin_limit(mut self, spin_limit: u64) -> Self {
        self.spin_limit = Some(spin_limit);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.slots == 0 {
            return Err(ConfigError::TooFewIterations {
                family: "store buffer race",
                required: 1,
                got: self.slots,
            });
        }
        Ok(())
    }
}

#[test]
fn defaults_match_the_designed_sizes() {
    let counter = CounterConfig::default();
    assert_eq!(counter.threads, 4);
    assert_eq!(counter.expected_increments(), 100_000_000);
    assert!(counter.validate().is_ok());

    assert_eq!(PublishConfig::default().iterations, 1_000_000);
    assert_eq!(StoreBufferConfig::default().slots, 3_000_000);
    assert_eq!(PointerConfig::default().spin_limit, None);
}

#[test]
fn rejects_runs_that_could_never_finish() {
    assert!(matches!(
        CounterConfig::default().with_threads(0).validate(),
        Err(ConfigError::NoThreads { .. })
    ));
    assert!(matches!(
        PublishConfig::default().with_iterations(1).validate(),
        Err(ConfigError::TooFewIterations { required: 2, got: 1, .. })
    ));
    assert!(matches!(
        StoreBufferConfig::default().with_slots(0).validate(),
        Err(ConfigError::TooFewIterations { .. })
    ));
    assert!(PointerConfig::default().with_iterations(0).validate().is_ok());
}
