use log::trace;

use crate::error::{ExperimentError, Result};

/// Counts busy-wait iterations that made no progress.
///
/// With no limit this never fails, so a reader waiting for a value that never
/// shows up spins forever. A limit turns that into [`ExperimentError::SpinLimit`].
pub(crate) struct Spin {
    role: &'static str,
    limit: Option<u64>,
    spins: u64,
}

impl Spin {
    pub(crate) fn new(role: &'static str, limit: Option<u64>) -> Self {
        Self {
            role,
            limit,
            spins: 0,
        }
    }

    /// Record one more fruitless poll.
    pub(crate) fn again(&mut self) -> Result<()> {
        self.spins += 1;
        match self.limit {
            Some(limit) if self.spins > limit => {
                trace!("{} gives up after {} spins", self.role, limit);
                Err(ExperimentError::SpinLimit {
                    role: self.role,
                    spins: limit,
                })
            }
            // No spin_loop hint: the tighter the poll, the better the chance
            // of catching a reordering.
            _ => Ok(()),
        }
    }

    /// The awaited value moved, start counting from scratch.
    pub(crate) fn progressed(&mut self) {
        self.spins = 0;
    }
}

#[test]
fn unlimited_spin_never_gives_up() {
    let mut spin = Spin::new("reader", None);
    for _ in 0..100_000 {
        assert!(spin.again().is_ok());
    }
}

#[test]
fn limited_spin_gives_up_unless_progress_is_made() {
    let mut spin = Spin::new("reader", Some(3));
    for _ in 0..3 {
        assert!(spin.again().is_ok());
    }
    spin.progressed();
    for _ in 0..3 {
        assert!(spin.again().is_ok());
    }
    assert!(matches!(
        spin.again(),
        Err(ExperimentError::SpinLimit {
            role: "reader",
            spins: 3
        })
    ));
}
