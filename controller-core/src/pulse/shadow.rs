//! Double-buffered compare register.
//!
//! Writes land in `pending` and only become the comparator's `committed`
//! configuration at the counter-zero boundary, so a duty change written
//! mid-period never produces a truncated or doubled pulse.

use super::{CompareRegister, PulseConfig};

/// Committed configuration plus an optional staged replacement.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ShadowRegister {
    committed: PulseConfig,
    pending: Option<PulseConfig>,
}

impl ShadowRegister {
    /// Creates a register whose comparator starts from `committed`.
    #[must_use]
    pub const fn new(committed: PulseConfig) -> Self {
        Self {
            committed,
            pending: None,
        }
    }

    /// Configuration the comparator is using for the current period.
    #[must_use]
    pub const fn committed(&self) -> PulseConfig {
        self.committed
    }

    /// Configuration staged for the next boundary, if any.
    #[must_use]
    pub const fn pending(&self) -> Option<PulseConfig> {
        self.pending
    }

    /// Stages `compare` for the next boundary. Last write wins.
    ///
    /// The staged period is the committed one; values above it are clamped.
    pub fn submit_pending(&mut self, compare: u16) {
        self.pending = Some(self.committed.with_compare(compare));
    }

    /// Promotes the staged configuration at a counter-zero boundary.
    ///
    /// Returns the newly committed configuration, or `None` when nothing was
    /// staged and the committed configuration is unchanged.
    pub fn commit_on_zero(&mut self) -> Option<PulseConfig> {
        let next = self.pending.take()?;
        self.committed = next;
        Some(next)
    }
}

impl CompareRegister for ShadowRegister {
    fn period(&self) -> u16 {
        self.committed.period()
    }

    fn submit_pending(&mut self, compare: u16) {
        ShadowRegister::submit_pending(self, compare);
    }
}
