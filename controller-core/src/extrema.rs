//! Running minimum / maximum of every observed sample.

use crate::sample::SampleValue;

/// Extrema of the samples seen so far.
///
/// Starts from worst-case sentinels (`minimum = MAX_SAMPLE`, `maximum = 0`) so the
/// first observation establishes both bounds. Until then `minimum > maximum`,
/// which [`ExtremaState::range`] uses to report that nothing was observed.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ExtremaState {
    minimum: SampleValue,
    maximum: SampleValue,
}

impl ExtremaState {
    /// Creates the sentinel state.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            minimum: SampleValue::FULL_SCALE,
            maximum: SampleValue::ZERO,
        }
    }

    /// Folds one sample into the extrema.
    pub fn observe(&mut self, sample: SampleValue) {
        if sample < self.minimum {
            self.minimum = sample;
        }
        if sample > self.maximum {
            self.maximum = sample;
        }
    }

    #[must_use]
    pub const fn minimum(&self) -> SampleValue {
        self.minimum
    }

    #[must_use]
    pub const fn maximum(&self) -> SampleValue {
        self.maximum
    }

    /// Returns `(minimum, maximum)` once at least one sample was observed.
    #[must_use]
    pub fn range(&self) -> Option<(SampleValue, SampleValue)> {
        if self.minimum <= self.maximum {
            Some((self.minimum, self.maximum))
        } else {
            None
        }
    }

    /// Restores the sentinels.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for ExtremaState {
    fn default() -> Self {
        Self::new()
    }
}
