//! Contract for the single-shot, externally triggered converter.

use core::fmt;

use crate::sample::{AdcChannel, SampleValue, SampleWindow};

/// Successive-approximation time of one 12-bit conversion, in converter clock
/// ticks, excluding the acquisition window.
pub const CONVERSION_TICKS: u16 = 13;

/// Ticks from start-of-conversion until the result is available.
#[must_use]
pub const fn conversion_latency(window: SampleWindow) -> u16 {
    window.ticks() + CONVERSION_TICKS
}

/// Failures reported by a [`SamplingUnit`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SamplingError {
    /// A start arrived while the previous conversion was still in flight or its
    /// completion had not been acknowledged.
    Overrun,
}

impl fmt::Display for SamplingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SamplingError::Overrun => {
                f.write_str("conversion started before previous completion was acknowledged")
            }
        }
    }
}

/// Single-shot converter with a completion interrupt flag.
///
/// One `start_conversion` yields exactly one completion. A new start is only
/// valid once the previous completion was read and its interrupt flag cleared;
/// anything else is [`SamplingError::Overrun`].
pub trait SamplingUnit {
    /// Begins one conversion on `channel`.
    fn start_conversion(&mut self, channel: AdcChannel) -> Result<(), SamplingError>;

    /// Returns `true` once the result register holds a fresh conversion.
    fn conversion_complete(&self) -> bool;

    /// Reads the result register. Reading acknowledges the converter.
    fn read_result(&mut self) -> SampleValue;

    /// Clears the completion interrupt flag so the next conversion can raise it.
    fn clear_interrupt(&mut self);
}

/// Anything that yields conversion results on demand.
///
/// Implemented by components that sit beside the control loop (for example
/// the temperature sensor) and are polled rather than wired into the interrupt
/// graph.
pub trait SampleProducer {
    /// Returns a fresh sample if one completed since the previous call.
    fn poll_sample(&mut self) -> Option<SampleValue>;
}
