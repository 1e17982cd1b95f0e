//! Linear mapping from a conversion result to a compare value.
//!
//! `compare = floor(sample * period / MAX_SAMPLE)`. The denominator is the
//! full-scale count (4095), never the power of two above it, so a full-scale
//! sample drives the output to exactly 100 % duty and a zero sample to 0 %.
//! The product is formed in `u32`; the largest possible product
//! (`4095 * 65535`) is checked against `u32::MAX` at compile time.

use crate::sample::{MAX_SAMPLE, SampleValue};

const _: () = assert!(
    (MAX_SAMPLE as u64) * (u16::MAX as u64) <= u32::MAX as u64,
    "actuation product must fit the u32 intermediate"
);

/// Maps `sample` to a compare value in `[0, period]`.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub const fn compare_for_sample(sample: SampleValue, period: u16) -> u16 {
    let product = sample.get() as u32 * period as u32;
    let compare = product / MAX_SAMPLE as u32;
    // `sample <= MAX_SAMPLE` so `compare <= period <= u16::MAX`.
    compare as u16
}

/// Duty cycle in hundredths of a percent for a compare/period pair.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub const fn duty_basis_points(compare: u16, period: u16) -> u16 {
    if period == 0 {
        return 0;
    }
    let compare = if compare > period { period } else { compare };
    // `compare <= period`, so the ratio is at most 10_000.
    ((compare as u32 * 10_000) / period as u32) as u16
}
