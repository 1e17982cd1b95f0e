//! Sample domain shared by the converter, the control loop and the observers.
//!
//! Conversions produce unsigned 12-bit values. [`SampleValue`] keeps that range
//! as a type invariant so every consumer downstream (actuation mapping, extrema
//! tracking, temperature conversion) can rely on `value <= MAX_SAMPLE` without
//! re-checking it.

use core::fmt;

/// Converter resolution in bits.
pub const SAMPLE_BITS: u32 = 12;

/// Largest value a conversion can produce (full scale).
pub const MAX_SAMPLE: u16 = (1 << SAMPLE_BITS) - 1;

const SAMPLE_MASK: u16 = MAX_SAMPLE;

/// One conversion result in `[0, MAX_SAMPLE]`.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct SampleValue(u16);

impl SampleValue {
    /// Zero-scale sample.
    pub const ZERO: Self = Self(0);
    /// Full-scale sample.
    pub const FULL_SCALE: Self = Self(MAX_SAMPLE);

    /// Creates a sample, rejecting values above [`MAX_SAMPLE`].
    #[must_use]
    pub const fn new(raw: u16) -> Option<Self> {
        if raw > MAX_SAMPLE {
            None
        } else {
            Some(Self(raw))
        }
    }

    /// Creates a sample, clamping values above [`MAX_SAMPLE`] to full scale.
    #[must_use]
    pub const fn saturating(raw: u16) -> Self {
        if raw > MAX_SAMPLE {
            Self::FULL_SCALE
        } else {
            Self(raw)
        }
    }

    /// Interprets a right-aligned result register, discarding bits above the
    /// converter resolution.
    #[must_use]
    pub const fn from_register(raw: u16) -> Self {
        Self(raw & SAMPLE_MASK)
    }

    /// Returns the raw count.
    #[must_use]
    pub const fn get(self) -> u16 {
        self.0
    }

    /// Converts the sample to millivolts against the given full-scale reference.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn to_millivolts(self, full_scale_mv: u16) -> u16 {
        let scaled = (self.0 as u32 * full_scale_mv as u32) / MAX_SAMPLE as u32;
        // `scaled <= full_scale_mv` because `self.0 <= MAX_SAMPLE`.
        scaled as u16
    }
}

impl fmt::Display for SampleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<SampleValue> for u16 {
    fn from(value: SampleValue) -> Self {
        value.0
    }
}

/// Highest analog input selector supported by the converter mux.
pub const MAX_CHANNEL: u8 = 15;

/// Analog input selector.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct AdcChannel(u8);

impl AdcChannel {
    /// Creates a channel selector if `index` is within the mux range.
    #[must_use]
    pub const fn new(index: u8) -> Option<Self> {
        if index > MAX_CHANNEL {
            None
        } else {
            Some(Self(index))
        }
    }

    /// Returns the mux index.
    #[must_use]
    pub const fn index(self) -> u8 {
        self.0
    }
}

impl fmt::Display for AdcChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ADCIN{}", self.0)
    }
}

/// Bounds for the acquisition window, in converter clock ticks.
pub const MIN_SAMPLE_WINDOW: u16 = 1;
pub const MAX_SAMPLE_WINDOW: u16 = 512;

/// Acquisition window length in converter clock ticks.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SampleWindow(u16);

impl SampleWindow {
    /// Creates a window if `ticks` lies in `MIN_SAMPLE_WINDOW..=MAX_SAMPLE_WINDOW`.
    #[must_use]
    pub const fn new(ticks: u16) -> Option<Self> {
        if ticks < MIN_SAMPLE_WINDOW || ticks > MAX_SAMPLE_WINDOW {
            None
        } else {
            Some(Self(ticks))
        }
    }

    /// Returns the window length in ticks.
    #[must_use]
    pub const fn ticks(self) -> u16 {
        self.0
    }
}

impl Default for SampleWindow {
    fn default() -> Self {
        Self(10)
    }
}
