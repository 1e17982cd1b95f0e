//! Peripheral adapters that back the `controller-core` collaborator traits.
//!
//! TIM3 channel 1 drives the actuation output with a preloaded compare
//! register, and its trigger output starts ADC1 conversions. The register
//! level adapters only exist on the target; the option mapping below is plain
//! logic and is unit tested on the host.

#![cfg_attr(not(target_os = "none"), allow(dead_code))]

#[cfg(target_os = "none")]
pub mod adc;
#[cfg(target_os = "none")]
pub mod timebase;

use controller_core::config::{ReferenceMode, ReferenceVoltage};
use controller_core::sample::SampleWindow;
use controller_core::trigger::TriggerSource;

/// Timer and converter clock under the default HAL configuration: HSI16
/// with no AHB or APB division.
pub const fn system_clock_frequency() -> u32 {
    16_000_000
}

/// Output frequency of a `period`-tick waveform counted at `clock_hz`.
pub const fn pwm_frequency(clock_hz: u32, period: u16) -> u32 {
    if period == 0 {
        clock_hz
    } else {
        clock_hz / period as u32
    }
}

/// ADC sampling times offered by the converter, in half cycles
/// (1.5, 3.5, 7.5, 12.5, 19.5, 39.5, 79.5 and 160.5 cycles).
const SAMPLE_TIME_HALF_CYCLES: [u16; 8] = [3, 7, 15, 25, 39, 79, 159, 321];

/// Index of the shortest sampling time that covers `window` ticks.
///
/// Windows longer than the longest sampling time saturate at the last entry.
pub fn sample_time_index(window: SampleWindow) -> usize {
    let wanted = window.ticks().saturating_mul(2);
    SAMPLE_TIME_HALF_CYCLES
        .iter()
        .position(|&half_cycles| half_cycles >= wanted)
        .unwrap_or(SAMPLE_TIME_HALF_CYCLES.len() - 1)
}

/// TIM3 master mode selection (`CR2.MMS`) used as the ADC trigger.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TriggerOutput {
    /// Update event, raised when the counter wraps to zero.
    Update,
    /// Compare pulse: fires on every channel 1 match, including a match at zero.
    ComparePulse,
    /// OC4REF in PWM mode 2 with CCR4 at the last tick: rises one tick before the wrap.
    PeriodOc4,
}

impl TriggerOutput {
    pub const fn for_source(source: TriggerSource) -> Self {
        match source {
            TriggerSource::CounterZero => TriggerOutput::Update,
            TriggerSource::CompareUp => TriggerOutput::ComparePulse,
            TriggerSource::CounterPeriod => TriggerOutput::PeriodOc4,
        }
    }

    /// Raw `MMS` field value.
    pub const fn mms(self) -> u32 {
        match self {
            TriggerOutput::Update => 0b010,
            TriggerOutput::ComparePulse => 0b011,
            TriggerOutput::PeriodOc4 => 0b111,
        }
    }
    /// Largest `CCR1` value that still produces a trigger. The compare pulse
    /// needs a match, and the counter never reaches `period`, so a full-scale
    /// compare stops at the last tick.
    pub const fn compare_limit(self, period: u16) -> u16 {
        match self {
            TriggerOutput::ComparePulse => period.saturating_sub(1),
            TriggerOutput::Update | TriggerOutput::PeriodOc4 => period,
        }
    }
}

/// Voltage reference buffer setting derived from the configured reference.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ReferenceBuffer {
    /// Buffer enabled at 2.5 V.
    Internal2V5,
    /// Buffer in high impedance; VREF+ comes from the board (VDDA or an external source).
    HighImpedance,
}

impl ReferenceBuffer {
    /// Maps the configured reference onto the buffer. The buffer cannot output
    /// 3.3 V, so an internal 3.3 V reference falls back to the board supply.
    pub const fn for_config(mode: ReferenceMode, voltage: ReferenceVoltage) -> Self {
        match (mode, voltage) {
            (ReferenceMode::Internal, ReferenceVoltage::V2_5) => ReferenceBuffer::Internal2V5,
            _ => ReferenceBuffer::HighImpedance,
        }
    }
}
