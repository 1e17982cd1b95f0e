//! Start-up options for the control loop.
//!
//! Everything here is fixed before the pulse generator starts. The only value
//! that changes at runtime is the compare value, which the control loop owns.

use core::fmt;

pub mod parse;

pub use parse::{ParseError, parse_config};

use crate::pulse::{ActionQualifier, PulseConfig};
use crate::sample::{AdcChannel, MAX_CHANNEL, MAX_SAMPLE_WINDOW, MIN_SAMPLE_WINDOW, SampleWindow};
use crate::sampling::conversion_latency;
use crate::trigger::{MAX_TRIGGER_PRESCALE, TriggerConfig};

/// Period of the reference configuration, in timebase ticks.
pub const DEFAULT_PERIOD: u16 = 1_000;

/// Converter reference source.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum ReferenceMode {
    #[default]
    Internal,
    External,
}

impl fmt::Display for ReferenceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceMode::Internal => f.write_str("internal"),
            ReferenceMode::External => f.write_str("external"),
        }
    }
}

/// Converter full-scale voltage.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum ReferenceVoltage {
    V2_5,
    #[default]
    V3_3,
}

impl ReferenceVoltage {
    #[must_use]
    pub const fn millivolts(self) -> u16 {
        match self {
            ReferenceVoltage::V2_5 => 2_500,
            ReferenceVoltage::V3_3 => 3_300,
        }
    }
}

impl fmt::Display for ReferenceVoltage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceVoltage::V2_5 => f.write_str("2.5V"),
            ReferenceVoltage::V3_3 => f.write_str("3.3V"),
        }
    }
}

/// Rejected configuration values.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ConfigError {
    ZeroPeriod,
    WindowOutOfRange(u16),
    ChannelOutOfRange(u8),
    PrescaleOutOfRange(u8),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroPeriod => f.write_str("period must be at least one tick"),
            ConfigError::WindowOutOfRange(ticks) => write!(
                f,
                "sample window {ticks} outside {MIN_SAMPLE_WINDOW}..={MAX_SAMPLE_WINDOW}"
            ),
            ConfigError::ChannelOutOfRange(index) => {
                write!(f, "channel {index} outside 0..={MAX_CHANNEL}")
            }
            ConfigError::PrescaleOutOfRange(events) => {
                write!(f, "trigger prescale {events} outside 1..={MAX_TRIGGER_PRESCALE}")
            }
        }
    }
}

/// Start-up configuration of the loop.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct LoopConfig {
    /// Pulse period in timebase ticks.
    pub period: u16,
    pub sample_window: SampleWindow,
    pub channel: AdcChannel,
    pub reference: ReferenceMode,
    pub reference_voltage: ReferenceVoltage,
    pub trigger: TriggerConfig,
    pub polarity: ActionQualifier,
}

impl LoopConfig {
    /// Checks the fields the type system does not already constrain.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroPeriod`] for a zero period.
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.period == 0 {
            Err(ConfigError::ZeroPeriod)
        } else {
            Ok(())
        }
    }

    /// Initial pulse configuration: configured period, zero duty.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroPeriod`] for a zero period.
    pub const fn pulse(&self) -> Result<PulseConfig, ConfigError> {
        match PulseConfig::new(self.period, 0) {
            Ok(config) => Ok(config),
            Err(_) => Err(ConfigError::ZeroPeriod),
        }
    }

    /// Ticks between two consecutive start-of-conversion pulses.
    #[must_use]
    pub const fn trigger_spacing(&self) -> u32 {
        self.period as u32 * self.trigger.prescale.get() as u32
    }

    /// Ticks from start-of-conversion until the result is available.
    #[must_use]
    pub const fn conversion_latency(&self) -> u16 {
        conversion_latency(self.sample_window)
    }

    /// `true` when every conversion completes before the next trigger can
    /// fire. A configuration without this margin overruns the converter.
    #[must_use]
    pub const fn conversion_fits(&self) -> bool {
        (self.conversion_latency() as u32) < self.trigger_spacing()
    }
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            period: DEFAULT_PERIOD,
            sample_window: SampleWindow::default(),
            channel: AdcChannel::default(),
            reference: ReferenceMode::default(),
            reference_voltage: ReferenceVoltage::default(),
            trigger: TriggerConfig::default(),
            polarity: ActionQualifier::default(),
        }
    }
}

impl fmt::Display for LoopConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "period={} window={} channel={} ref={} vref={} trigger={}/{}",
            self.period,
            self.sample_window.ticks(),
            self.channel,
            self.reference,
            self.reference_voltage,
            self.trigger.source,
            self.trigger.prescale.get(),
        )
    }
}
