//! Boot-time configuration.
//!
//! The loop configuration is compiled in as a settings line and checked
//! against what this board can actually do before any peripheral is touched.

use core::fmt;

use controller_core::config::{LoopConfig, ParseError, parse_config};

use crate::telemetry;

/// Settings applied at boot.
pub const CONFIG_LINE: &str =
    "period=1000 window=10 channel=0 ref=internal vref=3.3 trigger=zero prescale=1 polarity=high";

/// Reasons a configuration line cannot drive the hardware.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StartupError<'a> {
    Parse(ParseError<'a>),
    /// TIM3 has no repetition counter, so every period must trigger.
    UnsupportedPrescale(u8),
    /// A conversion would still be running when the next trigger fires.
    ConversionTooSlow { latency: u16, spacing: u32 },
}

impl fmt::Display for StartupError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartupError::Parse(error) => error.fmt(f),
            StartupError::UnsupportedPrescale(events) => {
                write!(f, "trigger prescale {events} unsupported, only 1")
            }
            StartupError::ConversionTooSlow { latency, spacing } => write!(
                f,
                "conversion takes {latency} ticks but triggers are {spacing} apart"
            ),
        }
    }
}

impl<'a> From<ParseError<'a>> for StartupError<'a> {
    fn from(error: ParseError<'a>) -> Self {
        StartupError::Parse(error)
    }
}

/// Parses `line` and checks it against the hardware.
pub fn resolve(line: &str) -> Result<LoopConfig, StartupError<'_>> {
    let config = parse_config(line)?;

    let prescale = config.trigger.prescale.get();
    if prescale != 1 {
        return Err(StartupError::UnsupportedPrescale(prescale));
    }
    if !config.conversion_fits() {
        return Err(StartupError::ConversionTooSlow {
            latency: config.conversion_latency(),
            spacing: config.trigger_spacing(),
        });
    }
    Ok(config)
}

/// Resolves `line`, falling back to [`LoopConfig::default`] when it is rejected.
pub fn resolve_or_default(line: &str) -> LoopConfig {
    match resolve(line) {
        Ok(config) => config,
        Err(error) => {
            telemetry::log_startup_fallback(&error);
            LoopConfig::default()
        }
    }
}
