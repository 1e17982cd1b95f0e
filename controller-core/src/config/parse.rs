//! Text form of [`LoopConfig`].
//!
//! The grammar is a whitespace separated list of `key=value` settings applied
//! on top of [`LoopConfig::default`]:
//!
//! ```text
//! period=1000 window=10 channel=0 ref=internal vref=3.3 trigger=zero prescale=1 polarity=high
//! ```
//!
//! Later settings override earlier ones. Unknown keys are rejected.

use core::fmt;

use winnow::ascii::{Uint, dec_uint, space0, space1};
use winnow::combinator::{alt, eof, separated_pair};
use winnow::error::ContextError;
use winnow::prelude::*;
use winnow::token::take_while;

use super::{ConfigError, LoopConfig, ReferenceMode, ReferenceVoltage};
use crate::pulse::ActionQualifier;
use crate::sample::{AdcChannel, SampleWindow};
use crate::trigger::{TriggerPrescale, TriggerSource};

/// Errors produced while parsing a configuration line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParseError<'a> {
    /// Input at `offset` is not a `key=value` setting.
    Syntax { offset: usize },
    UnknownKey(&'a str),
    /// The value does not have the shape the key expects.
    InvalidValue { key: &'a str, value: &'a str },
    /// The value is well formed but out of range.
    Config(ConfigError),
}

impl fmt::Display for ParseError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Syntax { offset } => write!(f, "expected key=value at byte {offset}"),
            ParseError::UnknownKey(key) => write!(f, "unknown setting `{key}`"),
            ParseError::InvalidValue { key, value } => {
                write!(f, "invalid value `{value}` for `{key}`")
            }
            ParseError::Config(error) => error.fmt(f),
        }
    }
}

impl From<ConfigError> for ParseError<'_> {
    fn from(error: ConfigError) -> Self {
        ParseError::Config(error)
    }
}

/// Parses `line` into a validated configuration.
///
/// # Errors
///
/// Returns the first malformed setting, unknown key, invalid value or range
/// violation as a [`ParseError`].
pub fn parse_config(line: &str) -> Result<LoopConfig, ParseError<'_>> {
    let mut config = LoopConfig::default();
    let mut input = line;

    loop {
        let _ = space0::<_, ContextError>.parse_next(&mut input);
        if input.is_empty() {
            break;
        }

        let offset = line.len() - input.len();
        let (key, value) = setting
            .parse_next(&mut input)
            .map_err(|_| ParseError::Syntax { offset })?;
        apply(&mut config, key, value)?;

        // Settings must be separated by whitespace or end the line.
        let offset = line.len() - input.len();
        alt((space1, eof))
            .parse_next(&mut input)
            .map_err(|_: ContextError| ParseError::Syntax { offset })?;
    }

    config.validate()?;
    Ok(config)
}

fn setting<'s>(input: &mut &'s str) -> ModalResult<(&'s str, &'s str)> {
    separated_pair(
        take_while(1.., |c: char| c.is_ascii_alphanumeric() || c == '_'),
        '=',
        take_while(1.., |c: char| c.is_ascii_alphanumeric() || c == '.'),
    )
    .parse_next(input)
}

fn apply<'a>(config: &mut LoopConfig, key: &'a str, value: &'a str) -> Result<(), ParseError<'a>> {
    let invalid = || ParseError::InvalidValue { key, value };

    match key {
        "period" => {
            config.period = number::<u16>(value).ok_or_else(invalid)?;
        }
        "window" => {
            let ticks = number::<u16>(value).ok_or_else(invalid)?;
            config.sample_window =
                SampleWindow::new(ticks).ok_or(ConfigError::WindowOutOfRange(ticks))?;
        }
        "channel" => {
            let index = number::<u8>(value).ok_or_else(invalid)?;
            config.channel = AdcChannel::new(index).ok_or(ConfigError::ChannelOutOfRange(index))?;
        }
        "prescale" => {
            let events = number::<u8>(value).ok_or_else(invalid)?;
            config.trigger.prescale =
                TriggerPrescale::new(events).ok_or(ConfigError::PrescaleOutOfRange(events))?;
        }
        "ref" => {
            config.reference = keyword(
                value,
                &[
                    ("internal", ReferenceMode::Internal),
                    ("external", ReferenceMode::External),
                ],
            )
            .ok_or_else(invalid)?;
        }
        "vref" => {
            config.reference_voltage = keyword(
                value,
                &[
                    ("2.5", ReferenceVoltage::V2_5),
                    ("3.3", ReferenceVoltage::V3_3),
                ],
            )
            .ok_or_else(invalid)?;
        }
        "trigger" => {
            config.trigger.source = keyword(
                value,
                &[
                    ("zero", TriggerSource::CounterZero),
                    ("period", TriggerSource::CounterPeriod),
                    ("compare", TriggerSource::CompareUp),
                ],
            )
            .ok_or_else(invalid)?;
        }
        "polarity" => {
            config.polarity = keyword(
                value,
                &[
                    ("high", ActionQualifier::ACTIVE_HIGH),
                    ("low", ActionQualifier::ACTIVE_LOW),
                ],
            )
            .ok_or_else(invalid)?;
        }
        _ => return Err(ParseError::UnknownKey(key)),
    }

    Ok(())
}

fn number<T: Uint>(value: &str) -> Option<T> {
    dec_uint::<_, T, ContextError>.parse(value).ok()
}

fn keyword<T: Copy>(value: &str, table: &[(&str, T)]) -> Option<T> {
    table
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(value))
        .map(|(_, variant)| *variant)
}
