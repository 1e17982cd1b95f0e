//! Routes timebase events to the converter's start-of-conversion input.
//!
//! The router is a rate divider: it counts qualifying timebase events and emits
//! one start-of-conversion (SOC) every `prescale` of them. It never checks
//! whether the converter is still busy; a start issued too early is an overrun
//! and is reported by the sampling unit, not smoothed over here.

use core::fmt;

use crate::pulse::TimebaseEvents;

/// Timebase event that qualifies as a trigger.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum TriggerSource {
    /// Counter wrapped to zero.
    #[default]
    CounterZero,
    /// Counter reached the last tick of the period.
    CounterPeriod,
    /// Counter matched the committed compare value while counting up. A
    /// compare equal to the period fires on the last tick instead.
    CompareUp,
}

impl TriggerSource {
    /// Returns `true` when `events` contains this source.
    #[must_use]
    pub const fn matches(self, events: &TimebaseEvents) -> bool {
        match self {
            TriggerSource::CounterZero => events.zero,
            TriggerSource::CounterPeriod => events.period,
            TriggerSource::CompareUp => events.compare_trigger,
        }
    }
}

impl fmt::Display for TriggerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerSource::CounterZero => f.write_str("zero"),
            TriggerSource::CounterPeriod => f.write_str("period"),
            TriggerSource::CompareUp => f.write_str("compare"),
        }
    }
}

/// Largest supported event prescale.
pub const MAX_TRIGGER_PRESCALE: u8 = 15;

/// Number of qualifying events per start-of-conversion, `1..=15`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TriggerPrescale(u8);

impl TriggerPrescale {
    /// One conversion per qualifying event.
    pub const EVERY_EVENT: Self = Self(1);

    #[must_use]
    pub const fn new(events: u8) -> Option<Self> {
        if events == 0 || events > MAX_TRIGGER_PRESCALE {
            None
        } else {
            Some(Self(events))
        }
    }

    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl Default for TriggerPrescale {
    fn default() -> Self {
        Self::EVERY_EVENT
    }
}

/// Trigger routing options.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct TriggerConfig {
    pub source: TriggerSource,
    pub prescale: TriggerPrescale,
}

/// Start-of-conversion pulse emitted by the router.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct StartOfConversion;

/// Rate-dividing trigger router.
#[derive(Copy, Clone, Debug)]
pub struct TriggerRouter {
    config: TriggerConfig,
    enabled: bool,
    event_count: u8,
}

impl TriggerRouter {
    /// Creates a disabled router.
    #[must_use]
    pub const fn new(config: TriggerConfig) -> Self {
        Self {
            config,
            enabled: false,
            event_count: 0,
        }
    }

    /// Enables SOC generation and clears the event counter.
    pub fn enable(&mut self) {
        self.enabled = true;
        self.event_count = 0;
    }

    /// Stops SOC generation; qualifying events are ignored until re-enabled.
    pub fn disable(&mut self) {
        self.enabled = false;
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub const fn config(&self) -> TriggerConfig {
        self.config
    }

    /// Feeds one tick worth of timebase events; returns a start pulse every
    /// `prescale` qualifying events.
    pub fn on_timebase(&mut self, events: &TimebaseEvents) -> Option<StartOfConversion> {
        if !self.enabled || !self.config.source.matches(events) {
            return None;
        }

        self.event_count += 1;
        if self.event_count >= self.config.prescale.get() {
            self.event_count = 0;
            Some(StartOfConversion)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ZERO: TimebaseEvents = TimebaseEvents {
        zero: true,
        period: false,
        compare_up: false,
        compare_trigger: false,
        committed: None,
    };

    #[test]
    fn prescale_bounds() {
        assert!(TriggerPrescale::new(0).is_none());
        assert!(TriggerPrescale::new(16).is_none());
        assert_eq!(TriggerPrescale::new(15).map(TriggerPrescale::get), Some(15));
    }

    #[test]
    fn disabled_router_never_triggers() {
        let mut router = TriggerRouter::new(TriggerConfig::default());
        assert_eq!(router.on_timebase(&ZERO), None);
    }

    #[test]
    fn disable_stops_and_enable_restarts_the_count() {
        let mut router = TriggerRouter::new(TriggerConfig {
            source: TriggerSource::CounterZero,
            prescale: TriggerPrescale::new(2).unwrap(),
        });
        router.enable();
        assert_eq!(router.on_timebase(&ZERO), None);

        router.disable();
        assert!(!router.is_enabled());
        assert_eq!(router.on_timebase(&ZERO), None);

        router.enable();
        assert_eq!(router.on_timebase(&ZERO), None);
        assert_eq!(router.on_timebase(&ZERO), Some(StartOfConversion));
    }

    #[test]
    fn every_zero_event_triggers_by_default() {
        let mut router = TriggerRouter::new(TriggerConfig::default());
        router.enable();
        for _ in 0..5 {
            assert_eq!(router.on_timebase(&ZERO), Some(StartOfConversion));
        }
        assert_eq!(router.on_timebase(&TimebaseEvents::NONE), None);
    }

    #[test]
    fn prescale_divides_event_rate() {
        let mut router = TriggerRouter::new(TriggerConfig {
            source: TriggerSource::CounterZero,
            prescale: TriggerPrescale::new(3).unwrap(),
        });
        router.enable();

        let fired: heapless::Vec<bool, 9> = (0..9)
            .map(|_| router.on_timebase(&ZERO).is_some())
            .collect();
        assert_eq!(
            &fired[..],
            &[false, false, true, false, false, true, false, false, true]
        );
    }

    #[test]
    fn source_selects_qualifying_event() {
        let mut router = TriggerRouter::new(TriggerConfig {
            source: TriggerSource::CompareUp,
            prescale: TriggerPrescale::EVERY_EVENT,
        });
        router.enable();

        assert_eq!(router.on_timebase(&ZERO), None);
        let compare = TimebaseEvents {
            compare_up: true,
            compare_trigger: true,
            ..TimebaseEvents::NONE
        };
        assert_eq!(router.on_timebase(&compare), Some(StartOfConversion));
    }
}
