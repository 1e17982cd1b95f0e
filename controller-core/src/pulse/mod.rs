//! Pulse generator model: free-running up-counter, shadowed comparator and
//! action qualifier.
//!
//! The counter runs `0, 1, …, period - 1` and wraps to zero, raising the
//! zero-event that both commits the shadow register and feeds the trigger
//! router. The model is tick accurate so the simulation and the tests can check
//! event ordering against the same rules the hardware timer follows.

use core::fmt;

pub mod action;
pub mod shadow;

pub use action::{Action, ActionQualifier, Level};
pub use shadow::ShadowRegister;

/// Write side of a shadowed compare register.
///
/// The control loop only ever sees this trait: the firmware implements it on
/// the hardware timer (preloaded capture/compare register), the simulation on
/// [`PulseGenerator`].
pub trait CompareRegister {
    /// Committed period in counter ticks.
    fn period(&self) -> u16;

    /// Stages a compare value that becomes effective at the next counter zero.
    fn submit_pending(&mut self, compare: u16);
}

/// Reasons a [`PulseConfig`] is rejected.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PulseConfigError {
    ZeroPeriod,
    CompareAbovePeriod { compare: u16, period: u16 },
}

impl fmt::Display for PulseConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PulseConfigError::ZeroPeriod => f.write_str("period must be non-zero"),
            PulseConfigError::CompareAbovePeriod { compare, period } => {
                write!(f, "compare {compare} exceeds period {period}")
            }
        }
    }
}

/// Period and compare threshold, both in counter ticks.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PulseConfig {
    period: u16,
    compare: u16,
}

impl PulseConfig {
    /// Validates `period > 0` and `compare <= period`.
    ///
    /// # Errors
    ///
    /// Returns [`PulseConfigError`] naming the violated bound.
    pub const fn new(period: u16, compare: u16) -> Result<Self, PulseConfigError> {
        if period == 0 {
            return Err(PulseConfigError::ZeroPeriod);
        }
        if compare > period {
            return Err(PulseConfigError::CompareAbovePeriod { compare, period });
        }
        Ok(Self { period, compare })
    }

    #[must_use]
    pub const fn period(self) -> u16 {
        self.period
    }

    #[must_use]
    pub const fn compare(self) -> u16 {
        self.compare
    }

    /// Same period with a new compare value, clamped to the period.
    #[must_use]
    pub const fn with_compare(self, compare: u16) -> Self {
        let compare = if compare > self.period {
            self.period
        } else {
            compare
        };
        Self {
            period: self.period,
            compare,
        }
    }
}

/// Events raised by the timebase on a single tick.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct TimebaseEvents {
    /// Counter wrapped to zero (or the generator was just started).
    pub zero: bool,
    /// Counter reached the last tick of the period.
    pub period: bool,
    /// Counter matched the committed compare value.
    pub compare_up: bool,
    /// Counter reached the compare trigger point: the compare value, or the
    /// last tick when the compare equals the period and never matches.
    pub compare_trigger: bool,
    /// Configuration promoted from the shadow register on this tick.
    pub committed: Option<PulseConfig>,
}

impl TimebaseEvents {
    pub const NONE: Self = Self {
        zero: false,
        period: false,
        compare_up: false,
        compare_trigger: false,
        committed: None,
    };
}

/// Tick-accurate pulse generator.
#[derive(Clone, Debug)]
pub struct PulseGenerator {
    counter: u16,
    shadow: ShadowRegister,
    qualifier: ActionQualifier,
    output: Level,
    running: bool,
}

impl PulseGenerator {
    /// Creates a stopped generator.
    #[must_use]
    pub const fn new(config: PulseConfig, qualifier: ActionQualifier) -> Self {
        Self {
            counter: 0,
            shadow: ShadowRegister::new(config),
            qualifier,
            output: Level::Low,
            running: false,
        }
    }

    /// Starts counting from zero. The start itself counts as a zero-event.
    pub fn start(&mut self) -> TimebaseEvents {
        self.running = true;
        self.counter = 0;
        self.boundary()
    }

    /// Advances the counter by one tick.
    pub fn tick(&mut self) -> TimebaseEvents {
        if !self.running {
            return TimebaseEvents::NONE;
        }

        let next = self.counter + 1;
        if next >= self.shadow.committed().period() {
            self.counter = 0;
            self.boundary()
        } else {
            self.counter = next;
            self.qualify(None)
        }
    }

    fn boundary(&mut self) -> TimebaseEvents {
        let committed = self.shadow.commit_on_zero();
        self.qualify(committed)
    }

    fn qualify(&mut self, committed: Option<PulseConfig>) -> TimebaseEvents {
        let config = self.shadow.committed();
        let zero = self.counter == 0;
        let last_tick = config.period() - 1;
        let events = TimebaseEvents {
            zero,
            period: self.counter == last_tick,
            compare_up: self.counter == config.compare(),
            compare_trigger: self.counter == config.compare().min(last_tick),
            committed,
        };
        self.output = self
            .qualifier
            .qualify(self.output, events.zero, events.compare_up);
        events
    }

    #[must_use]
    pub const fn counter(&self) -> u16 {
        self.counter
    }

    #[must_use]
    pub const fn output(&self) -> Level {
        self.output
    }

    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running
    }

    /// Configuration the comparator is currently using.
    #[must_use]
    pub const fn committed(&self) -> PulseConfig {
        self.shadow.committed()
    }

    /// Configuration staged for the next boundary.
    #[must_use]
    pub const fn pending(&self) -> Option<PulseConfig> {
        self.shadow.pending()
    }
}

impl CompareRegister for PulseGenerator {
    fn period(&self) -> u16 {
        self.shadow.committed().period()
    }

    fn submit_pending(&mut self, compare: u16) {
        self.shadow.submit_pending(compare);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator(period: u16, compare: u16) -> PulseGenerator {
        PulseGenerator::new(
            PulseConfig::new(period, compare).unwrap(),
            ActionQualifier::ACTIVE_HIGH,
        )
    }

    #[test]
    fn config_validation() {
        assert_eq!(PulseConfig::new(0, 0), Err(PulseConfigError::ZeroPeriod));
        assert_eq!(
            PulseConfig::new(10, 11),
            Err(PulseConfigError::CompareAbovePeriod {
                compare: 11,
                period: 10
            })
        );
        assert!(PulseConfig::new(10, 10).is_ok());
    }

    #[test]
    fn stopped_generator_raises_no_events() {
        let mut pwm = generator(4, 2);
        assert_eq!(pwm.tick(), TimebaseEvents::NONE);
        assert_eq!(pwm.counter(), 0);
    }

    #[test]
    fn counter_wraps_after_period_ticks() {
        let mut pwm = generator(4, 2);
        assert!(pwm.start().zero);

        let mut zeros = 0;
        let mut counters = heapless::Vec::<u16, 12>::new();
        for _ in 0..12 {
            let events = pwm.tick();
            if events.zero {
                zeros += 1;
            }
            counters.push(pwm.counter()).unwrap();
        }
        assert_eq!(zeros, 3);
        assert_eq!(&counters[..5], &[1, 2, 3, 0, 1]);
    }

    #[test]
    fn period_event_fires_on_last_tick() {
        let mut pwm = generator(4, 2);
        pwm.start();
        pwm.tick();
        pwm.tick();
        let events = pwm.tick();
        assert_eq!(pwm.counter(), 3);
        assert!(events.period);
        assert!(!events.zero);
    }

    #[test]
    fn output_is_high_while_counter_below_compare() {
        for period in [1_u16, 2, 5, 8] {
            for compare in 0..=period {
                let mut pwm = generator(period, compare);
                pwm.start();
                for _ in 0..(3 * period) {
                    assert_eq!(
                        pwm.output().is_high(),
                        pwm.counter() < compare,
                        "period {period} compare {compare} counter {}",
                        pwm.counter()
                    );
                    pwm.tick();
                }
            }
        }
    }

    #[test]
    fn pending_compare_applies_only_at_zero() {
        let mut pwm = generator(8, 2);
        pwm.start();
        pwm.tick();
        pwm.submit_pending(6);

        while pwm.counter() != 0 {
            assert_eq!(pwm.committed().compare(), 2);
            let events = pwm.tick();
            if events.zero {
                assert_eq!(events.committed.map(PulseConfig::compare), Some(6));
            } else {
                assert_eq!(events.committed, None);
            }
        }
        assert_eq!(pwm.committed().compare(), 6);
        assert_eq!(pwm.pending(), None);
    }

    #[test]
    fn full_scale_compare_triggers_on_last_tick() {
        let mut pwm = generator(4, 4);
        let mut triggers = heapless::Vec::<(u16, bool), 8>::new();
        let events = pwm.start();
        triggers.push((pwm.counter(), events.compare_trigger)).unwrap();
        for _ in 0..7 {
            let events = pwm.tick();
            assert!(!events.compare_up);
            assert!(pwm.output().is_high());
            triggers.push((pwm.counter(), events.compare_trigger)).unwrap();
        }
        let fired: heapless::Vec<u16, 8> = triggers
            .iter()
            .filter(|(_, fired)| *fired)
            .map(|(counter, _)| *counter)
            .collect();
        assert_eq!(&fired[..], &[3, 3]);
    }

    #[test]
    fn compare_trigger_follows_compare_below_period() {
        let mut pwm = generator(8, 0);
        assert!(pwm.start().compare_trigger);
        pwm.submit_pending(5);
        let mut fired = 0;
        for _ in 0..24 {
            let events = pwm.tick();
            assert_eq!(events.compare_trigger, events.compare_up);
            if events.compare_trigger {
                fired += 1;
                assert_eq!(pwm.counter(), 5);
            }
        }
        assert_eq!(fired, 2);
    }
}
