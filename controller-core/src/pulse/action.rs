//! Action qualifier: translates timebase events into the output level.

use core::fmt;

/// Logic level of the actuation output.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum Level {
    #[default]
    Low,
    High,
}

impl Level {
    #[must_use]
    pub const fn is_high(self) -> bool {
        matches!(self, Level::High)
    }

    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Level::Low => Level::High,
            Level::High => Level::Low,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Low => f.write_str("low"),
            Level::High => f.write_str("high"),
        }
    }
}

/// Effect of a qualified event on the output.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum Action {
    #[default]
    Nothing,
    Set,
    Clear,
    Toggle,
}

impl Action {
    /// Applies the action to `level`.
    #[must_use]
    pub const fn apply(self, level: Level) -> Level {
        match self {
            Action::Nothing => level,
            Action::Set => Level::High,
            Action::Clear => Level::Low,
            Action::Toggle => level.toggled(),
        }
    }
}

/// Per-event actions. When the zero and compare events coincide, the compare
/// action is applied last and therefore wins.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ActionQualifier {
    pub on_zero: Action,
    pub on_compare_up: Action,
}

impl ActionQualifier {
    /// Active-high output: rises at counter zero, falls at the compare match.
    pub const ACTIVE_HIGH: Self = Self {
        on_zero: Action::Set,
        on_compare_up: Action::Clear,
    };

    /// Active-low output: falls at counter zero, rises at the compare match.
    pub const ACTIVE_LOW: Self = Self {
        on_zero: Action::Clear,
        on_compare_up: Action::Set,
    };

    /// Computes the next output level for the events raised on one tick.
    #[must_use]
    pub const fn qualify(self, level: Level, zero: bool, compare_up: bool) -> Level {
        let mut next = level;
        if zero {
            next = self.on_zero.apply(next);
        }
        if compare_up {
            next = self.on_compare_up.apply(next);
        }
        next
    }
}

impl Default for ActionQualifier {
    fn default() -> Self {
        Self::ACTIVE_HIGH
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compare_action_wins_over_zero_action() {
        let aq = ActionQualifier::ACTIVE_HIGH;
        assert_eq!(aq.qualify(Level::High, true, true), Level::Low);
        assert_eq!(aq.qualify(Level::Low, true, false), Level::High);
        assert_eq!(aq.qualify(Level::High, false, true), Level::Low);
        assert_eq!(aq.qualify(Level::High, false, false), Level::High);
    }

    #[test]
    fn active_low_inverts_edges() {
        let aq = ActionQualifier::ACTIVE_LOW;
        assert_eq!(aq.qualify(Level::High, true, false), Level::Low);
        assert_eq!(aq.qualify(Level::Low, false, true), Level::High);
    }

    #[test]
    fn toggle_flips_level() {
        let aq = ActionQualifier {
            on_zero: Action::Toggle,
            on_compare_up: Action::Nothing,
        };
        assert_eq!(aq.qualify(Level::Low, true, false), Level::High);
        assert_eq!(aq.qualify(Level::High, true, true), Level::Low);
    }
}
