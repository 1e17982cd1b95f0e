//! Interrupt controller model with per-group acknowledgement gating.
//!
//! A raised line is delivered only if it is enabled and its group is open.
//! Delivery closes the group; it stays closed until the handler calls
//! [`InterruptController::acknowledge_group`]. A handler that forgets the
//! acknowledgement therefore blocks every later interrupt of its group.

use crate::interrupt::{AckGroup, INTERRUPT_LINE_COUNT, InterruptController, InterruptLine};

const LINES: [InterruptLine; INTERRUPT_LINE_COUNT] = [
    InterruptLine::ConversionComplete,
    InterruptLine::TemperatureComplete,
];

#[derive(Clone, Debug, Default)]
pub struct SimInterruptController {
    enabled: [bool; INTERRUPT_LINE_COUNT],
    pending: [bool; INTERRUPT_LINE_COUNT],
    /// Bit `n` set while group `n` awaits acknowledgement.
    blocked_groups: u16,
    delivered: u32,
}

impl SimInterruptController {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            enabled: [false; INTERRUPT_LINE_COUNT],
            pending: [false; INTERRUPT_LINE_COUNT],
            blocked_groups: 0,
            delivered: 0,
        }
    }

    /// Latches `line` as pending.
    pub fn raise(&mut self, line: InterruptLine) {
        self.pending[line.as_index()] = true;
    }

    /// Takes the next deliverable line, closing its group.
    pub fn next_deliverable(&mut self) -> Option<InterruptLine> {
        let line = LINES.into_iter().find(|line| {
            let index = line.as_index();
            self.pending[index] && self.enabled[index] && !self.is_group_blocked(line.group())
        })?;

        self.pending[line.as_index()] = false;
        self.blocked_groups |= group_mask(line.group());
        self.delivered = self.delivered.wrapping_add(1);
        Some(line)
    }

    #[must_use]
    pub fn is_pending(&self, line: InterruptLine) -> bool {
        self.pending[line.as_index()]
    }

    #[must_use]
    pub fn is_enabled(&self, line: InterruptLine) -> bool {
        self.enabled[line.as_index()]
    }

    #[must_use]
    pub fn is_group_blocked(&self, group: AckGroup) -> bool {
        self.blocked_groups & group_mask(group) != 0
    }

    /// Interrupts handed to handlers so far.
    #[must_use]
    pub fn delivered(&self) -> u32 {
        self.delivered
    }
}

impl InterruptController for SimInterruptController {
    fn enable(&mut self, line: InterruptLine) {
        self.enabled[line.as_index()] = true;
    }

    fn acknowledge_group(&mut self, group: AckGroup) {
        self.blocked_groups &= !group_mask(group);
    }
}

fn group_mask(group: AckGroup) -> u16 {
    1_u16.checked_shl(u32::from(group.0)).unwrap_or(0)
}
