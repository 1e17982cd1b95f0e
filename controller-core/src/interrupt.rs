//! Interrupt-controller contract and a table-driven dispatcher.
//!
//! Handlers are plain function pointers bound to an [`InterruptLine`]. The
//! dispatcher owns no state besides the table; the context a handler mutates is
//! passed in by `&mut` on every dispatch, so the same handler can run against
//! firmware peripherals or the simulation models.

use core::fmt;

use heapless::Vec;

/// Interrupt sources the controller knows about.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum InterruptLine {
    /// Conversion complete on the control channel.
    ConversionComplete,
    /// Conversion complete on the temperature channel.
    TemperatureComplete,
}

impl InterruptLine {
    /// Acknowledge group the line is aggregated into.
    #[must_use]
    pub const fn group(self) -> AckGroup {
        match self {
            InterruptLine::ConversionComplete | InterruptLine::TemperatureComplete => {
                AckGroup::CONVERTER
            }
        }
    }

    #[must_use]
    pub const fn as_index(self) -> usize {
        match self {
            InterruptLine::ConversionComplete => 0,
            InterruptLine::TemperatureComplete => 1,
        }
    }
}

impl fmt::Display for InterruptLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterruptLine::ConversionComplete => f.write_str("conversion-complete"),
            InterruptLine::TemperatureComplete => f.write_str("temperature-complete"),
        }
    }
}

/// Number of distinct [`InterruptLine`] variants.
pub const INTERRUPT_LINE_COUNT: usize = 2;

/// Interrupt aggregation group. Once a line in the group has been delivered,
/// no further line of the group is delivered until the group is acknowledged.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct AckGroup(pub u8);

impl AckGroup {
    /// Group carrying the converter interrupts.
    pub const CONVERTER: Self = Self(1);
}

/// Interrupt controller operations the control path consumes.
pub trait InterruptController {
    /// Unmasks `line`.
    fn enable(&mut self, line: InterruptLine);

    /// Re-arms delivery for every line in `group`.
    fn acknowledge_group(&mut self, group: AckGroup);
}

/// Handler bound to a line.
pub type Handler<C> = fn(&mut C);

/// Errors raised while registering or dispatching handlers.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DispatchError {
    /// The handler table is full.
    TableFull,
    /// No handler is bound to the dispatched line.
    Unbound(InterruptLine),
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::TableFull => f.write_str("handler table full"),
            DispatchError::Unbound(line) => write!(f, "no handler bound to {line}"),
        }
    }
}

/// Table mapping interrupt lines to handlers over a context `C`.
pub struct InterruptDispatcher<C, const CAPACITY: usize = INTERRUPT_LINE_COUNT> {
    handlers: Vec<(InterruptLine, Handler<C>), CAPACITY>,
}

impl<C, const CAPACITY: usize> InterruptDispatcher<C, CAPACITY> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// Registers (or replaces) the handler for `line`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::TableFull`] when `line` is new and the table
    /// has no free slot.
    pub fn register(&mut self, line: InterruptLine, handler: Handler<C>) -> Result<(), DispatchError> {
        if let Some(slot) = self.handlers.iter_mut().find(|(bound, _)| *bound == line) {
            slot.1 = handler;
            Ok(())
        } else {
            self.handlers
                .push((line, handler))
                .map_err(|_| DispatchError::TableFull)
        }
    }

    /// Returns `true` when a handler is bound to `line`.
    #[must_use]
    pub fn is_bound(&self, line: InterruptLine) -> bool {
        self.handlers.iter().any(|(bound, _)| *bound == line)
    }

    /// Runs the handler bound to `line` to completion against `context`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Unbound`] when no handler is bound to `line`.
    pub fn dispatch(&self, line: InterruptLine, context: &mut C) -> Result<(), DispatchError> {
        let (_, handler) = self
            .handlers
            .iter()
            .find(|(bound, _)| *bound == line)
            .ok_or(DispatchError::Unbound(line))?;
        handler(context);
        Ok(())
    }
}

impl<C, const CAPACITY: usize> Default for InterruptDispatcher<C, CAPACITY> {
    fn default() -> Self {
        Self::new()
    }
}
