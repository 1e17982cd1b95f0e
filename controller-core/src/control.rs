//! Interrupt-time control loop.
//!
//! [`ControlLoop::on_conversion_complete`] is the whole feedback path. It runs
//! once per completed conversion, never blocks, and always finishes with the
//! group acknowledgement so the interrupt source can fire again:
//!
//! 1. read the sample (acknowledges the converter),
//! 2. fold it into the running extrema,
//! 3. map it onto the committed period,
//! 4. stage the compare value in the shadow register,
//! 5. publish to the observer, clear the converter flag, acknowledge the group.
//!
//! The loop owns its state; peripherals are borrowed for the duration of one
//! invocation only.

use crate::actuation::compare_for_sample;
use crate::extrema::ExtremaState;
use crate::interrupt::{InterruptController, InterruptLine};
use crate::pulse::CompareRegister;
use crate::sample::SampleValue;
use crate::sampling::SamplingUnit;
use crate::status::LoopObserver;

/// Outcome of one control-loop invocation.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ControlStep {
    pub sample: SampleValue,
    /// Compare value staged for the next period.
    pub compare: u16,
}

/// State owned by the conversion-complete handler.
pub struct ControlLoop<'o> {
    extrema: ExtremaState,
    last: Option<ControlStep>,
    conversions: u32,
    observer: Option<&'o LoopObserver>,
}

impl<'o> ControlLoop<'o> {
    /// Creates a loop with sentinel extrema and no observer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            extrema: ExtremaState::new(),
            last: None,
            conversions: 0,
            observer: None,
        }
    }

    /// Creates a loop that publishes every step to `observer`.
    #[must_use]
    pub const fn with_observer(observer: &'o LoopObserver) -> Self {
        Self {
            extrema: ExtremaState::new(),
            last: None,
            conversions: 0,
            observer: Some(observer),
        }
    }

    /// Handles one conversion-complete interrupt.
    pub fn on_conversion_complete<U, P, I>(&mut self, adc: &mut U, pwm: &mut P, irq: &mut I) -> ControlStep
    where
        U: SamplingUnit,
        P: CompareRegister,
        I: InterruptController,
    {
        let sample = adc.read_result();
        self.extrema.observe(sample);

        let period = pwm.period();
        let compare = compare_for_sample(sample, period);
        pwm.submit_pending(compare);

        let step = ControlStep { sample, compare };
        self.last = Some(step);
        self.conversions = self.conversions.wrapping_add(1);
        if let Some(observer) = self.observer {
            observer.publish(&self.extrema, step, period, self.conversions);
        }

        adc.clear_interrupt();
        irq.acknowledge_group(InterruptLine::ConversionComplete.group());
        step
    }

    #[must_use]
    pub const fn extrema(&self) -> &ExtremaState {
        &self.extrema
    }

    /// Most recent step, `None` before the first conversion.
    #[must_use]
    pub const fn last(&self) -> Option<ControlStep> {
        self.last
    }

    /// Completed invocations (wraps at `u32::MAX`).
    #[must_use]
    pub const fn conversions(&self) -> u32 {
        self.conversions
    }
}

impl Default for ControlLoop<'_> {
    fn default() -> Self {
        Self::new()
    }
}
