//! Conversion-complete interrupt.
//!
//! The loop state and the peripherals it drives live in [`CONTEXT`], installed
//! once by the runtime before the interrupt is unmasked. The handler takes the
//! lock, runs one control-loop step and returns; it never waits on anything.

use core::cell::RefCell;

use controller_core::control::ControlLoop;
use controller_core::interrupt::{AckGroup, InterruptController, InterruptLine};
use controller_core::sample::AdcChannel;
use controller_core::sampling::{SamplingError, SamplingUnit};
use embassy_stm32::interrupt;
use embassy_stm32::interrupt::{InterruptExt, Priority};
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

use crate::hw::adc::TriggeredAdc;
use crate::hw::timebase::PulseTimer;
use crate::status;

static CONTEXT: Mutex<CriticalSectionRawMutex, RefCell<Option<IsrContext>>> =
    Mutex::new(RefCell::new(None));

/// NVIC view of the converter interrupt lines. Both lines share the
/// `ADC1_COMP` vector on this part.
pub struct NvicLines;

impl InterruptController for NvicLines {
    fn enable(&mut self, line: InterruptLine) {
        match line {
            InterruptLine::ConversionComplete | InterruptLine::TemperatureComplete => {
                interrupt::ADC1_COMP.set_priority(Priority::P1);
                unsafe { interrupt::ADC1_COMP.enable() };
            }
        }
    }

    fn acknowledge_group(&mut self, group: AckGroup) {
        // The vector is level triggered from the ADC flags, which the loop has
        // already cleared; drop the latched edge so the next completion re-enters.
        if group == AckGroup::CONVERTER {
            interrupt::ADC1_COMP.unpend();
        }
    }
}

pub struct IsrContext {
    pwm: PulseTimer<'static>,
    adc: TriggeredAdc<'static>,
    nvic: NvicLines,
    control: ControlLoop<'static>,
    channel: AdcChannel,
}

impl IsrContext {
    pub fn new(pwm: PulseTimer<'static>, adc: TriggeredAdc<'static>, channel: AdcChannel) -> Self {
        Self {
            pwm,
            adc,
            nvic: NvicLines,
            control: ControlLoop::with_observer(&status::OBSERVER),
            channel,
        }
    }

    /// Unmasks the interrupt, arms the converter trigger and starts the counter.
    fn start(&mut self) -> Result<(), SamplingError> {
        self.nvic.enable(InterruptLine::ConversionComplete);
        self.adc.start_conversion(self.channel)?;
        self.pwm.start();
        Ok(())
    }

    fn service(&mut self) {
        if self.adc.take_overrun() {
            status::record_overrun();
        }
        if self.adc.conversion_complete() {
            self.control
                .on_conversion_complete(&mut self.adc, &mut self.pwm, &mut self.nvic);
        }
    }
}

/// Hands the context to the interrupt and starts the loop.
pub fn install_and_start(context: IsrContext) -> Result<(), SamplingError> {
    CONTEXT.lock(|cell| {
        let mut slot = cell.borrow_mut();
        slot.insert(context).start()
    })
}

#[interrupt]
unsafe fn ADC1_COMP() {
    CONTEXT.lock(|cell| match cell.borrow_mut().as_mut() {
        Some(context) => context.service(),
        None => TriggeredAdc::discard_pending(),
    });
}
