//! TIM3 as the pulse generator.
//!
//! The embassy PWM driver brings up the clock, routes PA6 to channel 1 and
//! leaves the prescaler at 1 for the requested frequency; everything the loop
//! depends on is then set at register level:
//!
//! - `ARR = period - 1`, so the counter runs `0..period` and wraps to zero,
//! - PWM mode 1 with `OC1PE`, so `CCR1` is shadowed and commits on the update event,
//! - `CR2.MMS` selects the start-of-conversion event sent to ADC1. With the
//!   compare pulse, `CCR1` is capped one tick short of the period so a
//!   full-scale sample still matches and the next conversion starts.

use controller_core::config::{ConfigError, LoopConfig};
use controller_core::pulse::{ActionQualifier, CompareRegister};
use embassy_stm32::Peri;
use embassy_stm32::gpio::OutputType;
use embassy_stm32::pac;
use embassy_stm32::peripherals::{PA6, TIM3};
use embassy_stm32::time::hz;
use embassy_stm32::timer::Ch1;
use embassy_stm32::timer::simple_pwm::{PwmPin, SimplePwm};

use super::{TriggerOutput, pwm_frequency, system_clock_frequency};

const CR1_CEN: u32 = 1 << 0;
const CR1_ARPE: u32 = 1 << 7;
const CR2_MMS_SHIFT: u32 = 4;
const CR2_MMS_MASK: u32 = 0b111 << CR2_MMS_SHIFT;
const EGR_UG: u32 = 1 << 0;

// CCMR1 channel 1 and CCMR2 channel 4 share the same bit layout.
const CCMR_OCPE: u32 = 1 << 3;
const CCMR_OCM_SHIFT: u32 = 4;
const CCMR_OCM_MASK: u32 = 0b111 << CCMR_OCM_SHIFT | 1 << 16;
const CCMR_CH4_SHIFT: u32 = 8;
const OCM_PWM1: u32 = 0b110;
const OCM_PWM2: u32 = 0b111;

const CCER_CC1E: u32 = 1 << 0;
const CCER_CC1P: u32 = 1 << 1;

/// Routes the actuation output to PA6 (TIM3 channel 1, push-pull).
pub fn route_actuation_output(pin: Peri<'static, PA6>) -> PwmPin<'static, TIM3, Ch1> {
    PwmPin::new(pin, OutputType::PushPull)
}

/// Brings up TIM3 with only channel 1 routed.
pub fn pwm_driver(
    timer: Peri<'static, TIM3>,
    output: PwmPin<'static, TIM3, Ch1>,
    period: u16,
) -> SimplePwm<'static, TIM3> {
    SimplePwm::new(
        timer,
        Some(output),
        None,
        None,
        None,
        hz(pwm_frequency(system_clock_frequency(), period)),
        Default::default(),
    )
}

pub struct PulseTimer<'d> {
    _driver: SimplePwm<'d, TIM3>,
    period: u16,
    compare_limit: u16,
}

impl<'d> PulseTimer<'d> {
    /// Programs the timer for `config` with a zero compare value. The counter
    /// stays stopped until [`PulseTimer::start`].
    pub fn new(driver: SimplePwm<'d, TIM3>, config: &LoopConfig) -> Result<Self, ConfigError> {
        let pulse = config.pulse()?;
        let period = pulse.period();
        let last_tick = u32::from(period - 1);
        let trigger = TriggerOutput::for_source(config.trigger.source);
        let compare_limit = trigger.compare_limit(period);
        let tim = pac::TIM3;

        tim.cr1().modify(|w| w.0 &= !CR1_CEN);
        tim.arr().write(|w| w.0 = last_tick);
        tim.ccr(0).write(|w| w.0 = u32::from(pulse.compare().min(compare_limit)));
        tim.ccmr_output(0).modify(|w| {
            w.0 = (w.0 & !CCMR_OCM_MASK) | OCM_PWM1 << CCMR_OCM_SHIFT | CCMR_OCPE;
        });

        let inverted = config.polarity == ActionQualifier::ACTIVE_LOW;
        tim.ccer().modify(|w| {
            w.0 |= CCER_CC1E;
            if inverted {
                w.0 |= CCER_CC1P;
            } else {
                w.0 &= !CCER_CC1P;
            }
        });

        if trigger == TriggerOutput::PeriodOc4 {
            // OC4REF rises when the counter reaches the last tick of the period.
            tim.ccr(3).write(|w| w.0 = last_tick);
            tim.ccmr_output(1).modify(|w| {
                w.0 = (w.0 & !(CCMR_OCM_MASK << CCMR_CH4_SHIFT))
                    | (OCM_PWM2 << CCMR_OCM_SHIFT) << CCMR_CH4_SHIFT;
            });
        }

        tim.cr1().modify(|w| w.0 |= CR1_ARPE);
        // Load the preloaded registers before the trigger output is routed so
        // this update does not start a conversion.
        tim.egr().write(|w| w.0 = EGR_UG);
        tim.cr2()
            .modify(|w| w.0 = (w.0 & !CR2_MMS_MASK) | trigger.mms() << CR2_MMS_SHIFT);

        Ok(Self {
            _driver: driver,
            period,
            compare_limit,
        })
    }

    /// Enables the counter; the first period starts at zero.
    pub fn start(&mut self) {
        pac::TIM3.cr1().modify(|w| w.0 |= CR1_CEN);
    }
}

impl CompareRegister for PulseTimer<'_> {
    fn period(&self) -> u16 {
        self.period
    }

    fn submit_pending(&mut self, compare: u16) {
        let compare = compare.min(self.compare_limit);
        pac::TIM3.ccr(0).write(|w| w.0 = u32::from(compare));
    }
}
