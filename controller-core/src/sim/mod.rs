//! Host-side model of the whole trigger chain.
//!
//! [`ClosedLoop`] wires the pulse generator, trigger router, a simulated
//! converter and interrupt controller, the dispatcher and the control loop,
//! and advances them one timebase tick at a time. Within a tick the order is:
//!
//! 1. the timebase counts (a counter zero commits the shadow register),
//! 2. the router turns a qualifying event into a start-of-conversion,
//! 3. the converter advances and may raise its completion interrupt,
//! 4. deliverable interrupts are dispatched to their handlers.
//!
//! A start that finds the converter busy or unacknowledged is an overrun.
//! The model treats it as fatal and refuses to advance afterwards.

use core::fmt;

pub mod adc;
pub mod irq;

pub use adc::{HeldSample, SampleSequence, SampleSource, SimulatedAdc};
pub use irq::SimInterruptController;

use crate::config::{ConfigError, LoopConfig};
use crate::control::{ControlLoop, ControlStep};
use crate::interrupt::{DispatchError, Handler, InterruptController, InterruptDispatcher, InterruptLine};
use crate::pulse::{Level, PulseGenerator, TimebaseEvents};
use crate::sample::AdcChannel;
use crate::sampling::{SamplingError, SamplingUnit};
use crate::status::LoopObserver;
use crate::telemetry::{TelemetryInstant, TelemetryRecorder};
use crate::trigger::TriggerRouter;

/// Simulation time in timebase ticks since start.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd)]
pub struct TickInstant(pub u64);

impl TelemetryInstant for TickInstant {
    fn saturating_ticks_since(&self, earlier: Self) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl fmt::Display for TickInstant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t={}", self.0)
    }
}

/// Conditions that stop the simulation.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LoopFault {
    /// A start-of-conversion arrived before the previous one was acknowledged.
    Overrun { at: TickInstant },
    /// An interrupt was delivered with no handler bound.
    Unhandled(InterruptLine),
    /// The handler table rejected a registration.
    HandlerTableFull,
}

impl fmt::Display for LoopFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopFault::Overrun { at } => write!(f, "converter overrun at {at}"),
            LoopFault::Unhandled(line) => write!(f, "no handler for {line}"),
            LoopFault::HandlerTableFull => f.write_str("interrupt handler table full"),
        }
    }
}

impl From<DispatchError> for LoopFault {
    fn from(error: DispatchError) -> Self {
        match error {
            DispatchError::TableFull => LoopFault::HandlerTableFull,
            DispatchError::Unbound(line) => LoopFault::Unhandled(line),
        }
    }
}

/// Peripherals and loop state handed to interrupt handlers.
pub struct LoopHardware<'o, S> {
    pub pwm: PulseGenerator,
    pub adc: SimulatedAdc<S>,
    pub irq: SimInterruptController,
    pub control: ControlLoop<'o>,
}

/// Default conversion-complete handler: runs the control loop.
pub fn conversion_complete<S: SampleSource>(hardware: &mut LoopHardware<'_, S>) {
    let LoopHardware {
        pwm,
        adc,
        irq,
        control,
    } = hardware;
    control.on_conversion_complete(adc, pwm, irq);
}

/// What happened on one simulated tick.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TickReport {
    pub at: TickInstant,
    pub counter: u16,
    pub events: TimebaseEvents,
    pub output: Level,
    /// Control-loop step executed on this tick, if any.
    pub step: Option<ControlStep>,
}

/// Tick-accurate closed loop.
pub struct ClosedLoop<'o, S> {
    hardware: LoopHardware<'o, S>,
    router: TriggerRouter,
    dispatcher: InterruptDispatcher<LoopHardware<'o, S>>,
    channel: AdcChannel,
    telemetry: TelemetryRecorder<TickInstant>,
    now: TickInstant,
    fault: Option<LoopFault>,
}

impl<'o, S: SampleSource> ClosedLoop<'o, S> {
    /// Builds a stopped loop without an observer.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when `config` does not validate.
    pub fn new(config: &LoopConfig, source: S) -> Result<Self, ConfigError> {
        Self::build(config, source, ControlLoop::new())
    }

    /// Builds a stopped loop that publishes every step to `observer`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when `config` does not validate.
    pub fn with_observer(
        config: &LoopConfig,
        source: S,
        observer: &'o LoopObserver,
    ) -> Result<Self, ConfigError> {
        Self::build(config, source, ControlLoop::with_observer(observer))
    }

    fn build(config: &LoopConfig, source: S, control: ControlLoop<'o>) -> Result<Self, ConfigError> {
        config.validate()?;
        let pulse = config.pulse()?;

        Ok(Self {
            hardware: LoopHardware {
                pwm: PulseGenerator::new(pulse, config.polarity),
                adc: SimulatedAdc::new(source, config.conversion_latency()),
                irq: SimInterruptController::new(),
                control,
            },
            router: TriggerRouter::new(config.trigger),
            dispatcher: InterruptDispatcher::new(),
            channel: config.channel,
            telemetry: TelemetryRecorder::new(),
            now: TickInstant::default(),
            fault: None,
        })
    }

    /// Binds or rebinds the handler for `line`.
    ///
    /// # Errors
    ///
    /// Returns [`LoopFault::HandlerTableFull`] when the table has no free slot.
    pub fn register_handler(
        &mut self,
        line: InterruptLine,
        handler: Handler<LoopHardware<'o, S>>,
    ) -> Result<(), LoopFault> {
        self.dispatcher.register(line, handler)?;
        Ok(())
    }

    /// Binds the control loop to the conversion interrupt unless a handler
    /// was registered already, unmasks it, enables the router and starts the
    /// timebase. The start itself is a counter zero.
    ///
    /// # Errors
    ///
    /// Returns the recorded fault of a halted loop, a full handler table, or a
    /// fault raised on the start tick.
    pub fn start(&mut self) -> Result<TickReport, LoopFault> {
        self.check_fault()?;
        if !self.dispatcher.is_bound(InterruptLine::ConversionComplete) {
            self.register_handler(InterruptLine::ConversionComplete, conversion_complete::<S>)?;
        }
        self.hardware
            .irq
            .enable(InterruptLine::ConversionComplete);
        self.router.enable();
        let events = self.hardware.pwm.start();
        self.process(events)
    }

    /// Advances the whole chain by one timebase tick.
    ///
    /// # Errors
    ///
    /// Returns the [`LoopFault`] that halted the loop on this or an earlier tick.
    pub fn tick(&mut self) -> Result<TickReport, LoopFault> {
        self.check_fault()?;
        self.now = TickInstant(self.now.0 + 1);
        let events = self.hardware.pwm.tick();
        self.process(events)
    }

    /// Advances by `periods` full periods of the committed timebase.
    ///
    /// # Errors
    ///
    /// Stops at the first tick that returns a [`LoopFault`].
    pub fn run_periods(&mut self, periods: u32) -> Result<(), LoopFault> {
        for _ in 0..periods {
            for _ in 0..self.hardware.pwm.committed().period() {
                self.tick()?;
            }
        }
        Ok(())
    }

    fn check_fault(&self) -> Result<(), LoopFault> {
        match self.fault {
            Some(fault) => Err(fault),
            None => Ok(()),
        }
    }

    fn process(&mut self, events: TimebaseEvents) -> Result<TickReport, LoopFault> {
        if let Some(config) = events.committed {
            self.telemetry.record_compare_committed(config, self.now);
        }

        if self.router.on_timebase(&events).is_some() {
            match self.hardware.adc.start_conversion(self.channel) {
                Ok(()) => {
                    self.telemetry
                        .record_conversion_started(self.channel, self.now);
                }
                Err(SamplingError::Overrun) => {
                    self.telemetry.record_overrun(self.channel, self.now);
                    return Err(self.halt(LoopFault::Overrun { at: self.now }));
                }
            }
        }

        if self.hardware.adc.tick() {
            self.hardware.irq.raise(InterruptLine::ConversionComplete);
        }

        let before = self.hardware.control.conversions();
        while let Some(line) = self.hardware.irq.next_deliverable() {
            if let Err(error) = self.dispatcher.dispatch(line, &mut self.hardware) {
                return Err(self.halt(error.into()));
            }
        }

        let step = (self.hardware.control.conversions() != before)
            .then(|| self.hardware.control.last())
            .flatten();
        if let Some(step) = step {
            self.telemetry.record_conversion_complete(step, self.now);
        }

        Ok(TickReport {
            at: self.now,
            counter: self.hardware.pwm.counter(),
            events,
            output: self.hardware.pwm.output(),
            step,
        })
    }

    fn halt(&mut self, fault: LoopFault) -> LoopFault {
        self.router.disable();
        self.fault = Some(fault);
        fault
    }

    #[must_use]
    pub fn now(&self) -> TickInstant {
        self.now
    }

    #[must_use]
    pub fn fault(&self) -> Option<LoopFault> {
        self.fault
    }

    #[must_use]
    pub fn hardware(&self) -> &LoopHardware<'o, S> {
        &self.hardware
    }

    /// Input source of the simulated converter.
    pub fn source_mut(&mut self) -> &mut S {
        self.hardware.adc.source_mut()
    }

    #[must_use]
    pub fn router(&self) -> &TriggerRouter {
        &self.router
    }

    #[must_use]
    pub fn control(&self) -> &ControlLoop<'o> {
        &self.hardware.control
    }

    #[must_use]
    pub fn telemetry(&self) -> &TelemetryRecorder<TickInstant> {
        &self.telemetry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pulse::CompareRegister;
    use crate::sample::SampleValue;
    use crate::telemetry::{TelemetryEventKind, TelemetryPayload};

    fn held(raw: u16) -> HeldSample {
        HeldSample(SampleValue::new(raw).unwrap())
    }

    fn small_config(period: u16) -> LoopConfig {
        LoopConfig {
            period,
            ..LoopConfig::default()
        }
    }

    #[test]
    fn first_conversion_lands_after_latency() {
        let mut sim = ClosedLoop::new(&small_config(100), held(4_095)).unwrap();
        let report = sim.start().unwrap();
        assert!(report.events.zero);
        assert_eq!(report.step, None);

        let latency = u64::from(small_config(100).conversion_latency());
        let mut landed = None;
        for _ in 0..100 {
            let report = sim.tick().unwrap();
            if report.step.is_some() {
                landed = Some(report.at);
                break;
            }
        }
        assert_eq!(landed, Some(TickInstant(latency)));
        assert_eq!(sim.hardware().pwm.pending().map(|c| c.compare()), Some(100));
        assert_eq!(sim.hardware().pwm.committed().compare(), 0);
    }

    #[test]
    fn committed_compare_drives_waveform() {
        let mut sim = ClosedLoop::new(&small_config(50), held(2_048)).unwrap();
        sim.start().unwrap();
        sim.run_periods(1).unwrap();

        // Second period runs on the compare derived from the first sample.
        let committed = sim.hardware().pwm.committed().compare();
        assert_eq!(committed, 25);
        let mut high = 0;
        for _ in 0..50 {
            if sim.tick().unwrap().output.is_high() {
                high += 1;
            }
        }
        assert_eq!(high, 25);
    }

    #[test]
    fn overrun_halts_the_loop() {
        // Latency 23 ticks against a 20 tick period.
        let mut sim = ClosedLoop::new(&small_config(20), held(1)).unwrap();
        sim.start().unwrap();

        let fault = sim.run_periods(2).unwrap_err();
        assert_eq!(fault, LoopFault::Overrun { at: TickInstant(20) });
        assert_eq!(sim.tick(), Err(fault));
        assert!(!sim.router().is_enabled());
        assert_eq!(
            sim.telemetry().latest().map(|record| record.event),
            Some(TelemetryEventKind::Overrun)
        );
    }

    fn read_without_acknowledge<S: SampleSource>(hardware: &mut LoopHardware<'_, S>) {
        hardware.adc.read_result();
        hardware.adc.clear_interrupt();
    }

    #[test]
    fn missing_acknowledge_stalls_the_group() {
        let mut sim = ClosedLoop::new(&small_config(100), held(10)).unwrap();
        sim.register_handler(
            InterruptLine::ConversionComplete,
            read_without_acknowledge::<HeldSample>,
        )
        .unwrap();
        sim.start().unwrap();

        // First completion is delivered and never acknowledged; the second
        // stays pending with its flag set, so the third start overruns.
        let fault = sim.run_periods(3).unwrap_err();
        assert_eq!(fault, LoopFault::Overrun { at: TickInstant(200) });
        assert_eq!(sim.hardware().irq.delivered(), 1);
        assert!(sim.hardware().irq.is_pending(InterruptLine::ConversionComplete));
        assert_eq!(sim.control().conversions(), 0);
    }

    fn ignore_temperature<S: SampleSource>(hardware: &mut LoopHardware<'_, S>) {
        hardware.adc.clear_interrupt();
    }

    #[test]
    fn start_binds_control_loop_beside_other_handlers() {
        let mut sim = ClosedLoop::new(&small_config(100), held(4_095)).unwrap();
        sim.register_handler(
            InterruptLine::TemperatureComplete,
            ignore_temperature::<HeldSample>,
        )
        .unwrap();
        sim.start().unwrap();
        sim.run_periods(2).unwrap();

        assert_eq!(sim.control().conversions(), 2);
        assert_eq!(sim.hardware().pwm.committed().compare(), 100);
    }

    #[test]
    fn telemetry_follows_one_period() {
        let mut sim = ClosedLoop::new(&small_config(100), held(4_095)).unwrap();
        sim.start().unwrap();
        sim.run_periods(1).unwrap();

        let kinds: heapless::Vec<TelemetryEventKind, 8> = sim
            .telemetry()
            .oldest_first()
            .map(|record| record.event)
            .collect();
        assert_eq!(
            &kinds[..],
            &[
                TelemetryEventKind::ConversionStarted,
                TelemetryEventKind::ConversionComplete,
                TelemetryEventKind::CompareCommitted,
                TelemetryEventKind::ConversionStarted,
            ]
        );

        let commit = sim
            .telemetry()
            .oldest_first()
            .find(|record| record.event == TelemetryEventKind::CompareCommitted)
            .map(|record| record.details);
        match commit {
            Some(TelemetryPayload::Commit(config)) => {
                assert_eq!(config.compare(), 100);
                assert_eq!(config.period(), sim.hardware().pwm.period());
            }
            other => panic!("expected commit payload, got {other:?}"),
        }
    }
}
