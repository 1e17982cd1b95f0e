use cortex_m::interrupt;
use cortex_m::register::primask;
use critical_section::{self, RawRestoreState};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_stm32 as hal;
use embassy_stm32::adc::Adc;

use crate::hw::adc::{TriggeredAdc, configure_reference};
use crate::hw::ReferenceBuffer;
use crate::hw::timebase::{PulseTimer, pwm_driver, route_actuation_output};
use crate::isr::{self, IsrContext};
use crate::startup;
use crate::telemetry;

mod report_task;

critical_section::set_impl!(InterruptCriticalSection);

struct InterruptCriticalSection;

unsafe impl critical_section::Impl for InterruptCriticalSection {
    unsafe fn acquire() -> RawRestoreState {
        let primask = primask::read();
        interrupt::disable();
        primask.is_active()
    }

    unsafe fn release(restore_state: RawRestoreState) {
        if restore_state {
            unsafe {
                interrupt::enable();
            }
        }
    }
}

#[embassy_executor::main]
pub async fn main(spawner: Spawner) {
    let hal::Peripherals { TIM3, PA6, ADC1, .. } = hal::init(hal::Config::default());

    let config = startup::resolve_or_default(startup::CONFIG_LINE);
    telemetry::log_config(&config);

    configure_reference(ReferenceBuffer::for_config(
        config.reference,
        config.reference_voltage,
    ));

    let driver = pwm_driver(TIM3, route_actuation_output(PA6), config.period);

    let started = PulseTimer::new(driver, &config)
        .map_err(|_| "pulse timer rejected configuration")
        .and_then(|pwm| {
            let adc = TriggeredAdc::new(Adc::new(ADC1), &config);
            isr::install_and_start(IsrContext::new(pwm, adc, config.channel))
                .map_err(|_| "converter busy at start")
        });
    if let Err(message) = started {
        telemetry::log_fault(message);
    }

    if let Err(error) = spawner.spawn(report_task::run()) {
        defmt::error!("report task: {}", defmt::Debug2Format(&error));
    }

    core::future::pending::<()>().await;
}
