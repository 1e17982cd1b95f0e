#![cfg_attr(target_os = "none", no_std)]
#![cfg_attr(target_os = "none", no_main)]

#[cfg(target_os = "none")]
extern crate panic_halt;

mod hw;
mod startup;
mod status;
mod telemetry;

#[cfg(target_os = "none")]
mod isr;
#[cfg(target_os = "none")]
mod runtime;

#[cfg(not(target_os = "none"))]
fn main() {
    let config = startup::resolve_or_default(startup::CONFIG_LINE);
    telemetry::log_config(&config);
}
