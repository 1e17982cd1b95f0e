//! Logging helpers for the firmware.
//!
//! Lines are rendered into a fixed-capacity buffer with `core::fmt`, then
//! handed to defmt on the target or printed to the console on the host, so the
//! text stays identical between the two and can be unit tested.

#![cfg_attr(not(target_os = "none"), allow(dead_code))]

use core::fmt::{self, Write};

use controller_core::config::LoopConfig;
use controller_core::status::StatusFormatter;
use heapless::String;

use crate::startup::StartupError;
use crate::status::FirmwareStatus;

/// Capacity of one rendered log line.
pub const LOG_LINE_CAPACITY: usize = 160;

pub type LogLine = String<LOG_LINE_CAPACITY>;

/// Renders `args` into a log line. Fails when the line does not fit.
pub fn render(args: fmt::Arguments<'_>) -> Result<LogLine, fmt::Error> {
    let mut line = LogLine::new();
    line.write_fmt(args)?;
    Ok(line)
}

pub fn status_line(status: &FirmwareStatus) -> Result<LogLine, fmt::Error> {
    render(format_args!(
        "status {} overruns={}",
        StatusFormatter::new(&status.loop_state),
        status.overruns
    ))
}

/// Logs the periodic status report. `new_overruns` counts the overruns since
/// the previous report and raises the line to a warning when non-zero.
pub fn log_status(status: &FirmwareStatus, new_overruns: u32) {
    match status_line(status) {
        Ok(line) if new_overruns > 0 => emit_warn(line.as_str()),
        Ok(line) => emit_info(line.as_str()),
        Err(_) => emit_warn("status line overflow"),
    }
}

pub fn log_config(config: &LoopConfig) {
    let fits = if config.conversion_fits() { "fits" } else { "overruns" };
    match render(format_args!(
        "config {config} latency={} ({fits})",
        config.conversion_latency()
    )) {
        Ok(line) => emit_info(line.as_str()),
        Err(_) => emit_warn("config line overflow"),
    }
}

pub fn log_startup_fallback(error: &StartupError<'_>) {
    match render(format_args!("config rejected: {error}; using defaults")) {
        Ok(line) => emit_warn(line.as_str()),
        Err(_) => emit_warn("config rejected; using defaults"),
    }
}

pub fn log_fault(message: &str) {
    emit_error(message);
}

#[cfg(target_os = "none")]
fn emit_info(line: &str) {
    defmt::info!("{=str}", line);
}

#[cfg(target_os = "none")]
fn emit_warn(line: &str) {
    defmt::warn!("{=str}", line);
}

#[cfg(target_os = "none")]
fn emit_error(line: &str) {
    defmt::error!("{=str}", line);
}

#[cfg(not(target_os = "none"))]
fn emit_info(line: &str) {
    println!("{line}");
}

#[cfg(not(target_os = "none"))]
fn emit_warn(line: &str) {
    eprintln!("warn: {line}");
}

#[cfg(not(target_os = "none"))]
fn emit_error(line: &str) {
    eprintln!("error: {line}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use controller_core::control::ControlStep;
    use controller_core::sample::SampleValue;
    use controller_core::status::StatusSnapshot;

    #[test]
    fn idle_status_line() {
        let status = FirmwareStatus {
            loop_state: StatusSnapshot {
                extrema: None,
                last: None,
                period: 0,
                conversions: 0,
            },
            overruns: 0,
        };
        let line = status_line(&status).unwrap();
        assert_eq!(
            line.as_str(),
            "status conversions=0 min=- max=- sample=- compare=- overruns=0"
        );
    }

    #[test]
    fn widest_status_line_fits() {
        let full = SampleValue::FULL_SCALE;
        let status = FirmwareStatus {
            loop_state: StatusSnapshot {
                extrema: Some((full, full)),
                last: Some(ControlStep {
                    sample: full,
                    compare: u16::MAX,
                }),
                period: u16::MAX,
                conversions: u32::MAX,
            },
            overruns: u32::MAX,
        };
        let line = status_line(&status).unwrap();
        assert!(line.ends_with("duty=100.00% overruns=4294967295"), "{line}");
    }

    #[test]
    fn render_reports_overflow() {
        let long = [b'x'; LOG_LINE_CAPACITY + 1];
        let long = core::str::from_utf8(&long).unwrap();
        assert!(render(format_args!("{long}")).is_err());
    }
}
