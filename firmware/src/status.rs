#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Shared status storage for the firmware target.
//!
//! The interrupt handler publishes into [`OBSERVER`] and bumps the overrun
//! counter; the report task reads both without taking the loop context lock.

use controller_core::status::{LoopObserver, StatusSnapshot};
use portable_atomic::{AtomicU32, Ordering};

/// Latest control-loop state, written from the conversion-complete interrupt.
pub static OBSERVER: LoopObserver = LoopObserver::new();

/// Conversions lost because a trigger arrived before the previous result was read.
static OVERRUNS: AtomicU32 = AtomicU32::new(0);

pub fn record_overrun() {
    OVERRUNS.fetch_add(1, Ordering::Relaxed);
}

pub fn overruns() -> u32 {
    OVERRUNS.load(Ordering::Relaxed)
}

/// Everything the periodic report prints.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FirmwareStatus {
    pub loop_state: StatusSnapshot,
    pub overruns: u32,
}

pub fn snapshot() -> FirmwareStatus {
    FirmwareStatus {
        loop_state: OBSERVER.snapshot(),
        overruns: overruns(),
    }
}
