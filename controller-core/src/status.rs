//! Read-only status surface for the background task.
//!
//! The control loop publishes into a [`LoopObserver`] at the end of every
//! invocation; the background task reads it through a shared reference. Each
//! field is an independent atomic, so a reader racing the interrupt may see a
//! mix of two consecutive updates. Snapshots are advisory reports, never
//! inputs to the control path.

use core::fmt;

use portable_atomic::{AtomicU16, AtomicU32, Ordering};

use crate::actuation::duty_basis_points;
use crate::control::ControlStep;
use crate::extrema::ExtremaState;
use crate::sample::{MAX_SAMPLE, SampleValue};

/// Lock-free publication slot shared between the interrupt and the background task.
pub struct LoopObserver {
    minimum: AtomicU16,
    maximum: AtomicU16,
    last_sample: AtomicU16,
    last_compare: AtomicU16,
    period: AtomicU16,
    conversions: AtomicU32,
}

impl LoopObserver {
    /// Creates an observer holding the sentinel extrema and no conversions.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            minimum: AtomicU16::new(MAX_SAMPLE),
            maximum: AtomicU16::new(0),
            last_sample: AtomicU16::new(0),
            last_compare: AtomicU16::new(0),
            period: AtomicU16::new(0),
            conversions: AtomicU32::new(0),
        }
    }

    /// Publishes the state after one control-loop invocation.
    pub fn publish(&self, extrema: &ExtremaState, step: ControlStep, period: u16, conversions: u32) {
        self.minimum.store(extrema.minimum().get(), Ordering::Relaxed);
        self.maximum.store(extrema.maximum().get(), Ordering::Relaxed);
        self.last_sample.store(step.sample.get(), Ordering::Relaxed);
        self.last_compare.store(step.compare, Ordering::Relaxed);
        self.period.store(period, Ordering::Relaxed);
        self.conversions.store(conversions, Ordering::Relaxed);
    }

    /// Reads a best-effort snapshot.
    #[must_use]
    pub fn snapshot(&self) -> StatusSnapshot {
        let conversions = self.conversions.load(Ordering::Relaxed);
        let minimum = SampleValue::saturating(self.minimum.load(Ordering::Relaxed));
        let maximum = SampleValue::saturating(self.maximum.load(Ordering::Relaxed));
        let last = (conversions > 0).then(|| ControlStep {
            sample: SampleValue::saturating(self.last_sample.load(Ordering::Relaxed)),
            compare: self.last_compare.load(Ordering::Relaxed),
        });

        StatusSnapshot {
            extrema: (minimum <= maximum).then_some((minimum, maximum)),
            last,
            period: self.period.load(Ordering::Relaxed),
            conversions,
        }
    }
}

impl Default for LoopObserver {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time view of the control loop.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct StatusSnapshot {
    /// `(minimum, maximum)` once at least one sample was observed.
    pub extrema: Option<(SampleValue, SampleValue)>,
    /// Most recent sample and the compare value derived from it.
    pub last: Option<ControlStep>,
    /// Committed period in ticks (0 before the first conversion).
    pub period: u16,
    /// Number of completed control-loop invocations.
    pub conversions: u32,
}

impl StatusSnapshot {
    /// Duty cycle requested by the latest conversion, in basis points.
    #[must_use]
    pub fn requested_duty(&self) -> Option<u16> {
        self.last
            .map(|step| duty_basis_points(step.compare, self.period))
    }
}

/// Renders a [`StatusSnapshot`] on a single line.
pub struct StatusFormatter<'a> {
    snapshot: &'a StatusSnapshot,
}

impl<'a> StatusFormatter<'a> {
    #[must_use]
    pub const fn new(snapshot: &'a StatusSnapshot) -> Self {
        Self { snapshot }
    }
}

impl fmt::Display for StatusFormatter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let snapshot = self.snapshot;
        write!(f, "conversions={}", snapshot.conversions)?;

        match snapshot.extrema {
            Some((minimum, maximum)) => write!(f, " min={minimum} max={maximum}")?,
            None => f.write_str(" min=- max=-")?,
        }

        match (snapshot.last, snapshot.requested_duty()) {
            (Some(step), Some(duty)) => write!(
                f,
                " sample={} compare={}/{} duty={}.{:02}%",
                step.sample,
                step.compare,
                snapshot.period,
                duty / 100,
                duty % 100
            ),
            _ => f.write_str(" sample=- compare=-"),
        }
    }
}
