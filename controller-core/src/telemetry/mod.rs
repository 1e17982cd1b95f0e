//! Telemetry event catalog and a fixed-size recorder for the trigger chain.
//!
//! Events follow one period of the loop: a start-of-conversion, the completed
//! conversion with the compare value derived from it, and the commit of that
//! value at the next counter zero. Kinds encode to compact numeric codes so
//! hosts can ship them over narrow diagnostics channels; the recorder keeps
//! the most recent records in a `HistoryBuf` without allocating.

use core::fmt;

use heapless::{HistoryBuf, OldestOrdered};

use crate::control::ControlStep;
use crate::pulse::PulseConfig;
use crate::sample::AdcChannel;

/// Monotonic identifier assigned to each record.
pub type EventId = u32;

/// Discriminated telemetry events.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TelemetryEventKind {
    ConversionStarted,
    ConversionComplete,
    CompareCommitted,
    Overrun,
    Custom(u16),
}

impl fmt::Display for TelemetryEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryEventKind::ConversionStarted => f.write_str("conversion-started"),
            TelemetryEventKind::ConversionComplete => f.write_str("conversion-complete"),
            TelemetryEventKind::CompareCommitted => f.write_str("compare-committed"),
            TelemetryEventKind::Overrun => f.write_str("overrun"),
            TelemetryEventKind::Custom(code) => write!(f, "custom({code})"),
        }
    }
}

impl TelemetryEventKind {
    const CONVERSION_STARTED_CODE: u16 = 0x0001;
    const CONVERSION_COMPLETE_CODE: u16 = 0x0002;
    const COMPARE_COMMITTED_CODE: u16 = 0x0003;
    const OVERRUN_CODE: u16 = 0x00F0;

    /// Encodes the event into a compact transport-friendly discriminant.
    #[must_use]
    pub const fn to_raw(self) -> u16 {
        match self {
            TelemetryEventKind::ConversionStarted => Self::CONVERSION_STARTED_CODE,
            TelemetryEventKind::ConversionComplete => Self::CONVERSION_COMPLETE_CODE,
            TelemetryEventKind::CompareCommitted => Self::COMPARE_COMMITTED_CODE,
            TelemetryEventKind::Overrun => Self::OVERRUN_CODE,
            TelemetryEventKind::Custom(code) => code,
        }
    }

    /// Decodes a raw discriminant, falling back to [`TelemetryEventKind::Custom`].
    #[must_use]
    pub const fn from_raw(code: u16) -> Self {
        match code {
            Self::CONVERSION_STARTED_CODE => TelemetryEventKind::ConversionStarted,
            Self::CONVERSION_COMPLETE_CODE => TelemetryEventKind::ConversionComplete,
            Self::COMPARE_COMMITTED_CODE => TelemetryEventKind::CompareCommitted,
            Self::OVERRUN_CODE => TelemetryEventKind::Overrun,
            other => TelemetryEventKind::Custom(other),
        }
    }
}

/// Payloads carried alongside telemetry events.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TelemetryPayload {
    None,
    /// Conversion requested on a channel.
    Conversion(AdcChannel),
    /// Control-loop result plus the ticks since the matching start.
    Step {
        step: ControlStep,
        latency_ticks: Option<u64>,
    },
    /// Configuration promoted at a counter-zero boundary.
    Commit(PulseConfig),
}

/// Total number of telemetry entries retained in memory.
pub const TELEMETRY_RING_CAPACITY: usize = 64;

/// Monotonic instants the recorder can measure spans between.
pub trait TelemetryInstant: Copy {
    /// Ticks from `earlier` to `self`, zero if `earlier` is later.
    fn saturating_ticks_since(&self, earlier: Self) -> u64;
}

/// Telemetry record stored in the ring buffer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TelemetryRecord<TInstant>
where
    TInstant: Copy,
{
    pub id: EventId,
    pub timestamp: TInstant,
    pub event: TelemetryEventKind,
    pub details: TelemetryPayload,
}

/// Telemetry ring buffer type alias.
pub type TelemetryRing<TInstant, const CAPACITY: usize = TELEMETRY_RING_CAPACITY> =
    HistoryBuf<TelemetryRecord<TInstant>, CAPACITY>;

/// Records telemetry events into a fixed-size ring buffer.
pub struct TelemetryRecorder<TInstant, const CAPACITY: usize = TELEMETRY_RING_CAPACITY>
where
    TInstant: Copy,
{
    ring: TelemetryRing<TInstant, CAPACITY>,
    conversion_started_at: Option<TInstant>,
    next_event_id: EventId,
}

impl<TInstant, const CAPACITY: usize> TelemetryRecorder<TInstant, CAPACITY>
where
    TInstant: TelemetryInstant,
{
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ring: HistoryBuf::new(),
            conversion_started_at: None,
            next_event_id: 0,
        }
    }

    /// Records in chronological order.
    pub fn oldest_first(&self) -> OldestOrdered<'_, TelemetryRecord<TInstant>> {
        self.ring.oldest_ordered()
    }

    #[must_use]
    pub fn latest(&self) -> Option<&TelemetryRecord<TInstant>> {
        self.ring.recent()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Records a start-of-conversion and remembers when it happened.
    pub fn record_conversion_started(&mut self, channel: AdcChannel, timestamp: TInstant) -> EventId {
        self.conversion_started_at = Some(timestamp);
        self.record(
            TelemetryEventKind::ConversionStarted,
            TelemetryPayload::Conversion(channel),
            timestamp,
        )
    }

    /// Records a completed control-loop step, measuring the conversion latency.
    pub fn record_conversion_complete(&mut self, step: ControlStep, timestamp: TInstant) -> EventId {
        let latency_ticks = self
            .conversion_started_at
            .take()
            .map(|started| timestamp.saturating_ticks_since(started));
        self.record(
            TelemetryEventKind::ConversionComplete,
            TelemetryPayload::Step {
                step,
                latency_ticks,
            },
            timestamp,
        )
    }

    pub fn record_compare_committed(&mut self, config: PulseConfig, timestamp: TInstant) -> EventId {
        self.record(
            TelemetryEventKind::CompareCommitted,
            TelemetryPayload::Commit(config),
            timestamp,
        )
    }

    pub fn record_overrun(&mut self, channel: AdcChannel, timestamp: TInstant) -> EventId {
        self.record(
            TelemetryEventKind::Overrun,
            TelemetryPayload::Conversion(channel),
            timestamp,
        )
    }

    /// Records an arbitrary telemetry event with the supplied payload.
    pub fn record(
        &mut self,
        event: TelemetryEventKind,
        payload: TelemetryPayload,
        timestamp: TInstant,
    ) -> EventId {
        let id = self.next_event_id;
        self.next_event_id = self.next_event_id.wrapping_add(1);

        self.ring.write(TelemetryRecord {
            id,
            timestamp,
            event,
            details: payload,
        });

        id
    }
}

impl<TInstant, const CAPACITY: usize> Default for TelemetryRecorder<TInstant, CAPACITY>
where
    TInstant: TelemetryInstant,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::SampleValue;

    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
    struct MockInstant(u64);

    impl TelemetryInstant for MockInstant {
        fn saturating_ticks_since(&self, earlier: Self) -> u64 {
            self.0.saturating_sub(earlier.0)
        }
    }

    fn channel() -> AdcChannel {
        AdcChannel::new(0).unwrap()
    }

    #[test]
    fn event_codes_decode_to_known_kinds() {
        let fixtures = [
            (TelemetryEventKind::ConversionStarted, 0x0001),
            (TelemetryEventKind::ConversionComplete, 0x0002),
            (TelemetryEventKind::CompareCommitted, 0x0003),
            (TelemetryEventKind::Overrun, 0x00F0),
        ];
        for (kind, code) in fixtures {
            assert_eq!(kind.to_raw(), code);
            assert_eq!(TelemetryEventKind::from_raw(code), kind);
        }
        assert_eq!(
            TelemetryEventKind::from_raw(0x1234),
            TelemetryEventKind::Custom(0x1234)
        );
    }

    #[test]
    fn completion_carries_latency_since_start() {
        let mut recorder = TelemetryRecorder::<MockInstant>::new();
        assert_eq!(recorder.record_conversion_started(channel(), MockInstant(100)), 0);

        let step = ControlStep {
            sample: SampleValue::new(2_048).unwrap(),
            compare: 500,
        };
        assert_eq!(recorder.record_conversion_complete(step, MockInstant(123)), 1);

        let record = recorder.latest().copied().unwrap();
        assert_eq!(record.event, TelemetryEventKind::ConversionComplete);
        match record.details {
            TelemetryPayload::Step {
                step: recorded,
                latency_ticks,
            } => {
                assert_eq!(recorded, step);
                assert_eq!(latency_ticks, Some(23));
            }
            other => panic!("expected step payload, got {other:?}"),
        }

        // A completion without a matching start has no latency.
        recorder.record_conversion_complete(step, MockInstant(200));
        match recorder.latest().map(|record| record.details) {
            Some(TelemetryPayload::Step { latency_ticks, .. }) => assert_eq!(latency_ticks, None),
            other => panic!("expected step payload, got {other:?}"),
        }
    }

    #[test]
    fn ring_keeps_most_recent_records() {
        let mut recorder = TelemetryRecorder::<MockInstant, 4>::new();
        for tick in 0..6 {
            recorder.record_overrun(channel(), MockInstant(tick));
        }

        assert_eq!(recorder.len(), 4);
        let ids: heapless::Vec<EventId, 4> = recorder.oldest_first().map(|record| record.id).collect();
        assert_eq!(&ids[..], &[2, 3, 4, 5]);
    }
}
