use controller_core::config::{LoopConfig, parse_config};
use controller_core::sample::{MAX_SAMPLE, SampleValue};
use controller_core::sim::{ClosedLoop, HeldSample, LoopFault, SampleSequence, TickInstant};
use controller_core::status::{LoopObserver, StatusFormatter};
use controller_core::telemetry::{TelemetryEventKind, TelemetryPayload};
use controller_core::trigger::{TriggerConfig, TriggerPrescale, TriggerSource};

fn sample(raw: u16) -> SampleValue {
    SampleValue::new(raw).expect("sample in range")
}

fn committed_compares<S: controller_core::sim::SampleSource>(
    sim: &ClosedLoop<'_, S>,
) -> heapless::Vec<u16, 16> {
    sim.telemetry()
        .oldest_first()
        .filter_map(|record| match record.details {
            TelemetryPayload::Commit(config) => Some(config.compare()),
            _ => None,
        })
        .collect()
}

#[test]
fn reference_scenario_commits_one_value_per_boundary() {
    let config = LoopConfig::default();
    let source = SampleSequence::<3>::new(&[sample(0), sample(MAX_SAMPLE), sample(2_048)])
        .expect("three samples fit");
    let mut sim = ClosedLoop::new(&config, source).expect("default config is valid");

    sim.start().expect("start");
    sim.run_periods(3).expect("no overrun at the reference configuration");

    // floor(2048 * 1000 / 4095) = 500.
    assert_eq!(&committed_compares(&sim)[..], &[0, 1_000, 500]);

    let extrema = sim.control().extrema();
    assert_eq!(extrema.minimum(), sample(0));
    assert_eq!(extrema.maximum(), sample(MAX_SAMPLE));
    assert_eq!(sim.control().conversions(), 3);
}

#[test]
fn period_999_maps_half_scale_to_499() {
    let config = parse_config("period=999").expect("valid config");
    let mut sim = ClosedLoop::new(&config, HeldSample(sample(2_047))).expect("valid loop");

    sim.start().expect("start");
    sim.run_periods(1).expect("one period");

    assert_eq!(sim.hardware().pwm.committed().compare(), 499);
}

#[test]
fn committed_value_is_constant_between_zero_events() {
    let config = parse_config("period=64 window=4").expect("valid config");
    let source = SampleSequence::<8>::new(&[
        sample(100),
        sample(4_000),
        sample(1_500),
        sample(3_000),
        sample(0),
    ])
    .expect("samples fit");
    let mut sim = ClosedLoop::new(&config, source).expect("valid loop");
    sim.start().expect("start");

    let mut current = sim.hardware().pwm.committed();
    for _ in 0..(64 * 6) {
        let report = sim.tick().expect("tick");
        let committed = sim.hardware().pwm.committed();
        if report.events.zero {
            current = committed;
        } else {
            assert_eq!(committed, current, "commit outside a zero event at {}", report.at);
        }
    }
}

#[test]
fn prescale_samples_every_nth_period() {
    let config = LoopConfig {
        period: 40,
        trigger: TriggerConfig {
            source: TriggerSource::CounterZero,
            prescale: TriggerPrescale::new(3).expect("prescale in range"),
        },
        ..LoopConfig::default()
    };
    let mut sim = ClosedLoop::new(&config, HeldSample(sample(1_000))).expect("valid loop");
    sim.start().expect("start");
    sim.run_periods(9).expect("no overrun");

    assert_eq!(sim.control().conversions(), 3);
}

#[test]
fn compare_trigger_samples_mid_period() {
    let config = parse_config("period=200 trigger=compare").expect("valid config");
    let mut sim = ClosedLoop::new(&config, HeldSample(sample(2_048))).expect("valid loop");
    sim.start().expect("start");

    // The initial compare is zero, so the first start coincides with the
    // start event. From the second period on the comparator matches at 100.
    sim.run_periods(3).expect("no overrun");
    let starts: heapless::Vec<TickInstant, 8> = sim
        .telemetry()
        .oldest_first()
        .filter(|record| record.event == TelemetryEventKind::ConversionStarted)
        .map(|record| record.timestamp)
        .collect();
    assert_eq!(
        &starts[..],
        &[TickInstant(0), TickInstant(300), TickInstant(500)]
    );
}

#[test]
fn compare_trigger_keeps_sampling_at_full_scale() {
    let config = parse_config("period=200 trigger=compare").expect("valid config");
    let mut sim = ClosedLoop::new(&config, HeldSample(sample(MAX_SAMPLE))).expect("valid loop");
    sim.start().expect("start");

    // Full scale commits compare == period, which the counter never reaches;
    // the start moves to the last tick (t = 399, 599, ...) so every period
    // still converts.
    sim.run_periods(20).expect("no overrun");
    assert_eq!(sim.hardware().pwm.committed().compare(), 200);
    assert_eq!(sim.control().conversions(), 19);
    assert_eq!(sim.fault(), None);
}

#[test]
fn observer_reports_what_the_loop_did() {
    let observer = LoopObserver::new();
    let config = LoopConfig::default();
    let source = SampleSequence::<3>::new(&[sample(300), sample(3_900), sample(2_048)])
        .expect("samples fit");
    let mut sim = ClosedLoop::with_observer(&config, source, &observer).expect("valid loop");
    sim.start().expect("start");
    sim.run_periods(3).expect("no overrun");

    let snapshot = observer.snapshot();
    assert_eq!(snapshot.conversions, 3);
    assert_eq!(snapshot.extrema, Some((sample(300), sample(3_900))));
    assert_eq!(snapshot.period, 1_000);

    let line = format!("{}", StatusFormatter::new(&snapshot));
    assert!(line.starts_with("conversions=3 min=300 max=3900"), "{line}");
}

#[test]
fn latency_longer_than_period_overruns() {
    let config = parse_config("period=30 window=40").expect("valid config");
    assert!(!config.conversion_fits());

    let mut sim = ClosedLoop::new(&config, HeldSample(sample(1))).expect("valid loop");
    sim.start().expect("start");
    assert_eq!(
        sim.run_periods(2),
        Err(LoopFault::Overrun {
            at: TickInstant(30)
        })
    );
    assert_eq!(sim.fault(), Some(LoopFault::Overrun { at: TickInstant(30) }));
}
