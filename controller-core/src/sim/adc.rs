//! Tick-accurate single-shot converter.

use heapless::Vec;

use crate::sample::{AdcChannel, SampleValue};
use crate::sampling::{SampleProducer, SamplingError, SamplingUnit};

/// Supplies the analog value seen at the end of each conversion.
pub trait SampleSource {
    fn sample(&mut self, channel: AdcChannel) -> SampleValue;
}

impl<F> SampleSource for F
where
    F: FnMut(AdcChannel) -> SampleValue,
{
    fn sample(&mut self, channel: AdcChannel) -> SampleValue {
        self(channel)
    }
}

/// Constant input the caller can change between conversions.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct HeldSample(pub SampleValue);

impl SampleSource for HeldSample {
    fn sample(&mut self, _channel: AdcChannel) -> SampleValue {
        self.0
    }
}

/// Replays a fixed sequence, then holds the last value.
#[derive(Clone, Debug)]
pub struct SampleSequence<const N: usize> {
    samples: Vec<SampleValue, N>,
    next: usize,
}

impl<const N: usize> SampleSequence<N> {
    /// Returns `None` if `samples` holds more than `N` values.
    #[must_use]
    pub fn new(samples: &[SampleValue]) -> Option<Self> {
        Some(Self {
            samples: Vec::from_slice(samples).ok()?,
            next: 0,
        })
    }

    /// Number of samples handed out so far.
    #[must_use]
    pub fn consumed(&self) -> usize {
        self.next
    }
}

impl<const N: usize> SampleSource for SampleSequence<N> {
    fn sample(&mut self, _channel: AdcChannel) -> SampleValue {
        let index = self.next.min(self.samples.len().saturating_sub(1));
        self.next = self.next.saturating_add(1);
        self.samples.get(index).copied().unwrap_or(SampleValue::ZERO)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum ConversionState {
    Idle,
    Converting { channel: AdcChannel, remaining: u16 },
}

/// Converter that completes `latency` ticks after each start.
pub struct SimulatedAdc<S> {
    source: S,
    latency: u16,
    state: ConversionState,
    result: SampleValue,
    flag: bool,
    completed: u32,
}

impl<S: SampleSource> SimulatedAdc<S> {
    #[must_use]
    pub fn new(source: S, latency: u16) -> Self {
        Self {
            source,
            latency,
            state: ConversionState::Idle,
            result: SampleValue::ZERO,
            flag: false,
            completed: 0,
        }
    }

    /// Advances the conversion by one tick. Returns `true` on the tick the
    /// result lands and the completion flag rises.
    pub fn tick(&mut self) -> bool {
        match self.state {
            ConversionState::Idle => false,
            ConversionState::Converting { channel, remaining: 0 } => {
                self.result = self.source.sample(channel);
                self.state = ConversionState::Idle;
                self.flag = true;
                self.completed = self.completed.wrapping_add(1);
                true
            }
            ConversionState::Converting { channel, remaining } => {
                self.state = ConversionState::Converting {
                    channel,
                    remaining: remaining - 1,
                };
                false
            }
        }
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        matches!(self.state, ConversionState::Converting { .. })
    }

    #[must_use]
    pub fn latency(&self) -> u16 {
        self.latency
    }

    /// Conversions finished since construction.
    #[must_use]
    pub fn completed(&self) -> u32 {
        self.completed
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }
}

impl<S: SampleSource> SamplingUnit for SimulatedAdc<S> {
    fn start_conversion(&mut self, channel: AdcChannel) -> Result<(), SamplingError> {
        if self.is_busy() || self.flag {
            return Err(SamplingError::Overrun);
        }
        self.state = ConversionState::Converting {
            channel,
            remaining: self.latency,
        };
        Ok(())
    }

    fn conversion_complete(&self) -> bool {
        self.flag
    }

    fn read_result(&mut self) -> SampleValue {
        self.result
    }

    fn clear_interrupt(&mut self) {
        self.flag = false;
    }
}

impl<S: SampleSource> SampleProducer for SimulatedAdc<S> {
    fn poll_sample(&mut self) -> Option<SampleValue> {
        if !self.flag {
            return None;
        }
        self.flag = false;
        Some(self.result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> AdcChannel {
        AdcChannel::new(0).unwrap()
    }

    fn sample(raw: u16) -> SampleValue {
        SampleValue::new(raw).unwrap()
    }

    #[test]
    fn completes_after_latency_ticks() {
        let mut adc = SimulatedAdc::new(HeldSample(sample(1_234)), 3);
        adc.start_conversion(channel()).unwrap();

        let completions: Vec<bool, 5> = (0..5).map(|_| adc.tick()).collect();
        assert_eq!(&completions[..], &[false, false, false, true, false]);
        assert!(adc.conversion_complete());
        assert_eq!(adc.read_result(), sample(1_234));
    }

    #[test]
    fn start_before_acknowledge_is_overrun() {
        let mut adc = SimulatedAdc::new(HeldSample(sample(1)), 0);
        adc.start_conversion(channel()).unwrap();
        assert_eq!(adc.start_conversion(channel()), Err(SamplingError::Overrun));

        assert!(adc.tick());
        assert_eq!(adc.start_conversion(channel()), Err(SamplingError::Overrun));

        adc.read_result();
        adc.clear_interrupt();
        assert_eq!(adc.start_conversion(channel()), Ok(()));
    }

    #[test]
    fn sequence_holds_last_value() {
        let mut source = SampleSequence::<4>::new(&[sample(1), sample(2)]).unwrap();
        assert_eq!(source.sample(channel()), sample(1));
        assert_eq!(source.sample(channel()), sample(2));
        assert_eq!(source.sample(channel()), sample(2));
        assert_eq!(source.consumed(), 3);
        assert!(SampleSequence::<1>::new(&[sample(1), sample(2)]).is_none());
    }

    #[test]
    fn polling_consumes_completion() {
        let mut adc = SimulatedAdc::new(|_: AdcChannel| sample(7), 0);
        assert_eq!(adc.poll_sample(), None);
        adc.start_conversion(channel()).unwrap();
        adc.tick();
        assert_eq!(adc.poll_sample(), Some(sample(7)));
        assert_eq!(adc.poll_sample(), None);
    }
}
