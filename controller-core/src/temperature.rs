//! On-die temperature sensor, kept beside the control loop.
//!
//! The sensor shares the converter's acknowledge group but is not part of the
//! default interrupt graph; callers either poll it through [`SampleProducer`]
//! or bind [`TemperatureSensor::on_conversion_complete`] to
//! [`InterruptLine::TemperatureComplete`] themselves.

use crate::config::ReferenceVoltage;
use crate::interrupt::{InterruptController, InterruptLine};
use crate::sample::{AdcChannel, SampleValue};
use crate::sampling::{SampleProducer, SamplingError, SamplingUnit};

/// Millivolts at which the calibration constants were characterised.
pub const CALIBRATION_REFERENCE_MV: i32 = 2_500;

/// Linear sensor calibration.
///
/// `celsius = (sample * vref / 2.5 V - offset) * slope_q12 / 4096`, truncated
/// toward zero.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TemperatureCalibration {
    /// Reading at 0 °C, in counts against a 2.5 V reference.
    pub offset: i32,
    /// Degrees per count in Q12.
    pub slope_q12: i32,
}

impl TemperatureCalibration {
    /// Typical-part constants used when no trimmed values are available.
    pub const NOMINAL: Self = Self {
        offset: 1_035,
        slope_q12: 5_734,
    };

    /// Converts a sensor reading taken against `reference` to whole degrees.
    #[must_use]
    pub fn to_celsius(&self, sample: SampleValue, reference: ReferenceVoltage) -> i16 {
        let normalized =
            i32::from(sample.get()) * i32::from(reference.millivolts()) / CALIBRATION_REFERENCE_MV;
        let celsius =
            (i64::from(normalized) - i64::from(self.offset)) * i64::from(self.slope_q12) / 4_096;
        i16::try_from(celsius).unwrap_or(if celsius < 0 { i16::MIN } else { i16::MAX })
    }
}

impl Default for TemperatureCalibration {
    fn default() -> Self {
        Self::NOMINAL
    }
}

/// Temperature channel driven by its own sampling unit.
pub struct TemperatureSensor<U> {
    adc: U,
    channel: AdcChannel,
    calibration: TemperatureCalibration,
    reference: ReferenceVoltage,
    last_celsius: Option<i16>,
}

impl<U: SamplingUnit> TemperatureSensor<U> {
    #[must_use]
    pub fn new(
        adc: U,
        channel: AdcChannel,
        calibration: TemperatureCalibration,
        reference: ReferenceVoltage,
    ) -> Self {
        Self {
            adc,
            channel,
            calibration,
            reference,
            last_celsius: None,
        }
    }

    /// Starts one conversion on the sensor channel.
    ///
    /// # Errors
    ///
    /// Returns [`SamplingError::Overrun`] while the previous reading is unread.
    pub fn start(&mut self) -> Result<(), SamplingError> {
        self.adc.start_conversion(self.channel)
    }

    /// Interrupt-time handler: reads, converts, clears the flag and
    /// acknowledges the converter group.
    pub fn on_conversion_complete<I: InterruptController>(&mut self, irq: &mut I) -> i16 {
        let sample = self.adc.read_result();
        let celsius = self.calibration.to_celsius(sample, self.reference);
        self.last_celsius = Some(celsius);
        self.adc.clear_interrupt();
        irq.acknowledge_group(InterruptLine::TemperatureComplete.group());
        celsius
    }

    /// Polls for a finished conversion and converts it.
    pub fn read_celsius(&mut self) -> Option<i16> {
        let sample = self.poll_sample()?;
        let celsius = self.calibration.to_celsius(sample, self.reference);
        self.last_celsius = Some(celsius);
        Some(celsius)
    }

    /// Last converted temperature.
    #[must_use]
    pub fn last_celsius(&self) -> Option<i16> {
        self.last_celsius
    }

    pub fn adc_mut(&mut self) -> &mut U {
        &mut self.adc
    }

    #[must_use]
    pub fn into_inner(self) -> U {
        self.adc
    }
}

impl<U: SamplingUnit> SampleProducer for TemperatureSensor<U> {
    fn poll_sample(&mut self) -> Option<SampleValue> {
        if !self.adc.conversion_complete() {
            return None;
        }
        let sample = self.adc.read_result();
        self.adc.clear_interrupt();
        Some(sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interrupt::AckGroup;

    struct OneShot {
        result: u16,
        started: Option<AdcChannel>,
        complete: bool,
        cleared: bool,
    }

    impl OneShot {
        fn new(result: u16) -> Self {
            Self {
                result,
                started: None,
                complete: false,
                cleared: false,
            }
        }
    }

    impl SamplingUnit for OneShot {
        fn start_conversion(&mut self, channel: AdcChannel) -> Result<(), SamplingError> {
            if self.complete {
                return Err(SamplingError::Overrun);
            }
            self.started = Some(channel);
            self.complete = true;
            Ok(())
        }

        fn conversion_complete(&self) -> bool {
            self.complete
        }

        fn read_result(&mut self) -> SampleValue {
            SampleValue::saturating(self.result)
        }

        fn clear_interrupt(&mut self) {
            self.complete = false;
            self.cleared = true;
        }
    }

    #[derive(Default)]
    struct AckCounter {
        acknowledged: heapless::Vec<AckGroup, 4>,
    }

    impl InterruptController for AckCounter {
        fn enable(&mut self, _line: InterruptLine) {}

        fn acknowledge_group(&mut self, group: AckGroup) {
            self.acknowledged.push(group).unwrap();
        }
    }

    fn sample(raw: u16) -> SampleValue {
        SampleValue::new(raw).unwrap()
    }

    #[test]
    fn nominal_calibration_crosses_zero_at_offset() {
        let calibration = TemperatureCalibration::NOMINAL;
        assert_eq!(calibration.to_celsius(sample(1_035), ReferenceVoltage::V2_5), 0);
        assert_eq!(calibration.to_celsius(sample(1_053), ReferenceVoltage::V2_5), 25);
        assert!(calibration.to_celsius(sample(1_000), ReferenceVoltage::V2_5) < 0);
    }

    #[test]
    fn reference_voltage_rescales_reading() {
        let calibration = TemperatureCalibration {
            offset: 0,
            slope_q12: 4_096,
        };
        assert_eq!(calibration.to_celsius(sample(1_000), ReferenceVoltage::V2_5), 1_000);
        assert_eq!(calibration.to_celsius(sample(1_000), ReferenceVoltage::V3_3), 1_320);
    }

    #[test]
    fn extreme_calibration_saturates() {
        let hot = TemperatureCalibration {
            offset: i32::MIN,
            slope_q12: i32::MAX,
        };
        let cold = TemperatureCalibration {
            offset: i32::MAX,
            slope_q12: i32::MAX,
        };
        assert_eq!(hot.to_celsius(sample(4_095), ReferenceVoltage::V3_3), i16::MAX);
        assert_eq!(cold.to_celsius(sample(0), ReferenceVoltage::V2_5), i16::MIN);
    }

    #[test]
    fn polling_reads_once_per_conversion() {
        let mut sensor = TemperatureSensor::new(
            OneShot::new(1_053),
            AdcChannel::new(12).unwrap(),
            TemperatureCalibration::NOMINAL,
            ReferenceVoltage::V2_5,
        );

        assert_eq!(sensor.read_celsius(), None);
        sensor.start().unwrap();
        assert_eq!(sensor.adc_mut().started, AdcChannel::new(12));
        assert_eq!(sensor.read_celsius(), Some(25));
        assert_eq!(sensor.read_celsius(), None);
        assert_eq!(sensor.last_celsius(), Some(25));
        assert!(sensor.into_inner().cleared);
    }

    #[test]
    fn interrupt_handler_acknowledges_converter_group() {
        let mut sensor = TemperatureSensor::new(
            OneShot::new(1_035),
            AdcChannel::new(12).unwrap(),
            TemperatureCalibration::NOMINAL,
            ReferenceVoltage::V2_5,
        );
        let mut irq = AckCounter::default();

        sensor.start().unwrap();
        assert_eq!(sensor.on_conversion_complete(&mut irq), 0);
        assert_eq!(&irq.acknowledged[..], &[AckGroup::CONVERTER]);
        assert_eq!(sensor.start(), Ok(()));
    }
}
