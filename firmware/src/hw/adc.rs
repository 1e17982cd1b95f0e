//! ADC1 as the sampling unit.
//!
//! The embassy driver powers up and calibrates the converter. The adapter then
//! switches it to single conversions started by the TIM3 trigger output, with
//! the converter clocked synchronously from PCLK so sample windows and the
//! pulse period are counted in the same ticks.

use controller_core::config::LoopConfig;
use controller_core::sample::{AdcChannel, SampleValue};
use controller_core::sampling::{SamplingError, SamplingUnit};
use embassy_stm32::adc::Adc;
use embassy_stm32::pac;
use embassy_stm32::peripherals::ADC1;

use super::{ReferenceBuffer, sample_time_index};

const ISR_ADRDY: u32 = 1 << 0;
const ISR_EOC: u32 = 1 << 2;
const ISR_EOS: u32 = 1 << 3;
const ISR_OVR: u32 = 1 << 4;
const ISR_CCRDY: u32 = 1 << 13;

const IER_EOCIE: u32 = 1 << 2;
const IER_OVRIE: u32 = 1 << 4;

const CR_ADEN: u32 = 1 << 0;
const CR_ADDIS: u32 = 1 << 1;
const CR_ADSTART: u32 = 1 << 2;

const CFGR1_EXTSEL_SHIFT: u32 = 6;
const CFGR1_EXTEN_SHIFT: u32 = 10;
const CFGR1_CONFIG_MASK: u32 = 0b111 << CFGR1_EXTSEL_SHIFT
    | 0b11 << CFGR1_EXTEN_SHIFT
    | CFGR1_OVRMOD
    | CFGR1_CONT
    | CFGR1_DISCEN
    | CFGR1_RES_MASK
    | CFGR1_ALIGN
    | CFGR1_CHSELRMOD;
const CFGR1_OVRMOD: u32 = 1 << 12;
const CFGR1_CONT: u32 = 1 << 13;
const CFGR1_DISCEN: u32 = 1 << 16;
const CFGR1_RES_MASK: u32 = 0b11 << 3;
const CFGR1_ALIGN: u32 = 1 << 5;
const CFGR1_CHSELRMOD: u32 = 1 << 21;
/// TRG3: TIM3 trigger output.
const EXTSEL_TIM3_TRGO: u32 = 0b011;
const EXTEN_RISING: u32 = 0b01;

const CFGR2_CKMODE_SHIFT: u32 = 30;
/// Synchronous PCLK, undivided.
const CKMODE_PCLK: u32 = 0b11;

const SMPR_SMP1_MASK: u32 = 0b111;
const SMPR_SMPSEL_SHIFT: u32 = 8;

const DR_MASK: u32 = 0x0FFF;

const VREFBUF_ENVR: u32 = 1 << 0;
const VREFBUF_HIZ: u32 = 1 << 1;
const VREFBUF_VRS: u32 = 1 << 2;
const VREFBUF_VRR: u32 = 1 << 3;

pub struct TriggeredAdc<'d> {
    _driver: Adc<'d, ADC1>,
    channel: AdcChannel,
}

impl<'d> TriggeredAdc<'d> {
    /// Reconfigures the converter for `config`. Conversions start only after
    /// [`SamplingUnit::start_conversion`] arms the trigger input.
    pub fn new(driver: Adc<'d, ADC1>, config: &LoopConfig) -> Self {
        let adc = pac::ADC1;

        // Clock mode and resolution may only change while the converter is off.
        if adc.cr().read().0 & CR_ADEN != 0 {
            adc.cr().modify(|w| w.0 |= CR_ADDIS);
            while adc.cr().read().0 & CR_ADEN != 0 {}
        }
        adc.cfgr2().modify(|w| {
            w.0 = (w.0 & !(0b11 << CFGR2_CKMODE_SHIFT)) | CKMODE_PCLK << CFGR2_CKMODE_SHIFT;
        });
        adc.cfgr1().modify(|w| {
            w.0 = (w.0 & !CFGR1_CONFIG_MASK)
                | EXTSEL_TIM3_TRGO << CFGR1_EXTSEL_SHIFT
                | EXTEN_RISING << CFGR1_EXTEN_SHIFT;
        });
        let smp = sample_time_index(config.sample_window) as u32;
        adc.smpr().modify(|w| {
            w.0 = (w.0 & !SMPR_SMP1_MASK & !(0xFFFF << SMPR_SMPSEL_SHIFT)) | smp;
        });

        adc.isr().write(|w| w.0 = ISR_ADRDY);
        adc.cr().modify(|w| w.0 |= CR_ADEN);
        while adc.isr().read().0 & ISR_ADRDY == 0 {}

        let mut this = Self {
            _driver: driver,
            channel: config.channel,
        };
        this.select_channel(config.channel);
        adc.isr().write(|w| w.0 = ISR_EOC | ISR_EOS | ISR_OVR);
        adc.ier().modify(|w| w.0 |= IER_EOCIE | IER_OVRIE);
        this
    }

    fn select_channel(&mut self, channel: AdcChannel) {
        let adc = pac::ADC1;
        adc.isr().write(|w| w.0 = ISR_CCRDY);
        adc.chselr().write(|w| w.0 = 1 << channel.index());
        while adc.isr().read().0 & ISR_CCRDY == 0 {}
        self.channel = channel;
    }

    /// Returns and clears the hardware overrun flag.
    pub fn take_overrun(&mut self) -> bool {
        let adc = pac::ADC1;
        let overrun = adc.isr().read().0 & ISR_OVR != 0;
        if overrun {
            adc.isr().write(|w| w.0 = ISR_OVR);
        }
        overrun
    }

    /// Clears every completion flag without touching the data register.
    /// Used when the interrupt fires before the loop context exists.
    pub fn discard_pending() {
        pac::ADC1
            .isr()
            .write(|w| w.0 = ISR_EOC | ISR_EOS | ISR_OVR);
    }
}

impl SamplingUnit for TriggeredAdc<'_> {
    /// Arms the trigger input. With an external trigger `ADSTART` stays set,
    /// so every later timer event starts exactly one conversion on its own.
    fn start_conversion(&mut self, channel: AdcChannel) -> Result<(), SamplingError> {
        let adc = pac::ADC1;
        if adc.isr().read().0 & (ISR_EOC | ISR_OVR) != 0 {
            return Err(SamplingError::Overrun);
        }
        if adc.cr().read().0 & CR_ADSTART != 0 {
            return Ok(());
        }
        if channel != self.channel {
            self.select_channel(channel);
        }
        adc.cr().modify(|w| w.0 |= CR_ADSTART);
        Ok(())
    }

    fn conversion_complete(&self) -> bool {
        pac::ADC1.isr().read().0 & ISR_EOC != 0
    }

    fn read_result(&mut self) -> SampleValue {
        SampleValue::from_register((pac::ADC1.dr().read().0 & DR_MASK) as u16)
    }

    fn clear_interrupt(&mut self) {
        pac::ADC1.isr().write(|w| w.0 = ISR_EOC | ISR_EOS);
    }
}

/// Applies `buffer` to VREFBUF and waits for the output to settle.
pub fn configure_reference(buffer: ReferenceBuffer) {
    let vrefbuf = pac::VREFBUF;
    match buffer {
        ReferenceBuffer::Internal2V5 => {
            vrefbuf
                .csr()
                .write(|w| w.0 = VREFBUF_VRS | VREFBUF_ENVR);
            while vrefbuf.csr().read().0 & VREFBUF_VRR == 0 {}
        }
        ReferenceBuffer::HighImpedance => {
            vrefbuf.csr().write(|w| w.0 = VREFBUF_HIZ);
        }
    }
}
