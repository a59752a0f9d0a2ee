//! Single-slot analog converter
//!
//! The ATmega328P has one converter behind a multiplexer, so at most one
//! conversion is in flight. [`ConversionSlot`] tracks which channel owns it.

/// What the driver has to do on a `read` poll.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConversionStep {
    /// Select the channel and start a conversion
    Start,
    /// A conversion is still running
    Wait,
    /// The conversion for this channel finished; read the result
    Collect,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ConversionSlot {
    active: Option<u8>,
}

impl ConversionSlot {
    pub const fn new() -> Self {
        Self { active: None }
    }

    /// Advance the slot for a read of `channel`. `busy` is the hardware
    /// conversion-in-progress flag.
    ///
    /// A finished conversion started for another channel is discarded and the
    /// slot restarts for `channel`.
    pub fn poll(&mut self, channel: u8, busy: bool) -> ConversionStep {
        match self.active {
            None => {
                self.active = Some(channel);
                ConversionStep::Start
            }
            Some(_) if busy => ConversionStep::Wait,
            Some(active) if active == channel => {
                self.active = None;
                ConversionStep::Collect
            }
            Some(_) => {
                self.active = Some(channel);
                ConversionStep::Start
            }
        }
    }

    #[cfg(test)]
    fn active(&self) -> Option<u8> {
        self.active
    }
}

#[cfg(target_arch = "avr")]
pub use self::avr::{Adc, AnalogPin};

#[cfg(target_arch = "avr")]
mod avr {
    use super::{ConversionSlot, ConversionStep};
    use avr_device::atmega328p::ADC;
    use core::convert::Infallible;
    use embedded_hal::adc::{Channel, OneShot};

    // AVCC reference, clk/128 (125kHz @ 16MHz)
    const REFS_AVCC: u8 = 1 << 6;
    const ADPS_DIV128: u8 = 0x07;
    const ADEN: u8 = 1 << 7;
    const ADSC: u8 = 1 << 6;

    /// Analog input A0-A5 as an ADC multiplexer channel
    pub struct AnalogPin<const N: u8>;

    impl<const N: u8> Channel<Adc> for AnalogPin<N> {
        type ID = u8;

        fn channel() -> u8 {
            N
        }
    }

    pub struct Adc {
        slot: ConversionSlot,
    }

    impl Adc {
        pub fn new() -> Self {
            unsafe {
                let p = &*ADC::ptr();
                p.adcsra.write(|w| w.bits(ADEN | ADPS_DIV128));
                p.admux.write(|w| w.bits(REFS_AVCC));
            }
            Self {
                slot: ConversionSlot::new(),
            }
        }
    }

    impl Default for Adc {
        fn default() -> Self {
            Self::new()
        }
    }

    impl<PIN> OneShot<Adc, u16, PIN> for Adc
    where
        PIN: Channel<Adc, ID = u8>,
    {
        type Error = Infallible;

        fn read(&mut self, _pin: &mut PIN) -> nb::Result<u16, Infallible> {
            let channel = PIN::channel();
            unsafe {
                let p = &*ADC::ptr();
                let busy = p.adcsra.read().bits() & ADSC != 0;
                match self.slot.poll(channel, busy) {
                    ConversionStep::Start => {
                        p.admux
                            .modify(|r, w| w.bits((r.bits() & 0xF0) | (channel & 0x0F)));
                        p.adcsra.modify(|r, w| w.bits(r.bits() | ADSC));
                        Err(nb::Error::WouldBlock)
                    }
                    ConversionStep::Wait => Err(nb::Error::WouldBlock),
                    ConversionStep::Collect => Ok(p.adc.read().bits()),
                }
            }
        }
    }
}
