//! Analog temperature sensor sampled as a duty cycle of full scale

use core::marker::PhantomData;
use embedded_hal::adc::{Channel, OneShot};

/// Full-scale reading of the 10-bit converter
const ADC_MAX: f32 = 1023.0;

/// Something that yields a reading as a fraction of full scale.
pub trait DutyCycleSource {
    /// Reading in `[0, 1]`, or `None` if the converter failed.
    fn duty_cycle(&mut self) -> Option<f32>;
}

pub struct TemperatureSensor<A, P, ADC> {
    adc: A,
    pin: P,
    vcc: f32,
    _adc: PhantomData<ADC>,
}

impl<A, P, ADC> TemperatureSensor<A, P, ADC>
where
    A: OneShot<ADC, u16, P>,
    P: Channel<ADC>,
{
    pub fn new(adc: A, pin: P, vcc: f32) -> Self {
        Self {
            adc,
            pin,
            vcc,
            _adc: PhantomData,
        }
    }

    /// Sensor output in volts
    pub fn input_voltage(&mut self) -> Option<f32> {
        self.duty_cycle().map(|duty| duty * self.vcc)
    }
}

impl<A, P, ADC> DutyCycleSource for TemperatureSensor<A, P, ADC>
where
    A: OneShot<ADC, u16, P>,
    P: Channel<ADC>,
{
    fn duty_cycle(&mut self) -> Option<f32> {
        let raw = nb::block!(self.adc.read(&mut self.pin)).ok()?;
        Some((raw as f32 / ADC_MAX).clamp(0.0, 1.0))
    }
}
