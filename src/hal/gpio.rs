//! Digital pins with pin-change interrupt support
//!
//! Pins are numbered the Arduino Uno way: D0-D7 live on PORTD, D8-D13 on
//! PORTB and A0-A5 (14-19) on PORTC. Pin-change interrupts are gated per
//! physical port, so suspending one pin suspends every pin on its port.

use crate::callback::{CallbackRegistry, Handler};
use crate::Error;
use embedded_hal::digital::v2::{InputPin, OutputPin, StatefulOutputPin, ToggleableOutputPin};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Port {
    B,
    C,
    D,
}

impl Port {
    /// Bit of this port in PCICR / PCIFR
    #[inline]
    pub const fn pcint_bit(self) -> u8 {
        match self {
            Port::B => 0,
            Port::C => 1,
            Port::D => 2,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinId(u8);

impl PinId {
    pub const MAX: u8 = 19;

    pub fn new(number: u8) -> Result<Self, Error> {
        if number > Self::MAX {
            return Err(Error::Configuration);
        }
        Ok(Self(number))
    }

    #[inline]
    pub const fn number(self) -> u8 {
        self.0
    }

    pub const fn port(self) -> Port {
        match self.0 {
            0..=7 => Port::D,
            8..=13 => Port::B,
            _ => Port::C,
        }
    }

    /// Bit position inside the port registers
    pub const fn bit(self) -> u8 {
        match self.port() {
            Port::D => self.0,
            Port::B => self.0 - 8,
            Port::C => self.0 - 14,
        }
    }

    #[inline]
    pub const fn mask(self) -> u8 {
        1 << self.bit()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    Input,
    InputPullup,
    Output,
}

impl Direction {
    #[inline]
    pub const fn is_input(self) -> bool {
        !matches!(self, Direction::Output)
    }
}

/// Register-level port driver.
pub trait GpioBackend {
    fn set_direction(&mut self, pin: PinId, direction: Direction);
    fn read(&self, pin: PinId) -> bool;
    fn write(&mut self, pin: PinId, high: bool);
    /// Unmask the pin-change interrupt for `pin` and enable its port.
    fn enable_pin_change(&mut self, pin: PinId);
    fn set_port_interrupts(&mut self, port: Port, enabled: bool);
    fn port_interrupts_enabled(&self, port: Port) -> bool;
}

/// Port-granular interrupt gating.
pub trait PortInterrupts {
    fn enable_port_interrupts(&mut self);
    fn disable_port_interrupts(&mut self);
    fn port_interrupts_enabled(&self) -> bool;
}

/// A digital line with a fixed direction and one optional edge handler.
pub struct Pin<G, C> {
    id: PinId,
    direction: Option<Direction>,
    level: bool,
    interrupt_enabled: bool,
    callback: CallbackRegistry<C>,
    backend: G,
}

impl<G: GpioBackend, C> Pin<G, C> {
    pub fn new(backend: G, id: PinId) -> Self {
        Self {
            id,
            direction: None,
            level: false,
            interrupt_enabled: false,
            callback: CallbackRegistry::new(),
            backend,
        }
    }

    /// Shorthand for `new` followed by `configure`.
    pub fn with_direction(backend: G, number: u8, direction: Direction) -> Result<Self, Error> {
        let mut pin = Self::new(backend, PinId::new(number)?);
        pin.configure(direction)?;
        Ok(pin)
    }

    pub fn configure(&mut self, direction: Direction) -> Result<(), Error> {
        if self.direction.is_some() {
            return Err(Error::Configuration);
        }
        self.backend.set_direction(self.id, direction);
        if direction == Direction::Output {
            self.backend.write(self.id, false);
            self.level = false;
        }
        self.direction = Some(direction);
        Ok(())
    }

    #[inline]
    pub fn id(&self) -> PinId {
        self.id
    }

    #[inline]
    pub fn port(&self) -> Port {
        self.id.port()
    }

    #[inline]
    pub fn direction(&self) -> Option<Direction> {
        self.direction
    }

    /// Current logical level. Outputs report the last written level; a
    /// released pull-up input reads high.
    pub fn read(&self) -> Result<bool, Error> {
        match self.direction {
            None => Err(Error::InvalidOperation),
            Some(Direction::Output) => Ok(self.level),
            Some(_) => Ok(self.backend.read(self.id)),
        }
    }

    pub fn write(&mut self, high: bool) -> Result<(), Error> {
        if self.direction != Some(Direction::Output) {
            return Err(Error::InvalidOperation);
        }
        self.backend.write(self.id, high);
        self.level = high;
        Ok(())
    }

    pub fn toggle(&mut self) -> Result<(), Error> {
        let level = self.read()?;
        self.write(!level)
    }

    pub fn attach_handler(&mut self, handler: Handler<C>) -> Result<(), Error> {
        self.callback.attach(handler)
    }

    #[inline]
    pub fn handler(&self) -> Option<Handler<C>> {
        self.callback.handler()
    }

    /// Unmask the edge interrupt of this pin. Only inputs raise edges.
    pub fn enable_interrupt(&mut self) -> Result<(), Error> {
        match self.direction {
            Some(direction) if direction.is_input() => {
                self.backend.enable_pin_change(self.id);
                self.interrupt_enabled = true;
                Ok(())
            }
            _ => Err(Error::InvalidOperation),
        }
    }

    #[inline]
    pub fn is_interrupt_enabled(&self) -> bool {
        self.interrupt_enabled
    }
}

impl<G: GpioBackend, C> PortInterrupts for Pin<G, C> {
    fn enable_port_interrupts(&mut self) {
        self.backend.set_port_interrupts(self.id.port(), true);
    }

    fn disable_port_interrupts(&mut self) {
        self.backend.set_port_interrupts(self.id.port(), false);
    }

    fn port_interrupts_enabled(&self) -> bool {
        self.backend.port_interrupts_enabled(self.id.port())
    }
}

impl<G: GpioBackend, C> InputPin for Pin<G, C> {
    type Error = Error;

    fn is_high(&self) -> Result<bool, Error> {
        self.read()
    }

    fn is_low(&self) -> Result<bool, Error> {
        self.read().map(|level| !level)
    }
}

impl<G: GpioBackend, C> OutputPin for Pin<G, C> {
    type Error = Error;

    fn set_low(&mut self) -> Result<(), Error> {
        self.write(false)
    }

    fn set_high(&mut self) -> Result<(), Error> {
        self.write(true)
    }
}

impl<G: GpioBackend, C> StatefulOutputPin for Pin<G, C> {
    fn is_set_high(&self) -> Result<bool, Error> {
        match self.direction {
            Some(Direction::Output) => Ok(self.level),
            _ => Err(Error::InvalidOperation),
        }
    }

    fn is_set_low(&self) -> Result<bool, Error> {
        self.is_set_high().map(|level| !level)
    }
}

impl<G: GpioBackend, C> ToggleableOutputPin for Pin<G, C> {
    type Error = Error;

    fn toggle(&mut self) -> Result<(), Error> {
        Pin::toggle(self)
    }
}

#[cfg(target_arch = "avr")]
pub use self::avr::AvrGpio;

#[cfg(target_arch = "avr")]
mod avr {
    use super::{Direction, GpioBackend, PinId, Port};
    use avr_device::atmega328p::{EXINT, PORTB, PORTC, PORTD};

    macro_rules! modify_bits {
        ($reg:expr, $mask:expr, $on:expr) => {
            $reg.modify(|r, w| {
                w.bits(if $on {
                    r.bits() | $mask
                } else {
                    r.bits() & !$mask
                })
            })
        };
    }

    // Expands `$body` once per port with the DDRx/PORTx/PINx registers bound
    macro_rules! with_port {
        ($port:expr, |$ddr:ident, $out:ident, $inp:ident| $body:expr) => {
            match $port {
                Port::B => {
                    let regs = &*PORTB::ptr();
                    let ($ddr, $out, $inp) = (&regs.ddrb, &regs.portb, &regs.pinb);
                    $body
                }
                Port::C => {
                    let regs = &*PORTC::ptr();
                    let ($ddr, $out, $inp) = (&regs.ddrc, &regs.portc, &regs.pinc);
                    $body
                }
                Port::D => {
                    let regs = &*PORTD::ptr();
                    let ($ddr, $out, $inp) = (&regs.ddrd, &regs.portd, &regs.pind);
                    $body
                }
            }
        };
    }

    /// ATmega328P port driver. Zero-sized; every pin holds its own copy.
    #[derive(Clone, Copy, Default)]
    pub struct AvrGpio;

    impl GpioBackend for AvrGpio {
        fn set_direction(&mut self, pin: PinId, direction: Direction) {
            let mask = pin.mask();
            let output = direction == Direction::Output;
            let pullup = direction == Direction::InputPullup;
            unsafe {
                with_port!(pin.port(), |ddr, out, _inp| {
                    modify_bits!(ddr, mask, output);
                    modify_bits!(out, mask, pullup);
                })
            }
        }

        fn read(&self, pin: PinId) -> bool {
            let mask = pin.mask();
            unsafe { with_port!(pin.port(), |_ddr, _out, inp| inp.read().bits() & mask != 0) }
        }

        fn write(&mut self, pin: PinId, high: bool) {
            let mask = pin.mask();
            unsafe {
                with_port!(pin.port(), |_ddr, out, _inp| {
                    modify_bits!(out, mask, high);
                })
            }
        }

        fn enable_pin_change(&mut self, pin: PinId) {
            let mask = pin.mask();
            unsafe {
                let exint = &*EXINT::ptr();
                match pin.port() {
                    Port::B => modify_bits!(exint.pcmsk0, mask, true),
                    Port::C => modify_bits!(exint.pcmsk1, mask, true),
                    Port::D => modify_bits!(exint.pcmsk2, mask, true),
                }
            }
            self.set_port_interrupts(pin.port(), true);
        }

        fn set_port_interrupts(&mut self, port: Port, enabled: bool) {
            let mask = 1 << port.pcint_bit();
            unsafe {
                let exint = &*EXINT::ptr();
                if enabled {
                    // Drop edges latched while the port was suspended
                    exint.pcifr.write(|w| w.bits(mask));
                }
                modify_bits!(exint.pcicr, mask, enabled);
            }
        }

        fn port_interrupts_enabled(&self, port: Port) -> bool {
            let mask = 1 << port.pcint_bit();
            unsafe { (*EXINT::ptr()).pcicr.read().bits() & mask != 0 }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Lines {
        levels: [bool; 20],
        pcicr: u8,
        pcmsk: u32,
    }

    #[derive(Clone, Default)]
    struct FakeGpio(Rc<RefCell<Lines>>);

    impl GpioBackend for FakeGpio {
        fn set_direction(&mut self, pin: PinId, direction: Direction) {
            if direction == Direction::InputPullup {
                self.0.borrow_mut().levels[pin.number() as usize] = true;
            }
        }

        fn read(&self, pin: PinId) -> bool {
            self.0.borrow().levels[pin.number() as usize]
        }

        fn write(&mut self, pin: PinId, high: bool) {
            self.0.borrow_mut().levels[pin.number() as usize] = high;
        }

        fn enable_pin_change(&mut self, pin: PinId) {
            self.0.borrow_mut().pcmsk |= 1 << pin.number();
            self.set_port_interrupts(pin.port(), true);
        }

        fn set_port_interrupts(&mut self, port: Port, enabled: bool) {
            let mut lines = self.0.borrow_mut();
            if enabled {
                lines.pcicr |= 1 << port.pcint_bit();
            } else {
                lines.pcicr &= !(1 << port.pcint_bit());
            }
        }

        fn port_interrupts_enabled(&self, port: Port) -> bool {
            self.0.borrow().pcicr & (1 << port.pcint_bit()) != 0
        }
    }

    type TestPin = Pin<FakeGpio, ()>;

    #[test]
    fn uno_pin_mapping() {
        let d2 = PinId::new(2).unwrap();
        assert_eq!((d2.port(), d2.bit()), (Port::D, 2));
        let d13 = PinId::new(13).unwrap();
        assert_eq!((d13.port(), d13.bit()), (Port::B, 5));
        let a2 = PinId::new(16).unwrap();
        assert_eq!((a2.port(), a2.bit()), (Port::C, 2));
        assert_eq!(PinId::new(20), Err(Error::Configuration));
    }

    #[test]
    fn configure_only_once() {
        let mut pin = TestPin::new(FakeGpio::default(), PinId::new(9).unwrap());
        pin.configure(Direction::Output).unwrap();
        assert_eq!(pin.configure(Direction::Input), Err(Error::Configuration));
        assert_eq!(pin.direction(), Some(Direction::Output));
    }

    #[test]
    fn released_pullup_reads_high() {
        let pin = TestPin::with_direction(FakeGpio::default(), 13, Direction::InputPullup).unwrap();
        assert_eq!(pin.read(), Ok(true));
        assert_eq!(pin.is_low(), Ok(false));
    }

    #[test]
    fn write_requires_output() {
        let mut input = TestPin::with_direction(FakeGpio::default(), 13, Direction::Input).unwrap();
        assert_eq!(input.write(true), Err(Error::InvalidOperation));
        assert_eq!(input.toggle(), Err(Error::InvalidOperation));

        let mut unconfigured = TestPin::new(FakeGpio::default(), PinId::new(8).unwrap());
        assert_eq!(unconfigured.read(), Err(Error::InvalidOperation));
        assert_eq!(unconfigured.set_high(), Err(Error::InvalidOperation));
    }

    #[test]
    fn toggle_flips_cached_level() {
        let gpio = FakeGpio::default();
        let mut led = TestPin::with_direction(gpio.clone(), 9, Direction::Output).unwrap();
        assert_eq!(led.is_set_low(), Ok(true));
        ToggleableOutputPin::toggle(&mut led).unwrap();
        assert_eq!(led.read(), Ok(true));
        assert!(gpio.0.borrow().levels[9]);
        led.toggle().unwrap();
        assert_eq!(led.read(), Ok(false));
    }

    #[test]
    fn handler_binds_once() {
        fn noop(_: &mut ()) {}
        let mut pin = TestPin::with_direction(FakeGpio::default(), 13, Direction::InputPullup).unwrap();
        pin.attach_handler(noop).unwrap();
        assert_eq!(pin.attach_handler(noop), Err(Error::AlreadyBound));
        assert!(pin.handler().is_some());
    }

    #[test]
    fn port_gating_is_shared() {
        let gpio = FakeGpio::default();
        let mut button = TestPin::with_direction(gpio.clone(), 13, Direction::InputPullup).unwrap();
        let neighbour = TestPin::with_direction(gpio.clone(), 8, Direction::Input).unwrap();
        button.enable_interrupt().unwrap();
        assert!(button.is_interrupt_enabled());
        assert!(neighbour.port_interrupts_enabled());

        button.disable_port_interrupts();
        assert!(!neighbour.port_interrupts_enabled());
        button.enable_port_interrupts();
        assert!(button.port_interrupts_enabled());
    }

    #[test]
    fn outputs_cannot_raise_edges() {
        let mut led = TestPin::with_direction(FakeGpio::default(), 9, Direction::Output).unwrap();
        assert_eq!(led.enable_interrupt(), Err(Error::InvalidOperation));
    }
}
