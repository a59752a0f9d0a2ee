//! Polled USART0

/// Whether bytes handed to the transmitter may still be on the wire.
///
/// The transmit-complete flag only sets after a frame has been sent, so a
/// flush with nothing written must not wait on it.
#[derive(Clone, Copy, Debug, Default)]
pub struct TxState {
    pending: bool,
}

impl TxState {
    pub const fn new() -> Self {
        Self { pending: false }
    }

    /// A byte was loaded into the data register.
    #[inline]
    pub fn written(&mut self) {
        self.pending = true;
    }

    /// Poll with the hardware transmit-complete flag. Returns true once
    /// every written byte has left the shift register.
    pub fn flushed(&mut self, complete: bool) -> bool {
        if self.pending && !complete {
            return false;
        }
        self.pending = false;
        true
    }
}

#[cfg(target_arch = "avr")]
pub use self::avr::Usart0;

#[cfg(target_arch = "avr")]
mod avr {
    use super::TxState;
    use crate::config::CPU_FREQ_HZ;
    use avr_device::atmega328p::USART0;
    use core::convert::Infallible;
    use embedded_hal::serial;

    const RXEN0: u8 = 1 << 4;
    const TXEN0: u8 = 1 << 3;
    const UDRE0: u8 = 1 << 5;
    const TXC0: u8 = 1 << 6;
    // 8 data bits, no parity, 1 stop bit
    const FRAME_8N1: u8 = 0x06;

    /// Polled USART0. Used during setup, before global interrupts are enabled.
    pub struct Usart0 {
        tx: TxState,
    }

    impl Usart0 {
        pub fn new(baud: u32) -> Self {
            let ubrr = (CPU_FREQ_HZ / (16 * baud) - 1) as u16;
            unsafe {
                let p = &*USART0::ptr();
                p.ubrr0.write(|w| w.bits(ubrr));
                p.ucsr0c.write(|w| w.bits(FRAME_8N1));
                p.ucsr0b.write(|w| w.bits(RXEN0 | TXEN0));
            }
            Self { tx: TxState::new() }
        }
    }

    impl serial::Write<u8> for Usart0 {
        type Error = Infallible;

        fn write(&mut self, byte: u8) -> nb::Result<(), Infallible> {
            unsafe {
                let p = &*USART0::ptr();
                if p.ucsr0a.read().bits() & UDRE0 == 0 {
                    return Err(nb::Error::WouldBlock);
                }
                // TXC0 is cleared by writing one
                p.ucsr0a.modify(|r, w| w.bits(r.bits() | TXC0));
                p.udr0.write(|w| w.bits(byte));
            }
            self.tx.written();
            Ok(())
        }

        fn flush(&mut self) -> nb::Result<(), Infallible> {
            let complete = unsafe { (*USART0::ptr()).ucsr0a.read().bits() & TXC0 != 0 };
            if self.tx.flushed(complete) {
                Ok(())
            } else {
                Err(nb::Error::WouldBlock)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_transmitter_is_flushed() {
        let mut tx = TxState::new();
        assert!(tx.flushed(false));
    }

    #[test]
    fn flush_waits_for_last_frame() {
        let mut tx = TxState::new();
        tx.written();
        tx.written();
        assert!(!tx.flushed(false));
        assert!(!tx.flushed(false));
        assert!(tx.flushed(true));
        // Nothing left after completion
        assert!(tx.flushed(false));
    }
}
