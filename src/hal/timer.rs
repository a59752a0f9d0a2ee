//! Millisecond software timers on top of the hardware compare-match tick
//!
//! Each logical channel owns one hardware timer running in CTC mode with a
//! 1 ms period. The tick interrupt calls [`PeriodicTimer::tick`], which counts
//! up to the configured period and reports when the timer elapses.

use crate::callback::{CallbackRegistry, Handler};
use crate::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimerChannel {
    Timer0,
    Timer1,
    Timer2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimerMode {
    /// Stops after the first elapse
    OneShot,
    /// Reloads automatically on elapse
    Repeating,
}

/// Register-level tick source for one channel.
pub trait TimerBackend {
    /// Program the channel for a 1 ms tick without enabling its interrupt.
    fn configure(&mut self, channel: TimerChannel);
    fn enable(&mut self, channel: TimerChannel);
    fn disable(&mut self, channel: TimerChannel);
}

/// Start/stop control used by the controllers.
pub trait Timer {
    fn start(&mut self);
    fn stop(&mut self);
    fn is_running(&self) -> bool;
}

pub struct PeriodicTimer<T, C> {
    channel: TimerChannel,
    period_ms: u32,
    elapsed_ms: u32,
    running: bool,
    mode: TimerMode,
    callback: CallbackRegistry<C>,
    backend: T,
}

impl<T: TimerBackend, C> PeriodicTimer<T, C> {
    pub fn new(
        mut backend: T,
        channel: TimerChannel,
        period_ms: u32,
        mode: TimerMode,
    ) -> Result<Self, Error> {
        if period_ms == 0 {
            return Err(Error::Configuration);
        }
        backend.configure(channel);
        Ok(Self {
            channel,
            period_ms,
            elapsed_ms: 0,
            running: false,
            mode,
            callback: CallbackRegistry::new(),
            backend,
        })
    }

    #[inline]
    pub fn period_ms(&self) -> u32 {
        self.period_ms
    }

    #[inline]
    pub fn elapsed_ms(&self) -> u32 {
        self.elapsed_ms
    }

    pub fn attach_handler(&mut self, handler: Handler<C>) -> Result<(), Error> {
        self.callback.attach(handler)
    }

    #[inline]
    pub fn handler(&self) -> Option<Handler<C>> {
        self.callback.handler()
    }

    /// Advance by one millisecond. Returns the handler to run when the
    /// period has elapsed on this tick.
    pub fn tick(&mut self) -> Option<Handler<C>> {
        if !self.running {
            return None;
        }
        self.elapsed_ms += 1;
        if self.elapsed_ms < self.period_ms {
            return None;
        }
        self.elapsed_ms = 0;
        if self.mode == TimerMode::OneShot {
            self.stop();
        }
        self.callback.handler()
    }
}

impl<T: TimerBackend, C> Timer for PeriodicTimer<T, C> {
    fn start(&mut self) {
        if self.running {
            return;
        }
        self.running = true;
        self.backend.enable(self.channel);
    }

    fn stop(&mut self) {
        if self.running {
            self.backend.disable(self.channel);
        }
        self.running = false;
        self.elapsed_ms = 0;
    }

    #[inline]
    fn is_running(&self) -> bool {
        self.running
    }
}

#[cfg(target_arch = "avr")]
pub use self::avr::AvrTimers;

#[cfg(target_arch = "avr")]
mod avr {
    use super::{TimerBackend, TimerChannel};
    use crate::config::CPU_FREQ_HZ;
    use avr_device::atmega328p::{TC0, TC1, TC2};

    // Clock select clk/64; TC2 uses its own encoding
    const CS_DIV64: u8 = 0x03;
    const TC2_DIV64: u8 = 0x04;
    const OCIE_A: u8 = 1 << 1;
    const WGM_CTC: u8 = 1 << 1;
    const WGM12: u8 = 1 << 3;

    // 16MHz/64 = 250kHz, 250 ticks = 1ms
    const COMPARE_1MS: u8 = (CPU_FREQ_HZ / 64 / 1000 - 1) as u8;

    /// TC0/TC1/TC2 in CTC mode, one compare-match interrupt per millisecond.
    #[derive(Clone, Copy, Default)]
    pub struct AvrTimers;

    impl TimerBackend for AvrTimers {
        fn configure(&mut self, channel: TimerChannel) {
            unsafe {
                match channel {
                    TimerChannel::Timer0 => {
                        let p = &*TC0::ptr();
                        p.tccr0a.write(|w| w.bits(WGM_CTC));
                        p.ocr0a.write(|w| w.bits(COMPARE_1MS));
                        p.tccr0b.write(|w| w.bits(CS_DIV64));
                    }
                    TimerChannel::Timer1 => {
                        let p = &*TC1::ptr();
                        p.tccr1a.write(|w| w.bits(0));
                        p.ocr1a.write(|w| w.bits(COMPARE_1MS as u16));
                        p.tccr1b.write(|w| w.bits(WGM12 | CS_DIV64));
                    }
                    TimerChannel::Timer2 => {
                        let p = &*TC2::ptr();
                        p.tccr2a.write(|w| w.bits(WGM_CTC));
                        p.ocr2a.write(|w| w.bits(COMPARE_1MS));
                        p.tccr2b.write(|w| w.bits(TC2_DIV64));
                    }
                }
            }
        }

        fn enable(&mut self, channel: TimerChannel) {
            unsafe {
                match channel {
                    TimerChannel::Timer0 => {
                        let p = &*TC0::ptr();
                        p.tcnt0.write(|w| w.bits(0));
                        p.tifr0.write(|w| w.bits(OCIE_A));
                        p.timsk0.modify(|r, w| w.bits(r.bits() | OCIE_A));
                    }
                    TimerChannel::Timer1 => {
                        let p = &*TC1::ptr();
                        p.tcnt1.write(|w| w.bits(0));
                        p.tifr1.write(|w| w.bits(OCIE_A));
                        p.timsk1.modify(|r, w| w.bits(r.bits() | OCIE_A));
                    }
                    TimerChannel::Timer2 => {
                        let p = &*TC2::ptr();
                        p.tcnt2.write(|w| w.bits(0));
                        p.tifr2.write(|w| w.bits(OCIE_A));
                        p.timsk2.modify(|r, w| w.bits(r.bits() | OCIE_A));
                    }
                }
            }
        }

        fn disable(&mut self, channel: TimerChannel) {
            unsafe {
                match channel {
                    TimerChannel::Timer0 => (*TC0::ptr())
                        .timsk0
                        .modify(|r, w| w.bits(r.bits() & !OCIE_A)),
                    TimerChannel::Timer1 => (*TC1::ptr())
                        .timsk1
                        .modify(|r, w| w.bits(r.bits() & !OCIE_A)),
                    TimerChannel::Timer2 => (*TC2::ptr())
                        .timsk2
                        .modify(|r, w| w.bits(r.bits() & !OCIE_A)),
                }
            }
        }
    }
}
