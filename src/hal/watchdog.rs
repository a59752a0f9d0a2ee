//! Watchdog timer and the irrevocable liveness guard built on it

use crate::Error;
use embedded_hal::watchdog::{Watchdog, WatchdogEnable};

/// Timeout classes of the 128kHz watchdog oscillator (2K to 1024K cycles).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum WatchdogTimeout {
    Ms16 = 0,
    Ms32 = 1,
    Ms64 = 2,
    Ms128 = 3,
    Ms256 = 4,
    Ms512 = 5,
    Ms1024 = 6,
    Ms2048 = 7,
    Ms4096 = 8,
    Ms8192 = 9,
}

impl WatchdogTimeout {
    /// Nominal timeout in milliseconds
    pub const fn as_millis(self) -> u32 {
        16 << (self as u8)
    }

    /// WDP3..WDP0 placed at their WDTCSR positions
    pub const fn prescaler_bits(self) -> u8 {
        let p = self as u8;
        (p & 0x07) | ((p & 0x08) << 2)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WatchdogMode {
    Interrupt,
    SystemReset,
    InterruptAndReset,
}

impl WatchdogMode {
    #[inline]
    pub const fn resets(self) -> bool {
        !matches!(self, WatchdogMode::Interrupt)
    }
}

const WDIE: u8 = 1 << 6;
const WDCE: u8 = 1 << 4;
const WDE: u8 = 1 << 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WatchdogConfig {
    pub timeout: WatchdogTimeout,
    pub mode: WatchdogMode,
}

impl WatchdogConfig {
    /// WDTCSR value for the second write of the timed sequence
    pub const fn control_bits(self) -> u8 {
        let mode = match self.mode {
            WatchdogMode::Interrupt => WDIE,
            WatchdogMode::SystemReset => WDE,
            WatchdogMode::InterruptAndReset => WDIE | WDE,
        };
        mode | self.timeout.prescaler_bits()
    }
}

impl From<WatchdogTimeout> for WatchdogConfig {
    fn from(timeout: WatchdogTimeout) -> Self {
        Self {
            timeout,
            mode: WatchdogMode::SystemReset,
        }
    }
}

/// Source of the last reset, decoded from MCUSR.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ResetCause {
    PowerOn,
    External,
    BrownOut,
    Watchdog,
    Unknown,
}

impl ResetCause {
    pub const fn from_mcusr(bits: u8) -> Self {
        // Watchdog first: WDRF survives alongside stale flags
        if bits & (1 << 3) != 0 {
            ResetCause::Watchdog
        } else if bits & (1 << 2) != 0 {
            ResetCause::BrownOut
        } else if bits & (1 << 1) != 0 {
            ResetCause::External
        } else if bits & 1 != 0 {
            ResetCause::PowerOn
        } else {
            ResetCause::Unknown
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            ResetCause::PowerOn => "power-on",
            ResetCause::External => "external",
            ResetCause::BrownOut => "brown-out",
            ResetCause::Watchdog => "watchdog",
            ResetCause::Unknown => "unknown",
        }
    }
}

/// Liveness guard. Once armed in a resetting mode there is no way back:
/// only [`acknowledge`](WatchdogGuard::acknowledge) keeps the node alive.
pub struct WatchdogGuard<W> {
    watchdog: W,
    armed: Option<WatchdogConfig>,
}

impl<W> WatchdogGuard<W>
where
    W: Watchdog + WatchdogEnable<Time = WatchdogConfig>,
{
    pub fn new(watchdog: W) -> Self {
        Self {
            watchdog,
            armed: None,
        }
    }

    pub fn arm(&mut self, timeout: WatchdogTimeout, mode: WatchdogMode) -> Result<(), Error> {
        if self.armed.is_some() {
            return Err(Error::Configuration);
        }
        let config = WatchdogConfig { timeout, mode };
        self.watchdog.start(config);
        self.armed = Some(config);
        Ok(())
    }

    /// Reload the countdown to the full timeout. No-op while unarmed.
    #[inline]
    pub fn acknowledge(&mut self) {
        if self.armed.is_some() {
            self.watchdog.feed();
        }
    }

    #[inline]
    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    #[inline]
    pub fn config(&self) -> Option<WatchdogConfig> {
        self.armed
    }
}

#[cfg(target_arch = "avr")]
pub use self::avr::AvrWatchdog;

#[cfg(target_arch = "avr")]
mod avr {
    use super::{ResetCause, WatchdogConfig, WDCE, WDE};
    use avr_device::atmega328p::{CPU, WDT};
    use embedded_hal::watchdog::{Watchdog, WatchdogEnable};

    pub struct AvrWatchdog {
        _private: (),
    }

    impl AvrWatchdog {
        /// Take the reset cause and stop a watchdog left running by a
        /// watchdog reset. Must run early in boot, before any slow setup.
        pub fn new() -> (Self, ResetCause) {
            let cause = avr_device::interrupt::free(|_| unsafe {
                let cpu = &*CPU::ptr();
                let bits = cpu.mcusr.read().bits();
                // WDRF forces WDE on until cleared
                cpu.mcusr.write(|w| w.bits(0));
                avr_device::asm::wdr();
                let wdt = &*WDT::ptr();
                wdt.wdtcsr.write(|w| w.bits(WDCE | WDE));
                wdt.wdtcsr.write(|w| w.bits(0x00));
                ResetCause::from_mcusr(bits)
            });
            (Self { _private: () }, cause)
        }
    }

    impl WatchdogEnable for AvrWatchdog {
        type Time = WatchdogConfig;

        fn start<T>(&mut self, period: T)
        where
            T: Into<WatchdogConfig>,
        {
            let config: WatchdogConfig = period.into();
            avr_device::interrupt::free(|_| unsafe {
                avr_device::asm::wdr();
                let wdt = &*WDT::ptr();
                // Timed sequence: change enable, then the new configuration
                wdt.wdtcsr.write(|w| w.bits(WDCE | WDE));
                wdt.wdtcsr.write(|w| w.bits(config.control_bits()));
            });
        }
    }

    impl Watchdog for AvrWatchdog {
        #[inline]
        fn feed(&mut self) {
            unsafe {
                avr_device::asm::wdr();
            }
        }
    }
}
