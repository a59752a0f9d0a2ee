//! Error taxonomy for setup and device access

use core::fmt;

/// Errors raised by pins, timers, the watchdog guard and the startup sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Invalid or repeated configuration of a pin, timer or watchdog
    Configuration,
    /// Read/write issued against a pin in the wrong direction
    InvalidOperation,
    /// A second handler attached to a pin or timer
    AlreadyBound,
    /// The temperature predictor did not converge
    TrainingFailure,
}

impl Error {
    /// Diagnostic code reported over the serial console
    pub const fn code(self) -> u16 {
        match self {
            Error::Configuration => 0x1001,
            Error::InvalidOperation => 0x1002,
            Error::AlreadyBound => 0x1003,
            Error::TrainingFailure => 0x2001,
        }
    }

    const fn as_str(self) -> &'static str {
        match self {
            Error::Configuration => "configuration error",
            Error::InvalidOperation => "invalid operation",
            Error::AlreadyBound => "handler already bound",
            Error::TrainingFailure => "training failure",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ufmt::uDisplay for Error {
    fn fmt<W>(&self, f: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: ufmt::uWrite + ?Sized,
    {
        f.write_str(self.as_str())
    }
}
