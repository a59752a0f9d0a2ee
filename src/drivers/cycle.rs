//! Periodic output toggling gated by an enable flag
//!
//! The period timer runs for the lifetime of the node. The enable flag only
//! decides whether an elapse flips the output, so toggles always stay on the
//! timer's fixed phase.

use crate::hal::Timer;
use embedded_hal::digital::v2::OutputPin;

pub struct CycleController<O, T> {
    output: O,
    timer: T,
    enabled: bool,
    level: bool,
}

impl<O, T> CycleController<O, T>
where
    O: OutputPin,
    T: Timer,
{
    /// The output is assumed to start low.
    pub fn new(output: O, timer: T) -> Self {
        Self {
            output,
            timer,
            enabled: false,
            level: false,
        }
    }

    pub fn start(&mut self) {
        self.timer.start();
    }

    /// Flip the enable flag, returning the new value.
    pub fn toggle_enabled(&mut self) -> bool {
        self.enabled = !self.enabled;
        self.enabled
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Last level driven onto the output
    #[inline]
    pub fn level(&self) -> bool {
        self.level
    }

    /// Timer elapse: flip the output if enabled. Never touches the flag.
    pub fn on_period_elapsed(&mut self) -> Result<(), O::Error> {
        if !self.enabled {
            return Ok(());
        }
        self.drive(!self.level)
    }

    /// Drive the output directly, outside the periodic cycle.
    pub fn drive(&mut self, high: bool) -> Result<(), O::Error> {
        if high {
            self.output.set_high()?;
        } else {
            self.output.set_low()?;
        }
        self.level = high;
        Ok(())
    }

    #[inline]
    pub fn timer(&self) -> &T {
        &self.timer
    }

    #[inline]
    pub fn timer_mut(&mut self) -> &mut T {
        &mut self.timer
    }

    #[cfg(test)]
    fn release(self) -> (O, T) {
        (self.output, self.timer)
    }
}
