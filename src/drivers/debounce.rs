//! Edge-triggered button debouncing with a timed blackout window
//!
//! The controller has two states, derived from hardware rather than stored:
//!
//! - `Armed`: port interrupts enabled, debounce timer stopped
//! - `Suppressing`: port interrupts disabled, debounce timer running
//!
//! The decision is taken on the first edge, from the level sampled right
//! then. The window only absorbs the bounce edges that follow.

use crate::hal::{PortInterrupts, Timer};
use embedded_hal::digital::v2::InputPin;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DebounceState {
    Armed,
    Suppressing,
}

pub struct DebounceController<B, T> {
    button: B,
    timer: T,
    action_level: bool,
}

impl<B, T> DebounceController<B, T>
where
    B: InputPin + PortInterrupts,
    T: Timer,
{
    /// `action_level` is the level that, sampled on an accepted edge,
    /// triggers the debounced action.
    pub fn new(button: B, timer: T, action_level: bool) -> Self {
        Self {
            button,
            timer,
            action_level,
        }
    }

    /// `None` while interrupts are off with the timer stopped (edges would be
    /// lost for good) or on with the timer still running.
    pub fn state(&self) -> Option<DebounceState> {
        match (self.button.port_interrupts_enabled(), self.timer.is_running()) {
            (true, false) => Some(DebounceState::Armed),
            (false, true) => Some(DebounceState::Suppressing),
            _ => None,
        }
    }

    /// Armed -> Suppressing. Returns true when the sampled level calls for
    /// the debounced action.
    pub fn on_edge(&mut self) -> bool {
        if !self.button.port_interrupts_enabled() {
            return false;
        }
        self.button.disable_port_interrupts();
        self.timer.start();
        matches!(self.button.is_high(), Ok(level) if level == self.action_level)
    }

    /// Suppressing -> Armed.
    pub fn on_window_elapsed(&mut self) {
        self.timer.stop();
        self.button.enable_port_interrupts();
    }

    #[inline]
    pub fn button(&self) -> &B {
        &self.button
    }

    #[inline]
    pub fn button_mut(&mut self) -> &mut B {
        &mut self.button
    }

    #[inline]
    pub fn timer(&self) -> &T {
        &self.timer
    }

    #[inline]
    pub fn timer_mut(&mut self) -> &mut T {
        &mut self.timer
    }
}
