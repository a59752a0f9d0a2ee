//! Startup sequence, interrupt dispatch and the watchdog liveness contract
//!
//! [`Orchestrator`] is the one context every handler receives. It owns the
//! button, the LED, both timers and the watchdog guard; nothing else holds
//! device state. Handlers run in interrupt context and never return errors:
//! a failure they cannot resolve is latched as a fault, after which the
//! liveness loop stops acknowledging the watchdog and the hardware resets
//! the node.

use crate::config::{NodeConfig, TRAINING_EPOCHS, TRAINING_INPUTS, TRAINING_OUTPUTS};
use crate::drivers::{CycleController, DebounceController, DebounceState, DutyCycleSource};
use crate::hal::{
    Direction, GpioBackend, PeriodicTimer, Pin, Port, PortInterrupts, TimerBackend, TimerChannel,
    TimerMode, WatchdogConfig, WatchdogGuard,
};
use crate::predictor::{round_half_away, Predictor};
use crate::Error;
use embedded_hal::watchdog::{Watchdog, WatchdogEnable};
use ufmt::{uWrite, uwrite};

const DEBOUNCE_CHANNEL: TimerChannel = TimerChannel::Timer0;
const PREDICTION_CHANNEL: TimerChannel = TimerChannel::Timer1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    /// Devices configured, handlers not attached, watchdog unarmed
    Init,
    /// Handlers live, watchdog armed
    Running,
    /// Training failed during setup; error LED on, no button handling and
    /// no watchdog
    Degraded,
}

pub type NodePin<G, T, W> = Pin<G, Orchestrator<G, T, W>>;
pub type NodeTimer<G, T, W> = PeriodicTimer<T, Orchestrator<G, T, W>>;

pub struct Orchestrator<G, T, W> {
    config: NodeConfig,
    debounce: DebounceController<NodePin<G, T, W>, NodeTimer<G, T, W>>,
    cycle: CycleController<NodePin<G, T, W>, NodeTimer<G, T, W>>,
    watchdog: WatchdogGuard<W>,
    phase: Phase,
    fault: Option<Error>,
}

impl<G, T, W> Orchestrator<G, T, W>
where
    G: GpioBackend + Clone,
    T: TimerBackend + Clone,
    W: Watchdog + WatchdogEnable<Time = WatchdogConfig>,
{
    /// Configure every pin and timer. Nothing is armed yet.
    pub fn new(config: NodeConfig, gpio: G, timers: T, watchdog: W) -> Result<Self, Error> {
        if config.button_pin == config.led_pin {
            return Err(Error::Configuration);
        }
        let button = Pin::with_direction(gpio.clone(), config.button_pin, Direction::InputPullup)?;
        let led = Pin::with_direction(gpio, config.led_pin, Direction::Output)?;
        let debounce_timer = PeriodicTimer::new(
            timers.clone(),
            DEBOUNCE_CHANNEL,
            config.debounce_ms,
            TimerMode::Repeating,
        )?;
        let prediction_timer = PeriodicTimer::new(
            timers,
            PREDICTION_CHANNEL,
            config.prediction_period_ms,
            TimerMode::Repeating,
        )?;

        Ok(Self {
            config,
            debounce: DebounceController::new(button, debounce_timer, config.button_action_level),
            cycle: CycleController::new(led, prediction_timer),
            watchdog: WatchdogGuard::new(watchdog),
            phase: Phase::Init,
            fault: None,
        })
    }

    /// Train the predictor, report, then wire handlers and arm the watchdog.
    ///
    /// On training failure the LED is driven high, `Training failed!` is
    /// printed and setup returns [`Phase::Degraded`] before the button
    /// interrupt or the watchdog are enabled.
    pub fn setup<S, P, D>(
        &mut self,
        console: &mut S,
        predictor: &mut P,
        sensor: &mut D,
    ) -> Result<Phase, Error>
    where
        S: uWrite + ?Sized,
        P: Predictor,
        D: DutyCycleSource,
    {
        if self.phase != Phase::Init {
            return Err(Error::Configuration);
        }

        if !predictor.train(&TRAINING_INPUTS, &TRAINING_OUTPUTS, TRAINING_EPOCHS) {
            // TODO: arm the watchdog here as well once fail-safe vs fail-loud is decided
            self.cycle.drive(true)?;
            uwrite!(console, "Training failed!\n").ok();
            self.phase = Phase::Degraded;
            return Ok(self.phase);
        }

        for &x in TRAINING_INPUTS.iter() {
            uwrite!(console, "{} ", round_half_away(predictor.predict(x))).ok();
        }
        uwrite!(console, "\n").ok();

        if let Some(duty) = sensor.duty_cycle() {
            let celsius = round_half_away(predictor.predict(duty));
            uwrite!(console, "Temperature: {} C\n", celsius).ok();
        }

        self.debounce
            .button_mut()
            .attach_handler(on_button_edge::<G, T, W>)?;
        self.debounce
            .timer_mut()
            .attach_handler(on_debounce_elapsed::<G, T, W>)?;
        self.cycle
            .timer_mut()
            .attach_handler(on_prediction_elapsed::<G, T, W>)?;
        self.debounce.button_mut().enable_interrupt()?;
        self.cycle.start();

        self.watchdog
            .arm(self.config.watchdog_timeout, self.config.watchdog_mode)?;
        self.phase = Phase::Running;
        Ok(self.phase)
    }

    /// Pin-change interrupt for `port`.
    pub fn on_pin_change(&mut self, port: Port) {
        let button = self.debounce.button();
        if button.port() != port
            || !button.is_interrupt_enabled()
            || !button.port_interrupts_enabled()
        {
            return;
        }
        if let Some(handler) = button.handler() {
            handler(self);
        }
    }

    /// 1 ms compare-match interrupt for `channel`.
    pub fn on_timer_tick(&mut self, channel: TimerChannel) {
        let handler = if channel == DEBOUNCE_CHANNEL {
            self.debounce.timer_mut().tick()
        } else if channel == PREDICTION_CHANNEL {
            self.cycle.timer_mut().tick()
        } else {
            None
        };
        if let Some(handler) = handler {
            handler(self);
        }
    }

    /// One iteration of the liveness loop. Returns false once a fault is
    /// latched; the watchdog is then left to expire.
    pub fn service_watchdog(&mut self) -> bool {
        if self.fault.is_some() {
            return false;
        }
        self.watchdog.acknowledge();
        true
    }

    /// Record an unrecoverable handler failure. The first fault wins.
    pub fn latch_fault(&mut self, error: Error) {
        if self.fault.is_none() {
            self.fault = Some(error);
        }
    }

    #[inline]
    pub fn fault(&self) -> Option<Error> {
        self.fault
    }

    #[inline]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[inline]
    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn debounce_state(&self) -> Option<DebounceState> {
        self.debounce.state()
    }

    /// Whether the periodic LED toggle is enabled
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.cycle.is_enabled()
    }

    #[inline]
    pub fn led_level(&self) -> bool {
        self.cycle.level()
    }

    #[inline]
    pub fn button(&self) -> &NodePin<G, T, W> {
        self.debounce.button()
    }

    #[inline]
    pub fn debounce_timer(&self) -> &NodeTimer<G, T, W> {
        self.debounce.timer()
    }

    #[inline]
    pub fn prediction_timer(&self) -> &NodeTimer<G, T, W> {
        self.cycle.timer()
    }

    #[inline]
    pub fn watchdog(&self) -> &WatchdogGuard<W> {
        &self.watchdog
    }
}

fn on_button_edge<G, T, W>(node: &mut Orchestrator<G, T, W>)
where
    G: GpioBackend + Clone,
    T: TimerBackend + Clone,
    W: Watchdog + WatchdogEnable<Time = WatchdogConfig>,
{
    if node.debounce.on_edge() {
        node.cycle.toggle_enabled();
    }
}

fn on_debounce_elapsed<G, T, W>(node: &mut Orchestrator<G, T, W>)
where
    G: GpioBackend + Clone,
    T: TimerBackend + Clone,
    W: Watchdog + WatchdogEnable<Time = WatchdogConfig>,
{
    node.debounce.on_window_elapsed();
}

fn on_prediction_elapsed<G, T, W>(node: &mut Orchestrator<G, T, W>)
where
    G: GpioBackend + Clone,
    T: TimerBackend + Clone,
    W: Watchdog + WatchdogEnable<Time = WatchdogConfig>,
{
    if let Err(error) = node.cycle.on_period_elapsed() {
        node.latch_fault(error);
    }
}
