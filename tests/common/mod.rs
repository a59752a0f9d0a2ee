//! Simulated ATmega328P board for driving the node on the host.
//!
//! Time advances in 1 ms steps. Each step first counts down the watchdog,
//! then delivers the compare-match tick of every enabled timer channel, then
//! runs one liveness-loop iteration if the main loop is live.

#![allow(dead_code)]

use sensor_node_firmware::config::{NodeConfig, LEARNING_RATE};
use sensor_node_firmware::drivers::{DutyCycleSource, SerialConsole};
use sensor_node_firmware::hal::{
    Direction, GpioBackend, PinId, Port, TimerBackend, TimerChannel, WatchdogConfig,
};
use sensor_node_firmware::predictor::{LinReg, Predictor};
use sensor_node_firmware::{Error, Orchestrator, Phase};
use std::cell::RefCell;
use std::convert::Infallible;
use std::rc::Rc;

pub const CHANNELS: [TimerChannel; 3] = [
    TimerChannel::Timer0,
    TimerChannel::Timer1,
    TimerChannel::Timer2,
];

fn channel_index(channel: TimerChannel) -> usize {
    match channel {
        TimerChannel::Timer0 => 0,
        TimerChannel::Timer1 => 1,
        TimerChannel::Timer2 => 2,
    }
}

#[derive(Default)]
pub struct SimState {
    pub now_ms: u64,
    pub levels: [bool; 20],
    pub directions: [Option<Direction>; 20],
    pub pcmsk: u32,
    pub pcicr: u8,
    pub timer_configured: [bool; 3],
    pub timer_enabled: [bool; 3],
    pub watchdog: Option<WatchdogConfig>,
    pub since_feed_ms: u32,
    pub feeds: u32,
    pub reset_at: Option<u64>,
    pub serial: Vec<u8>,
}

#[derive(Clone, Default)]
pub struct Sim(pub Rc<RefCell<SimState>>);

impl GpioBackend for Sim {
    fn set_direction(&mut self, pin: PinId, direction: Direction) {
        let mut state = self.0.borrow_mut();
        let n = pin.number() as usize;
        state.directions[n] = Some(direction);
        if direction == Direction::InputPullup {
            state.levels[n] = true;
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
        let mut state = self.0.borrow_mut();
        let mask = 1 << port.pcint_bit();
        if enabled {
            state.pcicr |= mask;
        } else {
            state.pcicr &= !mask;
        }
    }

    fn port_interrupts_enabled(&self, port: Port) -> bool {
        self.0.borrow().pcicr & (1 << port.pcint_bit()) != 0
    }
}

impl TimerBackend for Sim {
    fn configure(&mut self, channel: TimerChannel) {
        self.0.borrow_mut().timer_configured[channel_index(channel)] = true;
    }

    fn enable(&mut self, channel: TimerChannel) {
        self.0.borrow_mut().timer_enabled[channel_index(channel)] = true;
    }

    fn disable(&mut self, channel: TimerChannel) {
        self.0.borrow_mut().timer_enabled[channel_index(channel)] = false;
    }
}

impl embedded_hal::watchdog::WatchdogEnable for Sim {
    type Time = WatchdogConfig;

    fn start<T: Into<WatchdogConfig>>(&mut self, period: T) {
        let mut state = self.0.borrow_mut();
        state.watchdog = Some(period.into());
        state.since_feed_ms = 0;
    }
}

impl embedded_hal::watchdog::Watchdog for Sim {
    fn feed(&mut self) {
        let mut state = self.0.borrow_mut();
        state.since_feed_ms = 0;
        state.feeds += 1;
    }
}

impl embedded_hal::serial::Write<u8> for Sim {
    type Error = Infallible;

    fn write(&mut self, byte: u8) -> nb::Result<(), Infallible> {
        self.0.borrow_mut().serial.push(byte);
        Ok(())
    }

    fn flush(&mut self) -> nb::Result<(), Infallible> {
        Ok(())
    }
}

/// Temperature sensor stub returning a fixed duty cycle.
pub struct FixedDuty(pub Option<f32>);

impl DutyCycleSource for FixedDuty {
    fn duty_cycle(&mut self) -> Option<f32> {
        self.0
    }
}

/// Predictor that never converges.
pub struct Diverging;

impl Predictor for Diverging {
    fn train(&mut self, _inputs: &[f32], _outputs: &[f32], _epochs: u32) -> bool {
        false
    }

    fn predict(&self, _x: f32) -> f32 {
        f32::NAN
    }
}

pub type SimNode = Orchestrator<Sim, Sim, Sim>;

pub struct Board {
    pub sim: Sim,
    pub node: SimNode,
    /// Whether the liveness loop is running
    pub main_loop: bool,
}

impl Board {
    pub fn new() -> Self {
        Self::with_config(NodeConfig::default()).expect("default config is valid")
    }

    pub fn with_config(config: NodeConfig) -> Result<Self, Error> {
        let sim = Sim::default();
        let node = Orchestrator::new(config, sim.clone(), sim.clone(), sim.clone())?;
        Ok(Self {
            sim,
            node,
            main_loop: false,
        })
    }

    /// Run setup with a freshly trained model and start the liveness loop.
    pub fn boot(&mut self) -> Phase {
        let mut predictor = LinReg::new(0.0, 0.0, LEARNING_RATE);
        self.boot_with(&mut predictor, Some(0.5))
    }

    pub fn boot_with<P: Predictor>(&mut self, predictor: &mut P, duty: Option<f32>) -> Phase {
        let mut console = SerialConsole::new(self.sim.clone());
        let phase = self
            .node
            .setup(&mut console, predictor, &mut FixedDuty(duty))
            .expect("setup succeeds");
        self.main_loop = true;
        phase
    }

    pub fn now(&self) -> u64 {
        self.sim.0.borrow().now_ms
    }

    pub fn serial(&self) -> String {
        String::from_utf8(self.sim.0.borrow().serial.clone()).expect("ascii output")
    }

    pub fn level(&self, pin: u8) -> bool {
        self.sim.0.borrow().levels[pin as usize]
    }

    pub fn reset_at(&self) -> Option<u64> {
        self.sim.0.borrow().reset_at
    }

    pub fn timer_enabled(&self, channel: TimerChannel) -> bool {
        self.sim.0.borrow().timer_enabled[channel_index(channel)]
    }

    /// Drive the button line. Returns true if a pin-change interrupt was
    /// delivered to the node.
    pub fn set_button(&mut self, high: bool) -> bool {
        let pin = PinId::new(self.node.config().button_pin).expect("valid pin");
        let deliver = {
            let mut state = self.sim.0.borrow_mut();
            let n = pin.number() as usize;
            let changed = state.levels[n] != high;
            state.levels[n] = high;
            changed
                && state.pcmsk & (1 << pin.number()) != 0
                && state.pcicr & (1 << pin.port().pcint_bit()) != 0
        };
        if deliver {
            self.node.on_pin_change(pin.port());
        }
        deliver
    }

    pub fn press(&mut self) -> bool {
        self.set_button(false)
    }

    pub fn release(&mut self) -> bool {
        self.set_button(true)
    }

    pub fn advance(&mut self, ms: u64) {
        for _ in 0..ms {
            self.step();
        }
    }

    /// Advance until the absolute time `t_ms`.
    pub fn advance_to(&mut self, t_ms: u64) {
        let now = self.now();
        assert!(t_ms >= now, "time only moves forward");
        self.advance(t_ms - now);
    }

    fn step(&mut self) {
        let expired = {
            let mut state = self.sim.0.borrow_mut();
            state.now_ms += 1;
            match state.watchdog {
                Some(config) if state.reset_at.is_none() => {
                    state.since_feed_ms += 1;
                    if state.since_feed_ms >= config.timeout.as_millis() {
                        state.reset_at = Some(state.now_ms);
                        true
                    } else {
                        false
                    }
                }
                _ => false,
            }
        };
        if expired {
            self.main_loop = false;
            return;
        }
        if self.reset_at().is_some() {
            return;
        }

        for channel in CHANNELS {
            if self.timer_enabled(channel) {
                self.node.on_timer_tick(channel);
            }
        }
        if self.main_loop {
            self.node.service_watchdog();
        }
    }
}
