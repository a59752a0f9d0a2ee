//! Configuration constants for the sensor node firmware

use crate::hal::watchdog::{WatchdogMode, WatchdogTimeout};

/// CPU frequency in Hz
pub const CPU_FREQ_HZ: u32 = 16_000_000;

/// UART baud rate
pub const UART_BAUD: u32 = 9600;

/// Supply voltage of the temperature sensor in volts
pub const VCC: f32 = 5.0;

/// Prediction button, pull-up input on D13
pub const BUTTON_PIN: u8 = 13;

/// Error / activity LED on D9
pub const LED_PIN: u8 = 9;

/// Temperature sensor on analog input A2
pub const TEMP_SENSOR_CHANNEL: u8 = 2;

/// Contact bounce suppression window in milliseconds
pub const DEBOUNCE_MS: u32 = 300;

/// Period of the LED toggle / prediction window in milliseconds
pub const PREDICTION_PERIOD_MS: u32 = 60_000;

/// Watchdog timeout class armed once setup is complete
pub const WATCHDOG_TIMEOUT: WatchdogTimeout = WatchdogTimeout::Ms1024;

/// Watchdog behaviour on expiry
pub const WATCHDOG_MODE: WatchdogMode = WatchdogMode::SystemReset;

/// Level sampled on an accepted edge that toggles the periodic action.
/// The button pulls D13 low while pressed.
pub const BUTTON_ACTION_LEVEL: bool = false;

/// Regression training inputs (sensor duty cycle)
pub const TRAINING_INPUTS: [f32; 11] = [0.0, 0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0];

/// Regression training outputs (degrees Celsius)
pub const TRAINING_OUTPUTS: [f32; 11] = [
    -50.0, -40.0, -30.0, -20.0, -10.0, 0.0, 10.0, 20.0, 30.0, 40.0, 50.0,
];

/// Gradient descent step size
pub const LEARNING_RATE: f32 = 0.1;

/// Number of passes over the training set
pub const TRAINING_EPOCHS: u32 = 100;

/// Fixed hardware configuration of one node, built from the constants above.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NodeConfig {
    pub button_pin: u8,
    pub led_pin: u8,
    pub button_action_level: bool,
    pub debounce_ms: u32,
    pub prediction_period_ms: u32,
    pub watchdog_timeout: WatchdogTimeout,
    pub watchdog_mode: WatchdogMode,
}

impl NodeConfig {
    pub const DEFAULT: Self = Self {
        button_pin: BUTTON_PIN,
        led_pin: LED_PIN,
        button_action_level: BUTTON_ACTION_LEVEL,
        debounce_ms: DEBOUNCE_MS,
        prediction_period_ms: PREDICTION_PERIOD_MS,
        watchdog_timeout: WATCHDOG_TIMEOUT,
        watchdog_mode: WATCHDOG_MODE,
    };
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
