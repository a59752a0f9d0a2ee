pub mod adc;
pub mod gpio;
pub mod timer;
pub mod uart;
pub mod watchdog;

// Re-export commonly used types
pub use gpio::{Direction, GpioBackend, Pin, PinId, Port, PortInterrupts};
pub use timer::{PeriodicTimer, Timer, TimerBackend, TimerChannel, TimerMode};
pub use watchdog::{ResetCause, WatchdogConfig, WatchdogGuard, WatchdogMode, WatchdogTimeout};
