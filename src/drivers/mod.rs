pub mod cycle;
pub mod debounce;
pub mod serial_console;
pub mod temperature;

pub use cycle::CycleController;
pub use debounce::{DebounceController, DebounceState};
pub use serial_console::SerialConsole;
pub use temperature::{DutyCycleSource, TemperatureSensor};
