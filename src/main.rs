#![cfg_attr(target_arch = "avr", no_std)]
#![cfg_attr(target_arch = "avr", no_main)]
#![cfg_attr(target_arch = "avr", feature(abi_avr_interrupt))]

#[cfg(target_arch = "avr")]
mod firmware {
    use avr_device::interrupt::{self, Mutex};
    use core::cell::RefCell;
    use panic_halt as _;
    use sensor_node_firmware::config::{
        NodeConfig, LEARNING_RATE, TEMP_SENSOR_CHANNEL, UART_BAUD, VCC,
    };
    use sensor_node_firmware::drivers::{SerialConsole, TemperatureSensor};
    use sensor_node_firmware::hal::adc::{Adc, AnalogPin};
    use sensor_node_firmware::hal::gpio::AvrGpio;
    use sensor_node_firmware::hal::timer::AvrTimers;
    use sensor_node_firmware::hal::uart::Usart0;
    use sensor_node_firmware::hal::watchdog::AvrWatchdog;
    use sensor_node_firmware::hal::{Port, TimerChannel};
    use sensor_node_firmware::predictor::LinReg;
    use sensor_node_firmware::{Error, Orchestrator};
    use ufmt::uwriteln;

    type Node = Orchestrator<AvrGpio, AvrTimers, AvrWatchdog>;
    type Console = SerialConsole<Usart0>;

    // Shared between the liveness loop and the interrupt handlers
    static NODE: Mutex<RefCell<Option<Node>>> = Mutex::new(RefCell::new(None));

    #[avr_device::entry]
    fn main() -> ! {
        let (watchdog, reset_cause) = AvrWatchdog::new();
        let mut console = SerialConsole::new(Usart0::new(UART_BAUD));
        let mut sensor = TemperatureSensor::new(Adc::new(), AnalogPin::<TEMP_SENSOR_CHANNEL>, VCC);

        console.write_line("Sensor node v0.1.0");
        uwriteln!(console, "Reset cause: {}", reset_cause.as_str()).ok();

        let mut node = match Node::new(NodeConfig::default(), AvrGpio, AvrTimers, watchdog) {
            Ok(node) => node,
            Err(err) => halt(&mut console, err),
        };
        let mut predictor = LinReg::new(0.0, 0.0, LEARNING_RATE);
        if let Err(err) = node.setup(&mut console, &mut predictor, &mut sensor) {
            halt(&mut console, err);
        }
        console.flush();

        interrupt::free(|cs| {
            NODE.borrow(cs).replace(Some(node));
        });

        // SAFETY: all shared state is initialized and owned by NODE
        unsafe { interrupt::enable() };

        loop {
            interrupt::free(|cs| {
                if let Some(node) = NODE.borrow(cs).borrow_mut().as_mut() {
                    node.service_watchdog();
                }
            });
        }
    }

    fn halt(console: &mut Console, err: Error) -> ! {
        uwriteln!(console, "Setup failed: {}", err).ok();
        console.debug("Code hi", (err.code() >> 8) as u8);
        console.debug("Code lo", err.code() as u8);
        console.flush();
        loop {}
    }

    fn with_node<F: FnOnce(&mut Node)>(f: F) {
        interrupt::free(|cs| {
            if let Some(node) = NODE.borrow(cs).borrow_mut().as_mut() {
                f(node);
            }
        });
    }

    #[avr_device::interrupt(atmega328p)]
    fn PCINT0() {
        with_node(|node| node.on_pin_change(Port::B));
    }

    #[avr_device::interrupt(atmega328p)]
    fn PCINT1() {
        with_node(|node| node.on_pin_change(Port::C));
    }

    #[avr_device::interrupt(atmega328p)]
    fn PCINT2() {
        with_node(|node| node.on_pin_change(Port::D));
    }

    #[avr_device::interrupt(atmega328p)]
    fn TIMER0_COMPA() {
        with_node(|node| node.on_timer_tick(TimerChannel::Timer0));
    }

    #[avr_device::interrupt(atmega328p)]
    fn TIMER1_COMPA() {
        with_node(|node| node.on_timer_tick(TimerChannel::Timer1));
    }

    #[avr_device::interrupt(atmega328p)]
    fn TIMER2_COMPA() {
        with_node(|node| node.on_timer_tick(TimerChannel::Timer2));
    }
}

#[cfg(not(target_arch = "avr"))]
fn main() {
    eprintln!("sensor_node_firmware runs on the ATmega328P; use `cargo test` on the host");
}
