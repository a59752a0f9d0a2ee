use core::convert::Infallible;
use embedded_hal::serial;

/// Best-effort diagnostic output over any blocking-capable serial writer.
/// Write errors are dropped; nothing in the node depends on them.
pub struct SerialConsole<W> {
    uart: W,
}

impl<W: serial::Write<u8>> SerialConsole<W> {
    pub fn new(uart: W) -> Self {
        Self { uart }
    }

    pub fn write_byte(&mut self, byte: u8) {
        nb::block!(self.uart.write(byte)).ok();
    }

    pub fn write_str(&mut self, s: &str) {
        for byte in s.bytes() {
            self.write_byte(byte);
        }
    }

    pub fn write_line(&mut self, s: &str) {
        self.write_str(s);
        self.write_str("\r\n");
    }

    // Debug helper - print hex value
    pub fn write_hex(&mut self, val: u8) {
        const HEX_CHARS: [u8; 16] = *b"0123456789ABCDEF";
        self.write_byte(HEX_CHARS[(val >> 4) as usize]);
        self.write_byte(HEX_CHARS[(val & 0xF) as usize]);
    }

    // Print formatted debug info
    pub fn debug(&mut self, msg: &str, val: u8) {
        self.write_str("[DBG] ");
        self.write_str(msg);
        self.write_str(": 0x");
        self.write_hex(val);
        self.write_str("\r\n");
    }

    pub fn flush(&mut self) {
        nb::block!(self.uart.flush()).ok();
    }

    pub fn release(self) -> W {
        self.uart
    }
}

impl<W: serial::Write<u8>> ufmt::uWrite for SerialConsole<W> {
    type Error = Infallible;

    fn write_str(&mut self, s: &str) -> Result<(), Infallible> {
        SerialConsole::write_str(self, s);
        Ok(())
    }
}
