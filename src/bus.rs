use crate::Error;

/// Register level access to the sensor.
///
/// The MPL3115A2 needs a repeated start between writing the register address and reading the
/// data back. Some controllers can't do that, so the register protocol is written against this
/// trait and there are two implementations of it:
///
/// * [`BitBangI2c`](crate::bitbang::BitBangI2c) drives the clock and data lines from GPIO pins.
/// * [`NativeI2c`](crate::native::NativeI2c) uses an `embedded_hal::i2c::I2c` controller.
///
/// Each method is one complete bus transaction, from start to stop.
pub trait RegisterBus {
    /// Error of the underlying pins or controller.
    type Error;

    /// Write a single byte to a register.
    fn write_register(&mut self, reg: u8, value: u8) -> Result<(), Error<Self::Error>>;

    /// Fill `buffer` with consecutive registers, starting at `reg`.
    ///
    /// The sensor auto-increments the register pointer, so this is a single transfer. An empty
    /// buffer doesn't touch the bus.
    fn read_registers(&mut self, reg: u8, buffer: &mut [u8]) -> Result<(), Error<Self::Error>>;

    /// Read a single register.
    fn read_register(&mut self, reg: u8) -> Result<u8, Error<Self::Error>> {
        let mut read_buffer = [0u8; 1];
        self.read_registers(reg, &mut read_buffer)?;
        Ok(read_buffer[0])
    }
}
