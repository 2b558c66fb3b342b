//! Register access through an I2C controller.
//!
//! The controller has to support combined transactions (a write followed by a read with a
//! repeated start in between), which is what `I2c::write_read` promises. On a Raspberry Pi with
//! the old `i2c-bcm2708` driver that means enabling its `combined` parameter.

use embedded_hal::i2c::{self, ErrorKind, I2c};

use crate::bus::RegisterBus;
use crate::registers::SENSOR_ADDRESS;
use crate::Error;

/// The sensor on an I2C controller `I`.
pub struct NativeI2c<I> {
    i2c: I,
    address: u8,
}

impl<I: I2c> NativeI2c<I> {
    /// Use the sensor at `SENSOR_ADDRESS` on `i2c`.
    pub fn new(i2c: I) -> Self {
        Self::with_address(i2c, SENSOR_ADDRESS)
    }

    /// Use the sensor at a different 7-bit address, for boards with address translation.
    pub fn with_address(i2c: I, address: u8) -> Self {
        NativeI2c { i2c, address }
    }

    /// Release the I2C controller.
    pub fn release(self) -> I {
        self.i2c
    }
}

impl<I: I2c> RegisterBus for NativeI2c<I> {
    type Error = I::Error;

    fn write_register(&mut self, reg: u8, value: u8) -> Result<(), Error<I::Error>> {
        self.i2c.write(self.address, &[reg, value]).map_err(bus_error)
    }

    fn read_registers(&mut self, reg: u8, buffer: &mut [u8]) -> Result<(), Error<I::Error>> {
        if buffer.is_empty() {
            return Ok(());
        }
        self.i2c.write_read(self.address, &[reg], buffer).map_err(bus_error)
    }
}

/// A missing acknowledge is reported the same way as on the bit-banged bus. Anything else is
/// passed through.
fn bus_error<E: i2c::Error>(error: E) -> Error<E> {
    match error.kind() {
        ErrorKind::NoAcknowledge(_) => {
            #[cfg(feature = "use-defmt")]
            defmt::warn!("mpl3115a2: controller reported NACK");
            Error::BusNack
        }
        _ => Error::Bus(error),
    }
}
