//! Bit-banged I2C for the MPL3115A2.
//!
//! This is not a general I2C master. It produces exactly the sequences the sensor's register
//! protocol needs, including the repeated start, and nothing else: there's no clock stretching,
//! no arbitration and no speed negotiation. Every line change is followed by a fixed 5 µs delay,
//! which keeps the clock comfortably below the sensor's 400 kHz limit.
//!
//! The clock line is a push-pull output. The data line must be open-drain: driving it high
//! releases the line to the external pull-up so the sensor can drive it, driving it low claims
//! it. Reading it samples whatever level is on the wire.
//!
//! ```text
//!            START         bit 7          bit 0     ACK           STOP
//!        ____   ______      _____        _____     _____         ______
//! SCL        |_|      |____|     |_ .. _|     |___|     |_ .. ___|      |_
//!        _____          _________________           released        ______
//! SDA         |________X_________________X ..  ____X__________ .. _|
//! ```

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

use crate::bus::RegisterBus;
use crate::registers::{READ_ADDRESS, WRITE_ADDRESS};
use crate::Error;

/// Settle time after every clock or data line change.
pub const BIT_DELAY_US: u32 = 5;

/// Time the sensor gets to act on a register transaction before the next one starts.
pub const SETTLE_DELAY_MS: u32 = 1;

/// Where in a transaction the transport is. Used to reject calls that would put garbage on the
/// bus, like reading a byte when no read address has been sent.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    /// No transaction, the bus is released.
    Idle,
    /// START sent, the next byte is an address byte.
    Addressing,
    /// A write address was sent, bytes go to the sensor.
    Transmitting,
    /// A read address was sent, bytes come from the sensor.
    Receiving,
    /// A byte went unacknowledged, or we NACKed the last byte read. Only START or STOP may follow.
    Finished,
}

/// A bit-banged I2C transport on a clock pin `SCL` and an open-drain data pin `SDA`.
///
/// `D` provides the microsecond bit delays and the millisecond settle delay.
pub struct BitBangI2c<SCL, SDA, D> {
    scl: SCL,
    sda: SDA,
    delay: D,
    phase: Phase,
    nacks: u32,
}

impl<E, SCL, SDA, D> BitBangI2c<SCL, SDA, D>
where
    SCL: OutputPin<Error = E>,
    SDA: InputPin<Error = E> + OutputPin<Error = E>,
    D: DelayNs,
{
    /// Create the transport. The pins are expected to be configured already, the clock as an
    /// output and the data line as an open-drain output with a pull-up.
    pub fn new(scl: SCL, sda: SDA, delay: D) -> Self {
        BitBangI2c {
            scl,
            sda,
            delay,
            phase: Phase::Idle,
            nacks: 0,
        }
    }

    /// Number of bytes the sensor has not acknowledged since this transport was created.
    pub fn nack_count(&self) -> u32 {
        self.nacks
    }

    /// Release the pins and the delay.
    pub fn release(self) -> (SCL, SDA, D) {
        (self.scl, self.sda, self.delay)
    }

    /// Send a START condition: the data line falls while the clock is high.
    ///
    /// Calling this inside a transaction produces a repeated start.
    pub fn start(&mut self) -> Result<(), Error<E>> {
        self.scl_high()?;
        self.sda_release()?;
        self.sda_low()?;
        self.scl_low()?;
        self.phase = Phase::Addressing;
        Ok(())
    }

    /// Send a STOP condition: the data line rises while the clock is high. This leaves the bus
    /// idle, and is also how a transaction is abandoned half way.
    pub fn stop(&mut self) -> Result<(), Error<E>> {
        self.scl_high()?;
        self.sda_low()?;
        self.sda_release()?;
        self.scl_low()?;
        self.phase = Phase::Idle;
        Ok(())
    }

    /// Shift out one byte, MSB first, and return whether the sensor acknowledged it.
    ///
    /// The first byte after a START is the address byte. Its lowest bit decides whether the rest
    /// of the transaction sends (`send_byte`) or receives (`read_byte`).
    pub fn send_byte(&mut self, value: u8) -> Result<bool, Error<E>> {
        let next = match self.phase {
            Phase::Addressing if value & 1 == 1 => Phase::Receiving,
            Phase::Addressing | Phase::Transmitting => Phase::Transmitting,
            Phase::Idle | Phase::Receiving | Phase::Finished => return Err(Error::OutOfSequence),
        };

        for bit in (0..8).rev() {
            self.scl_low()?;
            if value & (1 << bit) != 0 {
                self.sda_release()?;
            } else {
                self.sda_low()?;
            }
            // The sensor samples on the rising edge.
            self.scl_high()?;
        }

        // Ninth clock: let go of the data line, the sensor pulls it low to acknowledge.
        self.scl_low()?;
        self.sda_release()?;
        self.scl_high()?;
        let ack = self.sda.is_low().map_err(Error::Bus)?;
        self.scl_low()?;

        self.phase = if ack { next } else { Phase::Finished };
        Ok(ack)
    }

    /// Shift in one byte, MSB first.
    ///
    /// With `send_ack` the byte is acknowledged and the sensor goes on to the next register.
    /// Without it the ninth clock is a NACK, which tells the sensor this was the last byte.
    pub fn read_byte(&mut self, send_ack: bool) -> Result<u8, Error<E>> {
        if self.phase != Phase::Receiving {
            return Err(Error::OutOfSequence);
        }

        // The clock is low here, the sensor has the first bit on the line.
        let mut value = 0u8;
        for bit in (0..8).rev() {
            self.scl_high()?;
            if self.sda.is_high().map_err(Error::Bus)? {
                value |= 1 << bit;
            }
            // Falling edge, the sensor puts out the next bit.
            self.scl_low()?;
        }

        if send_ack {
            self.sda_low()?;
        }
        self.scl_high()?;
        self.scl_low()?;
        if send_ack {
            self.sda_release()?;
        } else {
            self.phase = Phase::Finished;
        }

        Ok(value)
    }

    /// Run a register transaction. If a pin fails half way, try to leave the bus idle with a
    /// STOP; the pin error is what gets reported either way.
    fn transaction<T>(
        &mut self,
        body: impl FnOnce(&mut Self) -> Result<T, Error<E>>,
    ) -> Result<T, Error<E>> {
        let result = body(self);
        if let Err(Error::Bus(_)) = result {
            #[cfg(feature = "use-defmt")]
            defmt::warn!("mpl3115a2: pin error, abandoning transaction");
            let _ = self.stop();
            self.phase = Phase::Idle;
        }
        result
    }

    /// Send a byte inside a register transaction. A NACK ends the transaction with a STOP.
    fn send_acknowledged(&mut self, value: u8) -> Result<(), Error<E>> {
        if self.send_byte(value)? {
            return Ok(());
        }

        self.nacks = self.nacks.wrapping_add(1);
        #[cfg(feature = "use-defmt")]
        defmt::warn!("mpl3115a2: byte {=u8:#x} not acknowledged ({=u32} total)", value, self.nacks);

        self.stop()?;
        Err(Error::BusNack)
    }

    fn scl_high(&mut self) -> Result<(), Error<E>> {
        self.scl.set_high().map_err(Error::Bus)?;
        self.delay.delay_us(BIT_DELAY_US);
        Ok(())
    }

    fn scl_low(&mut self) -> Result<(), Error<E>> {
        self.scl.set_low().map_err(Error::Bus)?;
        self.delay.delay_us(BIT_DELAY_US);
        Ok(())
    }

    fn sda_release(&mut self) -> Result<(), Error<E>> {
        self.sda.set_high().map_err(Error::Bus)?;
        self.delay.delay_us(BIT_DELAY_US);
        Ok(())
    }

    fn sda_low(&mut self) -> Result<(), Error<E>> {
        self.sda.set_low().map_err(Error::Bus)?;
        self.delay.delay_us(BIT_DELAY_US);
        Ok(())
    }
}

impl<E, SCL, SDA, D> RegisterBus for BitBangI2c<SCL, SDA, D>
where
    SCL: OutputPin<Error = E>,
    SDA: InputPin<Error = E> + OutputPin<Error = E>,
    D: DelayNs,
{
    type Error = E;

    /// START, write address, register, value, STOP.
    fn write_register(&mut self, reg: u8, value: u8) -> Result<(), Error<E>> {
        self.transaction(|bus| {
            bus.start()?;
            bus.send_acknowledged(WRITE_ADDRESS)?;
            bus.send_acknowledged(reg)?;
            bus.send_acknowledged(value)?;
            bus.stop()
        })?;

        self.delay.delay_ms(SETTLE_DELAY_MS);
        Ok(())
    }

    /// START, write address, register, repeated START, read address, data bytes, STOP.
    ///
    /// Every byte but the last is acknowledged.
    fn read_registers(&mut self, reg: u8, buffer: &mut [u8]) -> Result<(), Error<E>> {
        if buffer.is_empty() {
            return Ok(());
        }

        self.transaction(|bus| {
            bus.start()?;
            bus.send_acknowledged(WRITE_ADDRESS)?;
            bus.send_acknowledged(reg)?;
            bus.start()?;
            bus.send_acknowledged(READ_ADDRESS)?;

            let last = buffer.len() - 1;
            for (i, byte) in buffer.iter_mut().enumerate() {
                *byte = bus.read_byte(i != last)?;
            }
            bus.stop()
        })?;

        self.delay.delay_ms(SETTLE_DELAY_MS);
        Ok(())
    }
}
