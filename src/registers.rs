//! MPL3115A2 register map and the bitfields this driver reads and writes.
//!
//! Register addresses and bit positions are from the MPL3115A2 datasheet (Rev. 7.0, Section 14,
//! Table 11, "Register address map").

/// The sensor's 7-bit I2C address.
pub const SENSOR_ADDRESS: u8 = 0b0110_0000; // 0x60

/// Address byte for a write transfer, as it goes out on the wire: address << 1 | 0.
pub const WRITE_ADDRESS: u8 = SENSOR_ADDRESS << 1; // 0xC0

/// Address byte for a read transfer, as it goes out on the wire: address << 1 | 1.
pub const READ_ADDRESS: u8 = (SENSOR_ADDRESS << 1) | 1; // 0xC1

/// Value the WHO_AM_I register reports on a healthy device.
pub const DEVICE_ID: u8 = 0xC4;

/// Value written to PT_DATA_CFG: enable the data ready event flags for pressure/altitude and
/// temperature, and the combined data ready flag.
pub const ENABLE_EVENT_FLAGS: u8 = 0b0000_0111; // 0x07

/// Largest oversampling exponent the OS field can hold. 2^7 = 128 samples.
pub const MAX_OVERSAMPLE: u8 = 7;

/// Registers used by this driver.
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(u8)]
pub enum Register {
    Status = 0x00,         // DR_STATUS alias, data ready flags.
    PressureMsb = 0x01,    // OUT_P_MSB, then OUT_P_CSB and OUT_P_LSB by auto-increment.
    TemperatureMsb = 0x04, // OUT_T_MSB, then OUT_T_LSB by auto-increment.
    WhoAmI = 0x0C,         // Device identification, reads DEVICE_ID.
    PtDataCfg = 0x13,      // Data event flag configuration.
    CtrlReg1 = 0x26,       // Mode, oversampling, one-shot and standby control.
}

/// Data ready bits of the status register.
///
/// The flags are set by the sensor when a fresh sample has been written to the output registers,
/// and they are cleared when the data is read.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "use-defmt", derive(defmt::Format))]
pub enum DataReady {
    Temperature = 0b0000_0010, // TDR, bit 1. 0x02
    Pressure = 0b0000_0100,    // PDR, bit 2. 0x04. Covers altitude as well.
}

/// Bits of CTRL_REG1.
pub enum Control {
    Active = 0b0000_0001,     // SBYB, 1 is active, 0 is standby.
    OneShot = 0b0000_0010,    // OST, 0->1 takes one measurement. Cleared by the sensor when done.
    Oversample = 0b0011_1000, // OS[2:0], samples = 2^OS.
    Altimeter = 0b1000_0000,  // ALT, 1 is altimeter, 0 is barometer.
}

/// Contents of the status register, as returned from `wait_for_data` and `read_status`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorStatus(pub u8);

impl SensorStatus {
    pub fn new(status: u8) -> Self {
        SensorStatus(status)
    }

    /// Check whether the given data ready flag is set.
    pub fn is_ready(self, flag: DataReady) -> bool {
        (self.0 & flag as u8) != 0
    }
}

/// Operating mode of the sensor, decoded from CTRL_REG1.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "use-defmt", derive(defmt::Format))]
pub enum Mode {
    Standby,
    Altimeter,
    Barometer,
}

/// A CTRL_REG1 value.
///
/// All changes to the control register are read-modify-write: read the current value, change the
/// bits of interest with these methods and write the result back.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlRegister(pub u8);

impl ControlRegister {
    pub fn new(value: u8) -> Self {
        ControlRegister(value)
    }

    pub fn with_bits(self, mask: u8) -> Self {
        ControlRegister(self.0 | mask)
    }

    pub fn without_bits(self, mask: u8) -> Self {
        ControlRegister(self.0 & !mask)
    }

    /// Replace the oversampling exponent, leaving every other bit alone.
    ///
    /// Exponents above 7 don't fit in the three bit field and are clamped to 7.
    pub fn with_oversample(self, oversample: u8) -> Self {
        let oversample = oversample.min(MAX_OVERSAMPLE);
        ControlRegister((self.0 & !(Control::Oversample as u8)) | (oversample << 3))
    }

    pub fn oversample(self) -> u8 {
        (self.0 & Control::Oversample as u8) >> 3
    }

    pub fn is_active(self) -> bool {
        (self.0 & Control::Active as u8) != 0
    }

    pub fn is_altimeter(self) -> bool {
        (self.0 & Control::Altimeter as u8) != 0
    }

    /// True while a one-shot measurement is still in progress.
    pub fn one_shot_pending(self) -> bool {
        (self.0 & Control::OneShot as u8) != 0
    }

    pub fn mode(self) -> Mode {
        match (self.is_active(), self.is_altimeter()) {
            (false, _) => Mode::Standby,
            (true, true) => Mode::Altimeter,
            (true, false) => Mode::Barometer,
        }
    }
}
