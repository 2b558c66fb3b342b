//! Conversion of the sensor's raw output registers to physical units.
//!
//! The MPL3115A2 reports fixed-point values. The layouts are from the datasheet, Section 14.3
//! "Data registers":
//!
//! ```text
//!              OUT_P_MSB   OUT_P_CSB   OUT_P_LSB
//! pressure:    iiii_iiii   iiii_iiii   iiff_----   18 bit unsigned Pa, 2 bit quarters
//! altitude:    iiii_iiii   iiii_iiii   ffff_----   16 bit signed m, 4 bit sixteenths
//!
//!              OUT_T_MSB   OUT_T_LSB
//! temperature: iiii_iiii   ffff_----               8 bit signed °C, 4 bit sixteenths
//! ```
//!
//! The integer parts of altitude and temperature are two's complement, so they have to be
//! sign-extended before scaling or negative readings come out as large positive ones.

/// One reading of all three sensor values.
///
/// This is returned from the `measure` method. You get:
/// * temperature in degrees Celsius,
/// * pressure in hectopascals,
/// * altitude in meters.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "use-defmt", derive(defmt::Format))]
pub struct Reading {
    pub temperature: f32,
    pub pressure: f32,
    pub altitude: f32,
}

/// Pressure in hPa from OUT_P_MSB, OUT_P_CSB and OUT_P_LSB, read in barometer mode.
pub fn pressure_hpa(raw: [u8; 3]) -> f32 {
    // 18 bits of whole Pascals: all of MSB and CSB, and the top two bits of LSB.
    let whole: u32 = (((raw[0] as u32) << 16) | ((raw[1] as u32) << 8) | (raw[2] & 0xC0) as u32) >> 6;
    // Bits 5-4 of LSB are quarter Pascals.
    let quarters: u32 = ((raw[2] & 0x30) >> 4) as u32;

    // Pa to hPa.
    (whole as f32 + quarters as f32 * 0.25) * 0.01
}

/// Temperature in °C from OUT_T_MSB and OUT_T_LSB.
pub fn temperature_celsius(raw: [u8; 2]) -> f32 {
    // The 12 significant bits sit at the top of a 16-bit word. Casting to i16 before shifting
    // makes the shift arithmetic, which sign-extends from bit 11.
    let sixteenths: i16 = (((raw[0] as u16) << 8) | (raw[1] & 0xF0) as u16) as i16 >> 4;

    sixteenths as f32 * 0.0625
}

/// Altitude in meters from OUT_P_MSB, OUT_P_CSB and OUT_P_LSB, read in altimeter mode.
pub fn altitude_meters(raw: [u8; 3]) -> f32 {
    let whole: i16 = i16::from_be_bytes([raw[0], raw[1]]);
    let sixteenths: u8 = raw[2] >> 4;

    whole as f32 + sixteenths as f32 * 0.0625
}
