#![cfg_attr(not(test), no_std)]
//! MPL3115A2 driver.
//!
//! The MPL3115A2 measures pressure (or altitude) and temperature. Reading it needs an I2C
//! repeated start, so the register protocol runs on top of the [`RegisterBus`] trait with two
//! backends: [`BitBangI2c`] for boards where the I2C controller can't do a repeated start, and
//! [`NativeI2c`] for controllers that can.
//!
//! Example, reading the temperature once over an I2C controller. With a bit-banged bus the only
//! difference is the bus: `BitBangI2c::new(scl, sda, delay)`.
//!
//! ```
//! # use embedded_hal_mock::eh1::delay::NoopDelay as MockDelay;
//! # use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction};
//! # use mpl3115a2_driver::{Mpl3115a2, NativeI2c, SENSOR_ADDRESS};
//! # let update = |before: u8, after: u8| [
//! #     Transaction::write_read(SENSOR_ADDRESS, vec![0x26], vec![before]),
//! #     Transaction::write(SENSOR_ADDRESS, vec![0x26, after]),
//! # ];
//! # let mut expectations = vec![
//! #     Transaction::write_read(SENSOR_ADDRESS, vec![0x0C], vec![0xC4]),
//! #     Transaction::write(SENSOR_ADDRESS, vec![0x26, 0x00]),
//! #     Transaction::write(SENSOR_ADDRESS, vec![0x13, 0x07]),
//! # ];
//! # expectations.extend(update(0x00, 0x00));
//! # expectations.extend(update(0x00, 0x08));
//! # expectations.extend(update(0x08, 0x88));
//! # expectations.extend(update(0x88, 0x89));
//! # expectations.extend(update(0x89, 0x89));
//! # expectations.extend(update(0x89, 0x8B));
//! # expectations.push(Transaction::write_read(SENSOR_ADDRESS, vec![0x00], vec![0x02]));
//! # expectations.push(Transaction::write_read(SENSOR_ADDRESS, vec![0x04], vec![0x17, 0x80]));
//! # let i2c = I2cMock::new(&expectations);
//! # let mut delay = MockDelay::new();
//! let mut mpl3115a2 = Mpl3115a2::new(NativeI2c::new(i2c));
//! let mut sensor = mpl3115a2.init(&mut delay).unwrap();
//! let temperature = sensor.read_temperature(&mut delay).unwrap();
//!
//! println!("temperature (mpl3115a2): {:.2}C", temperature);
//! # assert_eq!(temperature, 23.5);
//! # mpl3115a2.destroy().release().done();
//! ```
//!
//! [MPL3115A2 Datasheet](https://www.nxp.com/docs/en/data-sheet/MPL3115A2.pdf)
//!
//! Every measurement is a one-shot cycle. All control register changes are read-modify-write.
//!
//! ```text
//!          Start (Power on)
//!                 │
//!                 ▼
//!     Read WHO_AM_I (0x0C) == 0xC4 ──► No ──► Error::DeviceOffline
//!                 │
//!                 ▼
//!     CTRL_REG1 (0x26) = 0x00, PT_DATA_CFG (0x13) = 0x07
//!                 │
//!                 ▼
//!     Clear SBYB (standby)          ◄─────────────┐
//!                 │                               │
//!                 ▼                               │
//!     Set OS, set/clear ALT                       │
//!                 │                               │
//!                 ▼                               │
//!     Set SBYB (active)                           │
//!                 │                               │
//!                 ▼                               │
//!     Clear then set OST                          │
//!                 │                               │
//!                 ▼                               │
//!     Read STATUS (0x00)  ◄── Wait 1 ms ◄── No    │
//!                 │                         ▲     │
//!                 ▼                         │     │
//!          PDR / TDR set ───────────────────┘     │
//!                 │                               │
//!                 ▼                               │
//!     Read OUT_P (0x01, 3 bytes) or OUT_T (0x04, 2 bytes)
//!                 │                               │
//!                 ▼                               │
//!        Decode, next measurement ────────────────┘
//! ```

pub mod bitbang;
pub mod bus;
pub mod measurement;
pub mod native;
pub mod registers;

use embedded_hal::delay::DelayNs;

pub use crate::bitbang::BitBangI2c;
pub use crate::bus::RegisterBus;
pub use crate::measurement::Reading;
pub use crate::native::NativeI2c;
pub use crate::registers::{DataReady, Mode, SensorStatus, SENSOR_ADDRESS};

use crate::registers::{Control, ControlRegister, Register, DEVICE_ID, ENABLE_EVENT_FLAGS};

/// Oversampling exponent used unless `with_oversample` says otherwise. 2^1 = 2 samples, which
/// keeps a one-shot measurement around 10 ms.
pub const DEFAULT_OVERSAMPLE: u8 = 1;

/// Status polls before a measurement is given up, unless `with_ready_timeout` says otherwise.
/// With the 1 ms poll interval this is about a second, well above the 512 ms the sensor needs
/// at 128x oversampling.
pub const DEFAULT_READY_POLLS: u32 = 1000;

/// Interval between data ready polls.
const POLL_INTERVAL_MS: u32 = 1;

/// Driver errors.
#[derive(Debug, PartialEq)]
#[cfg_attr(feature = "use-defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// Pin or I2C controller error
    Bus(E),
    /// The sensor did not acknowledge a byte. The transaction was abandoned.
    BusNack,
    /// WHO_AM_I did not read 0xC4. Carries the value that was read.
    DeviceOffline(u8),
    /// The data ready flag was not set within the ready timeout.
    StalledReady,
    /// A bit-banged byte transfer was requested in the wrong part of a transaction, like a read
    /// without a repeated start and read address first.
    OutOfSequence,
}

/// An MPL3115A2 sensor on the register bus `B`.
pub struct Mpl3115a2<B: RegisterBus> {
    bus: B,
    oversample: u8,
    ready_polls: Option<u32>,
}

impl<B: RegisterBus> Mpl3115a2<B> {
    /// Initializes the MPL3115A2 driver.
    ///
    /// This consumes the bus `B`. Before you can take measurements you must call the `init`
    /// method, which checks that the sensor is there and puts it in a known state.
    pub fn new(bus: B) -> Self {
        Mpl3115a2 {
            bus,
            oversample: DEFAULT_OVERSAMPLE,
            ready_polls: Some(DEFAULT_READY_POLLS),
        }
    }

    /// Set the oversampling exponent used by the measure methods. The sensor averages 2^n
    /// samples, n is clamped to 7.
    pub fn with_oversample(mut self, oversample: u8) -> Self {
        self.oversample = oversample.min(registers::MAX_OVERSAMPLE);
        self
    }

    /// Set how many times the status register is polled before a measurement fails with
    /// `Error::StalledReady`. `None` waits forever.
    pub fn with_ready_timeout(mut self, polls: Option<u32>) -> Self {
        self.ready_polls = polls;
        self
    }

    /// Check the sensor's identity and put it in standby with the data ready flags enabled.
    ///
    /// Returns `Error::DeviceOffline` if the sensor doesn't identify as an MPL3115A2. In that
    /// case it shouldn't be polled further.
    pub fn init(&mut self, delay: &mut impl DelayNs) -> Result<Mpl3115a2Initialized<'_, B>, Error<B::Error>> {
        delay.delay_ms(1);

        let id = self.bus.read_register(Register::WhoAmI as u8)?;
        #[cfg(feature = "use-defmt")]
        defmt::debug!("mpl3115a2: WHO_AM_I = {=u8:#x}", id);
        if id != DEVICE_ID {
            #[cfg(feature = "use-defmt")]
            defmt::warn!("mpl3115a2: sensor is offline");
            return Err(Error::DeviceOffline(id));
        }

        // Standby, barometer mode, no oversampling, no one-shot in progress.
        self.bus.write_register(Register::CtrlReg1 as u8, 0x00)?;
        self.bus.write_register(Register::PtDataCfg as u8, ENABLE_EVENT_FLAGS)?;

        Ok(Mpl3115a2Initialized { mpl3115a2: self })
    }

    /// Ask the sensor whether it is an MPL3115A2.
    ///
    /// This only reads WHO_AM_I, it doesn't change anything on the sensor.
    pub fn check_online(&mut self) -> Result<bool, Error<B::Error>> {
        Ok(self.bus.read_register(Register::WhoAmI as u8)? == DEVICE_ID)
    }

    /// Destroys this driver and releases the bus `B`.
    pub fn destroy(self) -> B {
        self.bus
    }

    /// Read-modify-write CTRL_REG1.
    fn update_control(
        &mut self,
        change: impl FnOnce(ControlRegister) -> ControlRegister,
    ) -> Result<(), Error<B::Error>> {
        let current = ControlRegister::new(self.bus.read_register(Register::CtrlReg1 as u8)?);
        self.bus.write_register(Register::CtrlReg1 as u8, change(current).0)
    }
}

/// Mpl3115a2Initialized is returned by Mpl3115a2::init() and the sensor is ready to measure.
///
/// The `read_*` methods each run a full one-shot cycle. The mode methods are public as well, for
/// callers who want to drive the cycle themselves.
pub struct Mpl3115a2Initialized<'a, B: RegisterBus> {
    mpl3115a2: &'a mut Mpl3115a2<B>,
}

impl<'a, B: RegisterBus> Mpl3115a2Initialized<'a, B> {
    /// Measure temperature, pressure and altitude, in that order.
    ///
    /// The sensor has to switch between barometer and altimeter mode in between, so these are
    /// three separate one-shot cycles.
    pub fn measure(&mut self, delay: &mut impl DelayNs) -> Result<Reading, Error<B::Error>> {
        let temperature = self.read_temperature(delay)?;
        let pressure = self.read_pressure(delay)?;
        let altitude = self.read_altitude(delay)?;

        Ok(Reading {
            temperature,
            pressure,
            altitude,
        })
    }

    /// Pressure in hPa.
    pub fn read_pressure(&mut self, delay: &mut impl DelayNs) -> Result<f32, Error<B::Error>> {
        let oversample = self.mpl3115a2.oversample;
        self.set_standby()?;
        self.set_barometer_mode(oversample)?;
        self.set_active()?;
        self.trigger_one_shot()?;
        self.wait_for_data(DataReady::Pressure, delay)?;

        let mut raw = [0u8; 3];
        self.mpl3115a2.bus.read_registers(Register::PressureMsb as u8, &mut raw)?;
        Ok(measurement::pressure_hpa(raw))
    }

    /// Temperature in °C.
    pub fn read_temperature(&mut self, delay: &mut impl DelayNs) -> Result<f32, Error<B::Error>> {
        let oversample = self.mpl3115a2.oversample;
        self.set_standby()?;
        self.set_altimeter_mode(oversample)?;
        self.set_active()?;
        self.trigger_one_shot()?;
        self.wait_for_data(DataReady::Temperature, delay)?;

        let mut raw = [0u8; 2];
        self.mpl3115a2.bus.read_registers(Register::TemperatureMsb as u8, &mut raw)?;
        Ok(measurement::temperature_celsius(raw))
    }

    /// Altitude in meters.
    pub fn read_altitude(&mut self, delay: &mut impl DelayNs) -> Result<f32, Error<B::Error>> {
        let oversample = self.mpl3115a2.oversample;
        self.set_standby()?;
        self.set_altimeter_mode(oversample)?;
        self.set_active()?;
        self.trigger_one_shot()?;
        self.wait_for_data(DataReady::Pressure, delay)?;

        let mut raw = [0u8; 3];
        self.mpl3115a2.bus.read_registers(Register::PressureMsb as u8, &mut raw)?;
        Ok(measurement::altitude_meters(raw))
    }

    /// Clear SBYB. The sensor stops measuring, mode changes are only safe in standby.
    pub fn set_standby(&mut self) -> Result<(), Error<B::Error>> {
        self.mpl3115a2
            .update_control(|reg| reg.without_bits(Control::Active as u8))
    }

    /// Set SBYB.
    pub fn set_active(&mut self) -> Result<(), Error<B::Error>> {
        self.mpl3115a2
            .update_control(|reg| reg.with_bits(Control::Active as u8))
    }

    /// Set the oversampling exponent, 0 to 7. Larger values are clamped to 7.
    pub fn set_oversample(&mut self, oversample: u8) -> Result<(), Error<B::Error>> {
        self.mpl3115a2
            .update_control(|reg| reg.with_oversample(oversample))
    }

    /// Switch to altimeter mode: the pressure registers report meters.
    pub fn set_altimeter_mode(&mut self, oversample: u8) -> Result<(), Error<B::Error>> {
        self.set_oversample(oversample)?;
        self.mpl3115a2
            .update_control(|reg| reg.with_bits(Control::Altimeter as u8))
    }

    /// Switch to barometer mode: the pressure registers report Pascals.
    pub fn set_barometer_mode(&mut self, oversample: u8) -> Result<(), Error<B::Error>> {
        self.set_oversample(oversample)?;
        self.mpl3115a2
            .update_control(|reg| reg.without_bits(Control::Altimeter as u8))
    }

    /// Start a measurement. The sensor reacts to OST going from 0 to 1, so it is cleared first.
    /// The sensor clears it again when the measurement is done.
    pub fn trigger_one_shot(&mut self) -> Result<(), Error<B::Error>> {
        self.mpl3115a2
            .update_control(|reg| reg.without_bits(Control::OneShot as u8))?;
        self.mpl3115a2
            .update_control(|reg| reg.with_bits(Control::OneShot as u8))
    }

    /// Current operating mode, read from CTRL_REG1.
    pub fn mode(&mut self) -> Result<Mode, Error<B::Error>> {
        let reg = self.mpl3115a2.bus.read_register(Register::CtrlReg1 as u8)?;
        Ok(ControlRegister::new(reg).mode())
    }

    /// Read the status register once.
    pub fn read_status(&mut self) -> Result<SensorStatus, Error<B::Error>> {
        let status = self.mpl3115a2.bus.read_register(Register::Status as u8)?;
        Ok(SensorStatus::new(status))
    }

    /// Poll the status register every millisecond until `flag` is set.
    ///
    /// Gives up with `Error::StalledReady` after the configured number of polls.
    pub fn wait_for_data(
        &mut self,
        flag: DataReady,
        delay: &mut impl DelayNs,
    ) -> Result<SensorStatus, Error<B::Error>> {
        let mut polls: u32 = 0;
        loop {
            let status = self.read_status()?;
            if status.is_ready(flag) {
                return Ok(status);
            }

            polls = polls.saturating_add(1);
            if let Some(limit) = self.mpl3115a2.ready_polls {
                if polls >= limit {
                    #[cfg(feature = "use-defmt")]
                    defmt::warn!("mpl3115a2: {} not ready after {=u32} polls", flag, polls);
                    return Err(Error::StalledReady);
                }
            }
            delay.delay_ms(POLL_INTERVAL_MS);
        }
    }

    /// Gives back the driver, and with it access to `destroy`.
    pub fn destroy(self) -> &'a mut Mpl3115a2<B> {
        self.mpl3115a2
    }
}

#[cfg(test)]
mod tests {
    use super::{Error, Mode, Mpl3115a2, Mpl3115a2Initialized, NativeI2c, DEFAULT_READY_POLLS, SENSOR_ADDRESS};
    use crate::bitbang::testing::{verify, Script};
    use crate::registers::{DataReady, Register};
    use embedded_hal_mock::eh1::delay::NoopDelay as MockDelay;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction};

    const CTRL: u8 = Register::CtrlReg1 as u8;

    /// A read-modify-write of CTRL_REG1 on the native bus.
    fn update(before: u8, after: u8) -> [Transaction; 2] {
        [
            Transaction::write_read(SENSOR_ADDRESS, vec![CTRL], vec![before]),
            Transaction::write(SENSOR_ADDRESS, vec![CTRL, after]),
        ]
    }

    fn status(value: u8) -> Transaction {
        Transaction::write_read(SENSOR_ADDRESS, vec![Register::Status as u8], vec![value])
    }

    fn driver(expectations: &[Transaction]) -> Mpl3115a2<NativeI2c<I2cMock>> {
        Mpl3115a2::new(NativeI2c::new(I2cMock::new(expectations)))
    }

    fn done(mpl3115a2: Mpl3115a2<NativeI2c<I2cMock>>) {
        let mut mock = mpl3115a2.destroy().release();
        mock.done(); // verify expectations
    }

    #[test]
    fn check_online() {
        let expectations = vec![Transaction::write_read(
            SENSOR_ADDRESS,
            vec![Register::WhoAmI as u8],
            vec![0xC4],
        )];
        let mut mpl3115a2 = driver(&expectations);

        assert!(mpl3115a2.check_online().unwrap());

        done(mpl3115a2);
    }

    #[test]
    fn check_offline() {
        let expectations = vec![Transaction::write_read(
            SENSOR_ADDRESS,
            vec![Register::WhoAmI as u8],
            vec![0xFF],
        )];
        let mut mpl3115a2 = driver(&expectations);

        assert!(!mpl3115a2.check_online().unwrap());

        done(mpl3115a2);
    }

    /// init resets the control register and enables the event flags.
    #[test]
    fn init() {
        let expectations = vec![
            Transaction::write_read(SENSOR_ADDRESS, vec![Register::WhoAmI as u8], vec![0xC4]),
            Transaction::write(SENSOR_ADDRESS, vec![CTRL, 0x00]),
            Transaction::write(SENSOR_ADDRESS, vec![Register::PtDataCfg as u8, 0x07]),
        ];
        let mut mpl3115a2 = driver(&expectations);
        let mut mock_delay = MockDelay::new();

        mpl3115a2.init(&mut mock_delay).unwrap();

        done(mpl3115a2);
    }

    /// An offline sensor is reported and not written to.
    #[test]
    fn init_offline() {
        let expectations = vec![Transaction::write_read(
            SENSOR_ADDRESS,
            vec![Register::WhoAmI as u8],
            vec![0x00],
        )];
        let mut mpl3115a2 = driver(&expectations);
        let mut mock_delay = MockDelay::new();

        assert!(matches!(
            mpl3115a2.init(&mut mock_delay),
            Err(Error::DeviceOffline(0x00))
        ));

        done(mpl3115a2);
    }

    /// Oversampling of 10 doesn't fit the register and is written as 7.
    #[test]
    fn altimeter_mode_clamps_oversample() {
        let mut expectations = vec![];
        for _ in 0..2 {
            expectations.extend(update(0x00, 0b0011_1000));
            expectations.extend(update(0b0011_1000, 0b1011_1000));
        }
        let mut mpl3115a2 = driver(&expectations);

        let mut sensor = Mpl3115a2Initialized { mpl3115a2: &mut mpl3115a2 };
        sensor.set_altimeter_mode(10).unwrap();
        sensor.set_altimeter_mode(7).unwrap();

        done(mpl3115a2);
    }

    /// Switching to barometer mode keeps the active and one-shot bits.
    #[test]
    fn barometer_mode_preserves_other_bits() {
        let mut expectations = vec![];
        expectations.extend(update(0b1011_1011, 0b1001_0011));
        expectations.extend(update(0b1001_0011, 0b0001_0011));
        let mut mpl3115a2 = driver(&expectations);

        let mut sensor = Mpl3115a2Initialized { mpl3115a2: &mut mpl3115a2 };
        sensor.set_barometer_mode(2).unwrap();

        done(mpl3115a2);
    }

    #[test]
    fn trigger_one_shot_clears_then_sets() {
        let mut expectations = vec![];
        expectations.extend(update(0b0000_1011, 0b0000_1001));
        expectations.extend(update(0b0000_1001, 0b0000_1011));
        let mut mpl3115a2 = driver(&expectations);

        let mut sensor = Mpl3115a2Initialized { mpl3115a2: &mut mpl3115a2 };
        sensor.trigger_one_shot().unwrap();

        done(mpl3115a2);
    }

    #[test]
    fn mode() {
        let expectations = vec![
            Transaction::write_read(SENSOR_ADDRESS, vec![CTRL], vec![0x00]),
            Transaction::write_read(SENSOR_ADDRESS, vec![CTRL], vec![0x89]),
            Transaction::write_read(SENSOR_ADDRESS, vec![CTRL], vec![0x09]),
        ];
        let mut mpl3115a2 = driver(&expectations);

        let mut sensor = Mpl3115a2Initialized { mpl3115a2: &mut mpl3115a2 };
        assert_eq!(sensor.mode().unwrap(), Mode::Standby);
        assert_eq!(sensor.mode().unwrap(), Mode::Altimeter);
        assert_eq!(sensor.mode().unwrap(), Mode::Barometer);

        done(mpl3115a2);
    }

    /// The ready flag is polled until it is set.
    #[test]
    fn wait_for_data_polls() {
        let expectations = vec![status(0x00), status(0x02), status(0x06)];
        let mut mpl3115a2 = driver(&expectations);
        let mut mock_delay = MockDelay::new();

        let mut sensor = Mpl3115a2Initialized { mpl3115a2: &mut mpl3115a2 };
        let ready = sensor.wait_for_data(DataReady::Pressure, &mut mock_delay).unwrap();
        assert_eq!(ready.0, 0x06);

        done(mpl3115a2);
    }

    #[test]
    fn wait_for_data_times_out() {
        let expectations = vec![status(0x00), status(0x00), status(0x00)];
        let mut mpl3115a2 = driver(&expectations).with_ready_timeout(Some(3));
        let mut mock_delay = MockDelay::new();

        let mut sensor = Mpl3115a2Initialized { mpl3115a2: &mut mpl3115a2 };
        assert_eq!(
            sensor.wait_for_data(DataReady::Temperature, &mut mock_delay),
            Err(Error::StalledReady)
        );

        done(mpl3115a2);
    }

    /// Without a limit the poll outlasts the default one and ends when the flag shows up.
    #[test]
    fn wait_for_data_without_timeout() {
        let mut expectations = vec![status(0x00); DEFAULT_READY_POLLS as usize + 5];
        expectations.push(status(0x04));
        let mut mpl3115a2 = driver(&expectations).with_ready_timeout(None);
        let mut mock_delay = MockDelay::new();

        let mut sensor = Mpl3115a2Initialized { mpl3115a2: &mut mpl3115a2 };
        let ready = sensor.wait_for_data(DataReady::Pressure, &mut mock_delay).unwrap();
        assert_eq!(ready.0, 0x04);

        done(mpl3115a2);
    }

    /// Temperature cycle in altimeter mode with the default oversampling of 1.
    #[test]
    fn read_temperature() {
        let mut expectations = vec![];
        expectations.extend(update(0x00, 0x00)); // standby
        expectations.extend(update(0x00, 0x08)); // oversample 1
        expectations.extend(update(0x08, 0x88)); // altimeter
        expectations.extend(update(0x88, 0x89)); // active
        expectations.extend(update(0x89, 0x89)); // clear OST
        expectations.extend(update(0x89, 0x8B)); // set OST
        expectations.push(status(0x00));
        expectations.push(status(0x02));
        expectations.push(Transaction::write_read(
            SENSOR_ADDRESS,
            vec![Register::TemperatureMsb as u8],
            vec![0x17, 0x80],
        ));
        let mut mpl3115a2 = driver(&expectations);
        let mut mock_delay = MockDelay::new();

        let mut sensor = Mpl3115a2Initialized { mpl3115a2: &mut mpl3115a2 };
        let temperature = sensor.read_temperature(&mut mock_delay).unwrap();
        assert_eq!(temperature, 23.5);

        done(mpl3115a2);
    }

    /// Altitude below sea level, with oversampling set on the driver.
    #[test]
    fn read_altitude() {
        let mut expectations = vec![];
        expectations.extend(update(0x01, 0x00));
        expectations.extend(update(0x00, 0x38));
        expectations.extend(update(0x38, 0xB8));
        expectations.extend(update(0xB8, 0xB9));
        expectations.extend(update(0xB9, 0xB9));
        expectations.extend(update(0xB9, 0xBB));
        expectations.push(status(0x04));
        expectations.push(Transaction::write_read(
            SENSOR_ADDRESS,
            vec![Register::PressureMsb as u8],
            vec![0xFF, 0xF6, 0x80],
        ));
        let mut mpl3115a2 = driver(&expectations).with_oversample(7);
        let mut mock_delay = MockDelay::new();

        let mut sensor = Mpl3115a2Initialized { mpl3115a2: &mut mpl3115a2 };
        let altitude = sensor.read_altitude(&mut mock_delay).unwrap();
        assert_eq!(altitude, -10.0 + 0.5);

        done(mpl3115a2);
    }

    /// Temperature, pressure and altitude in one go, switching modes in between.
    #[test]
    fn measure() {
        let mut expectations = vec![];
        // temperature
        expectations.extend(update(0x00, 0x00));
        expectations.extend(update(0x00, 0x08));
        expectations.extend(update(0x08, 0x88));
        expectations.extend(update(0x88, 0x89));
        expectations.extend(update(0x89, 0x89));
        expectations.extend(update(0x89, 0x8B));
        expectations.push(status(0x02));
        expectations.push(Transaction::write_read(
            SENSOR_ADDRESS,
            vec![Register::TemperatureMsb as u8],
            vec![0x16, 0x40],
        ));
        // pressure, the one-shot bit has been cleared by the sensor
        expectations.extend(update(0x89, 0x88));
        expectations.extend(update(0x88, 0x88));
        expectations.extend(update(0x88, 0x08));
        expectations.extend(update(0x08, 0x09));
        expectations.extend(update(0x09, 0x09));
        expectations.extend(update(0x09, 0x0B));
        expectations.push(status(0x04));
        expectations.push(Transaction::write_read(
            SENSOR_ADDRESS,
            vec![Register::PressureMsb as u8],
            vec![0x62, 0xE3, 0x70],
        ));
        // altitude
        expectations.extend(update(0x09, 0x08));
        expectations.extend(update(0x08, 0x08));
        expectations.extend(update(0x08, 0x88));
        expectations.extend(update(0x88, 0x89));
        expectations.extend(update(0x89, 0x89));
        expectations.extend(update(0x89, 0x8B));
        expectations.push(status(0x06));
        expectations.push(Transaction::write_read(
            SENSOR_ADDRESS,
            vec![Register::PressureMsb as u8],
            vec![0x00, 0x6E, 0x40],
        ));
        let mut mpl3115a2 = driver(&expectations);
        let mut mock_delay = MockDelay::new();

        let mut sensor = Mpl3115a2Initialized { mpl3115a2: &mut mpl3115a2 };
        let reading = sensor.measure(&mut mock_delay).unwrap();

        done(mpl3115a2);

        // 0x164 sixteenths = 22.25C. 0x62E37 quarters = 101261.75 Pa. 0x6E = 110m + 4/16.
        assert_eq!(reading.temperature, 22.25);
        assert!((reading.pressure - 1012.6175).abs() < 1e-3);
        assert_eq!(reading.altitude, 110.25);
    }

    /// The whole chain on the bit-banged bus: identity check, barometer one-shot with
    /// oversampling 1, one busy poll, then the three pressure bytes.
    #[test]
    fn pressure_over_bitbang() {
        let mut script = Script::new();
        script
            .read_registers(Register::WhoAmI as u8, &[0xC4])
            .write_register(CTRL, 0x00)
            .write_register(Register::PtDataCfg as u8, 0x07)
            // standby
            .read_registers(CTRL, &[0x00])
            .write_register(CTRL, 0x00)
            // barometer, oversample 1
            .read_registers(CTRL, &[0x00])
            .write_register(CTRL, 0x08)
            .read_registers(CTRL, &[0x08])
            .write_register(CTRL, 0x08)
            // active
            .read_registers(CTRL, &[0x08])
            .write_register(CTRL, 0x09)
            // one-shot
            .read_registers(CTRL, &[0x09])
            .write_register(CTRL, 0x09)
            .read_registers(CTRL, &[0x09])
            .write_register(CTRL, 0x0B)
            // busy, then PDR
            .read_registers(Register::Status as u8, &[0x00])
            .read_registers(Register::Status as u8, &[0x04])
            .read_registers(Register::PressureMsb as u8, &[0x01, 0x86, 0xA0]);
        let mut mpl3115a2 = Mpl3115a2::new(script.bus());
        let mut mock_delay = MockDelay::new();

        let pressure = {
            let mut sensor = mpl3115a2.init(&mut mock_delay).unwrap();
            sensor.read_pressure(&mut mock_delay).unwrap()
        };

        let expected = ((((0x01u32 << 16) | (0x86 << 8) | (0xA0 & 0xC0)) >> 6) as f32 + 2.0 * 0.25) * 0.01;
        assert!((pressure - expected).abs() < 1e-4);
        assert_eq!(mpl3115a2.bus.nack_count(), 0);

        verify(mpl3115a2.destroy());
    }

    /// A NACK while reading WHO_AM_I fails init with BusNack, and the bus is left stopped.
    #[test]
    fn init_nack_over_bitbang() {
        let mut script = Script::new();
        script
            .start()
            .send_byte(crate::registers::WRITE_ADDRESS, false)
            .stop();
        let mut mpl3115a2 = Mpl3115a2::new(script.bus());
        let mut mock_delay = MockDelay::new();

        assert!(matches!(mpl3115a2.init(&mut mock_delay), Err(Error::BusNack)));
        assert_eq!(mpl3115a2.bus.nack_count(), 1);

        verify(mpl3115a2.destroy());
    }
}
