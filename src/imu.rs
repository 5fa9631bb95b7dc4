//! LSM6DSV32X accelerometer and gyroscope on SPI, polled.

use embedded_hal::spi::{Operation, SpiDevice};

pub mod reg {
    pub const FUNC_CFG_ACCESS: u8 = 0x01;
    pub const WHO_AM_I: u8 = 0x0F;
    pub const CTRL1: u8 = 0x10;
    pub const CTRL2: u8 = 0x11;
    pub const CTRL3: u8 = 0x12;
    pub const CTRL4: u8 = 0x13;
    pub const CTRL5: u8 = 0x14;
    pub const CTRL6: u8 = 0x15;
    pub const CTRL7: u8 = 0x16;
    pub const CTRL8: u8 = 0x17;
    pub const CTRL9: u8 = 0x18;
    pub const CTRL10: u8 = 0x19;
    pub const STATUS_REG: u8 = 0x1E;
    pub const OUT_TEMP_L: u8 = 0x20;
    pub const OUTX_L_G: u8 = 0x22;
    pub const OUTX_L_A: u8 = 0x28;
    pub const EMB_FUNC_CFG: u8 = 0x63;
}

pub const DEVICE_ID: u8 = 0x70;

const READ: u8 = 0x80;
/// CTRL3 SW_RESET.
const SW_RESET: u8 = 0b0000_0001;
/// SW_RESET, BOOT and SW_POR across CTRL3 and FUNC_CFG_ACCESS.
const RESET_PENDING: u8 = 0b1010_0001;

/// Polling setup: 7.5 Hz accel at 4 g, 15 Hz gyro at 2000 dps, filtered.
pub const DEFAULT_SETUP: [(u8, u8); 9] = [
    (reg::CTRL3, 0b0000_0010),
    (reg::CTRL1, 0b0010_0000),
    (reg::CTRL2, 0b0110_0000),
    (reg::CTRL8, 0b0000_0100),
    (reg::CTRL6, 0b0100_0000),
    (reg::CTRL7, 0b1000_0000),
    (reg::CTRL4, 0b0001_0000),
    (reg::CTRL9, 0b0001_0000),
    (reg::EMB_FUNC_CFG, 0b0000_1100),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    Spi(E),
    WrongId(u8),
    ResetTimeout,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Config {
    /// Reads of the reset flags before giving up.
    pub reset_polls: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self { reset_polls: 1000 }
    }
}

/// STATUS_REG snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Status(pub u8);

impl Status {
    pub fn accel_ready(&self) -> bool {
        self.0 & 0b1000_0000 != 0
    }

    pub fn gyro_ready(&self) -> bool {
        self.0 & 0b0100_0000 != 0
    }

    pub fn temp_ready(&self) -> bool {
        self.0 & 0b0010_0000 != 0
    }
}

pub fn fs4_to_mg(lsb: i16) -> f32 {
    lsb as f32 * 0.122
}

pub fn fs2000_to_mdps(lsb: i16) -> f32 {
    lsb as f32 * 70.0
}

pub fn lsb_to_celsius(lsb: i16) -> f32 {
    lsb as f32 / 256.0 + 25.0
}

pub struct Lsm6dsv32x<SPI> {
    spi: SPI,
    config: Config,
}

impl<SPI: SpiDevice> Lsm6dsv32x<SPI> {
    pub fn new(spi: SPI, config: Config) -> Self {
        Self { spi, config }
    }

    pub fn release(self) -> SPI {
        self.spi
    }

    /// Checks the device id and restores the default configuration.
    pub fn init(&mut self) -> Result<(), Error<SPI::Error>> {
        let id = self.read_register(reg::WHO_AM_I)?;
        if id != DEVICE_ID {
            error!("lsm6dsv32x: unexpected id {=u8:#x}", id);
            return Err(Error::WrongId(id));
        }
        info!("lsm6dsv32x: found, id {=u8:#x}", id);

        self.reset()
    }

    /// Software reset, waiting until the reset and boot flags clear.
    pub fn reset(&mut self) -> Result<(), Error<SPI::Error>> {
        let ctrl3 = self.read_register(reg::CTRL3)?;
        self.write_register(reg::CTRL3, ctrl3 | SW_RESET)?;

        for _ in 0..self.config.reset_polls {
            let ctrl3 = self.read_register(reg::CTRL3)?;
            let access = self.read_register(reg::FUNC_CFG_ACCESS)?;
            if (ctrl3 | access) & RESET_PENDING == 0 {
                return Ok(());
            }
        }

        Err(Error::ResetTimeout)
    }

    /// Writes `(register, value)` pairs in order.
    pub fn configure(&mut self, setup: &[(u8, u8)]) -> Result<(), Error<SPI::Error>> {
        for &(register, value) in setup {
            self.write_register(register, value)?;
        }
        Ok(())
    }

    pub fn status(&mut self) -> Result<Status, Error<SPI::Error>> {
        self.read_register(reg::STATUS_REG).map(Status)
    }

    pub fn acceleration_raw(&mut self) -> Result<[i16; 3], Error<SPI::Error>> {
        self.read_vector(reg::OUTX_L_A)
    }

    pub fn angular_rate_raw(&mut self) -> Result<[i16; 3], Error<SPI::Error>> {
        self.read_vector(reg::OUTX_L_G)
    }

    pub fn temperature_raw(&mut self) -> Result<i16, Error<SPI::Error>> {
        let mut buf = [0u8; 2];
        self.read_registers(reg::OUT_TEMP_L, &mut buf)?;
        Ok(i16::from_le_bytes(buf))
    }

    pub fn read_register(&mut self, register: u8) -> Result<u8, Error<SPI::Error>> {
        let mut buf = [0u8];
        self.read_registers(register, &mut buf)?;
        Ok(buf[0])
    }

    pub fn read_registers(&mut self, register: u8, buf: &mut [u8]) -> Result<(), Error<SPI::Error>> {
        self.spi
            .transaction(&mut [Operation::Write(&[register | READ]), Operation::Read(buf)])
            .map_err(Error::Spi)
    }

    pub fn write_register(&mut self, register: u8, value: u8) -> Result<(), Error<SPI::Error>> {
        trace!("lsm6dsv32x: {=u8:#x} <- {=u8:#x}", register, value);
        self.spi.write(&[register & !READ, value]).map_err(Error::Spi)
    }

    fn read_vector(&mut self, register: u8) -> Result<[i16; 3], Error<SPI::Error>> {
        let mut buf = [0u8; 6];
        self.read_registers(register, &mut buf)?;
        Ok([
            i16::from_le_bytes([buf[0], buf[1]]),
            i16::from_le_bytes([buf[2], buf[3]]),
            i16::from_le_bytes([buf[4], buf[5]]),
        ])
    }
}

#[cfg(test)]
mod tests {
    use std::vec;
    use std::vec::Vec;

    use embedded_hal_mock::eh1::spi::{Mock as SpiMock, Transaction as SpiTransaction};

    use super::*;

    fn read(register: u8, data: &[u8]) -> [SpiTransaction<u8>; 4] {
        [
            SpiTransaction::transaction_start(),
            SpiTransaction::write_vec(vec![register | 0x80]),
            SpiTransaction::read_vec(data.to_vec()),
            SpiTransaction::transaction_end(),
        ]
    }

    fn write(register: u8, value: u8) -> [SpiTransaction<u8>; 3] {
        [
            SpiTransaction::transaction_start(),
            SpiTransaction::write_vec(vec![register, value]),
            SpiTransaction::transaction_end(),
        ]
    }

    #[test]
    fn init_resets_and_waits() {
        let mut expect = Vec::new();
        expect.extend(read(reg::WHO_AM_I, &[0x70]));
        expect.extend(read(reg::CTRL3, &[0x44]));
        expect.extend(write(reg::CTRL3, 0x45));
        // first poll still sees BOOT in FUNC_CFG_ACCESS
        expect.extend(read(reg::CTRL3, &[0x44]));
        expect.extend(read(reg::FUNC_CFG_ACCESS, &[0x80]));
        expect.extend(read(reg::CTRL3, &[0x44]));
        expect.extend(read(reg::FUNC_CFG_ACCESS, &[0x00]));

        let mut spi = SpiMock::new(&expect);
        let mut imu = Lsm6dsv32x::new(spi.clone(), Config::default());
        imu.init().unwrap();
        spi.done();
    }

    #[test]
    fn wrong_id_is_reported() {
        let mut spi = SpiMock::new(&read(reg::WHO_AM_I, &[0x6B]));
        let mut imu = Lsm6dsv32x::new(spi.clone(), Config::default());
        assert_eq!(imu.init(), Err(Error::WrongId(0x6B)));
        spi.done();
    }

    #[test]
    fn reset_gives_up() {
        let mut expect = Vec::new();
        expect.extend(read(reg::CTRL3, &[0x00]));
        expect.extend(write(reg::CTRL3, 0x01));
        for _ in 0..2 {
            expect.extend(read(reg::CTRL3, &[0x01]));
            expect.extend(read(reg::FUNC_CFG_ACCESS, &[0x00]));
        }

        let mut spi = SpiMock::new(&expect);
        let mut imu = Lsm6dsv32x::new(spi.clone(), Config { reset_polls: 2 });
        assert_eq!(imu.reset(), Err(Error::ResetTimeout));
        spi.done();
    }

    #[test]
    fn register_table() {
        let mut expect = Vec::new();
        for (register, value) in DEFAULT_SETUP {
            expect.extend(write(register, value));
        }

        let mut spi = SpiMock::new(&expect);
        let mut imu = Lsm6dsv32x::new(spi.clone(), Config::default());
        imu.configure(&DEFAULT_SETUP).unwrap();
        spi.done();
    }

    #[test]
    fn samples_are_little_endian() {
        let mut expect = Vec::new();
        expect.extend(read(reg::STATUS_REG, &[0b1010_0000]));
        expect.extend(read(reg::OUTX_L_A, &[0x10, 0x00, 0xFF, 0xFF, 0x00, 0x80]));
        expect.extend(read(reg::OUT_TEMP_L, &[0x00, 0x02]));

        let mut spi = SpiMock::new(&expect);
        let mut imu = Lsm6dsv32x::new(spi.clone(), Config::default());

        let status = imu.status().unwrap();
        assert!(status.accel_ready());
        assert!(!status.gyro_ready());
        assert!(status.temp_ready());
        assert_eq!(imu.acceleration_raw().unwrap(), [16, -1, i16::MIN]);
        assert_eq!(imu.temperature_raw().unwrap(), 512);

        spi.done();
    }

    #[test]
    fn unit_conversions() {
        assert!((fs4_to_mg(1000) - 122.0).abs() < 1e-3);
        assert!((fs2000_to_mdps(-2) + 140.0).abs() < 1e-3);
        assert!((lsb_to_celsius(512) - 27.0).abs() < 1e-3);
    }
}
