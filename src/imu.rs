//! LSM6DSO accelerometer/gyroscope over I2C.
//!
//! Only what the firmware needs: identify the part, switch both sensors to
//! 12.5 Hz, read raw samples and power both sensors down before sleep.

use embedded_hal_async::i2c::I2c;

use crate::error::Error;
use crate::power::sleep::AuxPeripheral;

const REG_WHO_AM_I: u8 = 0x0F;
const REG_CTRL1_XL: u8 = 0x10;
const REG_CTRL2_G: u8 = 0x11;
const REG_OUTX_L_G: u8 = 0x22;
const REG_OUTX_L_XL: u8 = 0x28;

/// WHO_AM_I value of the LSM6DSO.
pub const WHO_AM_I_VALUE: u8 = 0x6A;

/// ODR 12.5 Hz, ±2 g / 250 dps, high-performance off.
const ODR_12_5_HZ: u8 = 0x20;
const POWER_DOWN: u8 = 0x00;

/// One raw reading, X/Y/Z, straight from the output registers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawSample {
    pub accel: [i16; 3],
    pub gyro: [i16; 3],
}

pub struct Lsm6dso<I2C> {
    i2c: I2C,
    addr: u8,
}

impl<I2C: I2c> Lsm6dso<I2C> {
    pub fn new(i2c: I2C, addr: u8) -> Self {
        Self { i2c, addr }
    }

    pub fn release(self) -> I2C {
        self.i2c
    }

    async fn read_reg(&mut self, reg: u8) -> Result<u8, Error> {
        let mut buf = [0u8; 1];
        self.i2c
            .write_read(self.addr, &[reg], &mut buf)
            .await
            .map_err(|_| Error::RegisterIo)?;
        Ok(buf[0])
    }

    async fn write_reg(&mut self, reg: u8, value: u8) -> Result<(), Error> {
        self.i2c
            .write(self.addr, &[reg, value])
            .await
            .map_err(|_| Error::RegisterIo)
    }

    async fn read_axes(&mut self, start: u8) -> Result<[i16; 3], Error> {
        let mut buf = [0u8; 6];
        self.i2c
            .write_read(self.addr, &[start], &mut buf)
            .await
            .map_err(|_| Error::RegisterIo)?;
        Ok([
            i16::from_le_bytes([buf[0], buf[1]]),
            i16::from_le_bytes([buf[2], buf[3]]),
            i16::from_le_bytes([buf[4], buf[5]]),
        ])
    }

    /// Check WHO_AM_I. A bus error or an unexpected ID means the part is not there.
    pub async fn probe(&mut self) -> Result<(), Error> {
        let id = self
            .read_reg(REG_WHO_AM_I)
            .await
            .map_err(|_| Error::DeviceNotReady)?;
        if id != WHO_AM_I_VALUE {
            warn!("IMU WHO_AM_I mismatch: {:#04x}", id);
            return Err(Error::DeviceNotReady);
        }
        Ok(())
    }

    pub async fn configure(&mut self) -> Result<(), Error> {
        self.write_reg(REG_CTRL1_XL, ODR_12_5_HZ).await?;
        self.write_reg(REG_CTRL2_G, ODR_12_5_HZ).await?;
        debug!("IMU configured, 12.5 Hz");
        Ok(())
    }

    /// Probe and configure in one go.
    pub async fn init(&mut self) -> Result<(), Error> {
        self.probe().await?;
        self.configure().await
    }

    pub async fn read_raw(&mut self) -> Result<RawSample, Error> {
        let accel = self.read_axes(REG_OUTX_L_XL).await?;
        let gyro = self.read_axes(REG_OUTX_L_G).await?;
        Ok(RawSample { accel, gyro })
    }

    /// Put both sensors in power-down mode.
    pub async fn power_down(&mut self) -> Result<(), Error> {
        self.write_reg(REG_CTRL1_XL, POWER_DOWN).await?;
        self.write_reg(REG_CTRL2_G, POWER_DOWN).await?;
        info!("IMU powered down");
        Ok(())
    }
}

impl<I2C: I2c> AuxPeripheral for Lsm6dso<I2C> {
    async fn power_down(&mut self) -> Result<(), Error> {
        Lsm6dso::power_down(self).await
    }
}
