use std::thread;
use std::time;

use i2cdev::core::I2CDevice;

use crate::config;
use crate::model;

/// Something that produces raw moisture probe samples.
pub trait MoistureSensor {
    fn sample(&mut self) -> Result<f64, failure::Error>;
}

const REG_CONVERSION: u8 = 0x00;
const REG_CONFIG: u8 = 0x01;

// Single-shot, single-ended, +/-4.096V, 128 SPS, comparator off.
const CONFIG_OS_START: u16 = 0x8000;
const CONFIG_MUX_SINGLE_AIN0: u16 = 0x4000;
const CONFIG_PGA_4_096V: u16 = 0x0200;
const CONFIG_MODE_SINGLE: u16 = 0x0100;
const CONFIG_DR_128SPS: u16 = 0x0080;
const CONFIG_COMP_QUE_DISABLE: u16 = 0x0003;

const CONVERSION_TIME: time::Duration = time::Duration::from_millis(8);
const READY_POLL_INTERVAL: time::Duration = time::Duration::from_millis(2);
const READY_POLLS: usize = 10;

/// TI ADS1115 16-bit ADC, read one single-ended channel at a time.
pub struct Ads1115<D> {
    device: D,
    channel: u8,
}

impl Ads1115<i2cdev::linux::LinuxI2CDevice> {
    pub fn open(bus: &str, channel: &config::MoistureChannel) -> Result<Self, failure::Error> {
        let device =
            i2cdev::linux::LinuxI2CDevice::new(bus, u16::from(channel.i2c_address))?;
        Ads1115::new(device, channel.analog_pin)
    }
}

impl<D> Ads1115<D>
where
    D: I2CDevice,
    <D as I2CDevice>::Error: Send + Sync + 'static,
{
    pub fn new(device: D, channel: u8) -> Result<Self, failure::Error> {
        ensure!(channel < 4, "ADS1115 has no analog input {}", channel);
        Ok(Ads1115 { device, channel })
    }

    fn config_word(&self) -> u16 {
        CONFIG_OS_START
            | (CONFIG_MUX_SINGLE_AIN0 + (u16::from(self.channel) << 12))
            | CONFIG_PGA_4_096V
            | CONFIG_MODE_SINGLE
            | CONFIG_DR_128SPS
            | CONFIG_COMP_QUE_DISABLE
    }

    fn write_register(&mut self, register: u8, value: u16) -> Result<(), failure::Error> {
        let [hi, lo] = value.to_be_bytes();
        self.device.write(&[register, hi, lo])?;
        Ok(())
    }

    fn read_register(&mut self, register: u8) -> Result<u16, failure::Error> {
        let mut buf = [0u8; 2];
        self.device.write(&[register])?;
        self.device.read(&mut buf)?;
        Ok(u16::from_be_bytes(buf))
    }
}

impl<D> MoistureSensor for Ads1115<D>
where
    D: I2CDevice,
    <D as I2CDevice>::Error: Send + Sync + 'static,
{
    fn sample(&mut self) -> Result<f64, failure::Error> {
        let config = self.config_word();
        self.write_register(REG_CONFIG, config)?;
        thread::sleep(CONVERSION_TIME);

        for _ in 0..READY_POLLS {
            if self.read_register(REG_CONFIG)? & CONFIG_OS_START != 0 {
                let raw = self.read_register(REG_CONVERSION)? as i16;
                // Single-ended inputs can read slightly below ground.
                return Ok(f64::from(raw.max(0)));
            }
            thread::sleep(READY_POLL_INTERVAL);
        }

        bail!(
            "ADS1115 conversion on input {} did not complete",
            self.channel
        )
    }
}

/// Maps raw probe values onto a 0-100% moisture scale.
///
/// Capacitive probes read higher the drier the soil is, so `raw_dry` is
/// normally the larger of the two calibration points.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Calibration {
    raw_dry: f64,
    raw_wet: f64,
}

impl Calibration {
    pub fn new(raw_dry: f64, raw_wet: f64) -> Result<Self, failure::Error> {
        ensure!(
            raw_dry.is_finite() && raw_wet.is_finite(),
            "calibration points must be finite"
        );
        ensure!(
            raw_dry != raw_wet,
            "dry and wet calibration points are both {}",
            raw_dry
        );
        Ok(Calibration { raw_dry, raw_wet })
    }

    pub fn to_reading(&self, raw: f64) -> model::MoistureReading {
        model::MoistureReading::new((self.raw_dry - raw) / (self.raw_dry - self.raw_wet) * 100.0)
    }
}

/// A calibrated probe that averages several samples per reading.
pub struct Probe<S> {
    sensor: S,
    calibration: Calibration,
    samples: u32,
}

impl<S> Probe<S>
where
    S: MoistureSensor,
{
    pub fn new(sensor: S, calibration: Calibration, samples: u32) -> Self {
        Probe {
            sensor,
            calibration,
            samples: samples.max(1),
        }
    }

    /// Takes one reading. Failed samples are skipped; the reading only fails
    /// when no sample succeeded.
    pub fn read(&mut self) -> Result<model::MoistureReading, failure::Error> {
        let mut sum = 0.0;
        let mut count = 0u32;
        let mut last_error = None;

        for _ in 0..self.samples {
            match self.sensor.sample() {
                Ok(raw) => {
                    sum += raw;
                    count += 1;
                }
                Err(e) => last_error = Some(e),
            }
        }

        match last_error {
            Some(e) if count == 0 => Err(e),
            _ => Ok(self.calibration.to_reading(sum / f64::from(count))),
        }
    }
}

#[cfg(test)]
pub mod testing {
    use std::collections;

    use super::MoistureSensor;

    /// Replays scripted samples; `None` stands for a failed read.
    pub struct FakeSensor {
        pub samples: collections::VecDeque<Option<f64>>,
    }

    impl FakeSensor {
        pub fn new(samples: &[Option<f64>]) -> Self {
            FakeSensor {
                samples: samples.iter().cloned().collect(),
            }
        }
    }

    impl MoistureSensor for FakeSensor {
        fn sample(&mut self) -> Result<f64, failure::Error> {
            match self.samples.pop_front() {
                Some(Some(raw)) => Ok(raw),
                _ => bail!("probe disconnected"),
            }
        }
    }
}
