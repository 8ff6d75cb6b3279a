use crate::pump;
use crate::sensors;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub device_id: String,
    pub backend: Backend,
    #[serde(default)]
    pub schedule: Schedule,
    #[serde(default)]
    pub hysteresis: Hysteresis,
    #[serde(default)]
    pub sensor: Sensor,
    pub relay: Relay,
    #[serde(default)]
    pub indicator: Indicator,
}

#[derive(Debug, Deserialize)]
pub struct Backend {
    pub base_url: String,
    pub api_key: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub sync_pump_status: bool,
}

#[derive(Debug, Deserialize)]
pub struct Schedule {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct Hysteresis {
    #[serde(default = "default_dry")]
    pub dry: f64,
    #[serde(default = "default_wet")]
    pub wet: f64,
}

#[derive(Debug, Deserialize)]
pub struct Sensor {
    #[serde(default = "default_i2c_bus")]
    pub i2c_bus: String,
    #[serde(
        default = "default_moisture_channel",
        deserialize_with = "deserialize_moisture_channel"
    )]
    pub channel: MoistureChannel,
    #[serde(default = "default_samples")]
    pub samples: u32,
    #[serde(default = "default_raw_dry")]
    pub raw_dry: f64,
    #[serde(default)]
    pub raw_wet: f64,
}

#[derive(Debug, Deserialize)]
pub struct Relay {
    pub pin: u64,
    #[serde(default)]
    pub active_low: bool,
}

#[derive(Debug, Deserialize)]
pub struct Indicator {
    #[serde(default)]
    pub pin: Option<u64>,
    #[serde(default = "default_pulse_millis")]
    pub pulse_millis: u64,
}

#[derive(Debug, PartialEq)]
pub struct MoistureChannel {
    pub i2c_address: u8,
    pub analog_pin: u8,
}

impl Default for Schedule {
    fn default() -> Self {
        Schedule {
            interval_secs: default_interval_secs(),
        }
    }
}

impl Default for Hysteresis {
    fn default() -> Self {
        Hysteresis {
            dry: default_dry(),
            wet: default_wet(),
        }
    }
}

impl Default for Sensor {
    fn default() -> Self {
        Sensor {
            i2c_bus: default_i2c_bus(),
            channel: default_moisture_channel(),
            samples: default_samples(),
            raw_dry: default_raw_dry(),
            raw_wet: 0.0,
        }
    }
}

impl Default for Indicator {
    fn default() -> Self {
        Indicator {
            pin: None,
            pulse_millis: default_pulse_millis(),
        }
    }
}

impl Config {
    /// Reads the config file at `path`, then applies `DRIZZLE_*` environment
    /// overrides (`__` separates nested keys, as in
    /// `DRIZZLE_BACKEND__API_KEY`).
    pub fn load(path: &str) -> Result<Self, failure::Error> {
        let mut settings = ::config::Config::new();
        settings.merge(::config::File::with_name(path))?;
        settings.merge(::config::Environment::with_prefix("DRIZZLE").separator("__"))?;
        Config::from_settings(settings)
    }

    fn from_settings(settings: ::config::Config) -> Result<Self, failure::Error> {
        let config: Config = settings.try_into()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), failure::Error> {
        ensure!(!self.device_id.is_empty(), "device_id must not be empty");
        ensure!(
            self.schedule.interval_secs > 0,
            "schedule.interval_secs must be positive"
        );
        self.hysteresis()?;
        self.calibration()?;
        Ok(())
    }

    pub fn hysteresis(&self) -> Result<pump::Hysteresis, failure::Error> {
        pump::Hysteresis::new(self.hysteresis.dry, self.hysteresis.wet)
    }

    pub fn calibration(&self) -> Result<sensors::Calibration, failure::Error> {
        sensors::Calibration::new(self.sensor.raw_dry, self.sensor.raw_wet)
    }
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_interval_secs() -> u64 {
    15
}

fn default_dry() -> f64 {
    pump::DEFAULT_DRY
}

fn default_wet() -> f64 {
    pump::DEFAULT_WET
}

fn default_i2c_bus() -> String {
    "/dev/i2c-1".to_owned()
}

fn default_moisture_channel() -> MoistureChannel {
    MoistureChannel {
        i2c_address: 0x48,
        analog_pin: 0,
    }
}

fn default_samples() -> u32 {
    3
}

fn default_raw_dry() -> f64 {
    f64::from(i16::max_value())
}

fn default_pulse_millis() -> u64 {
    200
}

fn deserialize_moisture_channel<'de, D>(deserializer: D) -> Result<MoistureChannel, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = <String as serde::Deserialize>::deserialize(deserializer)?;
    let parts = raw.split('-').collect::<Vec<_>>();

    if parts.len() == 2 {
        let i2c_address = u8::from_str_radix(parts[0], 16).map_err(|e| {
            serde::de::Error::invalid_value(
                serde::de::Unexpected::Str(&raw),
                &format!("a valid hexadecimal integer: {}", e).as_str(),
            )
        })?;
        let analog_pin = u8::from_str_radix(parts[1], 10).map_err(|e| {
            serde::de::Error::invalid_value(
                serde::de::Unexpected::Str(&raw),
                &format!("a valid decimal integer: {}", e).as_str(),
            )
        })?;
        Ok(MoistureChannel {
            i2c_address,
            analog_pin,
        })
    } else {
        Err(serde::de::Error::invalid_value(
            serde::de::Unexpected::Str(&raw),
            &"a hexadecimal I2C address, a dash '-', and a decimal ADC input, like \"48-0\"",
        ))
    }
}
