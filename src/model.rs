use std::fmt;

/// A normalized soil moisture measurement, in percent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MoistureReading {
    pub percent: f64,
}

impl MoistureReading {
    /// Builds a reading, clamping the value into `0.0..=100.0`.
    pub fn new(percent: f64) -> MoistureReading {
        MoistureReading {
            percent: percent.max(0.0).min(100.0),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Auto,
    Manual,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Mode::Auto => f.write_str("auto"),
            Mode::Manual => f.write_str("manual"),
        }
    }
}

/// What the backend wants the pump to do this cycle.
///
/// Each mode only carries the input it is allowed to act on: the server's
/// moisture view in automatic mode, the requested motor state in manual mode.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StatusCommand {
    Auto { soil_moisture: f64 },
    Manual { motor_requested: bool },
}

impl StatusCommand {
    pub fn mode(&self) -> Mode {
        match *self {
            StatusCommand::Auto { .. } => Mode::Auto,
            StatusCommand::Manual { .. } => Mode::Manual,
        }
    }
}

/// The last output written to the pump relay.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PumpState {
    pub is_on: bool,
}

impl PumpState {
    pub const OFF: PumpState = PumpState { is_on: false };
    pub const ON: PumpState = PumpState { is_on: true };
}

impl fmt::Display for PumpState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(if self.is_on { "on" } else { "off" })
    }
}
