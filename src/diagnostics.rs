use std::thread;
use std::time;

use crate::actuator::Output;
use crate::error::CycleError;

/// Outcome classes, each with its own pulse count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Signal {
    Delivered,
    Disconnected,
    DecodeFailure,
    Rejected,
    SensorFailure,
    ActuatorFailure,
}

impl Signal {
    pub fn pulses(self) -> u32 {
        match self {
            Signal::Delivered => 2,
            Signal::Disconnected => 3,
            Signal::DecodeFailure => 4,
            Signal::Rejected => 5,
            Signal::SensorFailure => 6,
            Signal::ActuatorFailure => 7,
        }
    }
}

impl<'a> From<&'a CycleError> for Signal {
    fn from(error: &'a CycleError) -> Signal {
        match *error {
            CycleError::Sensor(_) => Signal::SensorFailure,
            CycleError::Disconnected(_) => Signal::Disconnected,
            CycleError::Rejected { .. } => Signal::Rejected,
            CycleError::Decode(_) => Signal::DecodeFailure,
            CycleError::Actuator(_) => Signal::ActuatorFailure,
        }
    }
}

pub trait Indicator {
    fn signal(&mut self, signal: Signal) -> Result<(), failure::Error>;
}

/// Without an LED, outcomes only show up in the log.
impl<I> Indicator for Option<I>
where
    I: Indicator,
{
    fn signal(&mut self, signal: Signal) -> Result<(), failure::Error> {
        match *self {
            Some(ref mut indicator) => indicator.signal(signal),
            None => Ok(()),
        }
    }
}

/// Blinks an LED once per pulse, blocking while it does so.
pub struct Led<O> {
    output: O,
    pulse: time::Duration,
}

impl<O> Led<O>
where
    O: Output,
{
    pub fn new(output: O, pulse: time::Duration) -> Self {
        Led { output, pulse }
    }
}

impl<O> Indicator for Led<O>
where
    O: Output,
{
    fn signal(&mut self, signal: Signal) -> Result<(), failure::Error> {
        for _ in 0..signal.pulses() {
            self.output.set(true)?;
            thread::sleep(self.pulse);
            self.output.set(false)?;
            thread::sleep(self.pulse);
        }
        Ok(())
    }
}
