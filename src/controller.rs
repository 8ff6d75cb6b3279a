//! The poll cycle: read the probe, report, fetch, decide, actuate.
//!
//! A reading that was not delivered is never followed by a status fetch, so
//! the pump only acts on commands that came back alongside a fresh report.
//! Any failure ends the cycle early and leaves the pump as it was.

use std::thread;
use std::time;

use crate::actuator;
use crate::backend;
use crate::diagnostics;
use crate::error::CycleError;
use crate::model;
use crate::pump;
use crate::scheduler;
use crate::sensors;

#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    Switched {
        mode: model::Mode,
        pump: model::PumpState,
    },
    Unchanged {
        mode: model::Mode,
        pump: model::PumpState,
    },
    Skipped(CycleError),
}

impl<'a> From<&'a Outcome> for diagnostics::Signal {
    fn from(outcome: &'a Outcome) -> diagnostics::Signal {
        match *outcome {
            Outcome::Switched { .. } | Outcome::Unchanged { .. } => diagnostics::Signal::Delivered,
            Outcome::Skipped(ref error) => diagnostics::Signal::from(error),
        }
    }
}

pub struct Controller<S, T, O, I> {
    log: slog::Logger,
    probe: sensors::Probe<S>,
    client: backend::Client<T>,
    band: pump::Hysteresis,
    actuator: actuator::Actuator<O>,
    indicator: I,
    sync_pump_status: bool,
}

impl<S, T, O, I> Controller<S, T, O, I>
where
    S: sensors::MoistureSensor,
    T: backend::Transport,
    O: actuator::Output,
    I: diagnostics::Indicator,
{
    pub fn new(
        log: slog::Logger,
        probe: sensors::Probe<S>,
        client: backend::Client<T>,
        band: pump::Hysteresis,
        actuator: actuator::Actuator<O>,
        indicator: I,
    ) -> Self {
        Controller {
            log,
            probe,
            client,
            band,
            actuator,
            indicator,
            sync_pump_status: false,
        }
    }

    /// Also report every relay transition back to the backend.
    pub fn sync_pump_status(mut self, enabled: bool) -> Self {
        self.sync_pump_status = enabled;
        self
    }

    pub fn pump_state(&self) -> model::PumpState {
        self.actuator.state()
    }

    /// Runs cycles forever, sleeping between them.
    pub fn run(&mut self, mut scheduler: scheduler::Scheduler) -> ! {
        info!(self.log, "Starting poll loop";
              "interval_secs" => scheduler.interval().as_secs(),
              "dry" => self.band.dry(), "wet" => self.band.wet());
        loop {
            if scheduler.tick(time::Instant::now()) {
                self.run_cycle();
            }
            thread::sleep(scheduler.remaining(time::Instant::now()));
        }
    }

    pub fn run_cycle(&mut self) -> Outcome {
        let outcome = match self.cycle() {
            Ok((mode, true)) => Outcome::Switched {
                mode,
                pump: self.actuator.state(),
            },
            Ok((mode, false)) => Outcome::Unchanged {
                mode,
                pump: self.actuator.state(),
            },
            Err(error) => Outcome::Skipped(error),
        };

        match outcome {
            Outcome::Switched { mode, pump } => {
                info!(self.log, "Switched pump {}", pump; "mode" => %mode, "pump_on" => pump.is_on)
            }
            Outcome::Unchanged { mode, pump } => {
                info!(self.log, "Pump stays {}", pump; "mode" => %mode, "pump_on" => pump.is_on)
            }
            Outcome::Skipped(ref error) => {
                warn!(self.log, "Skipped cycle: {}", error; "pump_on" => self.actuator.state().is_on)
            }
        }

        if let Err(e) = self.indicator.signal(diagnostics::Signal::from(&outcome)) {
            warn!(self.log, "Could not signal outcome"; "error" => %e);
        }

        outcome
    }

    fn cycle(&mut self) -> Result<(model::Mode, bool), CycleError> {
        let reading = self
            .probe
            .read()
            .map_err(|e| CycleError::Sensor(e.to_string()))?;
        debug!(self.log, "read probe"; "moisture" => reading.percent);

        self.client.submit_reading(reading)?;
        let command = self.client.fetch_status()?;

        let decision = pump::decide(self.actuator.state(), &command, &self.band);
        debug!(self.log, "decided"; "mode" => %command.mode(),
               "pump_on" => decision.state.is_on, "changed" => decision.changed);

        let switched = self
            .actuator
            .apply(decision)
            .map_err(|e| CycleError::Actuator(e.to_string()))?;

        if switched && self.sync_pump_status {
            if let Err(e) = self.client.sync_pump_status(self.actuator.state()) {
                warn!(self.log, "Could not sync pump status"; "error" => %e);
            }
        }

        Ok((command.mode(), switched))
    }
}
