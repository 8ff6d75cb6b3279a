use crate::model::PumpState;
use crate::pump::Decision;

/// A single binary output line.
pub trait Output {
    fn set(&mut self, on: bool) -> Result<(), failure::Error>;
}

/// An output driven through the sysfs GPIO interface.
pub struct GpioOutput {
    pin: sysfs_gpio::Pin,
}

impl GpioOutput {
    /// Exports `pin` as an output that starts out inactive.
    ///
    /// With `active_low` set, "on" drives the line low, which is what most
    /// opto-isolated relay boards expect.
    pub fn new(pin: u64, active_low: bool) -> Result<Self, failure::Error> {
        let pin = sysfs_gpio::Pin::new(pin);
        pin.export()?;
        pin.set_active_low(active_low)?;
        pin.set_direction(inactive_direction(active_low))?;

        Ok(GpioOutput { pin })
    }
}

/// Switches the pin to output and its inactive level in one write.
///
/// The kernel applies "high"/"low" to the raw line regardless of
/// `active_low`, and plain "out" drives it low, which would briefly energize
/// an active-low relay.
fn inactive_direction(active_low: bool) -> sysfs_gpio::Direction {
    if active_low {
        sysfs_gpio::Direction::High
    } else {
        sysfs_gpio::Direction::Low
    }
}

impl Output for GpioOutput {
    fn set(&mut self, on: bool) -> Result<(), failure::Error> {
        self.pin.set_value(if on { 1 } else { 0 })?;
        Ok(())
    }
}

impl Drop for GpioOutput {
    fn drop(&mut self) {
        let log = slog_scope::logger();
        if let Err(e) = self.pin.set_value(0) {
            error!(log, "Could not reset pin"; "pin" => self.pin.get_pin(), "error" => %e);
        }
        if let Err(e) = self.pin.unexport() {
            error!(log, "Could not unexport pin"; "pin" => self.pin.get_pin(), "error" => %e);
        }
    }
}

/// Owns the pump relay together with the state it was last driven to.
pub struct Actuator<O> {
    relay: O,
    state: PumpState,
}

impl<O> Actuator<O>
where
    O: Output,
{
    /// Takes over the relay, switching it off so that the tracked state and
    /// the physical output agree from the start.
    pub fn new(mut relay: O) -> Result<Self, failure::Error> {
        relay.set(false)?;
        Ok(Actuator {
            relay,
            state: PumpState::OFF,
        })
    }

    pub fn state(&self) -> PumpState {
        self.state
    }

    /// Drives the relay to the decided state.
    ///
    /// Returns whether the relay was written. Unchanged decisions never touch
    /// the relay, and the tracked state only moves once the write succeeded.
    pub fn apply(&mut self, decision: Decision) -> Result<bool, failure::Error> {
        if !decision.changed {
            return Ok(false);
        }

        self.relay.set(decision.state.is_on)?;
        self.state = decision.state;
        Ok(true)
    }
}

#[cfg(test)]
pub mod testing {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::Output;

    /// Records every write; fails writes while `broken` is set.
    #[derive(Clone, Default)]
    pub struct FakeOutput {
        pub writes: Rc<RefCell<Vec<bool>>>,
        pub broken: Rc<RefCell<bool>>,
    }

    impl Output for FakeOutput {
        fn set(&mut self, on: bool) -> Result<(), failure::Error> {
            if *self.broken.borrow() {
                bail!("relay line stuck");
            }
            self.writes.borrow_mut().push(on);
            Ok(())
        }
    }
}
