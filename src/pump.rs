//! Pump state decisions.
//!
//! Given the state the relay was last driven to and the command fetched from
//! the backend, [`decide`] works out what the relay should be driven to next.
//! Automatic mode uses a hysteresis band so that readings hovering around a
//! single threshold do not toggle the pump back and forth; manual mode follows
//! the requested motor state.

use crate::model::{PumpState, StatusCommand};

pub const DEFAULT_DRY: f64 = 40.0;
pub const DEFAULT_WET: f64 = 70.0;

/// Moisture thresholds, in percent, for automatic mode.
///
/// Below `dry` a stopped pump starts; above `wet` a running pump stops. In
/// between, the pump keeps doing whatever it was doing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hysteresis {
    dry: f64,
    wet: f64,
}

impl Hysteresis {
    pub fn new(dry: f64, wet: f64) -> Result<Self, failure::Error> {
        if !dry.is_finite() || !wet.is_finite() {
            bail!("moisture thresholds must be finite (dry={}, wet={})", dry, wet);
        }
        if dry >= wet {
            bail!(
                "dry threshold {} must be below wet threshold {}",
                dry,
                wet
            );
        }
        Ok(Hysteresis { dry, wet })
    }

    pub fn dry(&self) -> f64 {
        self.dry
    }

    pub fn wet(&self) -> f64 {
        self.wet
    }
}

impl Default for Hysteresis {
    fn default() -> Self {
        Hysteresis {
            dry: DEFAULT_DRY,
            wet: DEFAULT_WET,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Decision {
    pub state: PumpState,
    pub changed: bool,
}

impl Decision {
    fn keep(state: PumpState) -> Decision {
        Decision {
            state,
            changed: false,
        }
    }

    fn switch_to(state: PumpState) -> Decision {
        Decision {
            state,
            changed: true,
        }
    }
}

pub fn decide(current: PumpState, command: &StatusCommand, band: &Hysteresis) -> Decision {
    match *command {
        StatusCommand::Auto { soil_moisture } => {
            if !current.is_on && soil_moisture < band.dry {
                Decision::switch_to(PumpState::ON)
            } else if current.is_on && soil_moisture > band.wet {
                Decision::switch_to(PumpState::OFF)
            } else {
                Decision::keep(current)
            }
        }
        StatusCommand::Manual { motor_requested } => {
            if motor_requested != current.is_on {
                Decision::switch_to(PumpState {
                    is_on: motor_requested,
                })
            } else {
                Decision::keep(current)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auto(soil_moisture: f64) -> StatusCommand {
        StatusCommand::Auto { soil_moisture }
    }

    fn manual(motor_requested: bool) -> StatusCommand {
        StatusCommand::Manual { motor_requested }
    }

    #[test]
    fn dry_soil_starts_pump() {
        let band = Hysteresis::default();
        let decision = decide(PumpState::OFF, &auto(35.0), &band);
        assert_eq!(decision, Decision::switch_to(PumpState::ON));
    }

    #[test]
    fn dead_zone_keeps_running_pump() {
        let band = Hysteresis::default();
        let decision = decide(PumpState::ON, &auto(55.0), &band);
        assert_eq!(decision, Decision::keep(PumpState::ON));
    }

    #[test]
    fn wet_soil_stops_pump() {
        let band = Hysteresis::default();
        let decision = decide(PumpState::ON, &auto(75.0), &band);
        assert_eq!(decision, Decision::switch_to(PumpState::OFF));
    }

    #[test]
    fn manual_request_starts_pump() {
        let band = Hysteresis::default();
        let decision = decide(PumpState::OFF, &manual(true), &band);
        assert_eq!(decision, Decision::switch_to(PumpState::ON));
    }

    #[test]
    fn manual_request_stops_pump() {
        let band = Hysteresis::default();
        let decision = decide(PumpState::ON, &manual(false), &band);
        assert_eq!(decision, Decision::switch_to(PumpState::OFF));
    }

    #[test]
    fn stopped_pump_stays_off_inside_band() {
        let band = Hysteresis::default();
        for &moisture in &[40.0, 40.000_1, 50.0, 69.9, 70.0] {
            let decision = decide(PumpState::OFF, &auto(moisture), &band);
            assert_eq!(decision, Decision::keep(PumpState::OFF), "moisture {}", moisture);
        }
    }

    #[test]
    fn running_pump_stays_on_inside_band() {
        let band = Hysteresis::default();
        for &moisture in &[40.0, 55.5, 69.999, 70.0] {
            let decision = decide(PumpState::ON, &auto(moisture), &band);
            assert_eq!(decision, Decision::keep(PumpState::ON), "moisture {}", moisture);
        }
    }

    #[test]
    fn thresholds_are_strict() {
        let band = Hysteresis::default();
        assert!(decide(PumpState::OFF, &auto(39.999), &band).changed);
        assert!(!decide(PumpState::OFF, &auto(40.0), &band).changed);
        assert!(decide(PumpState::ON, &auto(70.001), &band).changed);
        assert!(!decide(PumpState::ON, &auto(70.0), &band).changed);
    }

    #[test]
    fn repeated_command_is_idempotent() {
        let band = Hysteresis::default();
        for command in &[auto(10.0), auto(90.0), manual(true), manual(false)] {
            for &start in &[PumpState::OFF, PumpState::ON] {
                let first = decide(start, command, &band);
                let second = decide(first.state, command, &band);
                assert!(!second.changed, "{:?} from {:?}", command, start);
                assert_eq!(second.state, first.state);
            }
        }
    }

    #[test]
    fn hysteresis_does_not_chatter() {
        let band = Hysteresis::default();
        let readings = [45.0, 39.0, 41.0, 39.5, 50.0, 69.0, 71.0, 69.5, 71.5, 60.0, 41.0];
        let mut state = PumpState::OFF;
        let mut switches = 0;
        for &moisture in &readings {
            let decision = decide(state, &auto(moisture), &band);
            if decision.changed {
                switches += 1;
            }
            state = decision.state;
        }
        assert_eq!(switches, 2);
        assert_eq!(state, PumpState::OFF);
    }

    #[test]
    fn custom_band_is_respected() {
        let band = Hysteresis::new(20.0, 30.0).unwrap();
        assert!(!decide(PumpState::OFF, &auto(25.0), &band).changed);
        assert!(decide(PumpState::OFF, &auto(19.0), &band).changed);
        assert!(decide(PumpState::ON, &auto(31.0), &band).changed);
    }

    #[test]
    fn inverted_band_is_rejected() {
        assert!(Hysteresis::new(70.0, 40.0).is_err());
        assert!(Hysteresis::new(50.0, 50.0).is_err());
        assert!(Hysteresis::new(::std::f64::NAN, 50.0).is_err());
    }
}
