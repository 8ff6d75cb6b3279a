use crate::error::CycleError;
use crate::model;

#[derive(Debug, Serialize)]
pub struct Reading<'a> {
    pub device_id: &'a str,
    pub moisture: f64,
}

#[derive(Debug, Serialize)]
pub struct PumpStatus<'a> {
    pub device_id: &'a str,
    pub pump_on: bool,
}

/// The device view of `status/esp/`.
///
/// The backend sends more than this (history, pending commands, timestamps);
/// only the fields that drive the pump are read. The two mode inputs are kept
/// raw so that only the active mode's field is ever interpreted.
#[derive(Debug, Deserialize)]
pub struct Status {
    pub is_auto_mode: bool,
    #[serde(default)]
    pub soil_moisture: Option<serde_json::Value>,
    #[serde(default)]
    pub motor_status: Option<serde_json::Value>,
}

impl Status {
    pub fn into_command(self) -> Result<model::StatusCommand, CycleError> {
        if self.is_auto_mode {
            match self.soil_moisture.as_ref().and_then(serde_json::Value::as_f64) {
                Some(soil_moisture) if soil_moisture.is_finite() => {
                    Ok(model::StatusCommand::Auto { soil_moisture })
                }
                _ => Err(CycleError::Decode(format!(
                    "auto mode status needs a numeric soil_moisture, got {}",
                    describe(&self.soil_moisture)
                ))),
            }
        } else {
            match self.motor_status.as_ref().and_then(serde_json::Value::as_bool) {
                Some(motor_requested) => Ok(model::StatusCommand::Manual { motor_requested }),
                None => Err(CycleError::Decode(format!(
                    "manual mode status needs a boolean motor_status, got {}",
                    describe(&self.motor_status)
                ))),
            }
        }
    }
}

fn describe(field: &Option<serde_json::Value>) -> String {
    match *field {
        Some(ref value) => value.to_string(),
        None => "nothing".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(body: &str) -> Result<model::StatusCommand, CycleError> {
        serde_json::from_str::<Status>(body)
            .map_err(|e| CycleError::Decode(e.to_string()))?
            .into_command()
    }

    #[test]
    fn manual_command_ignores_malformed_moisture() {
        assert_eq!(
            command(r#"{"is_auto_mode": false, "motor_status": true, "soil_moisture": "n/a"}"#),
            Ok(model::StatusCommand::Manual {
                motor_requested: true
            })
        );
    }

    #[test]
    fn auto_command_ignores_malformed_motor_status() {
        assert_eq!(
            command(r#"{"is_auto_mode": true, "soil_moisture": 42.0, "motor_status": "yes"}"#),
            Ok(model::StatusCommand::Auto {
                soil_moisture: 42.0
            })
        );
    }

    #[test]
    fn active_field_of_wrong_type_is_malformed() {
        match command(r#"{"is_auto_mode": true, "soil_moisture": "dry"}"#) {
            Err(CycleError::Decode(_)) => {}
            other => panic!("unexpected result {:?}", other),
        }
        match command(r#"{"is_auto_mode": false, "motor_status": 1}"#) {
            Err(CycleError::Decode(_)) => {}
            other => panic!("unexpected result {:?}", other),
        }
    }
}
