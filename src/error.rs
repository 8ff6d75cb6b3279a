/// Why a poll cycle ended before the pump decision was applied.
///
/// None of these stop the controller; the cycle is abandoned and the pump
/// keeps its last state until the next scheduled cycle.
#[derive(Debug, Fail, Clone, PartialEq)]
pub enum CycleError {
    #[fail(display = "could not read moisture probe: {}", _0)]
    Sensor(String),
    #[fail(display = "backend unreachable: {}", _0)]
    Disconnected(String),
    #[fail(display = "backend refused {} with status {}", request, status)]
    Rejected { request: &'static str, status: u16 },
    #[fail(display = "malformed status payload: {}", _0)]
    Decode(String),
    #[fail(display = "could not drive pump relay: {}", _0)]
    Actuator(String),
}

impl CycleError {
    /// Whether the backend link failed, either outright or with an
    /// unexpected status.
    pub fn is_transport(&self) -> bool {
        match *self {
            CycleError::Disconnected(_) | CycleError::Rejected { .. } => true,
            _ => false,
        }
    }
}
