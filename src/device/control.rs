/// Below this moisture the pump is switched on.
pub const PUMP_ON_BELOW: f64 = 25.0;
/// At or above this moisture the pump is switched off.
pub const PUMP_OFF_AT: f64 = 60.0;

/// Two-threshold hysteresis: inside [25, 60) the current pump state is kept.
pub fn pump_decision(moisture: f64, pump_active: bool) -> bool {
    if moisture < PUMP_ON_BELOW {
        true
    } else if moisture >= PUMP_OFF_AT {
        false
    } else {
        pump_active
    }
}
