use std::ops::RangeInclusive;
use std::sync::{Mutex, MutexGuard, PoisonError};

use rand::Rng;
use serde::Serialize;

use super::control;

pub const MIN_MOISTURE: f64 = 0.0;
pub const MAX_MOISTURE: f64 = 100.0;
pub const INITIAL_MOISTURE: f64 = 50.0;

/// Per-tick moisture loss while the pump is off.
const DRYING_RATE: RangeInclusive<f64> = 0.5..=1.5;
/// Per-tick moisture gain while the pump is on.
const WATERING_RATE: RangeInclusive<f64> = 1.0..=3.0;

/// A consistent copy of all device fields, taken under one lock acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Snapshot {
    pub moisture: f64,
    pub pump_active: bool,
    pub auto_mode: bool,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            moisture: INITIAL_MOISTURE,
            pump_active: false,
            auto_mode: false,
        }
    }
}

/// The device model. Fields are private; every access goes through one
/// mutex and holds it for a constant amount of work.
#[derive(Debug, Default)]
pub struct DeviceState {
    inner: Mutex<Snapshot>,
}

impl DeviceState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an arbitrary state instead of the power-on defaults.
    /// Moisture is clamped into range.
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            inner: Mutex::new(Snapshot {
                moisture: clamp_moisture(snapshot.moisture),
                ..snapshot
            }),
        }
    }

    // Every critical section leaves the fields consistent, so a poisoned
    // lock still guards valid data.
    fn lock(&self) -> MutexGuard<'_, Snapshot> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn read_snapshot(&self) -> Snapshot {
        *self.lock()
    }

    pub fn toggle_pump(&self) {
        let mut fields = self.lock();
        fields.pump_active = !fields.pump_active;
    }

    pub fn set_auto_mode(&self, enabled: bool) {
        self.lock().auto_mode = enabled;
    }

    /// Advance the moisture physics by one step and return the new reading.
    ///
    /// With the pump off, moisture drops by a uniform draw from [0.5, 1.5];
    /// with the pump on it rises by a draw from [1.0, 3.0]. The result is
    /// clamped to [0, 100].
    pub fn advance_moisture<R: Rng>(&self, rng: &mut R) -> f64 {
        let mut fields = self.lock();
        let delta = if fields.pump_active {
            rng.gen_range(WATERING_RATE)
        } else {
            -rng.gen_range(DRYING_RATE)
        };
        fields.moisture = clamp_moisture(fields.moisture + delta);
        fields.moisture
    }

    /// Evaluate the automatic control law against the current moisture.
    ///
    /// Does nothing unless auto mode is on. Returns the new pump state when
    /// the law changed it.
    pub fn apply_control_law(&self) -> Option<bool> {
        let mut fields = self.lock();
        if !fields.auto_mode {
            return None;
        }
        let wanted = control::pump_decision(fields.moisture, fields.pump_active);
        if wanted == fields.pump_active {
            return None;
        }
        fields.pump_active = wanted;
        Some(wanted)
    }
}

fn clamp_moisture(value: f64) -> f64 {
    value.clamp(MIN_MOISTURE, MAX_MOISTURE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn power_on_defaults() {
        let state = DeviceState::new();
        assert_eq!(
            state.read_snapshot(),
            Snapshot {
                moisture: 50.0,
                pump_active: false,
                auto_mode: false,
            }
        );
    }

    #[test]
    fn toggle_twice_restores_pump() {
        let state = DeviceState::new();
        state.toggle_pump();
        assert!(state.read_snapshot().pump_active);
        state.toggle_pump();
        assert!(!state.read_snapshot().pump_active);
    }

    #[test]
    fn set_auto_mode_is_idempotent() {
        let state = DeviceState::new();
        state.set_auto_mode(true);
        let once = state.read_snapshot();
        state.set_auto_mode(true);
        assert_eq!(state.read_snapshot(), once);
        assert!(once.auto_mode);
    }

    #[test]
    fn drying_step_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let state = DeviceState::new();
        let after = state.advance_moisture(&mut rng);
        assert!((48.5..=49.5).contains(&after), "got {after}");
    }

    #[test]
    fn watering_step_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let state = DeviceState::new();
        state.toggle_pump();
        let after = state.advance_moisture(&mut rng);
        assert!((51.0..=53.0).contains(&after), "got {after}");
    }

    #[test]
    fn moisture_clamps_at_bounds() {
        let mut rng = StdRng::seed_from_u64(1);
        let dry = DeviceState::from_snapshot(Snapshot {
            moisture: 0.2,
            ..Snapshot::default()
        });
        assert_eq!(dry.advance_moisture(&mut rng), 0.0);

        let wet = DeviceState::from_snapshot(Snapshot {
            moisture: 99.5,
            pump_active: true,
            auto_mode: false,
        });
        assert_eq!(wet.advance_moisture(&mut rng), 100.0);
    }

    #[test]
    fn from_snapshot_clamps_moisture() {
        let state = DeviceState::from_snapshot(Snapshot {
            moisture: 250.0,
            ..Snapshot::default()
        });
        assert_eq!(state.read_snapshot().moisture, 100.0);
    }

    #[test]
    fn control_law_ignored_in_manual_mode() {
        let state = DeviceState::from_snapshot(Snapshot {
            moisture: 10.0,
            pump_active: false,
            auto_mode: false,
        });
        assert_eq!(state.apply_control_law(), None);
        assert!(!state.read_snapshot().pump_active);
    }

    #[test]
    fn control_law_reports_only_changes() {
        let state = DeviceState::from_snapshot(Snapshot {
            moisture: 24.9,
            pump_active: false,
            auto_mode: true,
        });
        assert_eq!(state.apply_control_law(), Some(true));
        assert_eq!(state.apply_control_law(), None);
        assert!(state.read_snapshot().pump_active);
    }
}
