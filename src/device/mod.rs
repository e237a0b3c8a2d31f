pub mod commands;
pub mod console;
pub mod control;
pub mod presenter;
pub mod simulation;
pub mod state;
pub mod telemetry;

use std::sync::Arc;

pub use commands::CommandSubscriber;
pub use presenter::{LogPresenter, Presenter};
pub use simulation::{
    DEFAULT_TICK_INTERVAL_SECS, MAX_TICK_INTERVAL_SECS, MIN_TICK_INTERVAL_SECS, SimulationLoop,
    TickInterval,
};
pub use state::{DeviceState, Snapshot};
pub use telemetry::TelemetryPublisher;

/// The whole surface a local front end gets: read state, toggle the pump,
/// switch auto mode, change the tick interval.
#[derive(Debug, Clone)]
pub struct DeviceHandle {
    state: Arc<DeviceState>,
    interval: TickInterval,
}

impl DeviceHandle {
    pub fn new(state: Arc<DeviceState>, interval: TickInterval) -> Self {
        Self { state, interval }
    }

    pub fn read_snapshot(&self) -> Snapshot {
        self.state.read_snapshot()
    }

    pub fn toggle_pump(&self) {
        self.state.toggle_pump();
    }

    pub fn set_auto_mode(&self, enabled: bool) {
        self.state.set_auto_mode(enabled);
    }

    /// Returns the interval actually applied after clamping.
    pub fn set_tick_interval(&self, secs: u64) -> u64 {
        self.interval.set(secs)
    }

    pub fn tick_interval_secs(&self) -> u64 {
        self.interval.secs()
    }
}
