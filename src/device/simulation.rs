use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::presenter::Presenter;
use super::telemetry::TelemetryPublisher;
use super::{DeviceState, Snapshot};

pub const MIN_TICK_INTERVAL_SECS: u64 = 1;
pub const MAX_TICK_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_TICK_INTERVAL_SECS: u64 = 10;

/// Tick interval in seconds, shared between the loop and whoever adjusts it.
/// A new value is picked up at the start of the next sleep.
#[derive(Debug, Clone)]
pub struct TickInterval {
    secs: Arc<AtomicU64>,
}

impl Default for TickInterval {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_INTERVAL_SECS)
    }
}

impl TickInterval {
    pub fn new(secs: u64) -> Self {
        Self {
            secs: Arc::new(AtomicU64::new(clamp_interval(secs))),
        }
    }

    /// Store a new interval, clamped to [1, 60]. Returns the value applied.
    pub fn set(&self, secs: u64) -> u64 {
        let applied = clamp_interval(secs);
        if applied != secs {
            warn!(
                "Tick interval {}s out of range, using {}s",
                secs, applied
            );
        }
        self.secs.store(applied, Ordering::Relaxed);
        applied
    }

    pub fn secs(&self) -> u64 {
        self.secs.load(Ordering::Relaxed)
    }

    pub fn period(&self) -> Duration {
        Duration::from_secs(self.secs())
    }
}

fn clamp_interval(secs: u64) -> u64 {
    secs.clamp(MIN_TICK_INTERVAL_SECS, MAX_TICK_INTERVAL_SECS)
}

/// Periodic body of the device: sleep, advance physics, run the control
/// law, publish, refresh the display.
pub struct SimulationLoop {
    state: Arc<DeviceState>,
    telemetry: TelemetryPublisher,
    presenter: Arc<dyn Presenter>,
    interval: TickInterval,
    rng: StdRng,
}

impl SimulationLoop {
    pub fn new(
        state: Arc<DeviceState>,
        telemetry: TelemetryPublisher,
        presenter: Arc<dyn Presenter>,
        interval: TickInterval,
        seed: Option<u64>,
    ) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            state,
            telemetry,
            presenter,
            interval,
            rng,
        }
    }

    /// One tick. The control law sees the moisture written by this tick's
    /// physics step.
    pub fn tick(&mut self) -> Snapshot {
        let moisture = self.state.advance_moisture(&mut self.rng);
        if let Some(pump_active) = self.state.apply_control_law() {
            info!(
                "Auto mode switched pump {} at moisture {:.1}%",
                if pump_active { "ON" } else { "OFF" },
                moisture
            );
        }

        let snapshot = self.state.read_snapshot();
        self.telemetry.publish(snapshot.moisture);
        self.telemetry.publish_state(&snapshot);
        self.presenter.refresh(&snapshot);
        snapshot
    }

    /// Run until `shutdown` fires. A pending sleep is abandoned on shutdown,
    /// so the loop stops without finishing the interval. Returns the number
    /// of ticks executed.
    pub async fn run(mut self, shutdown: CancellationToken) -> u64 {
        info!(
            "Simulation loop started (interval {}s)",
            self.interval.secs()
        );
        let mut ticks = 0u64;

        loop {
            let period = self.interval.period();
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(period) => {}
            }
            if shutdown.is_cancelled() {
                break;
            }

            let snapshot = self.tick();
            ticks += 1;
            debug!(
                "Tick {}: moisture={:.1} pump={} auto={}",
                ticks, snapshot.moisture, snapshot.pump_active, snapshot.auto_mode
            );
        }

        info!("Simulation loop stopped after {} ticks", ticks);
        ticks
    }
}
