use std::sync::Arc;

use rumqttc::QoS;
use tracing::{debug, warn};

use crate::mqtt::Publisher;
use crate::protocol::format_telemetry;

use super::Snapshot;

/// Best-effort publisher for the per-tick moisture sample and state report.
/// Failures are logged and never retried; the next tick publishes afresh.
pub struct TelemetryPublisher {
    publisher: Arc<dyn Publisher>,
    telemetry_topic: String,
    state_topic: Option<String>,
}

impl TelemetryPublisher {
    pub fn new(
        publisher: Arc<dyn Publisher>,
        telemetry_topic: String,
        state_topic: Option<String>,
    ) -> Self {
        Self {
            publisher,
            telemetry_topic,
            state_topic,
        }
    }

    pub fn publish(&self, moisture: f64) {
        let payload = format_telemetry(moisture);
        match self
            .publisher
            .publish(&self.telemetry_topic, QoS::AtMostOnce, false, payload)
        {
            Ok(()) => debug!("Published moisture {:.1} to {}", moisture, self.telemetry_topic),
            Err(e) => warn!("Telemetry sample dropped: {}", e),
        }
    }

    /// Retained JSON copy of the whole snapshot, for dashboards.
    pub fn publish_state(&self, snapshot: &Snapshot) {
        let Some(topic) = &self.state_topic else {
            return;
        };
        let payload = match serde_json::to_string(snapshot) {
            Ok(p) => p,
            Err(e) => {
                warn!("Could not encode state report: {}", e);
                return;
            }
        };
        if let Err(e) = self.publisher.publish(topic, QoS::AtMostOnce, true, payload) {
            warn!("State report dropped: {}", e);
        }
    }
}
