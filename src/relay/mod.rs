pub mod chat;

use std::sync::Arc;

use rumqttc::QoS;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::{TelemetryError, TransportError};
use crate::mqtt::{InboundHandler, Publisher};
use crate::protocol::{Command, parse_telemetry};

/// Last telemetry value seen by the relay. Written only by the telemetry
/// subscription, read only by queries.
#[derive(Debug)]
pub struct RelayCache {
    last: watch::Sender<Option<f64>>,
}

impl Default for RelayCache {
    fn default() -> Self {
        Self {
            last: watch::Sender::new(None),
        }
    }
}

impl RelayCache {
    fn record(&self, value: f64) {
        self.last.send_replace(Some(value));
    }

    pub fn last(&self) -> Option<f64> {
        *self.last.borrow()
    }
}

/// Bridges external requests to the commands topic and serves cached
/// telemetry. Requests are advisory: `Ok` means the transport accepted the
/// message, not that the device acted on it.
pub struct RelayClient {
    cache: RelayCache,
    publisher: Arc<dyn Publisher>,
    telemetry_topic: String,
    commands_topic: String,
}

impl RelayClient {
    pub fn new(
        publisher: Arc<dyn Publisher>,
        telemetry_topic: String,
        commands_topic: String,
    ) -> Self {
        Self {
            cache: RelayCache::default(),
            publisher,
            telemetry_topic,
            commands_topic,
        }
    }

    /// `None` until the first valid sample arrives. Never waits.
    pub fn query_telemetry(&self) -> Option<f64> {
        self.cache.last()
    }

    pub fn request_toggle(&self) -> Result<(), TransportError> {
        self.send(Command::TogglePump)
    }

    pub fn request_auto_mode(&self, enabled: bool) -> Result<(), TransportError> {
        self.send(Command::auto_mode(enabled))
    }

    fn send(&self, command: Command) -> Result<(), TransportError> {
        self.publisher.publish(
            &self.commands_topic,
            QoS::AtLeastOnce,
            false,
            command.as_str().to_string(),
        )?;
        info!("Sent {} to {}", command, self.commands_topic);
        Ok(())
    }

    /// Parse a telemetry payload into the cache. A malformed sample leaves
    /// the cache as it was.
    pub fn on_telemetry(&self, payload: &[u8]) -> Result<f64, TelemetryError> {
        let value = parse_telemetry(payload)?;
        self.cache.record(value);
        Ok(value)
    }
}

impl InboundHandler for RelayClient {
    fn handle(&self, topic: &str, payload: &[u8]) {
        if topic != self.telemetry_topic {
            debug!("Ignoring message on unexpected topic {}", topic);
            return;
        }
        match self.on_telemetry(payload) {
            Ok(value) => debug!("Received moisture {:.1}", value),
            Err(e) => warn!("Discarding telemetry sample: {}", e),
        }
    }
}
