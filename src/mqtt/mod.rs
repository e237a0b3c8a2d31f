pub mod client;
#[doc(hidden)]
pub mod loopback;

use rumqttc::{AsyncClient, QoS};

use crate::error::TransportError;

/// Hands a payload to the transport without waiting for delivery.
pub trait Publisher: Send + Sync {
    fn publish(
        &self,
        topic: &str,
        qos: QoS,
        retain: bool,
        payload: String,
    ) -> Result<(), TransportError>;
}

impl Publisher for AsyncClient {
    fn publish(
        &self,
        topic: &str,
        qos: QoS,
        retain: bool,
        payload: String,
    ) -> Result<(), TransportError> {
        // try_publish only enqueues; it never waits on the network.
        self.try_publish(topic, qos, retain, payload)
            .map_err(|e| TransportError::PublishRefused {
                topic: topic.to_string(),
                reason: e.to_string(),
            })
    }
}

/// Receives every message delivered on a subscribed topic.
///
/// Runs on the transport's task: implementations must finish quickly and
/// must not panic, since that would take the subscription down with it.
pub trait InboundHandler: Send + Sync {
    fn handle(&self, topic: &str, payload: &[u8]);
}
