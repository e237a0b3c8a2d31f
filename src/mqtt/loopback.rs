//! In-process stand-in for a broker: publishes are recorded and delivered
//! synchronously to handlers subscribed to the exact topic. Lets the device
//! and relay be wired together without a network.
//!
//! Test support only. Neither binary uses it; it is public so the
//! integration tests under `tests/` can reach it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rumqttc::QoS;
use tracing::debug;

use crate::error::TransportError;

use super::{InboundHandler, Publisher};

#[derive(Debug, Clone, PartialEq)]
pub struct Published {
    pub topic: String,
    pub qos: QoS,
    pub retain: bool,
    pub payload: String,
}

#[derive(Default)]
struct Inner {
    handlers: Vec<(String, Arc<dyn InboundHandler>)>,
    log: Vec<Published>,
    refuse: bool,
}

#[derive(Default)]
pub struct LoopbackBus {
    inner: Mutex<Inner>,
}

impl LoopbackBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn subscribe(&self, topic: &str, handler: Arc<dyn InboundHandler>) {
        self.lock().handlers.push((topic.to_string(), handler));
    }

    /// While set, every publish is refused as a full client queue would be.
    pub fn set_refusing(&self, refuse: bool) {
        self.lock().refuse = refuse;
    }

    /// Deliver a raw payload to subscribers without recording it, as a
    /// foreign publisher on the broker would.
    pub fn inject(&self, topic: &str, payload: &[u8]) {
        for handler in self.handlers_for(topic) {
            handler.handle(topic, payload);
        }
    }

    pub fn published(&self) -> Vec<Published> {
        self.lock().log.clone()
    }

    pub fn payloads_on(&self, topic: &str) -> Vec<String> {
        self.lock()
            .log
            .iter()
            .filter(|p| p.topic == topic)
            .map(|p| p.payload.clone())
            .collect()
    }

    fn handlers_for(&self, topic: &str) -> Vec<Arc<dyn InboundHandler>> {
        self.lock()
            .handlers
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, h)| Arc::clone(h))
            .collect()
    }
}

impl Publisher for LoopbackBus {
    fn publish(
        &self,
        topic: &str,
        qos: QoS,
        retain: bool,
        payload: String,
    ) -> Result<(), TransportError> {
        {
            let mut inner = self.lock();
            if inner.refuse {
                return Err(TransportError::PublishRefused {
                    topic: topic.to_string(),
                    reason: "loopback bus is refusing publishes".into(),
                });
            }
            inner.log.push(Published {
                topic: topic.to_string(),
                qos,
                retain,
                payload: payload.clone(),
            });
        }
        debug!("loopback: {} <- {}", topic, payload);
        // Handlers run with the bus unlocked so they may publish in turn.
        self.inject(topic, payload.as_bytes());
        Ok(())
    }
}
