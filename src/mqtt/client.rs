use std::sync::Arc;
use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, Incoming, LastWill, MqttOptions, Outgoing, QoS};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::MqttConfig;

use super::InboundHandler;

/// How long shutdown waits for the DISCONNECT packet to be flushed.
const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Retained availability topic with "online"/"offline" payloads.
#[derive(Debug, Clone)]
pub struct Availability {
    pub topic: String,
}

/// Connection lifecycle shared by the device and the relay: connect,
/// resubscribe on every ConnAck, dispatch inbound publishes, and disconnect
/// in order on shutdown.
pub struct MqttBridge {
    client: AsyncClient,
    eventloop: EventLoop,
    subscriptions: Vec<String>,
    availability: Option<Availability>,
    reconnect_delay: Duration,
}

impl MqttBridge {
    pub fn new(
        config: &MqttConfig,
        subscriptions: Vec<String>,
        availability: Option<Availability>,
    ) -> Self {
        let mut mqttopts =
            MqttOptions::new(&config.client_id, &config.broker_host, config.broker_port);
        mqttopts.set_keep_alive(Duration::from_secs(config.keep_alive_secs));

        if let (Some(user), Some(pass)) = (&config.username, &config.password) {
            mqttopts.set_credentials(user, pass);
        }

        if let Some(availability) = &availability {
            mqttopts.set_last_will(LastWill::new(
                &availability.topic,
                "offline".as_bytes().to_vec(),
                QoS::AtLeastOnce,
                true,
            ));
        }

        let (client, eventloop) = AsyncClient::new(mqttopts, 100);

        Self {
            client,
            eventloop,
            subscriptions,
            availability,
            reconnect_delay: Duration::from_secs(config.reconnect_secs),
        }
    }

    /// A publishing handle. Requests are queued until the event loop runs.
    pub fn client(&self) -> AsyncClient {
        self.client.clone()
    }

    /// Drive the event loop until `shutdown` fires, then disconnect.
    ///
    /// rumqttc reconnects on the next poll after an error; this loop only
    /// adds a fixed delay so a dead broker is not hammered.
    pub async fn run(mut self, handler: Arc<dyn InboundHandler>, shutdown: CancellationToken) {
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                event = self.eventloop.poll() => {
                    match event {
                        Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                            info!("Connected to MQTT broker");
                            self.on_connected();
                        }
                        Ok(Event::Incoming(Incoming::Publish(publish))) => {
                            handler.handle(&publish.topic, &publish.payload);
                        }
                        Ok(Event::Incoming(Incoming::Disconnect)) => {
                            warn!("Broker closed the connection");
                        }
                        Ok(_) => {}
                        Err(e) => {
                            error!(
                                "MQTT connection error: {}. Reconnecting in {:?}",
                                e, self.reconnect_delay
                            );
                            tokio::select! {
                                _ = shutdown.cancelled() => break,
                                _ = tokio::time::sleep(self.reconnect_delay) => {}
                            }
                        }
                    }
                }
            }
        }

        self.disconnect().await;
    }

    fn on_connected(&self) {
        if let Some(availability) = &self.availability {
            if let Err(e) =
                self.client
                    .try_publish(&availability.topic, QoS::AtLeastOnce, true, "online")
            {
                error!("Failed to publish online status: {}", e);
            }
        }

        // The broker may have dropped our session; subscribe again every time.
        for topic in &self.subscriptions {
            match self.client.try_subscribe(topic, QoS::AtLeastOnce) {
                Ok(()) => info!("Subscribed to {}", topic),
                Err(e) => error!("Failed to subscribe to {}: {}", topic, e),
            }
        }
    }

    /// Stop dispatching, announce offline, then flush DISCONNECT.
    async fn disconnect(mut self) {
        if let Some(availability) = &self.availability {
            if let Err(e) =
                self.client
                    .try_publish(&availability.topic, QoS::AtLeastOnce, true, "offline")
            {
                warn!("Failed to publish offline status: {}", e);
            }
        }

        if let Err(e) = self.client.try_disconnect() {
            warn!("Failed to request disconnect: {}", e);
            return;
        }

        let eventloop = &mut self.eventloop;
        let flush = async {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Outgoing(Outgoing::Disconnect)) => break,
                    Ok(Event::Incoming(Incoming::Publish(publish))) => {
                        debug!("Dropping message on {} during shutdown", publish.topic);
                    }
                    Ok(_) => {}
                    Err(e) => {
                        debug!("Event loop ended during shutdown: {}", e);
                        break;
                    }
                }
            }
        };

        match tokio::time::timeout(DISCONNECT_TIMEOUT, flush).await {
            Ok(()) => info!("Disconnected from MQTT broker"),
            Err(_) => warn!(
                "Disconnect not flushed within {:?}, dropping connection",
                DISCONNECT_TIMEOUT
            ),
        }
    }
}
