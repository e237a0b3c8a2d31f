use std::sync::Arc;

use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use soil_irrigation_bridge::config::{Config, Role};
use soil_irrigation_bridge::mqtt::client::MqttBridge;
use soil_irrigation_bridge::relay::{RelayClient, chat};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match Config::from_env(Role::Relay) {
        Ok(c) => c,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        "Starting irrigation relay (mqtt={}:{}, telemetry={}, commands={})",
        config.mqtt.broker_host,
        config.mqtt.broker_port,
        config.topics.telemetry,
        config.topics.commands,
    );

    let bridge = MqttBridge::new(&config.mqtt, vec![config.topics.telemetry.clone()], None);
    let relay = Arc::new(RelayClient::new(
        Arc::new(bridge.client()),
        config.topics.telemetry.clone(),
        config.topics.commands.clone(),
    ));

    let shutdown = CancellationToken::new();
    let bridge_handle = tokio::spawn(bridge.run(relay.clone(), shutdown.clone()));

    let chat_relay = Arc::clone(&relay);
    let chat_shutdown = shutdown.child_token();
    let chat_handle = tokio::spawn(async move {
        chat::serve(
            &chat_relay,
            BufReader::new(tokio::io::stdin()),
            tokio::io::stdout(),
            chat_shutdown,
        )
        .await;
    });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received SIGINT, shutting down");
        }
        _ = async {
            let mut sigterm = tokio::signal::unix::signal(
                tokio::signal::unix::SignalKind::terminate()
            ).expect("Failed to register SIGTERM handler");
            sigterm.recv().await;
        } => {
            info!("Received SIGTERM, shutting down");
        }
    }

    shutdown.cancel();
    if let Err(e) = bridge_handle.await {
        warn!("MQTT task failed: {}", e);
    }
    chat_handle.abort();
    info!(
        "Irrigation relay stopped (last moisture: {})",
        relay
            .query_telemetry()
            .map_or_else(|| "none".to_string(), |m| format!("{m:.1}%"))
    );
}
