use std::sync::Arc;

use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use soil_irrigation_bridge::config::{Config, Role};
use soil_irrigation_bridge::device::{
    CommandSubscriber, DeviceHandle, DeviceState, LogPresenter, Presenter, SimulationLoop,
    TelemetryPublisher, TickInterval, console,
};
use soil_irrigation_bridge::mqtt::client::{Availability, MqttBridge};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = match Config::from_env(Role::Device) {
        Ok(c) => c,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        "Starting irrigation device (mqtt={}:{}, telemetry={}, commands={}, interval={}s)",
        config.mqtt.broker_host,
        config.mqtt.broker_port,
        config.topics.telemetry,
        config.topics.commands,
        config.simulation.tick_interval_secs,
    );

    let state = Arc::new(DeviceState::new());
    let interval = TickInterval::new(config.simulation.tick_interval_secs);
    let presenter: Arc<dyn Presenter> = Arc::new(LogPresenter);
    presenter.refresh(&state.read_snapshot());

    let bridge = MqttBridge::new(
        &config.mqtt,
        vec![config.topics.commands.clone()],
        Some(Availability {
            topic: config.topics.status.clone(),
        }),
    );
    let shutdown = CancellationToken::new();

    let telemetry = TelemetryPublisher::new(
        Arc::new(bridge.client()),
        config.topics.telemetry.clone(),
        config.topics.state.clone(),
    );
    let simulation = SimulationLoop::new(
        Arc::clone(&state),
        telemetry,
        Arc::clone(&presenter),
        interval.clone(),
        config.simulation.seed,
    );
    let sim_handle = tokio::spawn(simulation.run(shutdown.child_token()));

    let subscriber = Arc::new(CommandSubscriber::new(
        Arc::clone(&state),
        Arc::clone(&presenter),
        config.topics.commands.clone(),
    ));
    let bridge_shutdown = CancellationToken::new();
    let bridge_handle = tokio::spawn(bridge.run(subscriber, bridge_shutdown.clone()));

    let console_handle = tokio::spawn(console::run(
        BufReader::new(tokio::io::stdin()),
        DeviceHandle::new(Arc::clone(&state), interval),
        Arc::clone(&presenter),
        shutdown.child_token(),
    ));

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

    // Stop ticking first so nothing is published after the disconnect.
    shutdown.cancel();
    if let Err(e) = sim_handle.await {
        warn!("Simulation task failed: {}", e);
    }
    bridge_shutdown.cancel();
    if let Err(e) = bridge_handle.await {
        warn!("MQTT task failed: {}", e);
    }
    // Blocked on a stdin read that cannot be interrupted.
    console_handle.abort();
    info!("Irrigation device stopped");
}
