use thiserror::Error;

/// A payload could not be handed to the MQTT client.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("publish to {topic} refused: {reason}")]
    PublishRefused { topic: String, reason: String },
}

/// Why an inbound command payload was discarded.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("command payload is not valid UTF-8")]
    InvalidEncoding,
    #[error("unrecognized command {0:?}")]
    Unrecognized(String),
}

/// Why an inbound telemetry sample was discarded.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TelemetryError {
    #[error("telemetry payload is not valid UTF-8")]
    InvalidEncoding,
    #[error("telemetry payload {0:?} is not a number")]
    NotANumber(String),
    #[error("telemetry value {0:?} is not finite")]
    NotFinite(String),
}
