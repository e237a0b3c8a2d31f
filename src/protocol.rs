//! Wire format shared by the device and every remote controller.
//!
//! Telemetry is a UTF-8 decimal string with one fractional digit (`"47.3"`).
//! Commands are one of a closed set of UTF-8 words, matched case-sensitively.

use std::fmt;
use std::str::FromStr;

use crate::error::{CommandError, TelemetryError};

/// A control instruction published by a remote peer and consumed by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    TogglePump,
    AutoModeOn,
    AutoModeOff,
}

impl Command {
    pub const ALL: [Command; 3] = [Command::TogglePump, Command::AutoModeOn, Command::AutoModeOff];

    pub const fn as_str(self) -> &'static str {
        match self {
            Command::TogglePump => "TOGGLE_PUMP",
            Command::AutoModeOn => "AUTO_MODE_ON",
            Command::AutoModeOff => "AUTO_MODE_OFF",
        }
    }

    pub const fn auto_mode(enabled: bool) -> Self {
        if enabled {
            Command::AutoModeOn
        } else {
            Command::AutoModeOff
        }
    }

    /// Decode a raw MQTT payload.
    pub fn decode(payload: &[u8]) -> Result<Self, CommandError> {
        std::str::from_utf8(payload)
            .map_err(|_| CommandError::InvalidEncoding)?
            .parse()
    }
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Command::ALL
            .into_iter()
            .find(|cmd| cmd.as_str() == s)
            .ok_or_else(|| CommandError::Unrecognized(s.to_string()))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn format_telemetry(moisture: f64) -> String {
    format!("{moisture:.1}")
}

/// Parse a telemetry payload. Surrounding whitespace is tolerated; NaN and
/// infinities are rejected so they never reach a cache.
pub fn parse_telemetry(payload: &[u8]) -> Result<f64, TelemetryError> {
    let text = std::str::from_utf8(payload).map_err(|_| TelemetryError::InvalidEncoding)?;
    let trimmed = text.trim();
    let value: f64 = trimmed
        .parse()
        .map_err(|_| TelemetryError::NotANumber(trimmed.to_string()))?;
    if !value.is_finite() {
        return Err(TelemetryError::NotFinite(trimmed.to_string()));
    }
    Ok(value)
}
