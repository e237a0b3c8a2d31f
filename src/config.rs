use crate::device::{DEFAULT_TICK_INTERVAL_SECS, MAX_TICK_INTERVAL_SECS, MIN_TICK_INTERVAL_SECS};

/// Which process is loading the configuration. Only affects defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Device,
    Relay,
}

impl Role {
    fn default_client_id(self) -> &'static str {
        match self {
            Role::Device => "irrigation-device",
            Role::Relay => "irrigation-relay",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub mqtt: MqttConfig,
    pub topics: TopicConfig,
    pub simulation: SimulationConfig,
}

#[derive(Debug, Clone)]
pub struct MqttConfig {
    pub broker_host: String,
    pub broker_port: u16,
    pub keep_alive_secs: u64,
    pub username: Option<String>,
    pub password: Option<String>,
    pub client_id: String,
    /// Fixed backoff after an event loop error before polling again.
    pub reconnect_secs: u64,
}

#[derive(Debug, Clone)]
pub struct TopicConfig {
    pub telemetry: String,
    pub commands: String,
    /// Retained availability topic ("online"/"offline"), device only.
    pub status: String,
    /// Retained JSON state report, device only. `None` disables it.
    pub state: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub tick_interval_secs: u64,
    pub seed: Option<u64>,
}

fn env_optional<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).filter(|v| !v.is_empty())
}

fn env_or_default<F, T>(lookup: &F, key: &str, default: T) -> Result<T, String>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match env_optional(lookup, key) {
        Some(raw) => raw
            .parse()
            .map_err(|_| format!("{key} has invalid value {raw:?}")),
        None => Ok(default),
    }
}

impl Config {
    pub fn from_env(role: Role) -> Result<Self, String> {
        Self::from_lookup(role, |key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup. `from_env` is this
    /// with the process environment.
    pub fn from_lookup<F>(role: Role, lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let state = match lookup(STATE_TOPIC_KEY) {
            // Explicitly set to empty: report disabled.
            Some(v) if v.is_empty() => None,
            Some(v) => Some(v),
            None => Some("iot/state".to_string()),
        };

        let config = Self {
            mqtt: MqttConfig {
                broker_host: env_or_default(
                    &lookup,
                    "MQTT_BROKER_HOST",
                    "test.mosquitto.org".to_string(),
                )?,
                broker_port: env_or_default(&lookup, "MQTT_BROKER_PORT", 1883)?,
                keep_alive_secs: env_or_default(&lookup, "MQTT_KEEP_ALIVE_SECS", 60)?,
                username: env_optional(&lookup, "MQTT_USERNAME"),
                password: env_optional(&lookup, "MQTT_PASSWORD"),
                client_id: env_or_default(
                    &lookup,
                    "MQTT_CLIENT_ID",
                    role.default_client_id().to_string(),
                )?,
                reconnect_secs: env_or_default(&lookup, "MQTT_RECONNECT_SECS", 5)?,
            },
            topics: TopicConfig {
                telemetry: env_or_default(
                    &lookup,
                    "MQTT_TELEMETRY_TOPIC",
                    "iot/soil_moisture".to_string(),
                )?,
                commands: env_or_default(
                    &lookup,
                    "MQTT_COMMANDS_TOPIC",
                    "iot/commands".to_string(),
                )?,
                status: env_or_default(
                    &lookup,
                    "MQTT_STATUS_TOPIC",
                    "iot/device_status".to_string(),
                )?,
                state,
            },
            simulation: SimulationConfig {
                tick_interval_secs: env_or_default(
                    &lookup,
                    "SIM_TICK_INTERVAL_SECS",
                    DEFAULT_TICK_INTERVAL_SECS,
                )?,
                seed: match env_optional(&lookup, "SIM_SEED") {
                    Some(raw) => Some(
                        raw.parse()
                            .map_err(|_| format!("SIM_SEED has invalid value {raw:?}"))?,
                    ),
                    None => None,
                },
            },
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        if self.mqtt.broker_host.is_empty() {
            return Err("MQTT_BROKER_HOST must not be empty".into());
        }
        // rumqttc panics on such ids instead of returning an error.
        if self.mqtt.client_id.is_empty() || self.mqtt.client_id.starts_with(' ') {
            return Err(format!(
                "MQTT_CLIENT_ID must be non-empty and not start with a space, got {:?}",
                self.mqtt.client_id
            ));
        }
        if self.mqtt.keep_alive_secs == 0 {
            return Err("MQTT_KEEP_ALIVE_SECS must be > 0".into());
        }
        if self.mqtt.reconnect_secs == 0 {
            return Err("MQTT_RECONNECT_SECS must be > 0".into());
        }
        if self.topics.telemetry.is_empty() || self.topics.commands.is_empty() {
            return Err("telemetry and commands topics must not be empty".into());
        }
        for (key, topic) in [
            ("MQTT_TELEMETRY_TOPIC", Some(&self.topics.telemetry)),
            ("MQTT_COMMANDS_TOPIC", Some(&self.topics.commands)),
            ("MQTT_STATUS_TOPIC", Some(&self.topics.status)),
            ("MQTT_STATE_TOPIC", self.topics.state.as_ref()),
        ] {
            if let Some(topic) = topic {
                if topic.contains(['+', '#']) {
                    return Err(format!(
                        "{key} must be a plain topic without wildcards, got {topic:?}"
                    ));
                }
            }
        }
        if self.topics.telemetry == self.topics.commands {
            return Err(format!(
                "telemetry and commands topics must differ (both {:?})",
                self.topics.telemetry
            ));
        }
        let interval = self.simulation.tick_interval_secs;
        if !(MIN_TICK_INTERVAL_SECS..=MAX_TICK_INTERVAL_SECS).contains(&interval) {
            return Err(format!(
                "SIM_TICK_INTERVAL_SECS must be within {MIN_TICK_INTERVAL_SECS}..={MAX_TICK_INTERVAL_SECS}, got {interval}"
            ));
        }
        Ok(())
    }
}

const STATE_TOPIC_KEY: &str = "MQTT_STATE_TOPIC";
