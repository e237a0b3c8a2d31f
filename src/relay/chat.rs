//! Chat command front end for the relay.
//!
//! Commands follow bot conventions: a leading slash, an optional
//! `@botname` suffix, and whitespace separated arguments.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::TransportError;

use super::RelayClient;

pub const WELCOME: &str =
    "Welcome to the irrigation bot! Use the commands below to control the device.";
pub const NO_DATA: &str = "No moisture data yet. Try again later.";
pub const HELP: &str = "Commands: /telemetry, /start_pump, /stop_pump, /set_auto_mode [on|off]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    Start,
    Telemetry,
    StartPump,
    StopPump,
    /// No argument means on; any argument other than "on" means off.
    SetAutoMode(bool),
    Unknown(String),
}

impl ChatCommand {
    /// `None` for blank input.
    pub fn parse(line: &str) -> Option<Self> {
        let mut words = line.split_whitespace();
        let head = words.next()?;
        let name = head.split('@').next().unwrap_or(head);

        let command = match name {
            "/start" => ChatCommand::Start,
            "/telemetry" => ChatCommand::Telemetry,
            "/start_pump" => ChatCommand::StartPump,
            "/stop_pump" => ChatCommand::StopPump,
            "/set_auto_mode" => {
                let enabled = words.next().is_none_or(|mode| mode.eq_ignore_ascii_case("on"));
                ChatCommand::SetAutoMode(enabled)
            }
            _ => ChatCommand::Unknown(head.to_string()),
        };
        Some(command)
    }
}

/// Run one chat command against the relay and build the reply.
pub fn respond(relay: &RelayClient, command: &ChatCommand) -> String {
    match command {
        ChatCommand::Start => format!("{WELCOME}\n{HELP}"),
        ChatCommand::Telemetry => match relay.query_telemetry() {
            Some(moisture) => format!("Current soil moisture: {moisture:.1}%"),
            None => NO_DATA.to_string(),
        },
        // The device only understands a toggle, so both map to TOGGLE_PUMP.
        ChatCommand::StartPump => sent(relay.request_toggle(), "Pump toggle requested (pump on)."),
        ChatCommand::StopPump => sent(relay.request_toggle(), "Pump toggle requested (pump off)."),
        ChatCommand::SetAutoMode(enabled) => sent(
            relay.request_auto_mode(*enabled),
            if *enabled {
                "Automatic mode on requested."
            } else {
                "Automatic mode off requested."
            },
        ),
        ChatCommand::Unknown(name) => format!("Unknown command {name}. {HELP}"),
    }
}

fn sent(result: Result<(), TransportError>, reply: &str) -> String {
    match result {
        Ok(()) => reply.to_string(),
        Err(e) => {
            warn!("Chat request not sent: {}", e);
            "Could not send the command to the device, please retry.".to_string()
        }
    }
}

/// Serve chat commands from `input`, writing one reply per command to
/// `output`, until EOF or shutdown.
pub async fn serve<R, W>(relay: &RelayClient, input: R, mut output: W, shutdown: CancellationToken)
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    loop {
        let line = tokio::select! {
            _ = shutdown.cancelled() => break,
            line = lines.next_line() => line,
        };
        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => {
                info!("Chat input closed");
                break;
            }
            Err(e) => {
                warn!("Chat input error: {}", e);
                break;
            }
        };
        let Some(command) = ChatCommand::parse(&line) else {
            continue;
        };

        let reply = respond(relay, &command);
        let written = async {
            output.write_all(reply.as_bytes()).await?;
            output.write_all(b"\n").await?;
            output.flush().await
        };
        if let Err(e) = written.await {
            warn!("Could not write chat reply: {}", e);
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mqtt::InboundHandler;
    use crate::mqtt::loopback::LoopbackBus;
    use std::sync::Arc;

    const TELEMETRY: &str = "iot/soil_moisture";
    const COMMANDS: &str = "iot/commands";

    fn relay() -> (RelayClient, Arc<LoopbackBus>) {
        let bus = Arc::new(LoopbackBus::new());
        let relay = RelayClient::new(bus.clone(), TELEMETRY.into(), COMMANDS.into());
        (relay, bus)
    }

    #[test]
    fn parse_commands() {
        assert_eq!(ChatCommand::parse("/start"), Some(ChatCommand::Start));
        assert_eq!(ChatCommand::parse("/telemetry@garden_bot"), Some(ChatCommand::Telemetry));
        assert_eq!(ChatCommand::parse("  /stop_pump "), Some(ChatCommand::StopPump));
        assert_eq!(ChatCommand::parse(""), None);
        assert_eq!(
            ChatCommand::parse("/water"),
            Some(ChatCommand::Unknown("/water".into()))
        );
    }

    #[test]
    fn auto_mode_argument() {
        assert_eq!(ChatCommand::parse("/set_auto_mode"), Some(ChatCommand::SetAutoMode(true)));
        assert_eq!(ChatCommand::parse("/set_auto_mode ON"), Some(ChatCommand::SetAutoMode(true)));
        assert_eq!(ChatCommand::parse("/set_auto_mode off"), Some(ChatCommand::SetAutoMode(false)));
        assert_eq!(ChatCommand::parse("/set_auto_mode later"), Some(ChatCommand::SetAutoMode(false)));
    }

    #[test]
    fn telemetry_reply() {
        let (relay, _) = relay();
        assert_eq!(respond(&relay, &ChatCommand::Telemetry), NO_DATA);
        relay.handle(TELEMETRY, b"47.3");
        assert_eq!(
            respond(&relay, &ChatCommand::Telemetry),
            "Current soil moisture: 47.3%"
        );
    }

    #[test]
    fn pump_commands_both_toggle() {
        let (relay, bus) = relay();
        respond(&relay, &ChatCommand::StartPump);
        respond(&relay, &ChatCommand::StopPump);
        respond(&relay, &ChatCommand::SetAutoMode(false));
        assert_eq!(
            bus.payloads_on(COMMANDS),
            vec!["TOGGLE_PUMP", "TOGGLE_PUMP", "AUTO_MODE_OFF"]
        );
    }

    #[test]
    fn refused_publish_gets_a_failure_reply() {
        let (relay, bus) = relay();
        bus.set_refusing(true);
        let reply = respond(&relay, &ChatCommand::StartPump);
        assert!(reply.starts_with("Could not send"));
    }

    #[tokio::test]
    async fn serve_replies_per_line() {
        let (relay, bus) = relay();
        let input = tokio::io::BufReader::new(&b"/telemetry\n\n/set_auto_mode on\n"[..]);
        let mut output = Vec::new();

        serve(&relay, input, &mut output, CancellationToken::new()).await;

        let text = String::from_utf8(output).unwrap();
        assert_eq!(text, format!("{NO_DATA}\nAutomatic mode on requested.\n"));
        assert_eq!(bus.payloads_on(COMMANDS), vec!["AUTO_MODE_ON"]);
    }
}
