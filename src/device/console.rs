//! Line-oriented local controls for the device process.
//!
//! ```text
//! pump              toggle the pump
//! auto on|off       switch automatic mode
//! interval <1..60>  set the tick interval in seconds
//! status            print the current state
//! ```

use std::str::FromStr;
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::DeviceHandle;
use super::presenter::{Presenter, status_line};

pub const USAGE: &str = "commands: pump | auto on|off | interval <1..60> | status";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    TogglePump,
    AutoMode(bool),
    Interval(u64),
    Status,
}

impl FromStr for ConsoleCommand {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let verb = words.next().unwrap_or_default().to_ascii_lowercase();
        let arg = words.next();
        if words.next().is_some() {
            return Err(format!("too many arguments in {line:?}; {USAGE}"));
        }

        match (verb.as_str(), arg) {
            ("pump", None) => Ok(ConsoleCommand::TogglePump),
            ("status", None) => Ok(ConsoleCommand::Status),
            ("auto", Some(mode)) if mode.eq_ignore_ascii_case("on") => {
                Ok(ConsoleCommand::AutoMode(true))
            }
            ("auto", Some(mode)) if mode.eq_ignore_ascii_case("off") => {
                Ok(ConsoleCommand::AutoMode(false))
            }
            ("interval", Some(secs)) => secs
                .parse()
                .map(ConsoleCommand::Interval)
                .map_err(|_| format!("interval must be a whole number of seconds, got {secs:?}")),
            _ => Err(format!("unknown command {line:?}; {USAGE}")),
        }
    }
}

/// Apply one command and return the reply to show the operator.
pub fn execute(handle: &DeviceHandle, presenter: &dyn Presenter, command: ConsoleCommand) -> String {
    match command {
        ConsoleCommand::TogglePump => handle.toggle_pump(),
        ConsoleCommand::AutoMode(enabled) => handle.set_auto_mode(enabled),
        ConsoleCommand::Interval(secs) => {
            let applied = handle.set_tick_interval(secs);
            return format!("Tick interval set to {applied}s");
        }
        ConsoleCommand::Status => {}
    }
    let snapshot = handle.read_snapshot();
    if command != ConsoleCommand::Status {
        presenter.refresh(&snapshot);
    }
    status_line(&snapshot)
}

/// Read commands from `input` until EOF or shutdown. EOF only ends the
/// console; the device keeps running.
pub async fn run<R>(
    input: R,
    handle: DeviceHandle,
    presenter: Arc<dyn Presenter>,
    shutdown: CancellationToken,
) where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    loop {
        let line = tokio::select! {
            _ = shutdown.cancelled() => break,
            line = lines.next_line() => line,
        };
        match line {
            Ok(Some(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match line.parse::<ConsoleCommand>() {
                    Ok(command) => info!("{}", execute(&handle, presenter.as_ref(), command)),
                    Err(e) => warn!("{}", e),
                }
            }
            Ok(None) => {
                info!("Console input closed, local controls disabled");
                break;
            }
            Err(e) => {
                warn!("Console input error: {}", e);
                break;
            }
        }
    }
}
