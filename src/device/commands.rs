use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::CommandError;
use crate::mqtt::InboundHandler;
use crate::protocol::Command;

use super::DeviceState;
use super::presenter::Presenter;

/// Applies commands arriving on the commands topic to the device state.
pub struct CommandSubscriber {
    state: Arc<DeviceState>,
    presenter: Arc<dyn Presenter>,
    topic: String,
}

impl CommandSubscriber {
    pub fn new(state: Arc<DeviceState>, presenter: Arc<dyn Presenter>, topic: String) -> Self {
        Self {
            state,
            presenter,
            topic,
        }
    }

    /// Decode and apply one payload. On error the state is untouched.
    pub fn apply(&self, payload: &[u8]) -> Result<Command, CommandError> {
        let command = Command::decode(payload)?;
        match command {
            Command::TogglePump => self.state.toggle_pump(),
            Command::AutoModeOn => self.state.set_auto_mode(true),
            Command::AutoModeOff => self.state.set_auto_mode(false),
        }
        Ok(command)
    }
}

impl InboundHandler for CommandSubscriber {
    fn handle(&self, topic: &str, payload: &[u8]) {
        if topic != self.topic {
            debug!("Ignoring message on unexpected topic {}", topic);
            return;
        }
        match self.apply(payload) {
            Ok(command) => {
                info!("Applied remote command {}", command);
                self.presenter.refresh(&self.state.read_snapshot());
            }
            Err(e) => warn!("Discarding command: {}", e),
        }
    }
}
