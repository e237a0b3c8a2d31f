use tracing::info;

use super::Snapshot;

/// Anything that displays device state. Told when a refresh is due; reads
/// nothing but the snapshot it is handed.
pub trait Presenter: Send + Sync {
    fn refresh(&self, snapshot: &Snapshot);
}

/// Writes one status line per refresh to the log.
pub struct LogPresenter;

impl Presenter for LogPresenter {
    fn refresh(&self, snapshot: &Snapshot) {
        info!("{}", status_line(snapshot));
    }
}

pub fn status_line(snapshot: &Snapshot) -> String {
    format!(
        "Pump: {}, Soil moisture: {:.1}%",
        if snapshot.pump_active { "ON" } else { "OFF" },
        snapshot.moisture,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_line_format() {
        let line = status_line(&Snapshot {
            moisture: 47.26,
            pump_active: true,
            auto_mode: false,
        });
        assert_eq!(line, "Pump: ON, Soil moisture: 47.3%");

        let line = status_line(&Snapshot {
            moisture: 5.0,
            pump_active: false,
            auto_mode: true,
        });
        // Auto mode is not part of the line.
        assert_eq!(line, "Pump: OFF, Soil moisture: 5.0%");
    }
}
