//! Device and relay wired together over the in-memory loopback bus.

use std::sync::Arc;

use soil_irrigation_bridge::device::control::{PUMP_OFF_AT, PUMP_ON_BELOW};
use soil_irrigation_bridge::device::{
    CommandSubscriber, DeviceState, Presenter, SimulationLoop, Snapshot, TelemetryPublisher,
    TickInterval,
};
use soil_irrigation_bridge::mqtt::loopback::LoopbackBus;
use soil_irrigation_bridge::protocol::format_telemetry;
use soil_irrigation_bridge::relay::RelayClient;
use soil_irrigation_bridge::relay::chat::{ChatCommand, NO_DATA, respond};

const TELEMETRY: &str = "iot/soil_moisture";
const COMMANDS: &str = "iot/commands";
const STATE: &str = "iot/state";

struct NullPresenter;

impl Presenter for NullPresenter {
    fn refresh(&self, _snapshot: &Snapshot) {}
}

struct Rig {
    bus: Arc<LoopbackBus>,
    state: Arc<DeviceState>,
    sim: SimulationLoop,
    relay: Arc<RelayClient>,
}

fn rig(start: Snapshot) -> Rig {
    let bus = Arc::new(LoopbackBus::new());
    let state = Arc::new(DeviceState::from_snapshot(start));
    let presenter: Arc<dyn Presenter> = Arc::new(NullPresenter);

    let subscriber = Arc::new(CommandSubscriber::new(
        Arc::clone(&state),
        Arc::clone(&presenter),
        COMMANDS.into(),
    ));
    bus.subscribe(COMMANDS, subscriber);

    let relay = Arc::new(RelayClient::new(
        bus.clone(),
        TELEMETRY.into(),
        COMMANDS.into(),
    ));
    bus.subscribe(TELEMETRY, relay.clone());

    let telemetry = TelemetryPublisher::new(bus.clone(), TELEMETRY.into(), Some(STATE.into()));
    let sim = SimulationLoop::new(
        Arc::clone(&state),
        telemetry,
        presenter,
        TickInterval::default(),
        Some(2024),
    );

    Rig {
        bus,
        state,
        sim,
        relay,
    }
}

fn as_published(moisture: f64) -> f64 {
    format_telemetry(moisture).parse().unwrap()
}

#[test]
fn relay_serves_latest_tick() {
    let mut rig = rig(Snapshot::default());
    assert_eq!(rig.relay.query_telemetry(), None);
    assert_eq!(respond(&rig.relay, &ChatCommand::Telemetry), NO_DATA);

    let first = rig.sim.tick();
    assert_eq!(rig.relay.query_telemetry(), Some(as_published(first.moisture)));

    let second = rig.sim.tick();
    assert_eq!(rig.relay.query_telemetry(), Some(as_published(second.moisture)));
    assert_eq!(rig.bus.payloads_on(TELEMETRY).len(), 2);
    assert_eq!(rig.bus.payloads_on(STATE).len(), 2);
}

#[test]
fn lost_sample_leaves_relay_stale() {
    let mut rig = rig(Snapshot::default());
    let delivered = rig.sim.tick();

    rig.bus.set_refusing(true);
    rig.sim.tick();
    assert_eq!(rig.relay.query_telemetry(), Some(as_published(delivered.moisture)));

    rig.bus.set_refusing(false);
    let recovered = rig.sim.tick();
    assert_eq!(rig.relay.query_telemetry(), Some(as_published(recovered.moisture)));
}

#[test]
fn relay_commands_reach_device() {
    let rig = rig(Snapshot::default());

    rig.relay.request_auto_mode(true).unwrap();
    assert!(rig.state.read_snapshot().auto_mode);

    rig.relay.request_toggle().unwrap();
    assert!(rig.state.read_snapshot().pump_active);

    respond(&rig.relay, &ChatCommand::StopPump);
    respond(&rig.relay, &ChatCommand::SetAutoMode(false));
    let snapshot = rig.state.read_snapshot();
    assert!(!snapshot.pump_active);
    assert!(!snapshot.auto_mode);
}

#[test]
fn bogus_command_changes_nothing() {
    let rig = rig(Snapshot::default());
    rig.bus.inject(COMMANDS, b"AUTO_MODE_ON");
    let before = rig.state.read_snapshot();
    assert!(before.auto_mode);

    rig.bus.inject(COMMANDS, b"BOGUS");
    rig.bus.inject(COMMANDS, &[0xfe, 0xff]);
    assert_eq!(rig.state.read_snapshot(), before);
}

#[test]
fn malformed_telemetry_does_not_corrupt_cache() {
    let rig = rig(Snapshot::default());
    rig.bus.inject(TELEMETRY, b"62.5");
    assert_eq!(rig.relay.query_telemetry(), Some(62.5));
    rig.bus.inject(TELEMETRY, b"abc");
    assert_eq!(rig.relay.query_telemetry(), Some(62.5));
}

#[test]
fn auto_mode_waters_through_a_full_cycle() {
    let mut rig = rig(Snapshot {
        moisture: 50.0,
        pump_active: false,
        auto_mode: true,
    });

    // Drying phase: moisture falls on every tick until the pump kicks in.
    let mut previous = rig.state.read_snapshot();
    let switched_on = loop {
        let next = rig.sim.tick();
        if next.pump_active {
            break next;
        }
        assert!(next.moisture < previous.moisture);
        assert!(next.moisture >= PUMP_ON_BELOW);
        previous = next;
    };
    assert!(switched_on.moisture < PUMP_ON_BELOW);

    // Watering phase: moisture rises until the off-threshold is reached.
    let mut previous = switched_on;
    let switched_off = loop {
        let next = rig.sim.tick();
        assert!(next.moisture > previous.moisture);
        if !next.pump_active {
            break next;
        }
        assert!(next.moisture < PUMP_OFF_AT);
        previous = next;
    };
    assert!(switched_off.moisture >= PUMP_OFF_AT);

    let reported = rig.bus.payloads_on(TELEMETRY);
    assert_eq!(
        reported.last().map(String::as_str),
        Some(format_telemetry(switched_off.moisture).as_str())
    );
}
