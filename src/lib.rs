//! Simulated soil-moisture sensor and pump, driven by an automatic control
//! loop and bridged over MQTT to remote controllers.
//!
//! The device process owns a [`device::DeviceState`], ticks it from a
//! [`device::SimulationLoop`], publishes telemetry after every tick, and
//! applies commands from the commands topic. The relay process caches
//! telemetry and turns chat commands into command messages.

pub mod config;
pub mod device;
pub mod error;
pub mod mqtt;
pub mod protocol;
pub mod relay;
