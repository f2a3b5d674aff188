//! The four machines of the charging installation.
//!
//! Each machine is a transition table plus callbacks on a domain object. The
//! object carries everything its callbacks talk to (bus, topics, reporter,
//! lamps), injected at construction.

pub mod car;
pub mod charger;
pub mod monitor;
pub mod signal_led;

pub use car::{Car, CarMachine, CarState, CarTrigger};
pub use charger::{
    Charger, ChargerMachine, ChargerSettings, ChargerState, ChargerTrigger, STATUS_TIMER,
};
pub use monitor::{ChargerMonitor, MonitorMachine, MonitorState, MonitorTrigger};
pub use signal_led::{LedState, LedTrigger, SignalLed, SignalLedMachine};

use crate::bus::{Bus, Message};
use tracing::warn;

pub const CAR_ID: &str = "electric_car";
pub const CHARGER_ID: &str = "electric_charger";
pub const MONITOR_ID: &str = "electric_charger_monitor";
pub const SIGNAL_LED_ID: &str = "signal_LED";

/// Publish from inside an action. Failures are logged; the action carries on.
fn publish(bus: &dyn Bus, topic: &str, message: Message) {
    if let Err(error) = bus.publish_message(topic, &message) {
        warn!(topic, payload = %message, error = %error, "Publish failed");
    }
}
