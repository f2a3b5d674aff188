//! The electric car: an operator toggles the plug, the car tells the charger.

use super::charger::ChargerTrigger;
use super::{publish, CAR_ID};
use crate::builder::{transition, BuildError, MachineBuilder};
use crate::bus::{Bus, Message};
use crate::core::Args;
use crate::engine::{MachineDefinition, MachineInstance};
use crate::{state_enum, trigger_enum};
use std::sync::Arc;
use tracing::info;

state_enum! {
    pub enum CarState {
        Standby => "s_standby",
    }
}

trigger_enum! {
    pub enum CarTrigger {
        Connect => "connect",
        Disconnect => "disconnect",
    }
}

pub type CarMachine = MachineInstance<CarState, CarTrigger, Car>;

pub struct Car {
    bus: Arc<dyn Bus>,
    charger_topic: String,
}

impl Car {
    pub fn new(bus: Arc<dyn Bus>, charger_topic: impl Into<String>) -> Self {
        Self {
            bus,
            charger_topic: charger_topic.into(),
        }
    }

    fn connect_plug(&mut self) {
        info!(machine = CAR_ID, "Plug connected");
        self.notify_charger(ChargerTrigger::ConnectPlug);
    }

    fn disconnect_plug(&mut self) {
        info!(machine = CAR_ID, "Plug disconnected");
        self.notify_charger(ChargerTrigger::DisconnectPlug);
    }

    fn notify_charger(&self, trigger: ChargerTrigger) {
        publish(
            self.bus.as_ref(),
            &self.charger_topic,
            Message::of(trigger, Args::none()),
        );
    }
}

/// Both triggers loop on `s_standby`; which one the operator sent last lives
/// outside the machine.
pub fn definition() -> Result<Arc<MachineDefinition<CarState, CarTrigger, Car>>, BuildError> {
    let definition = MachineBuilder::new(CAR_ID)
        .initial(CarState::Standby)
        .on_init(|_car: &mut Car, ctx| info!(machine = %ctx.machine_id(), "Init"))
        .plain_state(CarState::Standby)
        .transition(
            transition(CarState::Standby, CarTrigger::Connect, CarState::Standby)
                .effect(|car: &mut Car, _ctx, _args: &Args| car.connect_plug()),
        )?
        .transition(
            transition(CarState::Standby, CarTrigger::Disconnect, CarState::Standby)
                .effect(|car: &mut Car, _ctx, _args: &Args| car.disconnect_plug()),
        )?
        .build()?;
    Ok(Arc::new(definition))
}

pub fn machine(car: Car) -> Result<CarMachine, BuildError> {
    Ok(MachineInstance::new(CAR_ID, definition()?, car))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::InMemoryBus;
    use crate::driver::Driver;

    #[test]
    fn connect_and_disconnect_publish_plug_events() {
        let bus = Arc::new(InMemoryBus::new());
        let mut charger_inbox = bus.subscribe("park/charger").unwrap();
        let driver = Driver::with_runtime("car", None);
        driver
            .register(machine(Car::new(bus.clone(), "park/charger")).unwrap())
            .unwrap();

        driver.send("connect", CAR_ID, Args::none());
        driver.send("disconnect", CAR_ID, Args::none());

        assert_eq!(charger_inbox.try_recv().unwrap().payload, b"connect_plug");
        assert_eq!(charger_inbox.try_recv().unwrap().payload, b"disconnect_plug");
        assert_eq!(driver.state_of(CAR_ID), Some("s_standby"));
    }

    #[test]
    fn self_loops_are_recorded_in_history() {
        let bus = Arc::new(InMemoryBus::new());
        let driver = Driver::with_runtime("car", None);
        driver
            .register(machine(Car::new(bus, "park/charger")).unwrap())
            .unwrap();

        driver.send("connect", CAR_ID, Args::none());
        let path = driver
            .inspect(CAR_ID, |m: &CarMachine| {
                m.history().get_path().into_iter().copied().collect::<Vec<_>>()
            })
            .unwrap();
        assert_eq!(path, vec![CarState::Standby, CarState::Standby]);
    }
}
