//! Status light on top of the charger.
//!
//! Only the forward path is wired: available, occupied, soon available,
//! available again. Leaving occupied or soon-available any other way (a
//! car unplugged mid-setup, for instance) has no transition and is ignored.

use super::SIGNAL_LED_ID;
use crate::builder::{transition, BuildError, MachineBuilder, StateBuilder};
use crate::engine::{MachineDefinition, MachineInstance};
use crate::notify::{IndicatorColor, IndicatorPanel};
use crate::{state_enum, trigger_enum};
use std::sync::Arc;

state_enum! {
    pub enum LedState {
        InitialOff => "s_initial_off",
        AvailableGreen => "s_available_green",
        OccupiedRed => "s_occupied_red",
        SoonAvailableYellow => "s_soon_available_pulsating_yellow",
    }
}

trigger_enum! {
    pub enum LedTrigger {
        SignalAvailable => "signal_available",
        SignalOccupied => "signal_occupied",
        SignalSoonAvailable => "signal_soon_available",
    }
}

pub type SignalLedMachine = MachineInstance<LedState, LedTrigger, SignalLed>;

pub struct SignalLed {
    panel: Box<dyn IndicatorPanel>,
    color: IndicatorColor,
}

impl SignalLed {
    pub fn new(panel: impl IndicatorPanel + 'static) -> Self {
        Self {
            panel: Box::new(panel),
            color: IndicatorColor::Off,
        }
    }

    /// Colour last shown.
    pub fn color(&self) -> IndicatorColor {
        self.color
    }

    fn show(&mut self, color: IndicatorColor) {
        self.panel.set_indicator(color);
        self.color = color;
    }
}

fn lit(color: IndicatorColor) -> StateBuilder<LedTrigger, SignalLed> {
    StateBuilder::new().entry(move |led: &mut SignalLed, _ctx| led.show(color))
}

pub fn definition(
) -> Result<Arc<MachineDefinition<LedState, LedTrigger, SignalLed>>, BuildError> {
    use LedState::*;
    use LedTrigger::*;

    let definition = MachineBuilder::new(SIGNAL_LED_ID)
        .initial(AvailableGreen)
        .state(InitialOff, lit(IndicatorColor::Off))
        .state(AvailableGreen, lit(IndicatorColor::Green))
        .state(OccupiedRed, lit(IndicatorColor::Red))
        .state(SoonAvailableYellow, lit(IndicatorColor::PulsatingYellow))
        .transition(transition(InitialOff, SignalAvailable, AvailableGreen))?
        .transition(transition(AvailableGreen, SignalOccupied, OccupiedRed))?
        .transition(transition(OccupiedRed, SignalSoonAvailable, SoonAvailableYellow))?
        .transition(transition(SoonAvailableYellow, SignalAvailable, AvailableGreen))?
        .build()?;
    Ok(Arc::new(definition))
}

pub fn machine(led: SignalLed) -> Result<SignalLedMachine, BuildError> {
    Ok(MachineInstance::new(SIGNAL_LED_ID, definition()?, led))
}
