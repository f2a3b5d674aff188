//! Fleet monitor: forwards every charger notification to the dashboard.

use super::MONITOR_ID;
use crate::builder::{BuildError, MachineBuilder, StateBuilder};
use crate::core::Args;
use crate::engine::{MachineDefinition, MachineInstance};
use crate::notify::{StatusReport, StatusReporter};
use crate::{state_enum, trigger_enum};
use std::sync::Arc;
use tracing::{info, warn};

state_enum! {
    pub enum MonitorState {
        Monitor => "s_monitor",
    }
}

trigger_enum! {
    pub enum MonitorTrigger {
        ChargerConnect => "charger_connect",
        ChargerDisconnect => "charger_disconnect",
        /// percentage, goal
        ChargerStatus => "charger_status" (Int, Int),
        ChargerFinished => "charger_finished",
    }
}

pub type MonitorMachine = MachineInstance<MonitorState, MonitorTrigger, ChargerMonitor>;

pub struct ChargerMonitor {
    reporter: Arc<dyn StatusReporter>,
}

impl ChargerMonitor {
    pub fn new(reporter: Arc<dyn StatusReporter>) -> Self {
        Self { reporter }
    }

    fn forward(&self, report: StatusReport) {
        if let Err(error) = self.reporter.report(report) {
            warn!(machine = MONITOR_ID, error = %error, "Error sending status report");
        }
    }

    fn status(&self, args: &Args) {
        // the schema guarantees both arguments
        if let (Some(percentage), Some(goal)) = (args.int(0), args.int(1)) {
            self.forward(StatusReport::charging(percentage, goal));
        }
    }
}

/// A single state whose every trigger is a state-level handler.
pub fn definition(
) -> Result<Arc<MachineDefinition<MonitorState, MonitorTrigger, ChargerMonitor>>, BuildError> {
    let steady = StateBuilder::new()
        .on(MonitorTrigger::ChargerConnect, |m: &mut ChargerMonitor, _ctx, _args: &Args| {
            m.forward(StatusReport::connected())
        })
        .on(MonitorTrigger::ChargerDisconnect, |m: &mut ChargerMonitor, _ctx, _args: &Args| {
            m.forward(StatusReport::disconnected())
        })
        .on(MonitorTrigger::ChargerStatus, |m: &mut ChargerMonitor, _ctx, args: &Args| {
            m.status(args)
        })
        .on(MonitorTrigger::ChargerFinished, |m: &mut ChargerMonitor, _ctx, _args: &Args| {
            m.forward(StatusReport::finished())
        });

    let definition = MachineBuilder::new(MONITOR_ID)
        .initial(MonitorState::Monitor)
        .on_init(|_m: &mut ChargerMonitor, ctx| info!(machine = %ctx.machine_id(), "Init"))
        .state(MonitorState::Monitor, steady)
        .build()?;
    Ok(Arc::new(definition))
}

pub fn machine(monitor: ChargerMonitor) -> Result<MonitorMachine, BuildError> {
    Ok(MachineInstance::new(MONITOR_ID, definition()?, monitor))
}
