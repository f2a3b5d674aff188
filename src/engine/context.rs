//! Capabilities handed to actions while a transition runs.

use crate::core::{Args, Trigger};
use crate::driver::{Event, MachineId};
use crate::timer::{TimerMode, TimerService};
use std::collections::VecDeque;
use std::time::Duration;
use tracing::warn;

/// Handle an action uses to talk to its own driver.
///
/// Events sent through the context are queued behind the event currently
/// being processed and ahead of anything submitted from outside, so they run
/// only after the whole exit/effect/entry sequence has returned.
pub struct ActionContext<'a> {
    machine: &'a MachineId,
    outbox: &'a mut VecDeque<Event>,
    timers: &'a TimerService,
}

impl<'a> ActionContext<'a> {
    pub(crate) fn new(
        machine: &'a MachineId,
        outbox: &'a mut VecDeque<Event>,
        timers: &'a TimerService,
    ) -> Self {
        Self {
            machine,
            outbox,
            timers,
        }
    }

    /// Id of the machine whose action is running.
    pub fn machine_id(&self) -> &MachineId {
        self.machine
    }

    /// Queue `trigger` for another machine registered on the same driver.
    pub fn send<T: Trigger>(&mut self, trigger: T, target: &MachineId, args: Args) {
        self.outbox
            .push_back(Event::local(trigger.name(), target.clone(), args));
    }

    /// Queue `trigger` for the running machine itself.
    pub fn send_self<T: Trigger>(&mut self, trigger: T, args: Args) {
        let target = self.machine.clone();
        self.send(trigger, &target, args);
    }

    /// Start (or restart) the named timer owned by the running machine.
    ///
    /// Timers started on entry must be stopped on exit by the machine itself.
    pub fn start_timer(&self, name: &str, delay: Duration, mode: TimerMode) {
        if let Err(error) = self.timers.start(self.machine, name, delay, mode) {
            warn!(
                machine = %self.machine,
                timer = name,
                error = %error,
                "Timer could not be started"
            );
        }
    }

    /// Stop the named timer. Expiries already queued still fire.
    pub fn stop_timer(&self, name: &str) {
        self.timers.stop(self.machine, name);
    }

    /// Events queued by actions so far in this run-to-completion step.
    pub fn pending(&self) -> usize {
        self.outbox.len()
    }
}
