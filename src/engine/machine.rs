//! Machine instances and the run-to-completion `fire` step.

use crate::core::{Args, State, StateHistory, StateTransition, Trigger};
use crate::driver::MachineId;
use crate::engine::context::ActionContext;
use crate::engine::definition::{Dispatch, MachineDefinition};
use chrono::Utc;
use std::any::Any;
use std::sync::Arc;
use tracing::{debug, warn};

/// Name of the pseudo-state an instance sits in before its initial transition.
pub const INITIAL: &str = "initial";

/// Outcome of delivering one trigger to one machine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransitionResult {
    /// A transition fired and the machine moved (or looped) to `to`
    Transitioned {
        from: &'static str,
        to: &'static str,
    },

    /// A state-level handler ran; the state did not change
    Handled { state: &'static str },

    /// Nothing in `state` reacts to the trigger
    Ignored { state: &'static str },

    /// The trigger is handled but its arguments do not match the schema
    Rejected { state: &'static str },
}

impl TransitionResult {
    pub fn is_transition(&self) -> bool {
        matches!(self, Self::Transitioned { .. })
    }

    pub fn is_ignored(&self) -> bool {
        matches!(self, Self::Ignored { .. })
    }
}

/// Type-erased view of a machine instance, as held by a driver.
pub trait Machine: Send + 'static {
    fn id(&self) -> &MachineId;

    /// Name of the definition this machine was built from.
    fn definition_name(&self) -> &str;

    fn state_name(&self) -> &'static str;

    /// Fire the initial transition. Only the first call has any effect.
    fn start(&mut self, ctx: &mut ActionContext<'_>) -> TransitionResult;

    /// Deliver a trigger by wire name.
    fn fire(&mut self, trigger: &str, args: &Args, ctx: &mut ActionContext<'_>)
        -> TransitionResult;

    fn as_any(&self) -> &dyn Any;
}

/// A live machine: a definition, its current state and the bound domain object.
pub struct MachineInstance<S: State, T: Trigger, O> {
    id: MachineId,
    definition: Arc<MachineDefinition<S, T, O>>,
    current: S,
    started: bool,
    object: O,
    history: StateHistory<S>,
}

impl<S: State, T: Trigger, O> MachineInstance<S, T, O> {
    /// Bind `object` to a new instance. The initial transition has not fired
    /// yet; registering the instance with a driver fires it.
    pub fn new(
        id: impl Into<MachineId>,
        definition: Arc<MachineDefinition<S, T, O>>,
        object: O,
    ) -> Self {
        let current = definition.initial();
        Self {
            id: id.into(),
            definition,
            current,
            started: false,
            object,
            history: StateHistory::new(),
        }
    }

    pub fn machine_id(&self) -> &MachineId {
        &self.id
    }

    pub fn definition(&self) -> &MachineDefinition<S, T, O> {
        &self.definition
    }

    /// Current state, `None` until the initial transition has fired.
    pub fn current_state(&self) -> Option<S> {
        self.started.then_some(self.current)
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn object(&self) -> &O {
        &self.object
    }

    pub fn history(&self) -> &StateHistory<S> {
        &self.history
    }

    /// Fire the initial transition: initial effect, then entry of the initial state.
    pub fn initialize(&mut self, ctx: &mut ActionContext<'_>) -> TransitionResult {
        if self.started {
            return TransitionResult::Ignored {
                state: self.current.name(),
            };
        }
        let definition = Arc::clone(&self.definition);
        self.started = true;
        if let Some(effect) = &definition.initial_effect {
            effect(&mut self.object, ctx);
        }
        self.current = definition.initial;
        if let Some(entry) = definition.entry(self.current) {
            entry(&mut self.object, ctx);
        }
        TransitionResult::Transitioned {
            from: INITIAL,
            to: self.current.name(),
        }
    }

    /// Deliver a typed trigger.
    ///
    /// For a transition: exit of the current state, the effect (with `args`),
    /// state change, entry of the target. For a state-level handler: the
    /// handler only. Anything queued through `ctx` runs after this returns.
    pub fn fire_trigger(
        &mut self,
        trigger: T,
        args: &Args,
        ctx: &mut ActionContext<'_>,
    ) -> TransitionResult {
        let state = self.current.name();
        if !self.started {
            return TransitionResult::Ignored { state: INITIAL };
        }

        let definition = Arc::clone(&self.definition);
        match definition.resolve(self.current, trigger) {
            Dispatch::Transition(transition) => {
                if !args.conforms_to(trigger.schema()) {
                    return self.reject(trigger, args);
                }
                let from = self.current;
                if let Some(exit) = definition.exit(from) {
                    exit(&mut self.object, ctx);
                }
                if let Some(effect) = &transition.effect {
                    effect(&mut self.object, ctx, args);
                }
                self.current = transition.target;
                self.history.record(StateTransition {
                    from,
                    to: transition.target,
                    trigger: trigger.name(),
                    timestamp: Utc::now(),
                });
                if let Some(entry) = definition.entry(transition.target) {
                    entry(&mut self.object, ctx);
                }
                TransitionResult::Transitioned {
                    from: from.name(),
                    to: transition.target.name(),
                }
            }
            Dispatch::Handler(handler) => {
                if !args.conforms_to(trigger.schema()) {
                    return self.reject(trigger, args);
                }
                handler(&mut self.object, ctx, args);
                TransitionResult::Handled { state }
            }
            Dispatch::Unhandled => TransitionResult::Ignored { state },
        }
    }

    fn reject(&self, trigger: T, args: &Args) -> TransitionResult {
        warn!(
            machine = %self.id,
            trigger = trigger.name(),
            expected = ?trigger.schema(),
            received = ?args,
            "Arguments do not match trigger schema"
        );
        TransitionResult::Rejected {
            state: self.current.name(),
        }
    }
}

impl<S, T, O> Machine for MachineInstance<S, T, O>
where
    S: State,
    T: Trigger,
    O: Send + 'static,
{
    fn id(&self) -> &MachineId {
        &self.id
    }

    fn definition_name(&self) -> &str {
        self.definition.name()
    }

    fn state_name(&self) -> &'static str {
        if self.started {
            self.current.name()
        } else {
            INITIAL
        }
    }

    fn start(&mut self, ctx: &mut ActionContext<'_>) -> TransitionResult {
        self.initialize(ctx)
    }

    fn fire(
        &mut self,
        trigger: &str,
        args: &Args,
        ctx: &mut ActionContext<'_>,
    ) -> TransitionResult {
        match T::from_name(trigger) {
            Some(trigger) => self.fire_trigger(trigger, args, ctx),
            None => {
                debug!(
                    machine = %self.id,
                    trigger,
                    "Trigger not known to this machine"
                );
                TransitionResult::Ignored {
                    state: self.state_name(),
                }
            }
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
