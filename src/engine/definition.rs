//! Static machine definitions: states, transitions and bound actions.

use crate::core::{Args, State, Trigger};
use crate::engine::context::ActionContext;
use std::collections::HashMap;
use std::sync::Arc;

/// Entry, exit and initial actions. They receive no event arguments.
pub type Action<O> = Arc<dyn Fn(&mut O, &mut ActionContext<'_>) + Send + Sync>;

/// Transition effects and state-level handlers, given the event's arguments.
pub type Handler<O> = Arc<dyn Fn(&mut O, &mut ActionContext<'_>, &Args) + Send + Sync>;

/// A `(source, trigger) -> target` edge with an optional effect.
pub struct Transition<S: State, T: Trigger, O> {
    pub source: S,
    pub trigger: T,
    pub target: S,
    pub effect: Option<Handler<O>>,
}

impl<S: State, T: Trigger, O> Transition<S, T, O> {
    /// Check if this transition fires for `trigger` in `current` (pure)
    pub fn matches(&self, current: S, trigger: T) -> bool {
        self.source == current && self.trigger == trigger
    }

    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}

impl<S: State, T: Trigger, O> Clone for Transition<S, T, O> {
    fn clone(&self) -> Self {
        Self {
            source: self.source,
            trigger: self.trigger,
            target: self.target,
            effect: self.effect.clone(),
        }
    }
}

/// Actions attached to a single declared state.
pub struct StateSpec<T: Trigger, O> {
    pub(crate) entry: Option<Action<O>>,
    pub(crate) exit: Option<Action<O>>,
    pub(crate) handlers: HashMap<T, Handler<O>>,
}

impl<T: Trigger, O> StateSpec<T, O> {
    pub fn has_entry(&self) -> bool {
        self.entry.is_some()
    }

    pub fn has_exit(&self) -> bool {
        self.exit.is_some()
    }

    pub fn handles(&self, trigger: T) -> bool {
        self.handlers.contains_key(&trigger)
    }
}

/// What a `(state, trigger)` pair resolves to.
pub enum Dispatch<'a, S: State, T: Trigger, O> {
    Transition(&'a Transition<S, T, O>),
    Handler(&'a Handler<O>),
    Unhandled,
}

/// Immutable description of a machine, shared by every instance built from it.
///
/// Construct with [`crate::builder::MachineBuilder`], which validates that
/// every referenced state is declared and that each `(source, trigger)` pair
/// has at most one transition.
pub struct MachineDefinition<S: State, T: Trigger, O> {
    pub(crate) name: String,
    pub(crate) initial: S,
    pub(crate) initial_effect: Option<Action<O>>,
    pub(crate) states: HashMap<S, StateSpec<T, O>>,
    pub(crate) transitions: HashMap<(S, T), Transition<S, T, O>>,
}

impl<S: State, T: Trigger, O> MachineDefinition<S, T, O> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn initial(&self) -> S {
        self.initial
    }

    pub fn is_declared(&self, state: S) -> bool {
        self.states.contains_key(&state)
    }

    pub fn state(&self, state: S) -> Option<&StateSpec<T, O>> {
        self.states.get(&state)
    }

    pub fn transition(&self, source: S, trigger: T) -> Option<&Transition<S, T, O>> {
        self.transitions.get(&(source, trigger))
    }

    pub fn transitions(&self) -> impl Iterator<Item = &Transition<S, T, O>> {
        self.transitions.values()
    }

    /// Resolve a trigger in `state`. Transitions take precedence over
    /// state-level handlers bound to the same trigger.
    pub fn resolve(&self, state: S, trigger: T) -> Dispatch<'_, S, T, O> {
        if let Some(transition) = self.transitions.get(&(state, trigger)) {
            return Dispatch::Transition(transition);
        }
        match self
            .states
            .get(&state)
            .and_then(|spec| spec.handlers.get(&trigger))
        {
            Some(handler) => Dispatch::Handler(handler),
            None => Dispatch::Unhandled,
        }
    }

    pub(crate) fn entry(&self, state: S) -> Option<&Action<O>> {
        self.states.get(&state).and_then(|spec| spec.entry.as_ref())
    }

    pub(crate) fn exit(&self, state: S) -> Option<&Action<O>> {
        self.states.get(&state).and_then(|spec| spec.exit.as_ref())
    }
}
