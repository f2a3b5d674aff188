//! Builder for constructing machine definitions.

use crate::builder::error::BuildError;
use crate::builder::state::StateBuilder;
use crate::builder::transition::TransitionBuilder;
use crate::core::{State, Trigger};
use crate::engine::{Action, ActionContext, MachineDefinition, StateSpec, Transition};
use std::collections::HashMap;
use std::sync::Arc;

/// Builder for constructing machine definitions with a fluent API.
pub struct MachineBuilder<S: State, T: Trigger, O> {
    name: String,
    initial: Option<S>,
    initial_effect: Option<Action<O>>,
    states: Vec<(S, StateSpec<T, O>)>,
    transitions: Vec<Transition<S, T, O>>,
}

impl<S: State, T: Trigger, O> MachineBuilder<S, T, O> {
    /// Create a new builder for a definition called `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            initial: None,
            initial_effect: None,
            states: Vec::new(),
            transitions: Vec::new(),
        }
    }

    /// Set the target of the initial transition (required).
    pub fn initial(mut self, state: S) -> Self {
        self.initial = Some(state);
        self
    }

    /// Effect of the initial transition, run before the initial state's entry.
    pub fn on_init<F>(mut self, effect: F) -> Self
    where
        F: Fn(&mut O, &mut ActionContext<'_>) + Send + Sync + 'static,
    {
        self.initial_effect = Some(Arc::new(effect));
        self
    }

    /// Declare a state with its actions.
    pub fn state(mut self, state: S, actions: StateBuilder<T, O>) -> Self {
        self.states.push((state, actions.build()));
        self
    }

    /// Declare a state without actions.
    pub fn plain_state(self, state: S) -> Self {
        self.state(state, StateBuilder::new())
    }

    /// Add a transition using a builder.
    /// Returns an error if the builder fails validation.
    pub fn transition(mut self, builder: TransitionBuilder<S, T, O>) -> Result<Self, BuildError> {
        let transition = builder.build()?;
        self.transitions.push(transition);
        Ok(self)
    }

    /// Add a pre-built transition.
    pub fn add_transition(mut self, transition: Transition<S, T, O>) -> Self {
        self.transitions.push(transition);
        self
    }

    /// Build the definition.
    ///
    /// Fails if the initial state is missing, if any state used by a
    /// transition is undeclared, or if a `(source, trigger)` pair repeats.
    pub fn build(self) -> Result<MachineDefinition<S, T, O>, BuildError> {
        let initial = self.initial.ok_or(BuildError::MissingInitialState)?;

        let mut states = HashMap::with_capacity(self.states.len());
        for (state, spec) in self.states {
            if states.insert(state, spec).is_some() {
                return Err(BuildError::DuplicateState {
                    machine: self.name,
                    state: state.name(),
                });
            }
        }

        let undeclared = |state: S| -> Option<BuildError> {
            (!states.contains_key(&state)).then(|| BuildError::UndeclaredState {
                machine: self.name.clone(),
                state: state.name(),
            })
        };

        if let Some(error) = undeclared(initial) {
            return Err(error);
        }

        let mut transitions = HashMap::with_capacity(self.transitions.len());
        for transition in self.transitions {
            if let Some(error) =
                undeclared(transition.source).or_else(|| undeclared(transition.target))
            {
                return Err(error);
            }
            let key = (transition.source, transition.trigger);
            if transitions.contains_key(&key) {
                return Err(BuildError::DuplicateTransition {
                    machine: self.name.clone(),
                    state: transition.source.name(),
                    trigger: transition.trigger.name(),
                });
            }
            transitions.insert(key, transition);
        }

        Ok(MachineDefinition {
            name: self.name,
            initial,
            initial_effect: self.initial_effect,
            states,
            transitions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::transition;
    use crate::{state_enum, trigger_enum};

    state_enum! {
        enum TestState {
            Available => "s_available",
            Occupied => "s_occupied",
            Finished => "s_finished",
        }
    }

    trigger_enum! {
        enum TestTrigger {
            Plug => "plug",
            Unplug => "unplug",
        }
    }

    fn base() -> MachineBuilder<TestState, TestTrigger, ()> {
        MachineBuilder::new("test")
            .initial(TestState::Available)
            .plain_state(TestState::Available)
            .plain_state(TestState::Occupied)
    }

    #[test]
    fn builder_requires_initial_state() {
        let result = MachineBuilder::<TestState, TestTrigger, ()>::new("test")
            .plain_state(TestState::Available)
            .build();

        assert!(matches!(result, Err(BuildError::MissingInitialState)));
    }

    #[test]
    fn initial_state_must_be_declared() {
        let result = MachineBuilder::<TestState, TestTrigger, ()>::new("test")
            .initial(TestState::Finished)
            .plain_state(TestState::Available)
            .build();

        assert_eq!(
            result.err(),
            Some(BuildError::UndeclaredState {
                machine: "test".into(),
                state: "s_finished"
            })
        );
    }

    #[test]
    fn transition_targets_must_be_declared() {
        let result = base()
            .transition(transition(
                TestState::Occupied,
                TestTrigger::Unplug,
                TestState::Finished,
            ))
            .and_then(|b| b.build());

        assert!(matches!(
            result,
            Err(BuildError::UndeclaredState {
                state: "s_finished",
                ..
            })
        ));
    }

    #[test]
    fn duplicate_source_trigger_pair_is_rejected() {
        let result = base()
            .transition(transition(TestState::Available, TestTrigger::Plug, TestState::Occupied))
            .and_then(|b| {
                b.transition(transition(
                    TestState::Available,
                    TestTrigger::Plug,
                    TestState::Available,
                ))
            })
            .and_then(|b| b.build());

        assert!(matches!(
            result,
            Err(BuildError::DuplicateTransition {
                state: "s_available",
                trigger: "plug",
                ..
            })
        ));
    }

    #[test]
    fn duplicate_state_is_rejected() {
        let result = base().plain_state(TestState::Available).build();

        assert!(matches!(result, Err(BuildError::DuplicateState { .. })));
    }

    #[test]
    fn fluent_api_builds_definition() {
        let definition = base()
            .transition(transition(TestState::Available, TestTrigger::Plug, TestState::Occupied))
            .and_then(|b| {
                b.transition(transition(
                    TestState::Occupied,
                    TestTrigger::Unplug,
                    TestState::Available,
                ))
            })
            .and_then(|b| b.build())
            .unwrap();

        assert_eq!(definition.name(), "test");
        assert_eq!(definition.initial(), TestState::Available);
        assert!(definition.is_declared(TestState::Occupied));
        assert!(!definition.is_declared(TestState::Finished));
        assert_eq!(
            definition
                .transition(TestState::Available, TestTrigger::Plug)
                .map(|t| t.target),
            Some(TestState::Occupied)
        );
        assert_eq!(definition.transitions().count(), 2);
    }
}
