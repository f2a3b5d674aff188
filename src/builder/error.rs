//! Build errors for machine definitions and transitions.

use thiserror::Error;

/// Errors that can occur when building machine definitions and transitions.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("Initial state not specified. Call .initial(state) before .build()")]
    MissingInitialState,

    #[error("Transition source state not specified. Call .from(state)")]
    MissingFromState,

    #[error("Transition trigger not specified. Call .on(trigger)")]
    MissingTrigger,

    #[error("Transition target state not specified. Call .to(state)")]
    MissingToState,

    #[error("State '{state}' is used by machine '{machine}' but never declared with .state()")]
    UndeclaredState {
        machine: String,
        state: &'static str,
    },

    #[error("State '{state}' is declared twice in machine '{machine}'")]
    DuplicateState {
        machine: String,
        state: &'static str,
    },

    #[error("Machine '{machine}' has more than one transition for ('{state}', '{trigger}')")]
    DuplicateTransition {
        machine: String,
        state: &'static str,
        trigger: &'static str,
    },
}
