//! Builder for constructing transitions.

use crate::builder::error::BuildError;
use crate::core::{Args, State, Trigger};
use crate::engine::{ActionContext, Handler, Transition};
use std::sync::Arc;

/// Builder for constructing transitions with a fluent API.
pub struct TransitionBuilder<S: State, T: Trigger, O> {
    from: Option<S>,
    trigger: Option<T>,
    to: Option<S>,
    effect: Option<Handler<O>>,
}

impl<S: State, T: Trigger, O> TransitionBuilder<S, T, O> {
    /// Create a new transition builder.
    pub fn new() -> Self {
        Self {
            from: None,
            trigger: None,
            to: None,
            effect: None,
        }
    }

    /// Set the source state (required).
    pub fn from(mut self, state: S) -> Self {
        self.from = Some(state);
        self
    }

    /// Set the trigger (required).
    pub fn on(mut self, trigger: T) -> Self {
        self.trigger = Some(trigger);
        self
    }

    /// Set the target state (required).
    pub fn to(mut self, state: S) -> Self {
        self.to = Some(state);
        self
    }

    /// Set the effect run between exit and entry (optional).
    pub fn effect<F>(mut self, effect: F) -> Self
    where
        F: Fn(&mut O, &mut ActionContext<'_>, &Args) + Send + Sync + 'static,
    {
        self.effect = Some(Arc::new(effect));
        self
    }

    /// Build the transition.
    pub fn build(self) -> Result<Transition<S, T, O>, BuildError> {
        let source = self.from.ok_or(BuildError::MissingFromState)?;
        let trigger = self.trigger.ok_or(BuildError::MissingTrigger)?;
        let target = self.to.ok_or(BuildError::MissingToState)?;

        Ok(Transition {
            source,
            trigger,
            target,
            effect: self.effect,
        })
    }
}

impl<S: State, T: Trigger, O> Default for TransitionBuilder<S, T, O> {
    fn default() -> Self {
        Self::new()
    }
}
