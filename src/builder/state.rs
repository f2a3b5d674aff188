//! Builder for per-state actions.

use crate::core::{Args, Trigger};
use crate::engine::{Action, ActionContext, Handler, StateSpec};
use std::collections::HashMap;
use std::sync::Arc;

/// Collects the entry/exit actions and state-level handlers of one state.
///
/// Registering a second handler for the same trigger replaces the first.
pub struct StateBuilder<T: Trigger, O> {
    entry: Option<Action<O>>,
    exit: Option<Action<O>>,
    handlers: HashMap<T, Handler<O>>,
}

impl<T: Trigger, O> StateBuilder<T, O> {
    pub fn new() -> Self {
        Self {
            entry: None,
            exit: None,
            handlers: HashMap::new(),
        }
    }

    /// Action run every time the state is entered.
    pub fn entry<F>(mut self, action: F) -> Self
    where
        F: Fn(&mut O, &mut ActionContext<'_>) + Send + Sync + 'static,
    {
        self.entry = Some(Arc::new(action));
        self
    }

    /// Action run every time the state is left.
    pub fn exit<F>(mut self, action: F) -> Self
    where
        F: Fn(&mut O, &mut ActionContext<'_>) + Send + Sync + 'static,
    {
        self.exit = Some(Arc::new(action));
        self
    }

    /// State-level handler: runs on `trigger` without leaving the state.
    pub fn on<F>(mut self, trigger: T, handler: F) -> Self
    where
        F: Fn(&mut O, &mut ActionContext<'_>, &Args) + Send + Sync + 'static,
    {
        self.handlers.insert(trigger, Arc::new(handler));
        self
    }

    pub(crate) fn build(self) -> StateSpec<T, O> {
        StateSpec {
            entry: self.entry,
            exit: self.exit,
            handlers: self.handlers,
        }
    }
}

impl<T: Trigger, O> Default for StateBuilder<T, O> {
    fn default() -> Self {
        Self::new()
    }
}
