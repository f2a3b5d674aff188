//! Core state machine types.
//!
//! This module contains the vocabulary shared by every machine:
//! - State and trigger identifiers via the `State` and `Trigger` traits
//! - Typed positional event arguments
//! - Bounded transition history

mod args;
mod history;
mod state;

pub use args::{Arg, ArgKind, Args};
pub use history::{StateHistory, StateTransition, DEFAULT_HISTORY_CAPACITY};
pub use state::{State, Trigger};
