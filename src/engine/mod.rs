//! The generic state machine runtime.
//!
//! A [`MachineDefinition`] is the static part: declared states, the
//! transition table, and the entry/exit/effect/handler callbacks bound to a
//! domain object type. A [`MachineInstance`] pairs a definition with a current
//! state and one domain object, and executes triggers against it.
//!
//! # Key Concepts
//!
//! - **Transitions**: `(source, trigger) -> target` with an optional effect
//! - **State-level handlers**: trigger callbacks that leave the state unchanged
//! - **Run-to-completion**: actions never fire nested triggers directly; they
//!   queue them through [`ActionContext`] and the driver delivers them after
//!   the current step finishes

mod context;
mod definition;
mod machine;

pub use context::ActionContext;
pub use definition::{Action, Dispatch, Handler, MachineDefinition, StateSpec, Transition};
pub use machine::{Machine, MachineInstance, TransitionResult, INITIAL};
