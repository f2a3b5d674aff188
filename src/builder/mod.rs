//! Builder API for ergonomic machine definition.
//!
//! This module provides fluent builders and macros that resolve trigger and
//! state identifiers to typed callbacks once, at definition time.

pub mod error;
pub mod machine;
pub mod macros;
pub mod state;
pub mod transition;

pub use error::BuildError;
pub use machine::MachineBuilder;
pub use state::StateBuilder;
pub use transition::TransitionBuilder;

use crate::core::{State, Trigger};

/// Start a transition builder for `from --trigger--> to`. Add an effect with
/// [`TransitionBuilder::effect`].
///
/// # Example
///
/// ```
/// use chargepark::builder::{transition, MachineBuilder};
/// use chargepark::{state_enum, trigger_enum};
///
/// state_enum! {
///     enum Light {
///         Off => "s_off",
///         On => "s_on",
///     }
/// }
///
/// trigger_enum! {
///     enum Switch {
///         Flip => "flip",
///     }
/// }
///
/// let definition = MachineBuilder::<Light, Switch, ()>::new("light")
///     .initial(Light::Off)
///     .plain_state(Light::Off)
///     .plain_state(Light::On)
///     .transition(transition(Light::Off, Switch::Flip, Light::On))
///     .and_then(|b| b.transition(transition(Light::On, Switch::Flip, Light::Off)))
///     .and_then(|b| b.build())
///     .unwrap();
///
/// assert_eq!(definition.transitions().count(), 2);
/// ```
pub fn transition<S, T, O>(from: S, trigger: T, to: S) -> TransitionBuilder<S, T, O>
where
    S: State,
    T: Trigger,
{
    TransitionBuilder::new().from(from).on(trigger).to(to)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{state_enum, trigger_enum};

    state_enum! {
        enum TestState {
            Standby => "s_standby",
        }
    }

    trigger_enum! {
        enum TestTrigger {
            Connect => "connect",
        }
    }

    #[test]
    fn transition_helper_sets_all_fields() {
        let built = transition::<TestState, TestTrigger, ()>(
            TestState::Standby,
            TestTrigger::Connect,
            TestState::Standby,
        )
        .build()
        .unwrap();

        assert!(built.matches(TestState::Standby, TestTrigger::Connect));
        assert!(built.is_self_loop());
        assert!(built.effect.is_none());
    }
}
