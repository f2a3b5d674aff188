//! Core identifier traits for machine states and triggers.
//!
//! States and triggers are small enumerations resolved once, when a machine
//! definition is built. Events still travel between processes as plain
//! strings, so both traits expose a stable wire name.

use super::args::ArgKind;
use std::fmt::Debug;
use std::hash::Hash;

/// Trait for state machine states.
///
/// All methods are pure. A state is a plain identifier; the data a machine
/// carries lives on its bound domain object, not on the state.
///
/// # Example
///
/// ```rust
/// use chargepark::core::State;
///
/// #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
/// enum Lamp {
///     Off,
///     On,
/// }
///
/// impl State for Lamp {
///     fn name(&self) -> &'static str {
///         match self {
///             Self::Off => "s_off",
///             Self::On => "s_on",
///         }
///     }
/// }
///
/// assert_eq!(Lamp::On.name(), "s_on");
/// ```
pub trait State: Copy + Eq + Hash + Debug + Send + Sync + 'static {
    /// Stable name used in logs and in type-erased driver queries.
    fn name(&self) -> &'static str;
}

/// Trait for the named events a machine reacts to.
///
/// `from_name` is the inverse of `name`; it is how a string trigger coming off
/// the bus is resolved to a typed identifier. `schema` lists the positional
/// argument kinds the trigger carries.
pub trait Trigger: Copy + Eq + Hash + Debug + Send + Sync + 'static {
    /// Wire name of the trigger.
    fn name(&self) -> &'static str;

    /// Resolve a wire name, `None` when this machine has no such trigger.
    fn from_name(name: &str) -> Option<Self>;

    /// Positional argument kinds. Defaults to no arguments.
    fn schema(&self) -> &'static [ArgKind] {
        &[]
    }
}
