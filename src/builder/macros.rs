//! Macros for declaring state and trigger enumerations.

/// Generate a `State` implementation for a fieldless enum, binding each
/// variant to its wire name.
///
/// # Example
///
/// ```
/// use chargepark::core::State;
/// use chargepark::state_enum;
///
/// state_enum! {
///     pub enum DoorState {
///         Closed => "s_closed",
///         Open => "s_open",
///     }
/// }
///
/// assert_eq!(DoorState::Open.name(), "s_open");
/// ```
#[macro_export]
macro_rules! state_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident => $wire:literal
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant
            ),*
        }

        impl $crate::core::State for $name {
            fn name(&self) -> &'static str {
                match self {
                    $(Self::$variant => $wire),*
                }
            }
        }
    };
}

/// Generate a `Trigger` implementation for a fieldless enum.
///
/// Each variant is bound to its wire name and may list the kinds of its
/// positional arguments in parentheses.
///
/// # Example
///
/// ```
/// use chargepark::core::{ArgKind, Trigger};
/// use chargepark::trigger_enum;
///
/// trigger_enum! {
///     pub enum DoorTrigger {
///         Open => "open",
///         Lock => "lock" (Int, Text),
///     }
/// }
///
/// assert_eq!(DoorTrigger::from_name("lock"), Some(DoorTrigger::Lock));
/// assert_eq!(DoorTrigger::Lock.schema(), &[ArgKind::Int, ArgKind::Text]);
/// assert!(DoorTrigger::Open.schema().is_empty());
/// ```
#[macro_export]
macro_rules! trigger_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident => $wire:literal $( ( $($kind:ident),* $(,)? ) )?
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant
            ),*
        }

        impl $crate::core::Trigger for $name {
            fn name(&self) -> &'static str {
                match self {
                    $(Self::$variant => $wire),*
                }
            }

            fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($wire => Some(Self::$variant),)*
                    _ => None,
                }
            }

            fn schema(&self) -> &'static [$crate::core::ArgKind] {
                match self {
                    $(Self::$variant => &[ $( $( $crate::core::ArgKind::$kind ),* )? ]),*
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::core::{ArgKind, State, Trigger};

    state_enum! {
        enum TestState {
            Idle => "s_idle",
            Running => "s_running",
        }
    }

    trigger_enum! {
        enum TestTrigger {
            Go => "go",
            Report => "report" (Int, Int),
            Label => "label" (Text),
        }
    }

    #[test]
    fn state_enum_macro_generates_trait() {
        assert_eq!(TestState::Idle.name(), "s_idle");
        assert_eq!(TestState::Running.name(), "s_running");
    }

    #[test]
    fn trigger_enum_macro_generates_names_and_lookup() {
        assert_eq!(TestTrigger::Go.name(), "go");
        assert_eq!(TestTrigger::from_name("report"), Some(TestTrigger::Report));
        assert_eq!(TestTrigger::from_name("Report"), None);
    }

    #[test]
    fn trigger_enum_macro_generates_schema() {
        assert!(TestTrigger::Go.schema().is_empty());
        assert_eq!(TestTrigger::Report.schema(), &[ArgKind::Int, ArgKind::Int]);
        assert_eq!(TestTrigger::Label.schema(), &[ArgKind::Text]);
    }

    #[test]
    fn macros_support_visibility() {
        state_enum! {
            pub enum PublicState {
                A => "a",
            }
        }

        let _state = PublicState::A;
    }
}
