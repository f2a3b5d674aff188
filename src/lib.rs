//! Chargepark: event-driven state machines for an EV charging installation
//!
//! A car, a charging point, a fleet monitor and a status light are each a
//! finite-state machine. They coordinate only through named events: locally
//! through their process's [`Driver`], across processes through a
//! publish/subscribe [`bus`].
//!
//! # Core Concepts
//!
//! - **Definitions**: states and transitions declared once with typed
//!   identifiers (`state_enum!`, `trigger_enum!`, [`builder::MachineBuilder`])
//! - **Run-to-completion**: a driver processes one event at a time, and
//!   events raised by actions wait until the raising transition has finished
//! - **Timers**: named per-machine timers whose expiry is just another event
//! - **Typed arguments**: payloads are validated against each trigger's schema
//!
//! # Example
//!
//! ```rust
//! use chargepark::builder::{transition, MachineBuilder, StateBuilder};
//! use chargepark::core::Args;
//! use chargepark::engine::MachineInstance;
//! use chargepark::{state_enum, trigger_enum, Driver};
//! use std::sync::Arc;
//!
//! state_enum! {
//!     enum Plug {
//!         Free => "s_free",
//!         Busy => "s_busy",
//!     }
//! }
//!
//! trigger_enum! {
//!     enum PlugEvent {
//!         Connect => "connect",
//!         Disconnect => "disconnect",
//!     }
//! }
//!
//! #[derive(Default)]
//! struct Counter {
//!     sessions: u32,
//! }
//!
//! let definition = MachineBuilder::new("plug")
//!     .initial(Plug::Free)
//!     .plain_state(Plug::Free)
//!     .state(
//!         Plug::Busy,
//!         StateBuilder::new().entry(|c: &mut Counter, _ctx| c.sessions += 1),
//!     )
//!     .transition(transition(Plug::Free, PlugEvent::Connect, Plug::Busy))
//!     .and_then(|b| b.transition(transition(Plug::Busy, PlugEvent::Disconnect, Plug::Free)))
//!     .and_then(|b| b.build())
//!     .unwrap();
//!
//! let driver = Driver::with_runtime("example", None);
//! driver
//!     .register(MachineInstance::new("plug", Arc::new(definition), Counter::default()))
//!     .unwrap();
//!
//! driver.send("connect", "plug", Args::none());
//! driver.send("connect", "plug", Args::none()); // ignored in s_busy
//!
//! assert_eq!(driver.state_of("plug"), Some("s_busy"));
//! assert_eq!(driver.stats().ignored, 1);
//! ```

pub mod builder;
pub mod bus;
pub mod config;
pub mod core;
pub mod domain;
pub mod driver;
pub mod engine;
pub mod error;
pub mod logging;
pub mod notify;
pub mod park;
pub mod timer;
pub mod web;

// Re-export commonly used types
pub use crate::core::{Arg, ArgKind, Args, State, StateHistory, StateTransition, Trigger};
pub use builder::{BuildError, MachineBuilder, StateBuilder};
pub use driver::{Driver, DriverError, DriverStats, Event, MachineId, Origin};
pub use engine::{ActionContext, Machine, MachineDefinition, MachineInstance, TransitionResult};
pub use error::{Error, Result};
pub use park::{CarStation, ChargePark};
