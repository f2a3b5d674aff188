//! Events and machine identifiers.

use crate::core::Args;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use uuid::Uuid;

/// Flat identifier of a machine registered with a driver.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MachineId(String);

impl MachineId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MachineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MachineId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for MachineId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for MachineId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Where an event came from.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// Queued by an action running on the same driver
    Local,
    /// Submitted from outside: bus adapters, timers, operators
    Remote,
}

/// One trigger addressed to one machine. Consumed exactly once by a driver.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub trigger: String,
    pub target: MachineId,
    pub args: Args,
    pub origin: Origin,
}

impl Event {
    pub fn new(
        trigger: impl Into<String>,
        target: impl Into<MachineId>,
        args: Args,
        origin: Origin,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            trigger: trigger.into(),
            target: target.into(),
            args,
            origin,
        }
    }

    pub fn local(trigger: impl Into<String>, target: impl Into<MachineId>, args: Args) -> Self {
        Self::new(trigger, target, args, Origin::Local)
    }

    pub fn remote(trigger: impl Into<String>, target: impl Into<MachineId>, args: Args) -> Self {
        Self::new(trigger, target, args, Origin::Remote)
    }
}
