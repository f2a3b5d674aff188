//! Crate-level error type.

use crate::builder::BuildError;
use crate::bus::{BusError, ProtocolError};
use crate::config::ConfigError;
use crate::driver::DriverError;
use crate::notify::DashboardError;
use thiserror::Error;

/// Any error surfaced while assembling or running a process.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Bus(#[from] BusError),

    #[error(transparent)]
    Driver(#[from] DriverError),

    #[error(transparent)]
    Dashboard(#[from] DashboardError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_errors_convert_and_keep_their_message() {
        let error: Error = DriverError::Closed("park".to_string()).into();
        assert!(matches!(error, Error::Driver(_)));
        assert_eq!(error.to_string(), "driver 'park' has been shut down");

        let error: Error = BuildError::MissingInitialState.into();
        assert!(matches!(error, Error::Build(_)));
    }
}
