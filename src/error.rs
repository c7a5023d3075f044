use std::convert::Infallible;

use thiserror::Error;

/// Status codes returned by the driver.
///
/// `E` is the bus error type of the underlying `embedded-hal` I2C
/// implementation. Configuration loading has no bus and uses the default.
#[derive(Debug, Error)]
pub enum ExpanderError<E = Infallible> {
    #[error("Uninitialized: no live device for this record")]
    Uninitialized,
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("Bus error: {0:?}")]
    Bus(E),
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ExpanderError {
    /// Widen a bus-less error into one carrying a bus error type.
    pub fn with_bus<E>(self) -> ExpanderError<E> {
        match self {
            ExpanderError::Uninitialized => ExpanderError::Uninitialized,
            ExpanderError::InvalidParameter(msg) => ExpanderError::InvalidParameter(msg),
            ExpanderError::Config(msg) => ExpanderError::Config(msg),
            ExpanderError::Bus(never) => match never {},
        }
    }
}
