//! Driver for the PCF8574 8-bit I2C port expander.
//!
//! Several chips can share one INT line. A [`Dispatcher`] holds every
//! registered chip and, on each interrupt, reads them in registration order
//! and fires the per-pin callbacks whose [`EdgeTrigger`] matches the change.
//! Chips wired to a rotary encoder are registered as [`RotaryEncoder`]s and
//! decoded instead of dispatched.

pub mod bus;
pub mod config;
pub mod dispatch;
pub mod encoder;
pub mod error;
pub mod expander;
pub mod registry;

pub use bus::{MockBus, SharedI2c};
pub use config::{AppConfig, DeviceConfig, DeviceRole, EdgeTrigger, EncoderPins, PIN_COUNT};
pub use dispatch::{Device, Dispatcher, IrqGate};
pub use encoder::RotaryEncoder;
pub use error::ExpanderError;
pub use expander::{PinCallback, PortExpander};
pub use registry::{RecordId, Registry};
