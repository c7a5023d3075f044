use std::sync::Arc;

use embedded_hal::i2c::{ErrorType, I2c, Operation, SevenBitAddress};
use parking_lot::Mutex;

/// One physical bus handed out to several expanders.
///
/// Every clone locks the same bus for the duration of a transaction, so
/// devices at different addresses can each own a handle.
pub struct SharedI2c<I2C> {
    bus: Arc<Mutex<I2C>>,
}

impl<I2C> SharedI2c<I2C> {
    pub fn new(bus: I2C) -> Self {
        Self {
            bus: Arc::new(Mutex::new(bus)),
        }
    }

    /// Run `f` with exclusive access to the underlying bus.
    pub fn with_bus<R>(&self, f: impl FnOnce(&mut I2C) -> R) -> R {
        f(&mut self.bus.lock())
    }
}

impl<I2C> Clone for SharedI2c<I2C> {
    fn clone(&self) -> Self {
        Self {
            bus: Arc::clone(&self.bus),
        }
    }
}

impl<I2C: ErrorType> ErrorType for SharedI2c<I2C> {
    type Error = I2C::Error;
}

impl<I2C: I2c> I2c for SharedI2c<I2C> {
    fn transaction(
        &mut self,
        address: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        self.bus.lock().transaction(address, operations)
    }
}
