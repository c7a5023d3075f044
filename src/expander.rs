//! Device handle for a single PCF8574 and its per-pin edge dispatcher.

use std::sync::Arc;

use embedded_hal::i2c::I2c;
use log::trace;

use crate::config::{EdgeTrigger, PIN_COUNT, check_address, check_pin};
use crate::error::ExpanderError;

/// Invoked synchronously from [`PortExpander::handle_irq`] with the handle
/// and the pin index that changed.
///
/// The callback may register or unregister callbacks on the handle it is
/// given. It must not trigger another dispatch pass on the same handle.
pub type PinCallback<I2C> = Arc<dyn Fn(&mut PortExpander<I2C>, u8) + Send + Sync>;

struct PinSlot<I2C> {
    trigger: EdgeTrigger,
    callback: Option<PinCallback<I2C>>,
}

impl<I2C> Default for PinSlot<I2C> {
    fn default() -> Self {
        Self {
            trigger: EdgeTrigger::None,
            callback: None,
        }
    }
}

/// One PCF8574 on an I2C bus.
///
/// Holds the last port snapshot and a callback slot per pin. The snapshot
/// is refreshed on every [`read`](Self::read) and every dispatch pass, so
/// edges are always computed against the most recent value seen.
pub struct PortExpander<I2C> {
    i2c: I2C,
    address: u8,
    last_value: u8,
    callbacks: [PinSlot<I2C>; PIN_COUNT as usize],
}

impl<I2C> PortExpander<I2C>
where
    I2C: I2c,
{
    /// Take the bus and seed the snapshot with one read.
    pub fn new(i2c: I2C, address: u8) -> Result<Self, ExpanderError<I2C::Error>> {
        if let Err(e) = check_address(address) {
            return Err(e.with_bus());
        }
        let mut expander = Self {
            i2c,
            address,
            last_value: 0,
            callbacks: Default::default(),
        };
        expander.read()?;
        trace!(
            "pcf8574 {:#04x} initialised, port={:#04x}",
            address, expander.last_value
        );
        Ok(expander)
    }

    pub fn read(&mut self) -> Result<u8, ExpanderError<I2C::Error>> {
        let value = self.sample()?;
        self.last_value = value;
        Ok(value)
    }

    /// Write the output latch. Lines written high act as inputs.
    pub fn write(&mut self, value: u8) -> Result<(), ExpanderError<I2C::Error>> {
        self.i2c
            .write(self.address, &[value])
            .map_err(ExpanderError::Bus)
    }

    /// Read the port without touching the snapshot.
    pub(crate) fn sample(&mut self) -> Result<u8, ExpanderError<I2C::Error>> {
        let mut buf = [0u8; 1];
        self.i2c
            .read(self.address, &mut buf)
            .map_err(ExpanderError::Bus)?;
        Ok(buf[0])
    }

    pub fn register_callback(
        &mut self,
        pin: u8,
        trigger: EdgeTrigger,
        callback: PinCallback<I2C>,
    ) -> Result<(), ExpanderError<I2C::Error>> {
        let index = Self::slot_index(pin)?;
        self.callbacks[index] = PinSlot {
            trigger,
            callback: Some(callback),
        };
        Ok(())
    }

    pub fn unregister_callback(&mut self, pin: u8) -> Result<(), ExpanderError<I2C::Error>> {
        let index = Self::slot_index(pin)?;
        self.callbacks[index] = PinSlot::default();
        Ok(())
    }

    fn slot_index(pin: u8) -> Result<usize, ExpanderError<I2C::Error>> {
        check_pin(pin)
            .map(|()| pin as usize)
            .map_err(ExpanderError::with_bus)
    }

    /// Handle the INT line for this device alone.
    ///
    /// Reads the port, diffs it against the snapshot and, for each changed
    /// pin in index order, invokes the callback whose trigger matches the
    /// direction of the change. On a bus error nothing is dispatched and the
    /// snapshot is kept.
    pub fn handle_irq(&mut self) -> Result<(), ExpanderError<I2C::Error>> {
        let current = self.sample()?;
        let changed = self.last_value ^ current;
        self.last_value = current;

        for pin in 0..PIN_COUNT {
            let mask = 1u8 << pin;
            if changed & mask == 0 {
                continue;
            }
            let slot = &self.callbacks[pin as usize];
            let trigger = slot.trigger;
            let Some(callback) = slot.callback.clone() else {
                continue;
            };
            if trigger.fires(current & mask != 0) {
                trace!(
                    "pcf8574 {:#04x} pin {pin} {:?} edge, port={current:#04x}",
                    self.address, trigger
                );
                callback(self, pin);
            }
        }
        Ok(())
    }
}

impl<I2C> PortExpander<I2C> {
    pub fn clear_callbacks(&mut self) {
        self.callbacks = Default::default();
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    /// Port value as of the last read or dispatch pass.
    pub fn last_value(&self) -> u8 {
        self.last_value
    }

    /// Level of `pin` in the snapshot. Out-of-range pins read low.
    pub fn is_high(&self, pin: u8) -> bool {
        pin < PIN_COUNT && self.last_value & (1 << pin) != 0
    }

    pub fn trigger(&self, pin: u8) -> Option<EdgeTrigger> {
        self.callbacks.get(pin as usize).map(|slot| slot.trigger)
    }

    pub fn has_callback(&self, pin: u8) -> bool {
        self.callbacks
            .get(pin as usize)
            .is_some_and(|slot| slot.callback.is_some())
    }

    /// Give the bus back. Registered callbacks are dropped.
    pub fn release(self) -> I2C {
        self.i2c
    }
}
