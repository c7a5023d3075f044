//! Interrupt fan-out across every registered expander.

use embedded_hal::i2c::I2c;
use log::{debug, warn};
use rustc_hash::FxHashMap;

use crate::config::{AppConfig, DeviceConfig, DeviceRole, EdgeTrigger};
use crate::encoder::RotaryEncoder;
use crate::error::ExpanderError;
use crate::expander::{PinCallback, PortExpander};
use crate::registry::{RecordId, Registry};

/// A registered device, tagged by how its INT events are handled.
pub enum Device<I2C> {
    Plain(PortExpander<I2C>),
    RotaryEncoder(RotaryEncoder<I2C>),
}

impl<I2C> Device<I2C> {
    pub fn expander(&self) -> &PortExpander<I2C> {
        match self {
            Device::Plain(expander) => expander,
            Device::RotaryEncoder(encoder) => encoder.expander(),
        }
    }

    /// The chip behind either kind of record, e.g. to drive spare pins
    /// of an encoder board.
    pub fn expander_mut(&mut self) -> &mut PortExpander<I2C> {
        match self {
            Device::Plain(expander) => expander,
            Device::RotaryEncoder(encoder) => encoder.expander_mut(),
        }
    }
}

/// Lock flag plus a deferred-work flag.
///
/// While locked, interrupts only mark work as pending. Any number of them
/// collapse into a single pass when the lock is released.
#[derive(Debug, Default, Clone, Copy)]
pub struct IrqGate {
    locked: bool,
    pending: bool,
}

impl IrqGate {
    pub fn lock(&mut self) {
        self.locked = true;
    }

    pub fn unlock(&mut self) -> bool {
        self.locked = false;
        self.pending
    }

    /// Returns whether the interrupt may be serviced now.
    pub fn request(&mut self) -> bool {
        self.pending = true;
        if self.locked {
            return false;
        }
        self.pending = false;
        true
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }
}

/// Registry of devices sharing one INT line, and the gate in front of it.
///
/// Construct one per INT source and feed it from the interrupt handler (or a
/// polling loop) through [`ext_irq_handle`](Self::ext_irq_handle), and from a
/// periodic timer through [`ms_tick`](Self::ms_tick).
pub struct Dispatcher<I2C> {
    registry: Registry<Device<I2C>>,
    gate: IrqGate,
}

impl<I2C> Default for Dispatcher<I2C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I2C> Dispatcher<I2C> {
    pub const fn new() -> Self {
        Self {
            registry: Registry::new(),
            gate: IrqGate {
                locked: false,
                pending: false,
            },
        }
    }

    pub fn register(&mut self, expander: PortExpander<I2C>) -> RecordId {
        let id = self.registry.add(Device::Plain(expander));
        debug!("registered expander as {id:?}");
        id
    }

    pub fn register_encoder(&mut self, encoder: RotaryEncoder<I2C>) -> RecordId {
        let id = self.registry.add(Device::RotaryEncoder(encoder));
        debug!("registered rotary encoder as {id:?}");
        id
    }

    pub fn deregister(&mut self, id: RecordId) -> Option<Device<I2C>> {
        let device = self.registry.remove(id);
        if device.is_some() {
            debug!("deregistered {id:?}");
        }
        device
    }

    pub fn registry(&self) -> &Registry<Device<I2C>> {
        &self.registry
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    pub fn device(&self, id: RecordId) -> Option<&Device<I2C>> {
        self.registry.get(id)
    }

    pub fn device_mut(&mut self, id: RecordId) -> Option<&mut Device<I2C>> {
        self.registry.get_mut(id)
    }

    pub fn expander_mut(&mut self, id: RecordId) -> Option<&mut PortExpander<I2C>> {
        match self.registry.get_mut(id)? {
            Device::Plain(expander) => Some(expander),
            Device::RotaryEncoder(_) => None,
        }
    }

    pub fn encoder(&self, id: RecordId) -> Option<&RotaryEncoder<I2C>> {
        match self.registry.get(id)? {
            Device::RotaryEncoder(encoder) => Some(encoder),
            Device::Plain(_) => None,
        }
    }

    pub fn encoder_mut(&mut self, id: RecordId) -> Option<&mut RotaryEncoder<I2C>> {
        match self.registry.get_mut(id)? {
            Device::RotaryEncoder(encoder) => Some(encoder),
            Device::Plain(_) => None,
        }
    }

    pub fn lock_irq(&mut self) {
        self.gate.lock();
    }

    pub fn is_locked(&self) -> bool {
        self.gate.is_locked()
    }

    pub fn is_pending(&self) -> bool {
        self.gate.is_pending()
    }

    /// Age the button-held time of every registered encoder by one tick.
    pub fn ms_tick(&mut self) {
        self.registry.for_each_mut(|_, device| {
            if let Device::RotaryEncoder(encoder) = device {
                encoder.tick();
            }
        });
    }
}

impl<I2C> Dispatcher<I2C>
where
    I2C: I2c,
{
    /// Entry point for the shared INT line.
    ///
    /// Runs one pass over every record in registration order, unless the
    /// gate is locked, in which case the pass is deferred to
    /// [`unlock_irq`](Self::unlock_irq).
    pub fn ext_irq_handle(&mut self) {
        if self.registry.is_empty() {
            return;
        }
        if self.gate.request() {
            self.dispatch_pass();
        }
    }

    /// Release the gate and run the single coalesced pass, if one is owed.
    pub fn unlock_irq(&mut self) {
        if self.gate.unlock() {
            debug!("replaying deferred interrupt");
            self.ext_irq_handle();
        }
    }

    /// Run `f` with interrupt processing deferred, then replay once.
    ///
    /// Nested sections leave the gate to the outermost one.
    pub fn with_irq_locked<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let was_locked = self.gate.is_locked();
        self.lock_irq();
        let result = f(self);
        if !was_locked {
            self.unlock_irq();
        }
        result
    }

    fn dispatch_pass(&mut self) {
        self.registry.for_each_mut(|id, device| {
            let result = match device {
                Device::Plain(expander) => expander.handle_irq(),
                Device::RotaryEncoder(encoder) => encoder.handle_irq(),
            };
            if let Err(e) = result {
                warn!("interrupt handling for {id:?} failed: {e}");
            }
        });
    }

    pub fn register_callback(
        &mut self,
        id: RecordId,
        pin: u8,
        trigger: EdgeTrigger,
        callback: PinCallback<I2C>,
    ) -> Result<(), ExpanderError<I2C::Error>> {
        let Some(expander) = self.expander_mut(id) else {
            return Err(ExpanderError::Uninitialized);
        };
        expander.register_callback(pin, trigger, callback)
    }

    pub fn unregister_callback(
        &mut self,
        id: RecordId,
        pin: u8,
    ) -> Result<(), ExpanderError<I2C::Error>> {
        let Some(expander) = self.expander_mut(id) else {
            return Err(ExpanderError::Uninitialized);
        };
        expander.unregister_callback(pin)
    }

    /// Build and register every device of `config` in file order.
    ///
    /// `bus_for` supplies the bus handle for each device; hand out clones of
    /// a [`SharedI2c`](crate::bus::SharedI2c) when they sit on one bus.
    pub fn from_config(
        config: &AppConfig,
        mut bus_for: impl FnMut(&DeviceConfig) -> I2C,
    ) -> Result<(Self, FxHashMap<String, RecordId>), ExpanderError<I2C::Error>> {
        if let Err(e) = config.validate() {
            return Err(e.with_bus());
        }

        let mut dispatcher = Self::new();
        let mut ids = FxHashMap::default();
        for device in &config.devices {
            let mut expander = PortExpander::new(bus_for(device), device.address)?;
            if let Some(value) = device.initial_output {
                expander.write(value)?;
                expander.read()?;
            }
            let id = match device.role {
                DeviceRole::Plain => dispatcher.register(expander),
                DeviceRole::RotaryEncoder(pins) => {
                    dispatcher.register_encoder(RotaryEncoder::new(expander, pins)?)
                }
            };
            debug!(
                "device {:?} at {:#04x} registered as {id:?}",
                device.name, device.address
            );
            ids.insert(device.name.clone(), id);
        }
        Ok((dispatcher, ids))
    }
}
