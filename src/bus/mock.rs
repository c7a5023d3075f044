use std::sync::Arc;

use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation, SevenBitAddress};
use log::trace;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

/// Simulated I2C bus with any number of PCF8574 chips on it.
///
/// Each chip has an output latch (0xFF at power-on) and external pin
/// levels. A read returns `latch & levels`: a line written low always reads
/// low, a line written high follows whatever drives it. Addresses with no
/// chip answer with a NACK. Clones share the same simulated hardware, so a
/// test can keep one clone to drive pins while the driver owns another.
#[derive(Clone, Default)]
pub struct MockBus {
    chips: Arc<Mutex<FxHashMap<u8, MockChip>>>,
}

#[derive(Clone)]
struct MockChip {
    latch: u8,
    levels: u8,
    reads: usize,
    writes: Vec<u8>,
    offline: bool,
}

impl Default for MockChip {
    fn default() -> Self {
        Self {
            latch: 0xFF,
            levels: 0xFF,
            reads: 0,
            writes: Vec::new(),
            offline: false,
        }
    }
}

impl MockBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chip(self, address: u8) -> Self {
        self.add_chip(address);
        self
    }

    pub fn add_chip(&self, address: u8) {
        self.chips.lock().entry(address).or_default();
    }

    pub fn set_levels(&self, address: u8, levels: u8) {
        self.chips.lock().entry(address).or_default().levels = levels;
    }

    /// Drive one line high or low, leaving the others alone.
    pub fn set_pin(&self, address: u8, pin: u8, high: bool) {
        let mut chips = self.chips.lock();
        let chip = chips.entry(address).or_default();
        if high {
            chip.levels |= 1 << pin;
        } else {
            chip.levels &= !(1 << pin);
        }
    }

    pub fn set_offline(&self, address: u8, offline: bool) {
        self.chips.lock().entry(address).or_default().offline = offline;
    }

    /// What a read of the port would return right now.
    pub fn port(&self, address: u8) -> Option<u8> {
        self.chips
            .lock()
            .get(&address)
            .map(|chip| chip.latch & chip.levels)
    }

    pub fn latch(&self, address: u8) -> Option<u8> {
        self.chips.lock().get(&address).map(|chip| chip.latch)
    }

    pub fn read_count(&self, address: u8) -> usize {
        self.chips.lock().get(&address).map_or(0, |chip| chip.reads)
    }

    pub fn writes(&self, address: u8) -> Vec<u8> {
        self.chips
            .lock()
            .get(&address)
            .map(|chip| chip.writes.clone())
            .unwrap_or_default()
    }
}

impl ErrorType for MockBus {
    type Error = ErrorKind;
}

impl I2c for MockBus {
    fn transaction(
        &mut self,
        address: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        let mut chips = self.chips.lock();
        let chip = chips
            .get_mut(&address)
            .filter(|chip| !chip.offline)
            .ok_or(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address))?;

        for operation in operations.iter_mut() {
            match operation {
                Operation::Read(buf) => {
                    chip.reads += 1;
                    buf.fill(chip.latch & chip.levels);
                    trace!("mock {address:#04x} read {:#04x}", chip.latch & chip.levels);
                }
                Operation::Write(bytes) => {
                    for &byte in bytes.iter() {
                        chip.latch = byte;
                        chip.writes.push(byte);
                    }
                    trace!("mock {address:#04x} latch {:#04x}", chip.latch);
                }
            }
        }
        Ok(())
    }
}
