//! Ordered arena of registration records.
//!
//! Records live in slots addressed by [`RecordId`] and are chained by index
//! in registration order. Insertion is at the tail and removal unlinks in
//! O(1). Ids carry a generation so a stale id never aliases a reused slot.

/// Stable handle to a registered record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId {
    index: u32,
    generation: u32,
}

struct Entry<T> {
    value: T,
    prev: Option<usize>,
    next: Option<usize>,
}

struct Slot<T> {
    generation: u32,
    entry: Option<Entry<T>>,
}

pub struct Registry<T> {
    slots: Vec<Slot<T>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Registry<T> {
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Append `value` after the current tail.
    pub fn add(&mut self, value: T) -> RecordId {
        let entry = Entry {
            value,
            prev: self.tail,
            next: None,
        };
        let index = match self.free.pop() {
            Some(index) => {
                self.slots[index].entry = Some(entry);
                index
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    entry: Some(entry),
                });
                self.slots.len() - 1
            }
        };

        match self.tail {
            Some(tail) => {
                if let Some(prev) = self.slots[tail].entry.as_mut() {
                    prev.next = Some(index);
                }
            }
            None => self.head = Some(index),
        }
        self.tail = Some(index);
        self.len += 1;

        RecordId {
            index: index as u32,
            generation: self.slots[index].generation,
        }
    }

    /// Unlink and return the record. Unknown or stale ids are a no-op.
    pub fn remove(&mut self, id: RecordId) -> Option<T> {
        let index = self.live_index(id)?;
        let slot = &mut self.slots[index];
        let entry = slot.entry.take()?;
        slot.generation = slot.generation.wrapping_add(1);

        match entry.prev {
            Some(prev) => {
                if let Some(prev) = self.slots[prev].entry.as_mut() {
                    prev.next = entry.next;
                }
            }
            None => self.head = entry.next,
        }
        match entry.next {
            Some(next) => {
                if let Some(next) = self.slots[next].entry.as_mut() {
                    next.prev = entry.prev;
                }
            }
            None => self.tail = entry.prev,
        }

        self.free.push(index);
        self.len -= 1;
        Some(entry.value)
    }

    pub fn contains(&self, id: RecordId) -> bool {
        self.live_index(id).is_some()
    }

    pub fn get(&self, id: RecordId) -> Option<&T> {
        let index = self.live_index(id)?;
        self.slots[index].entry.as_ref().map(|entry| &entry.value)
    }

    pub fn get_mut(&mut self, id: RecordId) -> Option<&mut T> {
        let index = self.live_index(id)?;
        self.slots[index].entry.as_mut().map(|entry| &mut entry.value)
    }

    /// Records in registration order.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            registry: self,
            cursor: self.head,
        }
    }

    /// Visit every record mutably in registration order.
    pub fn for_each_mut(&mut self, mut f: impl FnMut(RecordId, &mut T)) {
        let mut cursor = self.head;
        while let Some(index) = cursor {
            let slot = &mut self.slots[index];
            let generation = slot.generation;
            let Some(entry) = slot.entry.as_mut() else {
                break;
            };
            cursor = entry.next;
            f(
                RecordId {
                    index: index as u32,
                    generation,
                },
                &mut entry.value,
            );
        }
    }

    fn live_index(&self, id: RecordId) -> Option<usize> {
        let index = id.index as usize;
        let slot = self.slots.get(index)?;
        (slot.generation == id.generation && slot.entry.is_some()).then_some(index)
    }
}

pub struct Iter<'a, T> {
    registry: &'a Registry<T>,
    cursor: Option<usize>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (RecordId, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        let registry = self.registry;
        let index = self.cursor?;
        let slot = &registry.slots[index];
        let entry = slot.entry.as_ref()?;
        self.cursor = entry.next;
        Some((
            RecordId {
                index: index as u32,
                generation: slot.generation,
            },
            &entry.value,
        ))
    }
}

impl<'a, T> IntoIterator for &'a Registry<T> {
    type Item = (RecordId, &'a T);
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
