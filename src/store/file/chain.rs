//! Metadata Chain
//!
//! Per-bucket index of object id → record location, plus the records'
//! physical order in the bucket file as a doubly-linked list.
//!
//! Entries live in a slot vector and link to their neighbours by slot
//! index, so appending at the tail is O(1) and an offset shift after a
//! resize or removal only walks the k entries physically after the change.
//!
//! ## Layout Invariant
//! ```text
//! head.offset == 0
//! next.offset == offset + header_size + payload_size + 2
//! ```

use std::collections::HashMap;

use super::record::RecordSize;

/// Location of one record inside its bucket file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectEntry {
    /// Offset of the record's identifier from the start of the file
    pub offset: u64,
    /// Bytes of `<object id> <payload len>`
    pub header_size: u64,
    /// Bytes of raw payload
    pub payload_size: u64,
    prev: Option<usize>,
    next: Option<usize>,
}

impl ObjectEntry {
    /// Bytes the whole record occupies
    pub fn record_len(&self) -> u64 {
        self.header_size + self.payload_size + 2
    }

    /// Offset of the first payload byte
    pub fn payload_offset(&self) -> u64 {
        self.offset + self.header_size + 1
    }

    /// Offset just past the record's terminator
    pub fn end_offset(&self) -> u64 {
        self.offset + self.record_len()
    }

    pub fn size(&self) -> RecordSize {
        RecordSize {
            header_size: self.header_size,
            payload_size: self.payload_size,
        }
    }
}

/// Public snapshot of one record's placement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectLayout {
    pub object_id: String,
    pub offset: u64,
    pub header_size: u64,
    pub payload_size: u64,
}

#[derive(Debug)]
struct Slot {
    object_id: String,
    entry: ObjectEntry,
}

/// Offset-tracking index of a bucket's records in physical file order
#[derive(Debug, Default)]
pub struct ObjectChain {
    slots: Vec<Option<Slot>>,
    /// Vacated slot indexes, reused before the vector grows
    free: Vec<usize>,
    index: HashMap<String, usize>,
    head: Option<usize>,
    tail: Option<usize>,
}

impl ObjectChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of objects in the bucket
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains(&self, object_id: &str) -> bool {
        self.index.contains_key(object_id)
    }

    /// Look up an object's record location
    pub fn get(&self, object_id: &str) -> Option<&ObjectEntry> {
        let idx = *self.index.get(object_id)?;
        self.entry(idx)
    }

    /// Physically first record
    pub fn head(&self) -> Option<(&str, &ObjectEntry)> {
        self.head.and_then(|idx| self.slot_view(idx))
    }

    /// Physically last record
    pub fn tail(&self) -> Option<(&str, &ObjectEntry)> {
        self.tail.and_then(|idx| self.slot_view(idx))
    }

    /// Length of the bucket file this chain describes
    pub fn end_offset(&self) -> u64 {
        self.tail().map(|(_, entry)| entry.end_offset()).unwrap_or(0)
    }

    /// Append a record after the current tail and return its offset
    ///
    /// The caller must make sure `object_id` is not already present.
    pub fn push_back(&mut self, object_id: &str, size: RecordSize) -> u64 {
        debug_assert!(!self.contains(object_id), "duplicate object {object_id}");

        let offset = self.end_offset();
        let entry = ObjectEntry {
            offset,
            header_size: size.header_size,
            payload_size: size.payload_size,
            prev: self.tail,
            next: None,
        };
        let idx = self.alloc(Slot {
            object_id: object_id.to_string(),
            entry,
        });

        match self.tail.and_then(|t| self.entry_mut(t)) {
            Some(old_tail) => old_tail.next = Some(idx),
            None => self.head = Some(idx),
        }
        self.tail = Some(idx);
        self.index.insert(object_id.to_string(), idx);

        offset
    }

    /// Record that `object_id` was rewritten in place with new sizes
    ///
    /// Every record physically after it moves by the change in encoded
    /// length, which is returned. `None` if the object is unknown.
    pub fn resize(&mut self, object_id: &str, size: RecordSize) -> Option<i64> {
        let idx = *self.index.get(object_id)?;
        let entry = self.entry_mut(idx)?;

        let delta = size.encoded_len() as i64 - entry.record_len() as i64;
        entry.header_size = size.header_size;
        entry.payload_size = size.payload_size;
        let next = entry.next;

        if delta != 0 {
            self.shift_from(next, delta);
        }
        Some(delta)
    }

    /// Remove `object_id` and close the gap its record left behind
    pub fn unlink(&mut self, object_id: &str) -> Option<ObjectEntry> {
        let idx = self.index.remove(object_id)?;
        let slot = self.slots.get_mut(idx)?.take()?;
        self.free.push(idx);

        let ObjectEntry { prev, next, .. } = slot.entry;
        match prev.and_then(|p| self.entry_mut(p)) {
            Some(prev_entry) => prev_entry.next = next,
            None => self.head = next,
        }
        match next.and_then(|n| self.entry_mut(n)) {
            Some(next_entry) => next_entry.prev = prev,
            None => self.tail = prev,
        }

        self.shift_from(next, -(slot.entry.record_len() as i64));
        Some(slot.entry)
    }

    /// Iterate records in physical order
    pub fn iter(&self) -> ChainIter<'_> {
        ChainIter {
            chain: self,
            cursor: self.head,
        }
    }

    /// Snapshot of every record's placement in physical order
    pub fn layout(&self) -> Vec<ObjectLayout> {
        self.iter()
            .map(|(object_id, entry)| ObjectLayout {
                object_id: object_id.to_string(),
                offset: entry.offset,
                header_size: entry.header_size,
                payload_size: entry.payload_size,
            })
            .collect()
    }

    /// Check the layout invariant and that both link directions agree
    pub fn verify_layout(&self) -> bool {
        let mut expected_offset = 0;
        let mut expected_prev = None;
        let mut seen = 0;
        let mut cursor = self.head;

        while let Some(idx) = cursor {
            let Some(entry) = self.entry(idx) else {
                return false;
            };
            if entry.offset != expected_offset || entry.prev != expected_prev {
                return false;
            }
            expected_offset = entry.end_offset();
            expected_prev = Some(idx);
            seen += 1;
            cursor = entry.next;
        }

        seen == self.len() && self.tail == expected_prev
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn alloc(&mut self, slot: Slot) -> usize {
        match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Some(slot);
                idx
            }
            None => {
                self.slots.push(Some(slot));
                self.slots.len() - 1
            }
        }
    }

    fn entry(&self, idx: usize) -> Option<&ObjectEntry> {
        self.slots.get(idx)?.as_ref().map(|slot| &slot.entry)
    }

    fn entry_mut(&mut self, idx: usize) -> Option<&mut ObjectEntry> {
        self.slots.get_mut(idx)?.as_mut().map(|slot| &mut slot.entry)
    }

    fn slot_view(&self, idx: usize) -> Option<(&str, &ObjectEntry)> {
        self.slots
            .get(idx)?
            .as_ref()
            .map(|slot| (slot.object_id.as_str(), &slot.entry))
    }

    /// Move `start` and every record after it by `delta` bytes
    fn shift_from(&mut self, start: Option<usize>, delta: i64) {
        let mut cursor = start;
        while let Some(idx) = cursor {
            let Some(entry) = self.entry_mut(idx) else {
                break;
            };
            entry.offset = entry.offset.saturating_add_signed(delta);
            cursor = entry.next;
        }
    }
}

/// Iterator over a chain in physical order
pub struct ChainIter<'a> {
    chain: &'a ObjectChain,
    cursor: Option<usize>,
}

impl<'a> Iterator for ChainIter<'a> {
    type Item = (&'a str, &'a ObjectEntry);

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.cursor?;
        let (object_id, entry) = self.chain.slot_view(idx)?;
        self.cursor = entry.next;
        Some((object_id, entry))
    }
}
