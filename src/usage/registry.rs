use std::cmp::Ordering;

use tracing::debug;

use super::packed::PackedNameBuffer;

/// Maximum distinct names tracked per session.
pub const MAX_PROCESS_NAMES: usize = 64;

/// Maximum UTF-16 units in a single name.
pub const MAX_NAME_UNITS: usize = 260;

/// Index of a slot in arrival order.
pub type SlotIndex = usize;

/// A short process image name, already stripped of its directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessName {
    units: Vec<u16>,
}

impl ProcessName {
    /// `None` for empty names, names over `MAX_NAME_UNITS`, or names with an
    /// interior NUL (which would corrupt the packed layout).
    pub fn new(name: &str) -> Option<Self> {
        let units: Vec<u16> = name.encode_utf16().collect();
        if units.is_empty() || units.len() > MAX_NAME_UNITS || units.contains(&0) {
            return None;
        }
        Some(Self { units })
    }

    pub fn as_units(&self) -> &[u16] {
        &self.units
    }

    /// Case-insensitive equality with another name given as text.
    pub fn eq_ignore_case(&self, other: &str) -> bool {
        let other: Vec<u16> = other.encode_utf16().collect();
        cmp_ignore_case(&self.units, &other) == Ordering::Equal
    }
}

impl std::fmt::Display for ProcessName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&String::from_utf16_lossy(&self.units))
    }
}

fn fold(unit: u16) -> u16 {
    if (b'A' as u16..=b'Z' as u16).contains(&unit) {
        unit + 32
    } else {
        unit
    }
}

/// ASCII case-folded comparison of two UTF-16 names.
pub fn cmp_ignore_case(a: &[u16], b: &[u16]) -> Ordering {
    a.iter().map(|&u| fold(u)).cmp(b.iter().map(|&u| fold(u)))
}

/// One distinct name observed this session, with the counters credited to it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NameSlot {
    /// Where the name starts inside the packed buffer.
    pub offset: usize,
    pub connection_count: u32,
    pub primary_count: u32,
    pub failed_count: u32,
    pub failed_out_of_range_count: u32,
}

/// Outcome of a registry probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// `position` in the alphabetical index holds a matching slot.
    Found { position: usize },
    /// Not present; splicing at `position` keeps the index sorted.
    Vacant { position: usize },
}

/// Sorted, capacity-bounded table of distinct names.
///
/// Slots are kept in arrival order; `alphabetical` is a permutation of
/// `0..slots.len()` ordered by case-insensitive name. Neither ever exceeds
/// `MAX_PROCESS_NAMES` entries.
#[derive(Debug, Clone)]
pub struct NameRegistry {
    slots: Vec<NameSlot>,
    alphabetical: Vec<SlotIndex>,
    packed: PackedNameBuffer,
}

impl NameRegistry {
    pub fn new() -> Self {
        Self {
            slots: Vec::with_capacity(MAX_PROCESS_NAMES),
            alphabetical: Vec::with_capacity(MAX_PROCESS_NAMES),
            packed: PackedNameBuffer::new(),
        }
    }

    /// Binary search over the alphabetical index.
    pub fn lookup(&self, name: &ProcessName) -> Lookup {
        let needle = name.as_units();
        let mut lo: isize = 0;
        let mut hi: isize = self.alphabetical.len() as isize - 1;
        let mut mid: isize = 0;
        let mut last = Ordering::Equal;

        while lo <= hi {
            mid = (lo + hi) / 2;
            let slot = &self.slots[self.alphabetical[mid as usize]];
            last = cmp_ignore_case(needle, self.packed.name_at(slot.offset));
            match last {
                Ordering::Less => hi = mid - 1,
                Ordering::Greater => lo = mid + 1,
                Ordering::Equal => {
                    return Lookup::Found {
                        position: mid as usize,
                    }
                }
            }
        }

        let position = if last == Ordering::Greater { mid + 1 } else { mid };
        Lookup::Vacant {
            position: position as usize,
        }
    }

    /// Whether a new name could still be admitted.
    pub fn has_room_for(&self, name: &ProcessName) -> bool {
        self.slots.len() < MAX_PROCESS_NAMES && self.packed.can_admit(name.as_units())
    }

    /// Inserts a name that `lookup` reported as vacant at `position`.
    ///
    /// Returns `None` without touching anything when the table or the packed
    /// buffer is out of room.
    pub fn insert(&mut self, name: &ProcessName, position: usize) -> Option<SlotIndex> {
        if position > self.alphabetical.len() {
            return None;
        }
        if self.slots.len() >= MAX_PROCESS_NAMES {
            debug!(%name, "name table full, dropping");
            return None;
        }
        let Some(offset) = self.packed.append(name.as_units()) else {
            debug!(%name, "packed name buffer full, dropping");
            return None;
        };

        let index = self.slots.len();
        self.slots.push(NameSlot {
            offset,
            connection_count: 1,
            ..NameSlot::default()
        });
        self.alphabetical.insert(position, index);
        self.packed.set_count(self.slots.len() as u16);

        debug!(%name, index, position, "registered process name");
        Some(index)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slot(&self, index: SlotIndex) -> Option<&NameSlot> {
        self.slots.get(index)
    }

    pub fn slot_mut(&mut self, index: SlotIndex) -> Option<&mut NameSlot> {
        self.slots.get_mut(index)
    }

    /// Slots in arrival order.
    pub fn slots(&self) -> &[NameSlot] {
        &self.slots
    }

    /// Slot indices in case-insensitive name order.
    pub fn alphabetical(&self) -> &[SlotIndex] {
        &self.alphabetical
    }

    /// Slot index held at `position` of the alphabetical index.
    pub fn slot_at(&self, position: usize) -> Option<SlotIndex> {
        self.alphabetical.get(position).copied()
    }

    pub fn name(&self, index: SlotIndex) -> Option<String> {
        self.slots
            .get(index)
            .map(|slot| String::from_utf16_lossy(self.packed.name_at(slot.offset)))
    }

    pub fn packed(&self) -> &PackedNameBuffer {
        &self.packed
    }
}

impl Default for NameRegistry {
    fn default() -> Self {
        Self::new()
    }
}
