/// Total UTF-16 units in the packed buffer, header included.
pub const PACKED_NAME_UNITS: usize = 2048;

/// Units kept free at the tail. No name, terminator included, may reach
/// into this zone.
pub const SAFETY_MARGIN_UNITS: usize = 10;

/// Highest cursor position an append may leave behind.
pub const PACKED_NAME_LIMIT: usize = PACKED_NAME_UNITS - SAFETY_MARGIN_UNITS;

/// Names start after the u16 count header.
const FIRST_NAME_UNIT: usize = 1;

/// A single fixed block holding every distinct name back to back.
///
/// Layout (in UTF-16 units):
/// `[count][name0 ... 0][name1 ... 0] ...`
///
/// The block is allocated once and never grows.
#[derive(Debug, Clone)]
pub struct PackedNameBuffer {
    units: Box<[u16]>,
    cursor: usize,
}

impl PackedNameBuffer {
    pub fn new() -> Self {
        Self {
            units: vec![0u16; PACKED_NAME_UNITS].into_boxed_slice(),
            cursor: FIRST_NAME_UNIT,
        }
    }

    /// Whether `name` (plus its terminator) can still be admitted.
    pub fn can_admit(&self, name: &[u16]) -> bool {
        self.cursor + name.len() + 1 <= PACKED_NAME_LIMIT
    }

    /// Appends `name` and a NUL at the write cursor, returning the offset the
    /// name starts at. `None` when the buffer would overflow its margin.
    pub fn append(&mut self, name: &[u16]) -> Option<usize> {
        if !self.can_admit(name) {
            return None;
        }
        let offset = self.cursor;
        let end = offset + name.len();
        self.units[offset..end].copy_from_slice(name);
        self.units[end] = 0;
        self.cursor = end + 1;
        Some(offset)
    }

    /// The name stored at `offset`, without its terminator.
    pub fn name_at(&self, offset: usize) -> &[u16] {
        let tail = &self.units[offset..self.cursor];
        let len = tail.iter().position(|&u| u == 0).unwrap_or(tail.len());
        &tail[..len]
    }

    pub fn set_count(&mut self, count: u16) {
        self.units[0] = count;
    }

    pub fn count(&self) -> u16 {
        self.units[0]
    }

    /// Units consumed so far, header included.
    pub fn written_units(&self) -> usize {
        self.cursor
    }

    /// Serializes the written region: u16 LE count, then every name as
    /// UTF-16LE units each followed by a u16 NUL.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.cursor * 2);
        for unit in &self.units[..self.cursor] {
            out.extend_from_slice(&unit.to_le_bytes());
        }
        out
    }
}

impl Default for PackedNameBuffer {
    fn default() -> Self {
        Self::new()
    }
}
