use std::collections::HashMap;

use crate::serializable::*;

pub const IMAGE_SYM_CLASS_STATIC: u8 = 3;

/// Longest name stored inline in an 8-byte name field.
pub const SHORT_NAME_LEN: usize = 8;

/// Pads a short name into an 8-byte field, or `None` if it needs the string table.
pub fn short_name(name: &str) -> Option<[u8; 8]> {
    if name.len() > SHORT_NAME_LEN {
        return None;
    }
    let mut field = [0u8; 8];
    field[..name.len()].copy_from_slice(name.as_bytes());
    Some(field)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolRecord {
    pub name: [u8; 8],
    pub value: u32,
    pub section_number: u16,
    pub kind: u16,
    pub storage_class: u8,
    pub aux_count: u8,
}

impl SymbolRecord {
    pub const SIZE: usize = 18;

    /// A static symbol standing for a whole section (1-based `section_number`).
    pub fn section(name: [u8; 8], section_number: u16) -> Self {
        SymbolRecord {
            name,
            value: 0,
            section_number,
            kind: 0,
            storage_class: IMAGE_SYM_CLASS_STATIC,
            aux_count: 0,
        }
    }

    /// Name field for a name kept in the string table: four zero bytes, then the offset.
    pub fn long_name(offset: u32) -> [u8; 8] {
        let mut field = [0u8; 8];
        field[4..].copy_from_slice(&offset.to_le_bytes());
        field
    }
}

impl Serializable for SymbolRecord {
    fn serialize(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(Self::SIZE);
        data.extend(self.name);
        data.extend(self.value.to_le_bytes());
        data.extend(self.section_number.to_le_bytes());
        data.extend(self.kind.to_le_bytes());
        data.push(self.storage_class);
        data.push(self.aux_count);
        data
    }

    fn deserialize(data: &[u8]) -> Result<(usize, Self), SerializationError> {
        if data.len() < Self::SIZE {
            return Err(SerializationError::DataTooShort);
        }
        let mut name = [0u8; 8];
        name.copy_from_slice(&data[..8]);
        Ok((
            Self::SIZE,
            SymbolRecord {
                name,
                value: read_u32(data, 8),
                section_number: read_u16(data, 12),
                kind: read_u16(data, 14),
                storage_class: data[16],
                aux_count: data[17],
            },
        ))
    }
}

/// Long names, each stored once and null-terminated.
///
/// Offsets count from the start of the table, whose first four bytes hold the
/// table size, so the first name sits at offset 4.
#[derive(Debug, Clone, Default)]
pub struct StringTable {
    names: Vec<u8>,
    offsets: HashMap<String, u32>,
}

impl StringTable {
    const SIZE_FIELD: u32 = 4;

    pub fn new() -> Self {
        Self::default()
    }

    /// Offset the next inserted name would receive.
    pub fn next_offset(&self) -> u32 {
        Self::SIZE_FIELD + self.names.len() as u32
    }

    pub fn insert(&mut self, name: &str) -> u32 {
        if let Some(offset) = self.offsets.get(name) {
            return *offset;
        }
        let offset = self.next_offset();
        self.names.extend(name.as_bytes());
        self.names.push(0); // null terminator
        self.offsets.insert(name.to_string(), offset);
        offset
    }

    pub fn offset(&self, name: &str) -> Option<u32> {
        self.offsets.get(name).copied()
    }

    /// Total size including the size field itself.
    pub fn size(&self) -> u32 {
        self.next_offset()
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Reads the null-terminated name at `offset` from a serialized table.
    pub fn read_name(table: &[u8], offset: u32) -> Result<String, SerializationError> {
        let start = offset as usize;
        if start < Self::SIZE_FIELD as usize || start >= table.len() {
            return Err(SerializationError::InvalidData);
        }
        let end = table[start..]
            .iter()
            .position(|&b| b == 0)
            .ok_or(SerializationError::InvalidData)?;
        String::from_utf8(table[start..start + end].to_vec())
            .map_err(|_| SerializationError::InvalidData)
    }
}

impl Serializable for StringTable {
    fn serialize(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(self.size() as usize);
        data.extend(self.size().to_le_bytes());
        data.extend(&self.names);
        data
    }

    fn deserialize(data: &[u8]) -> Result<(usize, Self), SerializationError> {
        if data.len() < Self::SIZE_FIELD as usize {
            return Err(SerializationError::DataTooShort);
        }
        let size = read_u32(data, 0) as usize;
        if size < Self::SIZE_FIELD as usize {
            return Err(SerializationError::InvalidData);
        }
        if data.len() < size {
            return Err(SerializationError::DataTooShort);
        }

        let mut table = StringTable::new();
        let mut offset = Self::SIZE_FIELD as usize;
        while offset < size {
            let name = Self::read_name(&data[..size], offset as u32)?;
            offset += name.len() + 1;
            table.insert(&name);
        }
        Ok((size, table))
    }
}
