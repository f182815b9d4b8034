use crate::serializable::*;

/// A fixup site inside a section.
///
/// The target is always the owning section itself: the stored value is an
/// offset into the section that the linker rebases onto the section's RVA.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relocation {
    pub virtual_address: u32,
}

impl Relocation {
    pub fn new(virtual_address: u32) -> Self {
        Relocation { virtual_address }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelocationRecord {
    pub virtual_address: u32,
    pub symbol_index: u32,
    pub kind: u16,
}

impl RelocationRecord {
    pub const SIZE: usize = 10;
}

impl Serializable for RelocationRecord {
    fn serialize(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(Self::SIZE);
        data.extend(self.virtual_address.to_le_bytes());
        data.extend(self.symbol_index.to_le_bytes());
        data.extend(self.kind.to_le_bytes());
        data
    }

    fn deserialize(data: &[u8]) -> Result<(usize, Self), SerializationError> {
        if data.len() < Self::SIZE {
            return Err(SerializationError::DataTooShort);
        }
        Ok((
            Self::SIZE,
            RelocationRecord {
                virtual_address: read_u32(data, 0),
                symbol_index: read_u32(data, 4),
                kind: read_u16(data, 8),
            },
        ))
    }
}
