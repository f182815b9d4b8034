use crate::serializable::*;

/// Set in an entry's key field when it holds a string offset, and in its
/// target field when it points at a subdirectory.
pub const HIGH_BIT: u32 = 0x8000_0000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryHeader {
    pub characteristics: u32,
    pub timestamp: u32,
    pub major_version: u16,
    pub minor_version: u16,
    pub name_entry_count: u16,
    pub id_entry_count: u16,
}

impl DirectoryHeader {
    pub const SIZE: u32 = 16;
}

impl Serializable for DirectoryHeader {
    fn serialize(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(Self::SIZE as usize);
        data.extend(self.characteristics.to_le_bytes());
        data.extend(self.timestamp.to_le_bytes());
        data.extend(self.major_version.to_le_bytes());
        data.extend(self.minor_version.to_le_bytes());
        data.extend(self.name_entry_count.to_le_bytes());
        data.extend(self.id_entry_count.to_le_bytes());
        data
    }

    fn deserialize(data: &[u8]) -> Result<(usize, Self), SerializationError> {
        if data.len() < Self::SIZE as usize {
            return Err(SerializationError::DataTooShort);
        }
        Ok((
            Self::SIZE as usize,
            DirectoryHeader {
                characteristics: read_u32(data, 0),
                timestamp: read_u32(data, 4),
                major_version: read_u16(data, 8),
                minor_version: read_u16(data, 10),
                name_entry_count: read_u16(data, 12),
                id_entry_count: read_u16(data, 14),
            },
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntryRecord {
    pub key: u32,
    pub target: u32,
}

impl DirectoryEntryRecord {
    pub const SIZE: u32 = 8;

    pub fn is_named(&self) -> bool {
        self.key & HIGH_BIT != 0
    }

    pub fn is_subdirectory(&self) -> bool {
        self.target & HIGH_BIT != 0
    }

    /// Offset of the string, subdirectory or data entry with the flag bits cleared.
    pub fn key_offset(&self) -> u32 {
        self.key & !HIGH_BIT
    }

    pub fn target_offset(&self) -> u32 {
        self.target & !HIGH_BIT
    }
}

impl Serializable for DirectoryEntryRecord {
    fn serialize(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(Self::SIZE as usize);
        data.extend(self.key.to_le_bytes());
        data.extend(self.target.to_le_bytes());
        data
    }

    fn deserialize(data: &[u8]) -> Result<(usize, Self), SerializationError> {
        if data.len() < Self::SIZE as usize {
            return Err(SerializationError::DataTooShort);
        }
        Ok((
            Self::SIZE as usize,
            DirectoryEntryRecord {
                key: read_u32(data, 0),
                target: read_u32(data, 4),
            },
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataDescriptor {
    /// Section-relative until the linker applies the matching relocation.
    pub data_rva: u32,
    pub size: u32,
    pub codepage: u32,
    pub reserved: u32,
}

impl DataDescriptor {
    pub const SIZE: u32 = 16;
}

impl Serializable for DataDescriptor {
    fn serialize(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(Self::SIZE as usize);
        data.extend(self.data_rva.to_le_bytes());
        data.extend(self.size.to_le_bytes());
        data.extend(self.codepage.to_le_bytes());
        data.extend(self.reserved.to_le_bytes());
        data
    }

    fn deserialize(data: &[u8]) -> Result<(usize, Self), SerializationError> {
        if data.len() < Self::SIZE as usize {
            return Err(SerializationError::DataTooShort);
        }
        Ok((
            Self::SIZE as usize,
            DataDescriptor {
                data_rva: read_u32(data, 0),
                size: read_u32(data, 4),
                codepage: read_u32(data, 8),
                reserved: read_u32(data, 12),
            },
        ))
    }
}

/// Longest name, in UTF-16 code units, the 16-bit length prefix can describe.
pub const MAX_NAME_UNITS: usize = u16::MAX as usize;

/// Length-prefixed UTF-16LE, no terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceString {
    pub units: Vec<u16>,
}

impl ResourceString {
    pub fn new(value: &str) -> Self {
        ResourceString {
            units: value.encode_utf16().collect(),
        }
    }

    pub fn size(&self) -> u32 {
        2 + 2 * self.units.len() as u32
    }

    pub fn to_string_lossy(&self) -> String {
        String::from_utf16_lossy(&self.units)
    }
}

impl Serializable for ResourceString {
    fn serialize(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(self.size() as usize);
        data.extend((self.units.len() as u16).to_le_bytes());
        for unit in &self.units {
            data.extend(unit.to_le_bytes());
        }
        data
    }

    fn deserialize(data: &[u8]) -> Result<(usize, Self), SerializationError> {
        if data.len() < 2 {
            return Err(SerializationError::DataTooShort);
        }
        let count = read_u16(data, 0) as usize;
        let size = 2 + 2 * count;
        if data.len() < size {
            return Err(SerializationError::DataTooShort);
        }
        let units: Vec<u16> = (0..count).map(|i| read_u16(data, 2 + 2 * i)).collect();
        if char::decode_utf16(units.iter().copied()).any(|c| c.is_err()) {
            return Err(SerializationError::InvalidData);
        }
        Ok((size, ResourceString { units }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_flags() {
        let entry = DirectoryEntryRecord {
            key: 0x48 | HIGH_BIT,
            target: 0x18 | HIGH_BIT,
        };
        assert!(entry.is_named());
        assert!(entry.is_subdirectory());
        assert_eq!(entry.key_offset(), 0x48);
        assert_eq!(entry.target_offset(), 0x18);
        assert_eq!(entry.serialize(), [0x48, 0, 0, 0x80, 0x18, 0, 0, 0x80]);
    }

    #[test]
    fn header_counts_land_at_the_end() {
        let header = DirectoryHeader {
            characteristics: 0,
            timestamp: 0,
            major_version: 0,
            minor_version: 0,
            name_entry_count: 2,
            id_entry_count: 3,
        };
        let bytes = header.serialize();
        assert_eq!(bytes.len(), 16);
        assert_eq!(&bytes[12..], &[2, 0, 3, 0]);
    }

    #[test]
    fn string_encoding() {
        let string = ResourceString::new("Ab\u{1F600}");
        assert_eq!(string.units.len(), 4); // surrogate pair
        assert_eq!(string.size(), 10);

        let bytes = string.serialize();
        assert_eq!(&bytes[..6], &[4, 0, b'A', 0, b'b', 0]);
        let (size, parsed) = ResourceString::deserialize(&bytes).unwrap();
        assert_eq!(size, 10);
        assert_eq!(parsed.to_string_lossy(), "Ab\u{1F600}");
    }

    #[test]
    fn lone_surrogate_is_rejected() {
        let bytes = [1, 0, 0x00, 0xd8];
        assert_eq!(
            ResourceString::deserialize(&bytes),
            Err(SerializationError::InvalidData)
        );
    }
}
