use crate::serializable::*;

pub const IMAGE_SCN_CNT_INITIALIZED_DATA: u32 = 0x0000_0040;
pub const IMAGE_SCN_MEM_READ: u32 = 0x4000_0000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionHeader {
    pub name: [u8; 8],
    pub raw_data_size: u32,
    pub data_pointer: u32,
    pub relocation_pointer: u32,
    pub relocation_count: u16,
    pub characteristics: u32,
}

impl SectionHeader {
    pub const SIZE: usize = 40;

    /// The `/offset` form of a name kept in the string table, if it fits the field.
    pub fn long_name(offset: u32) -> Option<[u8; 8]> {
        let text = format!("/{offset}");
        if text.len() > 8 {
            return None;
        }
        let mut field = [0u8; 8];
        field[..text.len()].copy_from_slice(text.as_bytes());
        Some(field)
    }

    /// Decodes an `/offset` name field back to its string-table offset.
    pub fn string_table_offset(&self) -> Option<u32> {
        if self.name[0] != b'/' {
            return None;
        }
        let end = self.name.iter().position(|&b| b == 0).unwrap_or(8);
        std::str::from_utf8(&self.name[1..end]).ok()?.parse().ok()
    }
}

impl Serializable for SectionHeader {
    fn serialize(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(Self::SIZE);
        data.extend(self.name);
        data.extend([0; 8]); // virtual size and address, unused in objects
        data.extend(self.raw_data_size.to_le_bytes());
        data.extend(self.data_pointer.to_le_bytes());
        data.extend(self.relocation_pointer.to_le_bytes());
        data.extend([0; 4]); // line numbers
        data.extend(self.relocation_count.to_le_bytes());
        data.extend([0; 2]);
        data.extend(self.characteristics.to_le_bytes());
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
            SectionHeader {
                name,
                raw_data_size: read_u32(data, 16),
                data_pointer: read_u32(data, 20),
                relocation_pointer: read_u32(data, 24),
                relocation_count: read_u16(data, 32),
                characteristics: read_u32(data, 36),
            },
        ))
    }
}
