use crate::serializable::*;

pub const IMAGE_FILE_MACHINE_I386: u16 = 0x014c;
pub const IMAGE_FILE_32BIT_MACHINE: u16 = 0x0100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    pub machine: u16,
    pub section_count: u16,
    pub timestamp: u32,
    pub symbol_table_pointer: u32,
    pub symbol_count: u32,
    pub optional_header_size: u16,
    pub characteristics: u16,
}

impl FileHeader {
    pub const SIZE: usize = 20;

    /// Machine and characteristics stay fixed whatever the relocation
    /// architecture is; resource objects carry no code.
    pub fn new(section_count: u16, symbol_table_pointer: u32, symbol_count: u32) -> Self {
        FileHeader {
            machine: IMAGE_FILE_MACHINE_I386,
            section_count,
            timestamp: 0,
            symbol_table_pointer,
            symbol_count,
            optional_header_size: 0,
            characteristics: IMAGE_FILE_32BIT_MACHINE,
        }
    }
}

impl Serializable for FileHeader {
    fn serialize(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(Self::SIZE);
        data.extend(self.machine.to_le_bytes());
        data.extend(self.section_count.to_le_bytes());
        data.extend(self.timestamp.to_le_bytes());
        data.extend(self.symbol_table_pointer.to_le_bytes());
        data.extend(self.symbol_count.to_le_bytes());
        data.extend(self.optional_header_size.to_le_bytes());
        data.extend(self.characteristics.to_le_bytes());
        data
    }

    fn deserialize(data: &[u8]) -> Result<(usize, Self), SerializationError> {
        if data.len() < Self::SIZE {
            return Err(SerializationError::DataTooShort);
        }

        Ok((
            Self::SIZE,
            FileHeader {
                machine: read_u16(data, 0),
                section_count: read_u16(data, 2),
                timestamp: read_u32(data, 4),
                symbol_table_pointer: read_u32(data, 8),
                symbol_count: read_u32(data, 12),
                optional_header_size: read_u16(data, 16),
                characteristics: read_u16(data, 18),
            },
        ))
    }
}
