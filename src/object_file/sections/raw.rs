use std::io::Write;

use super::common::Section;
use crate::object_file::relocations::Relocation;
use crate::serializable::{RecordKind, RecordWriter, WriteError};

/// A named section of opaque bytes without fixups.
#[derive(Debug, Clone)]
pub struct RawSection {
    name: String,
    data: Vec<u8>,
}

impl RawSection {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        RawSection {
            name: name.into(),
            data,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl Section for RawSection {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u32 {
        self.data.len() as u32
    }

    fn relocations(&self) -> Vec<Relocation> {
        Vec::new()
    }

    fn write_to(&self, w: &mut dyn Write) -> Result<u64, WriteError> {
        let mut writer = RecordWriter::new(w);
        writer.bytes(&self.data, RecordKind::SectionData, 0)?;
        Ok(writer.written())
    }
}
