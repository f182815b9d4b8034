pub use header::FileHeader;
pub use relocations::{Relocation, RelocationRecord};
pub use sections::{RawSection, Section, SectionHeader};
pub use symbols::{StringTable, SymbolRecord};

use std::io::Write;

use log::debug;
use thiserror::Error;

use crate::serializable::{Architecture, RecordKind, RecordWriter, WriteError};
use sections::header::{IMAGE_SCN_CNT_INITIALIZED_DATA, IMAGE_SCN_MEM_READ};
use symbols::short_name;

pub mod header;
pub mod relocations;
pub mod sections;
pub mod symbols;

#[derive(Debug, Error)]
pub enum ObjectError {
    #[error("section `{0}` already exists")]
    SectionExists(String),
    #[error("section `{0}` not found")]
    SectionNotFound(String),
    #[error("unsupported architecture `{0}`")]
    UnsupportedArchitecture(String),
    #[error("name of section `{0}` cannot be encoded in a section header")]
    NameTooLong(String),
    #[error("section `{name}` has {count} relocations, more than a section header can hold")]
    TooManyRelocations { name: String, count: usize },
    #[error("section `{name}` wrote {written} bytes but declared {size}")]
    SizeMismatch { name: String, size: u32, written: u64 },
    #[error("an object file holds at most {MAX_SECTIONS} sections")]
    TooManySections,
    #[error("object file would grow past the 32-bit offset limit")]
    TooLarge,
    #[error(transparent)]
    Write(#[from] WriteError),
}

/// Section numbers are 16-bit and 1-based.
pub const MAX_SECTIONS: usize = u16::MAX as usize;

#[derive(Debug)]
struct SectionEntry {
    section: Box<dyn Section>,
    header_name: [u8; 8],
    symbol_name: [u8; 8],
}

#[derive(Debug)]
struct PlacedSection {
    size: u32,
    data_pointer: u32,
    relocation_pointer: u32,
    relocations: Vec<Relocation>,
}

#[derive(Debug)]
struct Layout {
    sections: Vec<PlacedSection>,
    symbol_table_pointer: u32,
    size: u32,
}

/// A COFF object file assembled from named sections.
///
/// Each section gets one static symbol, and every relocation a section
/// reports is written against that section's own symbol.
#[derive(Debug, Default)]
pub struct ObjectFile {
    architecture: Architecture,
    sections: Vec<SectionEntry>,
    strings: StringTable,
}

impl ObjectFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_architecture(architecture: Architecture) -> Self {
        ObjectFile {
            architecture,
            ..Self::default()
        }
    }

    pub fn architecture(&self) -> Architecture {
        self.architecture
    }

    pub fn set_architecture(&mut self, name: &str) -> Result<(), ObjectError> {
        self.architecture = Architecture::from_name(name)
            .ok_or_else(|| ObjectError::UnsupportedArchitecture(name.to_string()))?;
        Ok(())
    }

    pub fn add_section(&mut self, section: impl Section + 'static) -> Result<(), ObjectError> {
        self.add_boxed_section(Box::new(section))
    }

    pub fn add_boxed_section(&mut self, section: Box<dyn Section>) -> Result<(), ObjectError> {
        if self.sections.len() >= MAX_SECTIONS {
            return Err(ObjectError::TooManySections);
        }
        let name = section.name().to_string();
        if self.sections.iter().any(|e| e.section.name() == name) {
            return Err(ObjectError::SectionExists(name));
        }

        let (header_name, symbol_name) = match short_name(&name) {
            Some(field) => (field, field),
            None => {
                let offset = self.strings.offset(&name).unwrap_or(self.strings.next_offset());
                let header_name = SectionHeader::long_name(offset)
                    .ok_or_else(|| ObjectError::NameTooLong(name.clone()))?;
                self.strings.insert(&name);
                (header_name, SymbolRecord::long_name(offset))
            }
        };

        debug!("adding section '{name}' ({} bytes)", section.size());
        self.sections.push(SectionEntry {
            section,
            header_name,
            symbol_name,
        });
        Ok(())
    }

    pub fn section(&self, name: &str) -> Result<&dyn Section, ObjectError> {
        self.sections
            .iter()
            .find(|e| e.section.name() == name)
            .map(|e| e.section.as_ref())
            .ok_or_else(|| ObjectError::SectionNotFound(name.to_string()))
    }

    pub fn sections(&self) -> impl Iterator<Item = &dyn Section> {
        self.sections.iter().map(|e| e.section.as_ref())
    }

    /// Size of the serialized file.
    pub fn size(&self) -> Result<u32, ObjectError> {
        Ok(self.freeze()?.size)
    }

    fn freeze(&self) -> Result<Layout, ObjectError> {
        let mut offset = grow(FileHeader::SIZE as u32, SectionHeader::SIZE, self.sections.len())?;

        let mut sections = Vec::with_capacity(self.sections.len());
        for entry in &self.sections {
            let size = entry.section.size();
            sections.push(PlacedSection {
                size,
                data_pointer: offset,
                relocation_pointer: 0,
                relocations: entry.section.relocations(),
            });
            offset = offset.checked_add(size).ok_or(ObjectError::TooLarge)?;
        }

        for (entry, placed) in self.sections.iter().zip(sections.iter_mut()) {
            if placed.relocations.len() > u16::MAX as usize {
                return Err(ObjectError::TooManyRelocations {
                    name: entry.section.name().to_string(),
                    count: placed.relocations.len(),
                });
            }
            placed.relocation_pointer = offset;
            offset = grow(offset, RelocationRecord::SIZE, placed.relocations.len())?;
        }

        let symbol_table_pointer = offset;
        offset = grow(offset, SymbolRecord::SIZE, self.sections.len())?;
        offset = offset
            .checked_add(self.strings.size())
            .ok_or(ObjectError::TooLarge)?;

        Ok(Layout {
            sections,
            symbol_table_pointer,
            size: offset,
        })
    }

    /// Returns the number of bytes written. A failed write leaves a partial
    /// file behind.
    pub fn write_to(&self, w: &mut dyn Write) -> Result<u64, ObjectError> {
        let layout = self.freeze()?;
        let mut writer = RecordWriter::new(w);

        let count = self.sections.len();
        let header = FileHeader::new(count as u16, layout.symbol_table_pointer, count as u32);
        writer.record(&header, RecordKind::FileHeader, 0)?;

        for (i, (entry, placed)) in self.sections.iter().zip(&layout.sections).enumerate() {
            let header = SectionHeader {
                name: entry.header_name,
                raw_data_size: placed.size,
                data_pointer: placed.data_pointer,
                relocation_pointer: placed.relocation_pointer,
                relocation_count: placed.relocations.len() as u16,
                characteristics: IMAGE_SCN_MEM_READ | IMAGE_SCN_CNT_INITIALIZED_DATA,
            };
            writer.record(&header, RecordKind::SectionHeader, i)?;
        }

        for (entry, placed) in self.sections.iter().zip(&layout.sections) {
            let before = writer.written();
            let result = entry.section.write_to(writer.inner());
            writer.nested(result)?;
            let written = writer.written() - before;
            if written != placed.size as u64 {
                return Err(ObjectError::SizeMismatch {
                    name: entry.section.name().to_string(),
                    size: placed.size,
                    written,
                });
            }
        }

        let kind = self.architecture.relocation_type();
        let mut index = 0;
        for (i, placed) in layout.sections.iter().enumerate() {
            for relocation in &placed.relocations {
                let record = RelocationRecord {
                    virtual_address: relocation.virtual_address,
                    symbol_index: i as u32,
                    kind,
                };
                writer.record(&record, RecordKind::Relocation, index)?;
                index += 1;
            }
        }

        for (i, entry) in self.sections.iter().enumerate() {
            let symbol = SymbolRecord::section(entry.symbol_name, i as u16 + 1);
            writer.record(&symbol, RecordKind::Symbol, i)?;
        }

        writer.record(&self.strings, RecordKind::StringTable, 0)?;

        debug!(
            "wrote {} object: {} sections, {} bytes",
            self.architecture,
            count,
            writer.written()
        );
        Ok(writer.written())
    }
}

/// Advances `offset` past `count` records of `size` bytes each.
fn grow(offset: u32, size: usize, count: usize) -> Result<u32, ObjectError> {
    size.checked_mul(count)
        .and_then(|bytes| u32::try_from(bytes).ok())
        .and_then(|bytes| offset.checked_add(bytes))
        .ok_or(ObjectError::TooLarge)
}
