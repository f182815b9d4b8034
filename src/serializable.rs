use std::fmt;
use std::io::Write;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SerializationError {
    #[error("invalid data")]
    InvalidData,
    #[error("data too short")]
    DataTooShort,
}

pub trait Serializable: Sized {
    fn serialize(&self) -> Vec<u8>;
    fn deserialize(data: &[u8]) -> Result<(usize, Self), SerializationError>;
}

/// The class of on-disk record being emitted when a write fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    ResourceDirectory,
    ResourceDirectoryEntry,
    ResourceString,
    ResourceDataEntry,
    ResourceData,
    FileHeader,
    SectionHeader,
    SectionData,
    Relocation,
    Symbol,
    StringTable,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordKind::ResourceDirectory => "resource directory",
            RecordKind::ResourceDirectoryEntry => "resource directory entry",
            RecordKind::ResourceString => "resource string",
            RecordKind::ResourceDataEntry => "resource data entry",
            RecordKind::ResourceData => "resource data",
            RecordKind::FileHeader => "file header",
            RecordKind::SectionHeader => "section header",
            RecordKind::SectionData => "section data",
            RecordKind::Relocation => "relocation",
            RecordKind::Symbol => "symbol",
            RecordKind::StringTable => "string table",
        };
        f.write_str(name)
    }
}

/// An output stream failure. Bytes already emitted are not retracted.
#[derive(Debug, Error)]
#[error("failed to write {record} #{index} after {written} bytes")]
pub struct WriteError {
    pub record: RecordKind,
    pub index: usize,
    pub written: u64,
    #[source]
    pub source: std::io::Error,
}

/// Tracks how many bytes went out so failures can report where they happened.
pub(crate) struct RecordWriter<'w> {
    inner: &'w mut dyn Write,
    written: u64,
}

impl<'w> RecordWriter<'w> {
    pub(crate) fn new(inner: &'w mut dyn Write) -> Self {
        RecordWriter { inner, written: 0 }
    }

    pub(crate) fn written(&self) -> u64 {
        self.written
    }

    pub(crate) fn bytes(
        &mut self,
        bytes: &[u8],
        record: RecordKind,
        index: usize,
    ) -> Result<(), WriteError> {
        self.inner.write_all(bytes).map_err(|source| WriteError {
            record,
            index,
            written: self.written,
            source,
        })?;
        self.written += bytes.len() as u64;
        Ok(())
    }

    pub(crate) fn record<T: Serializable>(
        &mut self,
        value: &T,
        record: RecordKind,
        index: usize,
    ) -> Result<(), WriteError> {
        self.bytes(&value.serialize(), record, index)
    }

    /// Hands the raw stream to a payload producer, counting what it emits.
    pub(crate) fn stream(
        &mut self,
        record: RecordKind,
        index: usize,
        produce: impl FnOnce(&mut dyn Write) -> std::io::Result<()>,
    ) -> Result<(), WriteError> {
        let mut counting = Counting {
            inner: &mut *self.inner,
            count: 0,
        };
        let result = produce(&mut counting);
        let count = counting.count;
        result.map_err(|source| WriteError {
            record,
            index,
            written: self.written + count,
            source,
        })?;
        self.written += count;
        Ok(())
    }

    /// Adds the count reported by a nested writer.
    pub(crate) fn nested(&mut self, result: Result<u64, WriteError>) -> Result<(), WriteError> {
        match result {
            Ok(n) => {
                self.written += n;
                Ok(())
            }
            Err(mut e) => {
                e.written += self.written;
                Err(e)
            }
        }
    }

    pub(crate) fn inner(&mut self) -> &mut dyn Write {
        &mut *self.inner
    }
}

struct Counting<'a> {
    inner: &'a mut dyn Write,
    count: u64,
}

impl Write for Counting<'_> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.count += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

// Relocation type codes for a section-relative 32-bit address (ADDR32NB/DIR32NB).
pub const IMAGE_REL_AMD64_ADDR32NB: u16 = 0x03;
pub const IMAGE_REL_ARM64_ADDR32NB: u16 = 0x02;
pub const IMAGE_REL_I386_DIR32NB: u16 = 0x07;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Default)]
pub enum Architecture {
    #[default]
    Amd64 = 0,
    Arm64 = 1,
    I386 = 2,
}

// Indexed by discriminant.
const ARCHITECTURES: [(Architecture, &str, u16); 3] = [
    (Architecture::Amd64, "amd64", IMAGE_REL_AMD64_ADDR32NB),
    (Architecture::Arm64, "arm64", IMAGE_REL_ARM64_ADDR32NB),
    (Architecture::I386, "i386", IMAGE_REL_I386_DIR32NB),
];

impl Architecture {
    pub fn from_name(name: &str) -> Option<Self> {
        ARCHITECTURES
            .iter()
            .find(|(_, n, _)| *n == name)
            .map(|(arch, _, _)| *arch)
    }

    pub fn name(self) -> &'static str {
        ARCHITECTURES[self as usize].1
    }

    /// The relocation type every resource fixup uses on this architecture.
    pub fn relocation_type(self) -> u16 {
        ARCHITECTURES[self as usize].2
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub(crate) fn read_u16(data: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([data[at], data[at + 1]])
}

pub(crate) fn read_u32(data: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}
