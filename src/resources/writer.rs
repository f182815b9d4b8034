use std::io::{self, Write};

use super::layout::Layout;
use crate::serializable::{RecordKind, RecordWriter, WriteError};

/// Writes a frozen tree. Returns the number of bytes written.
pub(crate) fn write(layout: &Layout<'_>, w: &mut dyn Write) -> Result<u64, WriteError> {
    let mut writer = RecordWriter::new(w);

    for (i, directory) in layout.directories.iter().enumerate() {
        debug_assert_eq!(writer.written(), directory.offset as u64);
        writer.record(&directory.header, RecordKind::ResourceDirectory, i)?;
        for (j, (offset, entry)) in directory.entries.iter().enumerate() {
            debug_assert_eq!(writer.written(), *offset as u64);
            writer.record(entry, RecordKind::ResourceDirectoryEntry, j)?;
        }
    }

    for (i, string) in layout.strings.iter().enumerate() {
        debug_assert_eq!(writer.written(), string.offset as u64);
        writer.record(&string.string, RecordKind::ResourceString, i)?;
    }

    for (i, data) in layout.data.iter().enumerate() {
        debug_assert_eq!(writer.written(), data.descriptor_offset as u64);
        writer.record(&data.descriptor, RecordKind::ResourceDataEntry, i)?;
    }

    for (i, data) in layout.data.iter().enumerate() {
        let before = writer.written();
        writer.stream(RecordKind::ResourceData, i, |w| data.entry.blob.write_to(w))?;
        let emitted = writer.written() - before;
        if emitted != data.descriptor.size as u64 {
            return Err(WriteError {
                record: RecordKind::ResourceData,
                index: i,
                written: writer.written(),
                source: io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("payload wrote {emitted} bytes, declared {}", data.descriptor.size),
                ),
            });
        }
    }

    Ok(writer.written())
}
