use log::{debug, trace};

use super::directory::{Child, DataEntry, Directory, ResourceKey, Visit};
use super::records::{
    DataDescriptor, DirectoryEntryRecord, DirectoryHeader, ResourceString, HIGH_BIT,
};
use crate::object_file::Relocation;

/// Running byte cursor shared by the four layout passes.
#[derive(Debug, Default)]
struct LayoutContext {
    cursor: u32,
}

impl LayoutContext {
    /// Reserves `size` bytes and returns where they start.
    fn place(&mut self, size: u32) -> u32 {
        let offset = self.cursor;
        self.cursor += size;
        offset
    }
}

#[derive(Debug)]
pub(crate) struct PlacedDirectory {
    pub(crate) offset: u32,
    pub(crate) header: DirectoryHeader,
    /// (offset, record) per entry, in `entries()` order.
    pub(crate) entries: Vec<(u32, DirectoryEntryRecord)>,
}

#[derive(Debug)]
pub(crate) struct PlacedString {
    pub(crate) offset: u32,
    pub(crate) string: ResourceString,
}

#[derive(Debug)]
pub(crate) struct PlacedData<'a> {
    pub(crate) descriptor_offset: u32,
    pub(crate) descriptor: DataDescriptor,
    pub(crate) entry: &'a DataEntry,
}

/// A frozen resource tree: every record resolved to its final bytes and offset.
///
/// Records appear in the order they are written: directory headers with their
/// entries, then strings, then data descriptors, then payloads.
#[derive(Debug)]
pub(crate) struct Layout<'a> {
    pub(crate) directories: Vec<PlacedDirectory>,
    pub(crate) strings: Vec<PlacedString>,
    pub(crate) data: Vec<PlacedData<'a>>,
    pub(crate) relocations: Vec<Relocation>,
    pub(crate) size: u32,
}

/// Lays out the tree under `root`. Pure: the same tree always yields the same layout.
pub(crate) fn freeze(root: &Directory) -> Layout<'_> {
    let visits = root.walk();
    let mut context = LayoutContext::default();

    // Pass 1: directory headers, each followed by its entries.
    let mut directory_offsets = Vec::with_capacity(visits.len());
    let mut entry_offsets = Vec::with_capacity(visits.len());
    for visit in &visits {
        directory_offsets.push(context.place(DirectoryHeader::SIZE));
        let offsets: Vec<u32> = visit
            .children
            .iter()
            .map(|_| context.place(DirectoryEntryRecord::SIZE))
            .collect();
        entry_offsets.push(offsets);
    }
    trace!("resource directories end at {:#x}", context.cursor);

    // Pass 2: every directory's string pool.
    let mut strings = Vec::new();
    let mut string_offsets = Vec::with_capacity(visits.len());
    for visit in &visits {
        let mut offsets = Vec::new();
        for name in visit.directory.strings() {
            let string = ResourceString::new(name);
            let offset = context.place(string.size());
            offsets.push(offset);
            strings.push(PlacedString { offset, string });
        }
        string_offsets.push(offsets);
    }
    trace!("resource strings end at {:#x}", context.cursor);

    // Pass 3: data descriptors, one relocation each.
    let mut entries = Vec::new();
    let mut descriptor_offsets = Vec::new();
    let mut relocations = Vec::new();
    for entry in data_entries(&visits) {
        let offset = context.place(DataDescriptor::SIZE);
        relocations.push(Relocation::new(offset));
        descriptor_offsets.push(offset);
        entries.push(entry);
    }
    trace!("resource data descriptors end at {:#x}", context.cursor);

    // Pass 4: raw payloads, unpadded.
    let data: Vec<PlacedData<'_>> = entries
        .into_iter()
        .zip(descriptor_offsets.iter())
        .map(|(entry, descriptor_offset)| PlacedData {
            descriptor_offset: *descriptor_offset,
            descriptor: DataDescriptor {
                data_rva: context.place(entry.size),
                size: entry.size,
                codepage: entry.codepage,
                reserved: 0,
            },
            entry,
        })
        .collect();

    let directories = resolve_entries(
        &visits,
        &directory_offsets,
        entry_offsets,
        &string_offsets,
        &descriptor_offsets,
    );

    debug!(
        "froze resource tree: {} directories, {} strings, {} data entries, {:#x} bytes",
        directories.len(),
        strings.len(),
        data.len(),
        context.cursor
    );
    Layout {
        directories,
        strings,
        data,
        relocations,
        size: context.cursor,
    }
}

/// Terminal entries in walk order, the order passes 3 and 4 place them in.
fn data_entries<'a, 'b>(
    visits: &'b [Visit<'a>],
) -> impl Iterator<Item = &'a DataEntry> + 'b {
    visits.iter().flat_map(|visit| {
        visit.children.iter().filter_map(|child| match child {
            Child::Data(entry) => Some(*entry),
            Child::Directory(_) => None,
        })
    })
}

fn resolve_entries(
    visits: &[Visit<'_>],
    directory_offsets: &[u32],
    entry_offsets: Vec<Vec<u32>>,
    string_offsets: &[Vec<u32>],
    descriptor_offsets: &[u32],
) -> Vec<PlacedDirectory> {
    let mut next_data = 0;
    visits
        .iter()
        .zip(entry_offsets)
        .enumerate()
        .map(|(index, (visit, offsets))| {
            let directory = visit.directory;
            let mut next_string = 0;
            let entries = directory
                .entries()
                .zip(&visit.children)
                .zip(offsets)
                .map(|((entry, child), offset)| {
                    let key = match &entry.key {
                        ResourceKey::Id(id) => u32::from(*id),
                        ResourceKey::Name(_) => {
                            next_string += 1;
                            string_offsets[index][next_string - 1] | HIGH_BIT
                        }
                    };
                    let target = match child {
                        Child::Directory(walk_index) => directory_offsets[*walk_index] | HIGH_BIT,
                        Child::Data(_) => {
                            next_data += 1;
                            descriptor_offsets[next_data - 1]
                        }
                    };
                    (offset, DirectoryEntryRecord { key, target })
                })
                .collect();

            PlacedDirectory {
                offset: directory_offsets[index],
                header: DirectoryHeader {
                    characteristics: directory.characteristics,
                    timestamp: 0,
                    major_version: 0,
                    minor_version: 0,
                    name_entry_count: directory.name_entries().len() as u16,
                    id_entry_count: directory.id_entries().len() as u16,
                },
                entries,
            }
        })
        .collect()
}
