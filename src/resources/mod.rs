//! The `.rsrc` section: a three-level resource tree (type, then id or name,
//! then language) laid out and serialized the way the PE resource format
//! expects.

pub use directory::{
    DataEntry, Directory, DirectoryEntry, EntryTarget, ResourceKey, MAX_ENTRIES,
};
pub use records::{
    DataDescriptor, DirectoryEntryRecord, DirectoryHeader, ResourceString, MAX_NAME_UNITS,
};
pub use types::*;

use std::io::Write;

use log::debug;
use thiserror::Error;

use crate::blob::Blob;
use crate::object_file::{Relocation, Section};
use crate::serializable::WriteError;

pub mod directory;
pub(crate) mod layout;
pub mod records;
pub mod types;
pub(crate) mod writer;

/// en-US; the only language resources are filed under.
pub const LANG_EN_US: u16 = 0x0409;

pub const SECTION_NAME: &str = ".rsrc";

#[derive(Debug, Error)]
pub enum ResourceError {
    /// The tree holds a type entry that is not a directory. Indicates a bug.
    #[error("resource type {0} has no subdirectory")]
    MissingSubdirectory(u16),
    #[error("resource {key} of type {typ} already exists")]
    DuplicateResource { typ: u16, key: ResourceKey },
    #[error("resource payload of {0} bytes does not fit a 32-bit size")]
    PayloadTooLarge(u64),
    #[error("section would grow to {0} bytes, past the 32-bit limit")]
    SectionTooLarge(u64),
    #[error("resource name of {0} UTF-16 units is longer than a length prefix can hold")]
    NameTooLong(usize),
    #[error("resource type directory is full")]
    TooManyTypes,
    #[error("resource type {0} already holds as many resources of that kind as it can")]
    TooManyResources(u16),
}

#[derive(Debug)]
pub struct ResourceSection {
    root: Directory,
    /// Serialized size of `root`, grown with every insertion.
    size: u64,
}

impl Default for ResourceSection {
    fn default() -> Self {
        ResourceSection {
            root: Directory::new(),
            size: u64::from(DirectoryHeader::SIZE),
        }
    }
}

impl ResourceSection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(&self) -> &Directory {
        &self.root
    }

    pub fn add_by_id(
        &mut self,
        typ: u16,
        id: u16,
        blob: impl Blob + 'static,
    ) -> Result<(), ResourceError> {
        self.add(typ, ResourceKey::Id(id), Box::new(blob))
    }

    pub fn add_by_name(
        &mut self,
        typ: u16,
        name: &str,
        blob: impl Blob + 'static,
    ) -> Result<(), ResourceError> {
        self.add(typ, ResourceKey::Name(name.to_string()), Box::new(blob))
    }

    /// Files `blob` under `typ`/`key`/en-US. Fails without touching the tree
    /// if the pair is already present or the section would outgrow the
    /// 32-bit fields that describe it.
    pub fn add(
        &mut self,
        typ: u16,
        key: ResourceKey,
        blob: Box<dyn Blob>,
    ) -> Result<(), ResourceError> {
        let size = u32::try_from(blob.size())
            .map_err(|_| ResourceError::PayloadTooLarge(blob.size()))?;
        if let ResourceKey::Name(name) = &key {
            let units = name.encode_utf16().count();
            if units > MAX_NAME_UNITS {
                return Err(ResourceError::NameTooLong(units));
            }
        }

        let type_key = ResourceKey::Id(typ);
        let type_growth = match self.root.find(&type_key) {
            Some(entry) => {
                let subdirectory = entry
                    .subdirectory()
                    .ok_or(ResourceError::MissingSubdirectory(typ))?;
                if subdirectory.find(&key).is_some() {
                    return Err(ResourceError::DuplicateResource { typ, key });
                }
                if !subdirectory.has_room_for(&key) {
                    return Err(ResourceError::TooManyResources(typ));
                }
                0
            }
            None => {
                if !self.root.has_room_for(&type_key) {
                    return Err(ResourceError::TooManyTypes);
                }
                u64::from(DirectoryEntryRecord::SIZE + DirectoryHeader::SIZE)
            }
        };
        let total = self.size + type_growth + resource_growth(&key, size);
        if total > u64::from(u32::MAX) {
            return Err(ResourceError::SectionTooLarge(total));
        }

        if type_growth > 0 {
            self.root
                .insert(type_key.clone(), EntryTarget::Directory(Directory::new()));
        }
        let type_directory = self
            .root
            .find_mut(&type_key)
            .and_then(DirectoryEntry::subdirectory_mut)
            .ok_or(ResourceError::MissingSubdirectory(typ))?;

        debug!("adding resource {key} of type {typ} ({size} bytes)");
        let mut language = Directory::new();
        language.insert(
            ResourceKey::Id(LANG_EN_US),
            EntryTarget::Data(DataEntry::new(blob, size)),
        );
        type_directory.insert(key, EntryTarget::Directory(language));
        self.size = total;
        Ok(())
    }

    /// Whether any type holds a resource with this id. Looks at the second level only.
    pub fn id_exists(&self, id: u16) -> bool {
        self.second_level_has(&ResourceKey::Id(id))
    }

    /// Whether any type holds a resource with this name. Looks at the second level only.
    pub fn name_exists(&self, name: &str) -> bool {
        self.second_level_has(&ResourceKey::Name(name.to_string()))
    }

    fn second_level_has(&self, key: &ResourceKey) -> bool {
        self.root
            .entries()
            .filter_map(DirectoryEntry::subdirectory)
            .any(|directory| directory.find(key).is_some())
    }

    /// Number of resources in the tree.
    pub fn resource_count(&self) -> usize {
        self.root
            .entries()
            .filter_map(DirectoryEntry::subdirectory)
            .map(|directory| directory.entries().count())
            .sum()
    }
}

/// Bytes one resource adds below its type directory: its entry and name,
/// the language directory, the data descriptor and the payload.
fn resource_growth(key: &ResourceKey, size: u32) -> u64 {
    let name = match key {
        ResourceKey::Name(name) => ResourceString::new(name).size(),
        ResourceKey::Id(_) => 0,
    };
    u64::from(DirectoryEntryRecord::SIZE)
        + u64::from(name)
        + u64::from(DirectoryHeader::SIZE + DirectoryEntryRecord::SIZE)
        + u64::from(DataDescriptor::SIZE)
        + u64::from(size)
}

impl Section for ResourceSection {
    fn name(&self) -> &str {
        SECTION_NAME
    }

    fn size(&self) -> u32 {
        layout::freeze(&self.root).size
    }

    fn relocations(&self) -> Vec<Relocation> {
        layout::freeze(&self.root).relocations
    }

    fn write_to(&self, w: &mut dyn Write) -> Result<u64, WriteError> {
        let layout = layout::freeze(&self.root);
        debug_assert_eq!(u64::from(layout.size), self.size);
        debug!(
            "writing {SECTION_NAME}: {} bytes, {} relocations",
            layout.size,
            layout.relocations.len()
        );
        writer::write(&layout, w)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serializable::{RecordKind, Serializable};

    fn read<T: Serializable>(data: &[u8], offset: u32) -> T {
        T::deserialize(&data[offset as usize..]).unwrap().1
    }

    fn written(section: &ResourceSection) -> Vec<u8> {
        let mut out = Vec::new();
        let n = section.write_to(&mut out).unwrap();
        assert_eq!(n, out.len() as u64);
        assert_eq!(n, section.size() as u64);
        assert_eq!(n, section.size);
        out
    }

    #[test]
    fn name_and_empty_section() {
        let section = ResourceSection::new();
        assert_eq!(section.name(), ".rsrc");
        assert_eq!(written(&section).len(), 16);
        assert!(section.relocations().is_empty());
    }

    #[test]
    fn existence_checks() {
        let mut section = ResourceSection::new();
        section.add_by_id(RT_ICON, 1, vec![0; 4]).unwrap();
        section.add_by_name(RT_RCDATA, "CONFIG", vec![1; 2]).unwrap();

        assert!(section.id_exists(1));
        assert!(!section.id_exists(2));
        assert!(section.name_exists("CONFIG"));
        assert!(!section.name_exists("config"));
        assert!(!section.name_exists("missing"));
        // the type and language levels are not searched
        assert!(!section.id_exists(RT_ICON));
        assert!(!section.id_exists(LANG_EN_US));
        assert_eq!(section.resource_count(), 2);
    }

    #[test]
    fn duplicates_are_rejected() {
        let mut section = ResourceSection::new();
        section.add_by_id(RT_MANIFEST, 1, vec![0; 4]).unwrap();
        let err = section.add_by_id(RT_MANIFEST, 1, vec![0; 8]).unwrap_err();
        assert!(matches!(
            err,
            ResourceError::DuplicateResource { typ: RT_MANIFEST, key: ResourceKey::Id(1) }
        ));
        section.add_by_name(RT_MANIFEST, "one", vec![0; 1]).unwrap();
        assert!(section.add_by_name(RT_MANIFEST, "one", vec![0; 1]).is_err());
        // same key under another type is fine
        section.add_by_id(RT_VERSION, 1, vec![0; 4]).unwrap();
        assert_eq!(section.resource_count(), 3);
        assert_eq!(section.relocations().len(), 3);
    }

    #[test]
    fn single_icon_writes_three_levels() {
        let mut section = ResourceSection::new();
        section.add_by_id(3, 1, vec![0xab; 100]).unwrap();
        let out = written(&section);
        assert_eq!(out.len(), 188);

        let mut offset = 0;
        for expected_key in [3u32, 1, 0x409] {
            let header: DirectoryHeader = read(&out, offset);
            assert_eq!(header.name_entry_count, 0);
            assert_eq!(header.id_entry_count, 1);
            let entry: DirectoryEntryRecord = read(&out, offset + 16);
            assert_eq!(entry.key, expected_key);
            if expected_key == 0x409 {
                assert!(!entry.is_subdirectory());
                offset = entry.target;
            } else {
                assert!(entry.is_subdirectory());
                offset = entry.target_offset();
            }
        }

        let descriptor: DataDescriptor = read(&out, offset);
        assert_eq!(descriptor.size, 100);
        assert_eq!(descriptor.data_rva, 88);
        assert!(out[88..].iter().all(|&b| b == 0xab));
        assert_eq!(section.relocations(), vec![Relocation::new(72)]);
    }

    #[test]
    fn two_ids_share_one_type_directory() {
        let mut section = ResourceSection::new();
        section.add_by_id(3, 1, vec![0xa; 10]).unwrap();
        section.add_by_id(3, 2, vec![0xb; 20]).unwrap();
        let out = written(&section);

        let root: DirectoryHeader = read(&out, 0);
        assert_eq!(root.id_entry_count, 1);
        let type_entry: DirectoryEntryRecord = read(&out, 16);
        let type_header: DirectoryHeader = read(&out, type_entry.target_offset());
        assert_eq!(type_header.id_entry_count, 2);

        let first: DirectoryEntryRecord = read(&out, type_entry.target_offset() + 16);
        let second: DirectoryEntryRecord = read(&out, type_entry.target_offset() + 24);
        assert_eq!((first.key, second.key), (1, 2));
        assert_ne!(first.target_offset(), second.target_offset());

        let descriptors: Vec<DataDescriptor> = section
            .relocations()
            .iter()
            .map(|r| read(&out, r.virtual_address))
            .collect();
        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[0].size, 10);
        assert_eq!(descriptors[1].size, 20);
        assert_eq!(&out[descriptors[1].data_rva as usize..], &[0xb; 20]);
    }

    #[test]
    fn names_are_written_as_utf16_strings() {
        let mut section = ResourceSection::new();
        section.add_by_name(RT_ICON, "Ünïcode", vec![7; 3]).unwrap();
        let out = written(&section);

        let type_entry: DirectoryEntryRecord = read(&out, 16);
        let type_header: DirectoryHeader = read(&out, type_entry.target_offset());
        assert_eq!(type_header.name_entry_count, 1);
        assert_eq!(type_header.id_entry_count, 0);

        let named: DirectoryEntryRecord = read(&out, type_entry.target_offset() + 16);
        assert!(named.is_named());
        let string: ResourceString = read(&out, named.key_offset());
        assert_eq!(string.to_string_lossy(), "Ünïcode");
    }

    #[derive(Debug)]
    struct Short;

    impl Blob for Short {
        fn size(&self) -> u64 {
            10
        }
        fn write_to(&self, w: &mut dyn Write) -> std::io::Result<()> {
            w.write_all(&[0; 4])
        }
    }

    #[test]
    fn short_payload_is_reported() {
        let mut section = ResourceSection::new();
        section.add_by_id(RT_RCDATA, 1, Short).unwrap();
        let err = section.write_to(&mut Vec::new()).unwrap_err();
        assert_eq!(err.record, RecordKind::ResourceData);
        assert_eq!(err.index, 0);
    }

    struct FailAfter(usize);

    impl Write for FailAfter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if self.0 < buf.len() {
                return Err(std::io::Error::other("closed"));
            }
            self.0 -= buf.len();
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn stream_failure_names_the_record() {
        let mut section = ResourceSection::new();
        section.add_by_id(3, 1, vec![0; 4]).unwrap();
        section.add_by_id(3, 2, vec![0; 4]).unwrap();

        // root header + entry, type header + 2 entries, then the first id directory
        let err = section.write_to(&mut FailAfter(16 + 8 + 16 + 16 + 16)).unwrap_err();
        assert_eq!(err.record, RecordKind::ResourceDirectoryEntry);
        assert_eq!(err.index, 0);
        assert_eq!(err.written, 72);
    }

    #[derive(Debug)]
    struct Huge(u64);

    impl Blob for Huge {
        fn size(&self) -> u64 {
            self.0
        }
        fn write_to(&self, _: &mut dyn Write) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn section_total_stays_within_32_bits() {
        let mut section = ResourceSection::new();
        assert!(matches!(
            section.add_by_id(RT_RCDATA, 1, Huge(1 << 32)),
            Err(ResourceError::PayloadTooLarge(_))
        ));
        section.add_by_id(RT_RCDATA, 1, Huge(0xC000_0000)).unwrap();
        let err = section.add_by_id(RT_RCDATA, 2, Huge(0xC000_0000)).unwrap_err();
        assert!(matches!(
            err,
            ResourceError::SectionTooLarge(total) if total > u64::from(u32::MAX)
        ));

        assert_eq!(section.resource_count(), 1);
        assert!(!section.id_exists(2));
        assert_eq!(section.size(), 88 + 0xC000_0000);
    }

    #[test]
    fn tracked_size_matches_layout() {
        let mut section = ResourceSection::new();
        section.add_by_name(RT_ICON, "ONE", vec![1; 3]).unwrap();
        section.add_by_id(RT_ICON, 4, vec![2; 5]).unwrap();
        section.add_by_name(RT_MANIFEST, "Ünïcode", vec![3; 7]).unwrap();
        assert_eq!(u64::from(section.size()), section.size);
        written(&section);
    }

    #[test]
    fn names_must_fit_the_length_prefix() {
        let mut section = ResourceSection::new();
        let err = section
            .add_by_name(RT_RCDATA, &"A".repeat(70_000), vec![0; 1])
            .unwrap_err();
        assert!(matches!(err, ResourceError::NameTooLong(70_000)));
        assert_eq!(section.resource_count(), 0);

        let longest = "B".repeat(MAX_NAME_UNITS);
        section.add_by_name(RT_RCDATA, &longest, vec![0; 1]).unwrap();
        let out = written(&section);
        let type_entry: DirectoryEntryRecord = read(&out, 16);
        let named: DirectoryEntryRecord = read(&out, type_entry.target_offset() + 16);
        let string: ResourceString = read(&out, named.key_offset());
        assert_eq!(string.units.len(), MAX_NAME_UNITS);
    }

    #[test]
    fn id_count_fits_the_directory_header() {
        let mut section = ResourceSection::new();
        for id in 0..u16::MAX {
            section.add_by_id(RT_RCDATA, id, Vec::new()).unwrap();
        }
        let err = section.add_by_id(RT_RCDATA, u16::MAX, Vec::new()).unwrap_err();
        assert!(matches!(err, ResourceError::TooManyResources(RT_RCDATA)));
        // names are counted separately
        section.add_by_name(RT_RCDATA, "EXTRA", Vec::new()).unwrap();

        let layout = layout::freeze(section.root());
        assert_eq!(layout.directories[1].header.id_entry_count, u16::MAX);
        assert_eq!(layout.directories[1].header.name_entry_count, 1);
    }

    #[test]
    fn type_count_fits_the_root_header() {
        let mut section = ResourceSection::new();
        for typ in 0..u16::MAX {
            section.add_by_id(typ, 1, Vec::new()).unwrap();
        }
        let err = section.add_by_id(u16::MAX, 1, Vec::new()).unwrap_err();
        assert!(matches!(err, ResourceError::TooManyTypes));
        assert_eq!(section.resource_count(), MAX_ENTRIES);
    }
}
