use std::cmp::Ordering;
use std::fmt;

use crate::blob::Blob;

/// How an entry is keyed: by integer id or by name. The two key spaces are disjoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceKey {
    Id(u16),
    Name(String),
}

impl ResourceKey {
    /// Names sort before ids; names by UTF-16 code units, ids ascending.
    fn order(&self, other: &ResourceKey) -> Ordering {
        match (self, other) {
            (ResourceKey::Name(a), ResourceKey::Name(b)) => a.encode_utf16().cmp(b.encode_utf16()),
            (ResourceKey::Name(_), ResourceKey::Id(_)) => Ordering::Less,
            (ResourceKey::Id(_), ResourceKey::Name(_)) => Ordering::Greater,
            (ResourceKey::Id(a), ResourceKey::Id(b)) => a.cmp(b),
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKey::Id(id) => write!(f, "#{id}"),
            ResourceKey::Name(name) => write!(f, "{name:?}"),
        }
    }
}

impl From<u16> for ResourceKey {
    fn from(id: u16) -> Self {
        ResourceKey::Id(id)
    }
}

impl From<&str> for ResourceKey {
    fn from(name: &str) -> Self {
        ResourceKey::Name(name.to_string())
    }
}

/// A terminal leaf: one payload and its length.
#[derive(Debug)]
pub struct DataEntry {
    pub(crate) blob: Box<dyn Blob>,
    pub(crate) size: u32,
    pub(crate) codepage: u32,
}

impl DataEntry {
    pub(crate) fn new(blob: Box<dyn Blob>, size: u32) -> Self {
        DataEntry {
            blob,
            size,
            codepage: 0,
        }
    }

    pub fn size(&self) -> u32 {
        self.size
    }
}

#[derive(Debug)]
pub enum EntryTarget {
    Directory(Directory),
    Data(DataEntry),
}

#[derive(Debug)]
pub struct DirectoryEntry {
    pub(crate) key: ResourceKey,
    pub(crate) target: EntryTarget,
}

impl DirectoryEntry {
    pub fn key(&self) -> &ResourceKey {
        &self.key
    }

    pub fn target(&self) -> &EntryTarget {
        &self.target
    }

    pub fn subdirectory(&self) -> Option<&Directory> {
        match &self.target {
            EntryTarget::Directory(directory) => Some(directory),
            EntryTarget::Data(_) => None,
        }
    }

    pub(crate) fn subdirectory_mut(&mut self) -> Option<&mut Directory> {
        match &mut self.target {
            EntryTarget::Directory(directory) => Some(directory),
            EntryTarget::Data(_) => None,
        }
    }
}

/// Most entries of one kind (named or id) a directory header can count.
pub const MAX_ENTRIES: usize = u16::MAX as usize;

#[derive(Debug, Default)]
pub struct Directory {
    pub(crate) characteristics: u32,
    name_entries: Vec<DirectoryEntry>,
    id_entries: Vec<DirectoryEntry>,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name-keyed entries first, then id-keyed, each group in key order.
    pub fn entries(&self) -> impl Iterator<Item = &DirectoryEntry> {
        self.name_entries.iter().chain(self.id_entries.iter())
    }

    pub fn name_entries(&self) -> &[DirectoryEntry] {
        &self.name_entries
    }

    pub fn id_entries(&self) -> &[DirectoryEntry] {
        &self.id_entries
    }

    /// This directory's string pool: the names of its name-keyed entries.
    pub fn strings(&self) -> impl Iterator<Item = &str> {
        self.name_entries.iter().filter_map(|e| match &e.key {
            ResourceKey::Name(name) => Some(name.as_str()),
            ResourceKey::Id(_) => None,
        })
    }

    pub fn find(&self, key: &ResourceKey) -> Option<&DirectoryEntry> {
        let group = self.group(key);
        let index = group.binary_search_by(|e| e.key.order(key)).ok()?;
        group.get(index)
    }

    pub(crate) fn find_mut(&mut self, key: &ResourceKey) -> Option<&mut DirectoryEntry> {
        let group = self.group_mut(key);
        let index = group.binary_search_by(|e| e.key.order(key)).ok()?;
        group.get_mut(index)
    }

    /// Whether another entry of this key's kind still fits the 16-bit count
    /// in the directory header.
    pub(crate) fn has_room_for(&self, key: &ResourceKey) -> bool {
        self.group(key).len() < MAX_ENTRIES
    }

    /// Inserts at the key's sorted position. The caller guarantees the key is absent.
    pub(crate) fn insert(&mut self, key: ResourceKey, target: EntryTarget) -> &mut DirectoryEntry {
        let group = self.group_mut(&key);
        let position = group.partition_point(|e| e.key.order(&key) == Ordering::Less);
        group.insert(position, DirectoryEntry { key, target });
        &mut group[position]
    }

    fn group(&self, key: &ResourceKey) -> &Vec<DirectoryEntry> {
        match key {
            ResourceKey::Id(_) => &self.id_entries,
            ResourceKey::Name(_) => &self.name_entries,
        }
    }

    fn group_mut(&mut self, key: &ResourceKey) -> &mut Vec<DirectoryEntry> {
        match key {
            ResourceKey::Id(_) => &mut self.id_entries,
            ResourceKey::Name(_) => &mut self.name_entries,
        }
    }
}

/// One directory reached by [`Directory::walk`], with each entry's child
/// resolved in `entries()` order.
#[derive(Debug)]
pub(crate) struct Visit<'a> {
    pub(crate) directory: &'a Directory,
    pub(crate) children: Vec<Child<'a>>,
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum Child<'a> {
    /// Position of the subdirectory in the walk.
    Directory(usize),
    Data(&'a DataEntry),
}

impl Directory {
    /// The single traversal order every layout pass and the writer share:
    /// pre-order, a directory before its children, siblings in `entries()` order.
    pub(crate) fn walk(&self) -> Vec<Visit<'_>> {
        let mut visits = Vec::new();
        self.visit(&mut visits);
        visits
    }

    fn visit<'a>(&'a self, visits: &mut Vec<Visit<'a>>) -> usize {
        let index = visits.len();
        visits.push(Visit {
            directory: self,
            children: Vec::with_capacity(self.name_entries.len() + self.id_entries.len()),
        });
        for entry in self.entries() {
            let child = match &entry.target {
                EntryTarget::Directory(subdirectory) => Child::Directory(subdirectory.visit(visits)),
                EntryTarget::Data(data) => Child::Data(data),
            };
            visits[index].children.push(child);
        }
        index
    }
}
