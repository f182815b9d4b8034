use std::fmt::Debug;
use std::io::Write;

use crate::object_file::relocations::Relocation;
use crate::serializable::WriteError;

/// What the container needs from every section it holds.
///
/// `size`, `relocations` and `write_to` must agree with each other for any
/// state of the section: `write_to` emits exactly `size()` bytes and every
/// relocation addresses a byte inside them.
pub trait Section: Debug {
    /// Identity of the section within a container.
    fn name(&self) -> &str;

    fn size(&self) -> u32;

    fn relocations(&self) -> Vec<Relocation>;

    /// Returns the number of bytes written.
    fn write_to(&self, w: &mut dyn Write) -> Result<u64, WriteError>;
}
