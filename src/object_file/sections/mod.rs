pub mod common;
pub mod header;
pub mod raw;

pub use common::Section;
pub use header::SectionHeader;
pub use raw::RawSection;
