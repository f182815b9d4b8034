//! Synthesizes COFF object files holding a Windows `.rsrc` resource section,
//! so icons, version blocks and manifests can be linked into an executable
//! without a resource compiler.

pub mod blob;
pub mod definition;
pub mod object_file;
pub mod resources;
pub mod serializable;

pub use blob::{Blob, FileBlob};
pub use definition::{Definition, DefinitionError, RawDefinition};
pub use object_file::{ObjectError, ObjectFile, RawSection, Relocation, Section};
pub use resources::{ResourceError, ResourceKey, ResourceSection};
pub use serializable::{Architecture, RecordKind, Serializable, SerializationError, WriteError};
