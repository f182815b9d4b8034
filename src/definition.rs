use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::blob::FileBlob;
use crate::object_file::{ObjectError, ObjectFile};
use crate::resources::{type_from_name, ResourceError, ResourceKey, ResourceSection};
use crate::serializable::Architecture;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawResourceType {
    Id(u16),
    Name(String),
}

#[derive(Debug, Deserialize)]
pub struct RawResource {
    #[serde(rename = "type")]
    pub typ: RawResourceType,
    #[serde(default)]
    pub id: Option<u16>,
    #[serde(default)]
    pub name: Option<String>,
    pub path: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct RawDefinition {
    #[serde(default)]
    pub architecture: Option<String>,
    #[serde(default)]
    pub resources: Vec<RawResource>,
}

impl RawDefinition {
    pub fn from_str(s: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(s)
    }
}

#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("failed to parse definition: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unknown resource type `{0}`")]
    UnknownType(String),
    #[error("resource #{0} needs exactly one of `id` and `name`")]
    InvalidKey(usize),
    #[error("resource {key} of type {typ} is defined twice")]
    Duplicate { typ: u16, key: ResourceKey },
    #[error(transparent)]
    Object(#[from] ObjectError),
    #[error(transparent)]
    Resource(#[from] ResourceError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDefinition {
    pub typ: u16,
    pub key: ResourceKey,
    pub path: PathBuf,
}

/// A validated description of an object file: its architecture and the files
/// to embed as resources.
#[derive(Debug)]
pub struct Definition {
    pub architecture: Architecture,
    pub resources: Vec<ResourceDefinition>,
    /// Relative resource paths are resolved against this directory.
    pub base_dir: PathBuf,
}

impl TryFrom<RawDefinition> for Definition {
    type Error = DefinitionError;

    fn try_from(raw: RawDefinition) -> Result<Self, Self::Error> {
        let architecture = match raw.architecture {
            Some(name) => Architecture::from_name(&name)
                .ok_or(ObjectError::UnsupportedArchitecture(name))?,
            None => Architecture::default(),
        };

        let mut seen = HashSet::new();
        let mut resources = Vec::with_capacity(raw.resources.len());
        for (index, resource) in raw.resources.into_iter().enumerate() {
            let typ = match resource.typ {
                RawResourceType::Id(id) => id,
                RawResourceType::Name(name) => {
                    type_from_name(&name).ok_or(DefinitionError::UnknownType(name))?
                }
            };
            let key = match (resource.id, resource.name) {
                (Some(id), None) => ResourceKey::Id(id),
                (None, Some(name)) => ResourceKey::Name(name),
                _ => return Err(DefinitionError::InvalidKey(index)),
            };
            if !seen.insert((typ, key.clone())) {
                return Err(DefinitionError::Duplicate { typ, key });
            }
            resources.push(ResourceDefinition {
                typ,
                key,
                path: resource.path,
            });
        }

        Ok(Definition {
            architecture,
            resources,
            base_dir: PathBuf::from("."),
        })
    }
}

impl TryFrom<String> for Definition {
    type Error = DefinitionError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Definition::try_from(RawDefinition::from_str(&s)?)
    }
}

impl Definition {
    /// Parses a definition whose relative resource paths resolve against `base_dir`.
    pub fn from_str(yaml: &str, base_dir: impl Into<PathBuf>) -> Result<Self, DefinitionError> {
        let mut definition = Definition::try_from(RawDefinition::from_str(yaml)?)?;
        definition.base_dir = base_dir.into();
        Ok(definition)
    }

    /// Reads a definition file; resource paths are relative to its directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DefinitionError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| DefinitionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Definition::from_str(&text, base_dir)
    }

    /// Builds an object file with one `.rsrc` section holding every resource.
    pub fn build(&self) -> Result<ObjectFile, DefinitionError> {
        let mut section = ResourceSection::new();
        for resource in &self.resources {
            let path = self.base_dir.join(&resource.path);
            let blob = FileBlob::open(&path).map_err(|source| DefinitionError::Io {
                path: path.clone(),
                source,
            })?;
            section.add(resource.typ, resource.key.clone(), Box::new(blob))?;
        }

        let mut object = ObjectFile::with_architecture(self.architecture);
        object.add_section(section)?;
        Ok(object)
    }
}
