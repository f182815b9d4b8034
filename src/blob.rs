use std::fmt;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

/// An opaque payload of known length, embedded verbatim into a section.
pub trait Blob: fmt::Debug {
    fn size(&self) -> u64;

    /// Writes exactly `size()` bytes.
    fn write_to(&self, w: &mut dyn Write) -> io::Result<()>;
}

impl Blob for Vec<u8> {
    fn size(&self) -> u64 {
        self.len() as u64
    }

    fn write_to(&self, w: &mut dyn Write) -> io::Result<()> {
        w.write_all(self)
    }
}

impl Blob for &'static [u8] {
    fn size(&self) -> u64 {
        self.len() as u64
    }

    fn write_to(&self, w: &mut dyn Write) -> io::Result<()> {
        w.write_all(self)
    }
}

/// A payload streamed from disk at write time.
///
/// The length is captured when the blob is opened; a file that changes size
/// before the write fails it rather than corrupting the layout.
#[derive(Debug, Clone)]
pub struct FileBlob {
    path: PathBuf,
    size: u64,
}

impl FileBlob {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let size = std::fs::metadata(&path)?.len();
        Ok(FileBlob { path, size })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Blob for FileBlob {
    fn size(&self) -> u64 {
        self.size
    }

    fn write_to(&self, w: &mut dyn Write) -> io::Result<()> {
        let file = File::open(&self.path)?;
        let copied = io::copy(&mut file.take(self.size), w)?;
        if copied != self.size {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "{} shrank from {} to {} bytes",
                    self.path.display(),
                    self.size,
                    copied
                ),
            ));
        }
        Ok(())
    }
}
