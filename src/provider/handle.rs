use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{ProviderError, Result};

/// Access modes accepted by `open_document`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// "r"
    Read,
    /// "w" and "wt"
    WriteTruncate,
    /// "wa"
    WriteAppend,
    /// "rw"
    ReadWrite,
    /// "rwt"
    ReadWriteTruncate,
}

impl OpenMode {
    pub fn parse(mode: &str) -> Result<Self> {
        match mode {
            "r" => Ok(OpenMode::Read),
            "w" | "wt" => Ok(OpenMode::WriteTruncate),
            "wa" => Ok(OpenMode::WriteAppend),
            "rw" => Ok(OpenMode::ReadWrite),
            "rwt" => Ok(OpenMode::ReadWriteTruncate),
            other => Err(ProviderError::InvalidMode(other.to_string())),
        }
    }

    pub fn is_write(self) -> bool {
        self != OpenMode::Read
    }

    fn options(self) -> OpenOptions {
        let mut options = OpenOptions::new();
        match self {
            OpenMode::Read => options.read(true),
            OpenMode::WriteTruncate => options.write(true).create(true).truncate(true),
            OpenMode::WriteAppend => options.write(true).create(true).append(true),
            OpenMode::ReadWrite => options.read(true).write(true).create(true),
            OpenMode::ReadWriteTruncate => options.read(true).write(true).create(true).truncate(true),
        };
        options
    }

    pub(crate) fn open(self, path: &Path) -> io::Result<File> {
        self.options().open(path)
    }
}

/// Open file handed to the host for a document.
///
/// Dropping a write-mode handle is the "client is done writing" event.
#[derive(Debug)]
pub struct DocumentHandle {
    document_id: String,
    mode: OpenMode,
    file: File,
}

impl DocumentHandle {
    pub(crate) fn new(document_id: &str, mode: OpenMode, file: File) -> Self {
        Self {
            document_id: document_id.to_string(),
            mode,
            file,
        }
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    pub fn file(&mut self) -> &mut File {
        &mut self.file
    }
}

impl Drop for DocumentHandle {
    fn drop(&mut self) {
        if self.mode.is_write() {
            info!("A file with id {} has been closed", self.document_id);
        }
    }
}

/// Read-only handle on a cached thumbnail.
///
/// The declared length is unknown; readers stream until EOF.
#[derive(Debug)]
pub struct ThumbnailHandle {
    path: PathBuf,
    file: File,
}

impl ThumbnailHandle {
    pub const START_OFFSET: u64 = 0;

    pub(crate) fn open(path: PathBuf) -> Result<Self> {
        let file = File::open(&path)?;
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Always None: the size is only known after reading
    pub fn declared_length(&self) -> Option<u64> {
        None
    }

    pub fn file(&mut self) -> &mut File {
        &mut self.file
    }

    pub fn into_file(self) -> File {
        self.file
    }
}
