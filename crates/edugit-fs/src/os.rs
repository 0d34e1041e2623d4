//! [`DiskStore`] — a [`FileStore`] rooted on a real directory.
//!
//! Virtual paths map below the root directory; the store never touches
//! anything outside it (normalisation already rejected `..` escapes).

use std::fs;
use std::io;
use std::path::PathBuf;

use crate::{path, FileStore, FsError, FsErrorKind, FsResult, NodeKind};

/// A store backed by `std::fs` under a fixed root directory.
pub struct DiskStore {
    root: PathBuf,
}

impl DiskStore {
    /// Create a store rooted at `root`. The directory must exist.
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn real(&self, vpath: &str) -> PathBuf {
        let mut p = self.root.clone();
        for seg in path::segments(vpath) {
            p.push(seg);
        }
        p
    }

    fn map_err(err: &io::Error, vpath: &str) -> FsError {
        let kind = match err.kind() {
            io::ErrorKind::NotFound => FsErrorKind::NotFound,
            io::ErrorKind::AlreadyExists => FsErrorKind::Exists,
            io::ErrorKind::DirectoryNotEmpty => FsErrorKind::NotEmpty,
            _ => FsErrorKind::NotADirectory,
        };
        FsError::new(kind, vpath)
    }
}

impl FileStore for DiskStore {
    fn stat(&self, vpath: &str) -> FsResult<Option<NodeKind>> {
        match fs::metadata(self.real(vpath)) {
            Ok(meta) if meta.is_dir() => Ok(Some(NodeKind::Dir)),
            Ok(_) => Ok(Some(NodeKind::File)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Self::map_err(&e, vpath)),
        }
    }

    fn read_dir(&self, vpath: &str) -> FsResult<Vec<String>> {
        let entries = fs::read_dir(self.real(vpath)).map_err(|e| Self::map_err(&e, vpath))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Self::map_err(&e, vpath))?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    fn read_file(&self, vpath: &str) -> FsResult<Vec<u8>> {
        fs::read(self.real(vpath)).map_err(|e| Self::map_err(&e, vpath))
    }

    fn write_file(&self, vpath: &str, data: &[u8]) -> FsResult<()> {
        fs::write(self.real(vpath), data).map_err(|e| Self::map_err(&e, vpath))
    }

    fn rename(&self, from: &str, to: &str) -> FsResult<()> {
        if matches!(self.stat(to)?, Some(NodeKind::Dir)) {
            return Err(FsError::new(FsErrorKind::Exists, to));
        }
        fs::rename(self.real(from), self.real(to)).map_err(|e| Self::map_err(&e, from))
    }

    fn unlink(&self, vpath: &str) -> FsResult<()> {
        if matches!(self.stat(vpath)?, Some(NodeKind::Dir)) {
            return Err(FsError::new(FsErrorKind::NotADirectory, vpath));
        }
        fs::remove_file(self.real(vpath)).map_err(|e| Self::map_err(&e, vpath))
    }

    fn mkdir(&self, vpath: &str) -> FsResult<()> {
        match fs::create_dir(self.real(vpath)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                if self.is_dir(vpath)? {
                    Ok(())
                } else {
                    Err(FsError::new(FsErrorKind::Exists, vpath))
                }
            }
            Err(e) => Err(Self::map_err(&e, vpath)),
        }
    }

    fn rmdir(&self, vpath: &str) -> FsResult<()> {
        fs::remove_dir(self.real(vpath)).map_err(|e| Self::map_err(&e, vpath))
    }
}
