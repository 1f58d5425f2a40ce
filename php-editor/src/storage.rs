use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::error::{Error, Result};

/// Where files are read from and written to.
pub trait Storage {
    fn exists(&self, path: &Path) -> bool;

    fn read_all(&self, path: &Path) -> Result<String>;

    fn write_all(&self, path: &Path, contents: &str) -> Result<()>;
}

/// The local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsStorage;

impl Storage for FsStorage {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn read_all(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => Error::FileNotFound(path.to_path_buf()),
            _ => Error::io(path, e),
        })
    }

    fn write_all(&self, path: &Path, contents: &str) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        fs::write(path, contents).map_err(|e| Error::io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_fs_storage() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/Thing.php");
        let storage = FsStorage;

        assert!(!storage.exists(&path));
        assert!(matches!(storage.read_all(&path), Err(Error::FileNotFound(_))));

        storage.write_all(&path, "<?php\n").unwrap();
        assert!(storage.exists(&path));
        assert_eq!(storage.read_all(&path).unwrap(), "<?php\n");
    }
}
