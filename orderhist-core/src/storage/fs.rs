//! Filesystem object store.
//!
//! Layout: `{root}/{bucket}/{key}`, with `/` in keys mapped to directories.
//! Writes are atomic: write to `.tmp`, then rename into place.

use super::{ObjectStore, StorageError};
use std::fs;
use std::path::{Component, Path, PathBuf};

pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `bucket/key` under the root, refusing anything that could
    /// escape it.
    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf, StorageError> {
        let mut path = self.root.clone();
        for part in [bucket, key] {
            let rel = Path::new(part);
            if part.is_empty()
                || rel
                    .components()
                    .any(|c| !matches!(c, Component::Normal(_)))
            {
                return Err(StorageError::InvalidKey(format!("{bucket}/{key}")));
            }
            path.push(rel);
        }
        Ok(path)
    }
}

impl ObjectStore for FsStore {
    fn name(&self) -> &str {
        "fs"
    }

    fn put(&self, bucket: &str, key: &str, body: &[u8]) -> Result<(), StorageError> {
        let path = self.object_path(bucket, key)?;
        let io_err = |source| StorageError::Io {
            key: key.to_string(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let mut tmp_name = path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        fs::write(&tmp_path, body).map_err(io_err)?;
        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            io_err(e)
        })
    }

    fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.object_path(bucket, key)?;
        fs::read(&path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                }
            } else {
                StorageError::Io {
                    key: key.to_string(),
                    source,
                }
            }
        })
    }
}
