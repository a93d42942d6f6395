//! Secret store backends: file-based and in-memory.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::error::{ClientError, Result};
use crate::store::SecretBackend;

const ENTRY_EXTENSION: &str = "wallet";

/// File-backed blob storage with atomic writes.
///
/// One file per entry under the data directory, written via tmp + rename
/// with owner-only permissions. Suitable where no hardware keystore is
/// available; the blobs are already sealed by [`super::SecretStore`].
pub struct FsBackend {
    base_dir: PathBuf,
}

impl FsBackend {
    pub fn new() -> Result<Self> {
        Self::with_dir(default_data_dir())
    }

    pub fn with_dir(base_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&base_dir)
            .map_err(|e| ClientError::Storage(format!("Cannot create data directory: {e}")))?;
        Ok(Self { base_dir })
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.base_dir.join(format!("{key}.{ENTRY_EXTENSION}"))
    }
}

impl SecretBackend for FsBackend {
    fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        let path = self.entry_path(key);
        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, value)
            .map_err(|e| ClientError::Storage(format!("Failed to write: {e}")))?;
        fs::rename(&tmp_path, &path)
            .map_err(|e| ClientError::Storage(format!("Failed to commit write: {e}")))?;
        set_restrictive_permissions(&path)?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match fs::read(self.entry_path(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ClientError::Storage(format!("Failed to read: {e}"))),
        }
    }

    fn delete(&self, key: &str) -> Result<()> {
        let path = self.entry_path(key);
        if path.exists() {
            fs::remove_file(&path)
                .map_err(|e| ClientError::Storage(format!("Failed to delete: {e}")))?;
        }
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let entries = fs::read_dir(&self.base_dir)
            .map_err(|e| ClientError::Storage(format!("Failed to list entries: {e}")))?;
        for entry in entries {
            let entry = entry.map_err(|e| ClientError::Storage(e.to_string()))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some(ENTRY_EXTENSION) {
                fs::remove_file(&path)
                    .map_err(|e| ClientError::Storage(format!("Failed to delete: {e}")))?;
            }
        }
        Ok(())
    }
}

fn default_data_dir() -> PathBuf {
    if let Some(proj_dirs) = directories::ProjectDirs::from("com", "aurum", "wallet") {
        proj_dirs.data_dir().to_path_buf()
    } else {
        dirs_fallback()
    }
}

fn dirs_fallback() -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".into());
    PathBuf::from(home).join(".aurum")
}

#[cfg(unix)]
fn set_restrictive_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let perms = fs::Permissions::from_mode(0o600);
    fs::set_permissions(path, perms)
        .map_err(|e| ClientError::Storage(format!("Failed to set file permissions: {e}")))?;
    Ok(())
}

#[cfg(not(unix))]
fn set_restrictive_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

/// In-memory backend for tests and ephemeral sessions.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    entries: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SecretBackend for MemoryBackend {
    fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let entries = self
            .entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_backend() -> (FsBackend, PathBuf) {
        let dir = std::env::temp_dir().join(format!("aurum-store-{}", uuid::Uuid::new_v4()));
        (FsBackend::with_dir(dir.clone()).unwrap(), dir)
    }

    #[test]
    fn test_fs_put_get_delete() {
        let (backend, dir) = temp_backend();
        backend.put("abc", b"sealed bytes").unwrap();
        assert_eq!(backend.get("abc").unwrap().unwrap(), b"sealed bytes");

        backend.put("abc", b"replaced").unwrap();
        assert_eq!(backend.get("abc").unwrap().unwrap(), b"replaced");

        backend.delete("abc").unwrap();
        assert!(backend.get("abc").unwrap().is_none());
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_fs_clear_only_touches_entries() {
        let (backend, dir) = temp_backend();
        backend.put("a", b"1").unwrap();
        backend.put("b", b"2").unwrap();
        fs::write(dir.join("unrelated.txt"), b"keep").unwrap();

        backend.clear().unwrap();
        assert!(backend.get("a").unwrap().is_none());
        assert!(backend.get("b").unwrap().is_none());
        assert!(dir.join("unrelated.txt").exists());
        let _ = fs::remove_dir_all(dir);
    }

    #[cfg(unix)]
    #[test]
    fn test_fs_entries_are_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let (backend, dir) = temp_backend();
        backend.put("abc", b"sealed").unwrap();
        let mode = fs::metadata(dir.join("abc.wallet"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_memory_backend_roundtrip() {
        let backend = MemoryBackend::new();
        backend.put("k", b"v").unwrap();
        assert_eq!(backend.get("k").unwrap().unwrap(), b"v");
        backend.clear().unwrap();
        assert!(backend.get("k").unwrap().is_none());
    }
}
