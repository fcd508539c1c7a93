//! Directory backed store
//!
//! Each label maps to `<hex(sha256(label))>.p12` inside the store directory, re-encrypted with
//! the store passphrase. The digest keeps entry names a fixed 68 bytes for any label.
//! Mutations take an exclusive lock on `<dir>/.lock` so that concurrent processes cannot
//! interleave a check and a write; reads take a shared lock.

use super::{DeleteOutcome, SecureStore};
use crate::bundle::Identity;
use crate::error::StoreError;
use fs4::fs_std::FileExt;
use sha2::{Digest, Sha256};
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::debug;
use zeroize::Zeroizing;

/// Directory name used under the platform data directory.
pub const STORE_DIR_NAME: &str = "pairing-identity";

const LOCK_FILE_NAME: &str = ".lock";
const ENTRY_EXTENSION: &str = "p12";

/// Persistent store keeping one encrypted PKCS#12 file per label.
pub struct FileStore {
    dir: PathBuf,
    passphrase: Zeroizing<String>,
}

impl FileStore {
    /// Open (creating if needed) a store rooted at `dir`.
    ///
    /// A directory created here is restricted to the owner; an existing one is used as is.
    /// `passphrase` encrypts every entry at rest; opening an existing store with a different
    /// passphrase succeeds but its entries will fail to read with `StoreError::Corrupt`.
    pub fn open(dir: impl Into<PathBuf>, passphrase: &str) -> Result<Self, StoreError> {
        let dir = dir.into();
        let created = !dir.is_dir();
        std::fs::create_dir_all(&dir)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if created {
                std::fs::set_permissions(&dir, std::fs::Permissions::from_mode(0o700))?;
            }
        }
        #[cfg(not(unix))]
        let _ = created;

        Ok(Self {
            dir,
            passphrase: Zeroizing::new(passphrase.to_string()),
        })
    }

    /// `<local data dir>/pairing-identity`, if the platform has a data directory.
    #[must_use]
    pub fn default_dir() -> Option<PathBuf> {
        dirs::data_local_dir().map(|dir| dir.join(STORE_DIR_NAME))
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, label: &str) -> PathBuf {
        let digest = Sha256::digest(label.as_bytes());
        self.dir
            .join(format!("{}.{ENTRY_EXTENSION}", hex::encode(digest)))
    }

    /// Lock is released when the returned file is dropped.
    fn lock(&self, exclusive: bool) -> Result<File, StoreError> {
        let lock_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(self.dir.join(LOCK_FILE_NAME))?;

        let locked = if exclusive {
            lock_file.lock_exclusive()
        } else {
            lock_file.lock_shared()
        };
        locked.map_err(|e| StoreError::Unavailable(format!("failed to acquire store lock: {e}")))?;

        Ok(lock_file)
    }
}

impl SecureStore for FileStore {
    fn add(&self, label: &str, identity: &Identity) -> Result<(), StoreError> {
        let _lock = self.lock(true)?;
        let path = self.entry_path(label);

        if path.exists() {
            return Err(StoreError::Duplicate(label.to_string()));
        }

        let encoded = Zeroizing::new(identity.to_pkcs12(label, &self.passphrase)?);

        // NamedTempFile is created 0600 on Unix
        let mut temp = tempfile::NamedTempFile::new_in(&self.dir)?;
        temp.write_all(&encoded)?;
        temp.as_file().sync_all()?;
        temp.persist(&path).map_err(|e| StoreError::Io(e.error))?;

        debug!(path = %path.display(), "wrote identity entry");
        Ok(())
    }

    fn query(&self, label: &str) -> Result<Option<Identity>, StoreError> {
        let _lock = self.lock(false)?;

        let bytes = match std::fs::read(self.entry_path(label)) {
            Ok(bytes) => Zeroizing::new(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::Io(e)),
        };

        let corrupt = |reason: String| StoreError::Corrupt {
            label: label.to_string(),
            reason,
        };

        Identity::from_pkcs12(&bytes, &self.passphrase)
            .map_err(corrupt)?
            .ok_or_else(|| corrupt("entry holds no private key".to_string()))
            .map(Some)
    }

    fn delete(&self, label: &str) -> Result<DeleteOutcome, StoreError> {
        let _lock = self.lock(true)?;

        match std::fs::remove_file(self.entry_path(label)) {
            Ok(()) => Ok(DeleteOutcome::Deleted),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(DeleteOutcome::NotFound),
            Err(e) => Err(StoreError::Io(e)),
        }
    }
}

impl std::fmt::Debug for FileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStore")
            .field("dir", &self.dir)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::IdentityBundle;
    use tempfile::TempDir;

    const CLIENT_P12: &[u8] = include_bytes!("../../tests/fixtures/client.p12");

    fn identity() -> Identity {
        IdentityBundle::new(CLIENT_P12, "secret")
            .decode()
            .unwrap()
            .remove(0)
            .into_identity()
    }

    #[test]
    fn test_entries_survive_reopen() {
        let dir = TempDir::new().unwrap();

        let store = FileStore::open(dir.path(), "store-pass").unwrap();
        store.add("slot", &identity()).unwrap();
        drop(store);

        let reopened = FileStore::open(dir.path(), "store-pass").unwrap();
        assert_eq!(reopened.query("slot").unwrap(), Some(identity()));
    }

    #[test]
    fn test_duplicate_add_is_rejected() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path(), "store-pass").unwrap();

        store.add("slot", &identity()).unwrap();
        let err = store.add("slot", &identity()).unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
    }

    #[test]
    fn test_wrong_store_passphrase_reports_corrupt_entry() {
        let dir = TempDir::new().unwrap();
        FileStore::open(dir.path(), "store-pass")
            .unwrap()
            .add("slot", &identity())
            .unwrap();

        let other = FileStore::open(dir.path(), "not-the-pass").unwrap();
        let err = other.query("slot").unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { label, .. } if label == "slot"));
    }

    #[test]
    fn test_delete() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path(), "store-pass").unwrap();

        assert_eq!(store.delete("slot").unwrap(), DeleteOutcome::NotFound);
        store.add("slot", &identity()).unwrap();
        assert_eq!(store.delete("slot").unwrap(), DeleteOutcome::Deleted);
        assert!(store.query("slot").unwrap().is_none());
    }

    #[test]
    fn test_label_is_hashed_on_disk() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path(), "store-pass").unwrap();
        store.add("../escape", &identity()).unwrap();

        let expected = dir
            .path()
            .join(format!("{}.p12", hex::encode(Sha256::digest("../escape"))));
        assert!(expected.is_file());
    }

    #[test]
    fn test_long_label() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path(), "store-pass").unwrap();
        let label = "tv-".repeat(100);

        store.add(&label, &identity()).unwrap();
        assert_eq!(store.query(&label).unwrap(), Some(identity()));
        assert_eq!(
            store.entry_path(&label).file_name().map(|name| name.len()),
            Some(68)
        );
        assert_eq!(store.delete(&label).unwrap(), DeleteOutcome::Deleted);
    }

    #[cfg(unix)]
    #[test]
    fn test_created_directory_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let root = TempDir::new().unwrap();
        let store = FileStore::open(root.path().join("nested/store"), "store-pass").unwrap();

        let mode = std::fs::metadata(store.dir()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o700);
    }

    #[cfg(unix)]
    #[test]
    fn test_existing_directory_keeps_its_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        std::fs::set_permissions(dir.path(), std::fs::Permissions::from_mode(0o755)).unwrap();

        let store = FileStore::open(dir.path(), "store-pass").unwrap();
        let mode = std::fs::metadata(store.dir()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[cfg(unix)]
    #[test]
    fn test_entry_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path(), "store-pass").unwrap();
        store.add("slot", &identity()).unwrap();

        let mode = std::fs::metadata(store.entry_path("slot"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o077, 0);
    }
}
