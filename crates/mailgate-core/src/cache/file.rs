//! File-backed credential cache.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use super::{CredentialCache, CredentialResult};

/// Credential cache stored in a single file, replaced atomically.
#[derive(Debug, Clone)]
pub struct FileCredentialCache {
    path: PathBuf,
}

impl FileCredentialCache {
    /// Creates a cache backed by `path`. Nothing is touched until first use.
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Location of the cache file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialCache for FileCredentialCache {
    fn load(&self) -> CredentialResult<Option<Vec<u8>>> {
        match fs::read(&self.path) {
            Ok(blob) => Ok(Some(blob)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No credential cache on disk");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, blob: &[u8]) -> CredentialResult<()> {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)?;

        // Same directory keeps the rename on one filesystem.
        let mut temp = NamedTempFile::new_in(&parent)?;
        temp.write_all(blob)?;
        temp.as_file().sync_all()?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(temp.path(), fs::Permissions::from_mode(0o600))?;
        }

        temp.persist(&self.path)?;

        if let Ok(dir) = File::open(&parent) {
            let _ = dir.sync_all();
        }

        debug!(path = %self.path.display(), bytes = blob.len(), "Credential cache saved");
        Ok(())
    }

    fn clear(&self) -> CredentialResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "Credential cache removed");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
