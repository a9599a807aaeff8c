//! Persistent storage for the on-disk token.

use std::{
    fs, io,
    io::Write,
    path::{Path, PathBuf},
};

use tracing::debug;

use crate::{error::StorageError, types::OAuthTokens};

/// Reads and writes the single token file.
///
/// The file holds secrets, so it is created 0600 and replaced wholesale on
/// every save: the token is serialized to a temp file in the same directory,
/// then renamed over the target. There is no cross-process locking;
/// concurrent writers race last-write-wins.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored token. `Ok(None)` when the file does not exist or is
    /// empty. Read and parse failures are surfaced, never treated as a
    /// missing token.
    pub fn load(&self) -> Result<Option<OAuthTokens>, StorageError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::Io(e)),
        };
        if contents.trim().is_empty() {
            return Ok(None);
        }
        let tokens = serde_json::from_str(&contents)?;
        Ok(Some(tokens))
    }

    /// Persist the token, replacing any previous one wholesale.
    pub fn save(&self, tokens: &OAuthTokens) -> Result<(), StorageError> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tmp.as_file()
                .set_permissions(fs::Permissions::from_mode(0o600))?;
        }
        serde_json::to_writer_pretty(&mut tmp, tokens)?;
        tmp.flush()?;
        tmp.persist(&self.path).map_err(|e| StorageError::Io(e.error))?;

        debug!(path = %self.path.display(), "token saved");
        Ok(())
    }

    /// Remove the token file. A missing file is not an error.
    pub fn delete(&self) -> Result<(), StorageError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tokens() -> OAuthTokens {
        OAuthTokens {
            access_token: "at-sample".into(),
            token_type: "Bearer".into(),
            refresh_token: Some("rt-sample".into()),
            expires_at: Some(1_900_000_000),
        }
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));
        let tokens = sample_tokens();

        store.save(&tokens).unwrap();
        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded, tokens);
    }

    #[test]
    fn test_load_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_load_empty_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        fs::write(&path, "").unwrap();
        assert!(TokenStore::new(path).load().unwrap().is_none());
    }

    #[test]
    fn test_load_malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        fs::write(&path, "{not json").unwrap();

        let err = TokenStore::new(path).load().unwrap_err();
        assert!(matches!(err, StorageError::Parse(_)));
    }

    #[test]
    fn test_save_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));

        store.save(&sample_tokens()).unwrap();
        let updated = OAuthTokens {
            access_token: "at-updated".into(),
            ..sample_tokens()
        };
        store.save(&updated).unwrap();

        assert_eq!(store.load().unwrap().unwrap(), updated);
    }

    #[cfg(unix)]
    #[test]
    fn test_save_sets_owner_only_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));
        store.save(&sample_tokens()).unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_delete_missing_file_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));
        store.delete().unwrap();
    }

    #[test]
    fn test_delete_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));
        store.save(&sample_tokens()).unwrap();
        store.delete().unwrap();
        assert!(store.load().unwrap().is_none());
    }
}
