//! Persistent storage for the token pair.
//!
//! Exactly one key holds the serialized pair; an absent key means there is no
//! session to restore.

use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use anyhow::{Context, Result};
use keyring::Entry;
use tracing::debug;

use super::token::TokenPair;

/// Key under which the serialized token pair is stored.
pub const STORAGE_KEY: &str = "authTokens";

/// Keychain service name
const SERVICE_NAME: &str = "campusdesk";

pub trait TokenStore: Send + Sync {
    /// Read the persisted pair. A present but unparseable value is an error.
    fn load(&self) -> Result<Option<TokenPair>>;

    fn save(&self, tokens: &TokenPair) -> Result<()>;

    /// Remove the persisted pair. Removing an absent pair succeeds.
    fn clear(&self) -> Result<()>;
}

fn parse(contents: &str) -> Result<TokenPair> {
    serde_json::from_str(contents).context("Failed to parse persisted token pair")
}

/// Token pair stored as JSON in the cache directory.
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            path: dir.join(format!("{}.json", STORAGE_KEY)),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<TokenPair>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.path)
            .context("Failed to read token file")?;
        parse(&contents).map(Some)
    }

    fn save(&self, tokens: &TokenPair) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string(tokens)?;
        std::fs::write(&self.path, contents).context("Failed to write token file")?;
        debug!(path = ?self.path, "Token pair saved");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path).context("Failed to remove token file")?;
        }
        Ok(())
    }
}

/// Token pair stored in the OS keychain.
pub struct KeyringTokenStore {
    account: String,
}

impl KeyringTokenStore {
    pub fn new() -> Self {
        Self {
            account: STORAGE_KEY.to_string(),
        }
    }

    fn entry(&self) -> Result<Entry> {
        Entry::new(SERVICE_NAME, &self.account).context("Failed to create keyring entry")
    }
}

impl Default for KeyringTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenStore for KeyringTokenStore {
    fn load(&self) -> Result<Option<TokenPair>> {
        match self.entry()?.get_password() {
            Ok(contents) => parse(&contents).map(Some),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to read token pair from keychain"),
        }
    }

    fn save(&self, tokens: &TokenPair) -> Result<()> {
        let contents = serde_json::to_string(tokens)?;
        self.entry()?
            .set_password(&contents)
            .context("Failed to store token pair in keychain")
    }

    fn clear(&self) -> Result<()> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete token pair from keychain"),
        }
    }
}

/// In-process store; nothing survives a restart.
#[derive(Default)]
pub struct MemoryTokenStore {
    value: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a raw value, bypassing serialization.
    pub fn with_raw(raw: &str) -> Self {
        Self {
            value: Mutex::new(Some(raw.to_string())),
        }
    }

    pub fn raw(&self) -> Option<String> {
        self.value.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<TokenPair>> {
        match self.raw() {
            Some(contents) => parse(&contents).map(Some),
            None => Ok(None),
        }
    }

    fn save(&self, tokens: &TokenPair) -> Result<()> {
        let contents = serde_json::to_string(tokens)?;
        *self.value.lock().unwrap_or_else(PoisonError::into_inner) = Some(contents);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.value.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_roundtrip_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("nested"));

        assert!(store.load().unwrap().is_none());

        let pair = TokenPair::new("a.b.c", "r1");
        store.save(&pair).unwrap();
        assert_eq!(store.load().unwrap(), Some(pair));

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
        // Clearing twice is fine
        store.clear().unwrap();
    }

    #[test]
    fn test_file_store_persisted_shape() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().to_path_buf());
        store.save(&TokenPair::new("acc", "ref")).unwrap();

        let raw = std::fs::read_to_string(store.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["access"], "acc");
        assert_eq!(value["refresh"], "ref");
    }

    #[test]
    fn test_file_store_garbage_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().to_path_buf());
        std::fs::write(store.path(), "{not json").unwrap();
        assert!(store.load().is_err());
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryTokenStore::new();
        assert!(store.load().unwrap().is_none());
        store.save(&TokenPair::new("a", "r")).unwrap();
        assert!(store.raw().unwrap().contains("\"refresh\":\"r\""));
        store.clear().unwrap();
        assert!(store.raw().is_none());

        let broken = MemoryTokenStore::with_raw("[]");
        assert!(broken.load().is_err());
    }
}
