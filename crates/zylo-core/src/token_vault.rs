//! File-backed vault for the single persisted auth token.
//!
//! The shell keeps exactly one opaque token between launches. Reads happen at
//! startup and on demand; the token is cleared when the server rejects it.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::time_utils::current_unix_timestamp_ms;

const VAULT_STATE_SCHEMA_VERSION: u32 = 1;

/// Storage key the vault is keyed by, mirrored from the embedded content.
pub const DEFAULT_AUTH_TOKEN_KEY: &str = "authToken";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct VaultState {
    schema_version: u32,
    key: String,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    updated_unix_ms: u64,
}

impl VaultState {
    fn empty(key: &str) -> Self {
        Self {
            schema_version: VAULT_STATE_SCHEMA_VERSION,
            key: key.to_string(),
            token: None,
            updated_unix_ms: 0,
        }
    }
}

/// Persistent store for the session auth token.
pub struct TokenVault {
    path: PathBuf,
    state: VaultState,
}

impl TokenVault {
    /// Loads the vault from `path`, creating an empty one when absent.
    pub fn load(path: PathBuf, key: &str) -> Result<Self> {
        let state = if path.exists() {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read vault file {}", path.display()))?;
            let parsed = serde_json::from_str::<VaultState>(&raw)
                .with_context(|| format!("failed to parse vault file {}", path.display()))?;
            if parsed.schema_version != VAULT_STATE_SCHEMA_VERSION {
                bail!(
                    "unsupported vault schema: expected {}, found {}",
                    VAULT_STATE_SCHEMA_VERSION,
                    parsed.schema_version
                );
            }
            if parsed.key == key {
                parsed
            } else {
                VaultState::empty(key)
            }
        } else {
            VaultState::empty(key)
        };

        Ok(Self { path, state })
    }

    /// Returns the stored token, if any. Empty strings count as absent.
    pub fn token(&self) -> Option<&str> {
        self.state
            .token
            .as_deref()
            .filter(|value| !value.trim().is_empty())
    }

    /// Persists a new token value. A no-op when the value is unchanged.
    pub fn store(&mut self, token: &str) -> Result<()> {
        if self.token() == Some(token) {
            return Ok(());
        }
        self.state.token = Some(token.to_string());
        self.state.updated_unix_ms = current_unix_timestamp_ms();
        self.save()
    }

    /// Drops the persisted token, used when the server rejects it.
    pub fn clear(&mut self) -> Result<()> {
        if self.state.token.is_none() {
            return Ok(());
        }
        self.state.token = None;
        self.state.updated_unix_ms = current_unix_timestamp_ms();
        self.save()
    }

    // Temp file + rename so a crash mid-write never leaves a truncated vault.
    fn save(&self) -> Result<()> {
        let mut payload =
            serde_json::to_string_pretty(&self.state).context("failed to serialize vault state")?;
        payload.push('\n');

        let dir = self
            .path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create vault dir {}", dir.display()))?;

        let temp_path = self.path.with_extension(format!("tmp-{}", std::process::id()));
        std::fs::write(&temp_path, &payload)
            .with_context(|| format!("failed to write vault temp file {}", temp_path.display()))?;
        std::fs::rename(&temp_path, &self.path)
            .with_context(|| format!("failed to commit vault file {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{TokenVault, DEFAULT_AUTH_TOKEN_KEY};

    #[test]
    fn vault_round_trips_token_across_loads() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let path = tempdir.path().join("vault.json");

        let mut vault =
            TokenVault::load(path.clone(), DEFAULT_AUTH_TOKEN_KEY).expect("load empty");
        assert_eq!(vault.token(), None);
        vault.store("tok123").expect("store");

        let reloaded = TokenVault::load(path, DEFAULT_AUTH_TOKEN_KEY).expect("reload");
        assert_eq!(reloaded.token(), Some("tok123"));
    }

    #[test]
    fn vault_clear_removes_persisted_token() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let path = tempdir.path().join("vault.json");

        let mut vault = TokenVault::load(path.clone(), DEFAULT_AUTH_TOKEN_KEY).expect("load");
        vault.store("tok123").expect("store");
        vault.clear().expect("clear");

        let reloaded = TokenVault::load(path, DEFAULT_AUTH_TOKEN_KEY).expect("reload");
        assert_eq!(reloaded.token(), None);
    }

    #[test]
    fn vault_keyed_by_different_storage_key_starts_empty() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let path = tempdir.path().join("vault.json");

        let mut vault = TokenVault::load(path.clone(), "authToken").expect("load");
        vault.store("tok123").expect("store");

        let other = TokenVault::load(path, "session").expect("reload with other key");
        assert_eq!(other.token(), None);
    }

    #[test]
    fn vault_save_leaves_no_temp_file_behind() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let path = tempdir.path().join("vault.json");

        let mut vault = TokenVault::load(path.clone(), DEFAULT_AUTH_TOKEN_KEY).expect("load");
        vault.store("tok123").expect("store");

        let entries: Vec<_> = std::fs::read_dir(tempdir.path())
            .expect("read dir")
            .map(|entry| entry.expect("entry").file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("vault.json")]);
    }

    #[test]
    fn vault_treats_blank_token_as_absent() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let path = tempdir.path().join("vault.json");

        let mut vault = TokenVault::load(path, DEFAULT_AUTH_TOKEN_KEY).expect("load");
        vault.store("   ").expect("store blank");
        assert_eq!(vault.token(), None);
    }
}
