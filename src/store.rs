//! Persistence for the API key.
//!
//! The client never writes the key itself; callers persist a key explicitly with
//! [`set_api_key`] and [`crate::load_config`] falls back to the store when neither
//! an explicit key nor `CMAP_API_KEY` is present.

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::error::{Error, ErrorKind, Result};
use crate::util::strip_quotes;

/// Environment variable overriding the location of the key file.
pub const RC_ENV: &str = "CMAP_RC";

const RC_FILE_NAME: &str = ".cmapapirc";
const KEY_FIELD: &str = "api_key";

/// Storage for a single API key string.
pub trait KeyStore: Send + Sync {
    /// Load the stored key, if any.
    fn load(&self) -> Result<Option<String>>;

    /// Replace the stored key.
    fn save(&self, key: &str) -> Result<()>;

    /// Human readable location, used in error messages.
    fn describe(&self) -> String;
}

/// Persists `key` into `store`. The value is opaque; only empty keys are refused.
pub fn set_api_key(store: &dyn KeyStore, key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(Error::invalid("API key must not be empty"));
    }
    store.save(key)?;
    tracing::info!(location = %store.describe(), "API key stored");
    Ok(())
}

/// Key store backed by an rc-style file (`api_key: <value>`).
#[derive(Debug, Clone)]
pub struct FileKeyStore {
    path: PathBuf,
}

impl FileKeyStore {
    /// Store at `$CMAP_RC`, or `~/.cmapapirc`.
    pub fn new() -> Result<Self> {
        if let Ok(p) = std::env::var(RC_ENV) {
            return Ok(Self::with_path(p));
        }
        let home = dirs::home_dir().ok_or_else(|| {
            Error::new(ErrorKind::Storage(
                "could not determine home directory".to_string(),
            ))
        })?;
        Ok(Self::with_path(home.join(RC_FILE_NAME)))
    }

    pub fn with_path(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyStore for FileKeyStore {
    fn load(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(&self.path).map_err(|e| {
            Error::with_source(
                ErrorKind::Storage(format!("failed to read {}", self.path.display())),
                e,
            )
        })?;
        Ok(parse_rc(&text))
    }

    fn save(&self, key: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        std::fs::write(&self.path, format!("{}: {}\n", KEY_FIELD, key)).map_err(|e| {
            Error::with_source(
                ErrorKind::Storage(format!("failed to write {}", self.path.display())),
                e,
            )
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&self.path, perms)?;
        }

        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-process key store; replacement is atomic.
#[derive(Debug, Default)]
pub struct MemoryKeyStore {
    key: RwLock<Option<String>>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyStore for MemoryKeyStore {
    fn load(&self) -> Result<Option<String>> {
        let guard = self
            .key
            .read()
            .map_err(|_| Error::new(ErrorKind::Storage("key store lock poisoned".into())))?;
        Ok(guard.clone())
    }

    fn save(&self, key: &str) -> Result<()> {
        let mut guard = self
            .key
            .write()
            .map_err(|_| Error::new(ErrorKind::Storage("key store lock poisoned".into())))?;
        *guard = Some(key.to_string());
        Ok(())
    }

    fn describe(&self) -> String {
        "in-memory key store".to_string()
    }
}

fn parse_rc(text: &str) -> Option<String> {
    // `api_key:` may carry its value on the following line.
    let mut pending = false;

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if pending {
            if !line.contains(':') {
                return Some(strip_quotes(line).to_string());
            }
            pending = false;
        }

        if let Some((k, v)) = line.split_once(':') {
            if k.trim() != KEY_FIELD {
                continue;
            }
            let v = strip_quotes(v.trim());
            if v.is_empty() {
                pending = true;
            } else {
                return Some(v.to_string());
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rc_inline_value() {
        let text = "# cmap\napi_key: abc-123\n";
        assert_eq!(parse_rc(text).as_deref(), Some("abc-123"));
    }

    #[test]
    fn parse_rc_value_on_next_line_and_quotes() {
        let text = "api_key:\n  \"abc-123\"\n";
        assert_eq!(parse_rc(text).as_deref(), Some("abc-123"));
    }

    #[test]
    fn parse_rc_ignores_other_fields() {
        assert_eq!(parse_rc("url: https://x\n"), None);
        assert_eq!(parse_rc(""), None);
    }

    #[test]
    fn memory_store_replaces_key() {
        let store = MemoryKeyStore::new();
        assert_eq!(store.load().unwrap(), None);
        set_api_key(&store, "first").unwrap();
        set_api_key(&store, "second").unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("second"));
    }

    #[test]
    fn empty_key_is_refused() {
        let store = MemoryKeyStore::new();
        let err = set_api_key(&store, "").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::InvalidParameter(_)));
        assert_eq!(store.load().unwrap(), None);
    }
}
