use std::fmt;
use std::time::Duration;

use crate::error::{Error, ErrorKind, Result};
use crate::store::KeyStore;

pub const API_KEY_ENV: &str = "CMAP_API_KEY";
pub const API_URL_ENV: &str = "CMAP_API_URL";
pub const DEFAULT_URL: &str = "https://simonscmap.com";

/// Opaque API key. Redacted in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential([REDACTED])")
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base service URL, typically `https://simonscmap.com`.
    pub url: String,
    pub api_key: Credential,
    /// Whole-request timeout. Large subsets can take minutes to stream.
    pub timeout: Duration,
    pub connect_timeout: Duration,
    /// Show a spinner on stderr while response bodies download.
    pub progress: bool,
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            api_key: Credential::new(api_key),
            timeout: Duration::from_secs(300),
            connect_timeout: Duration::from_secs(30),
            progress: true,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }
}

/// Resolves configuration (in order of precedence):
/// - explicit `api_key`/`url` arguments
/// - environment variables `CMAP_API_KEY` / `CMAP_API_URL`
/// - the key persisted in `store`
pub fn load_config(
    api_key: Option<String>,
    url: Option<String>,
    store: &dyn KeyStore,
) -> Result<ClientConfig> {
    resolve(
        api_key,
        url,
        std::env::var(API_KEY_ENV).ok(),
        std::env::var(API_URL_ENV).ok(),
        store,
    )
}

fn resolve(
    api_key: Option<String>,
    url: Option<String>,
    env_key: Option<String>,
    env_url: Option<String>,
    store: &dyn KeyStore,
) -> Result<ClientConfig> {
    let non_empty = |v: String| if v.trim().is_empty() { None } else { Some(v) };

    let mut key = api_key.and_then(non_empty).or_else(|| env_key.and_then(non_empty));
    if key.is_none() {
        key = store.load()?.and_then(non_empty);
    }

    let key = match key {
        Some(v) => v,
        None => {
            return Err(Error::new(ErrorKind::MissingCredential(format!(
                "set {} or store a key with set_api_key (looked in: {})",
                API_KEY_ENV,
                store.describe()
            ))));
        }
    };

    let url = url
        .and_then(non_empty)
        .or_else(|| env_url.and_then(non_empty))
        .unwrap_or_else(|| DEFAULT_URL.to_string());

    Ok(ClientConfig::new(key).with_url(url))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{KeyStore, MemoryKeyStore};

    #[test]
    fn explicit_key_wins() {
        let store = MemoryKeyStore::new();
        store.save("stored").unwrap();
        let cfg = resolve(
            Some("explicit".into()),
            None,
            Some("env".into()),
            None,
            &store,
        )
        .unwrap();
        assert_eq!(cfg.api_key.expose(), "explicit");
        assert_eq!(cfg.url, DEFAULT_URL);
    }

    #[test]
    fn env_before_store() {
        let store = MemoryKeyStore::new();
        store.save("stored").unwrap();
        let cfg = resolve(None, None, Some("env".into()), None, &store).unwrap();
        assert_eq!(cfg.api_key.expose(), "env");
    }

    #[test]
    fn falls_back_to_store_and_env_url() {
        let store = MemoryKeyStore::new();
        store.save("stored").unwrap();
        let cfg = resolve(
            None,
            None,
            Some("  ".into()),
            Some("http://localhost:8080".into()),
            &store,
        )
        .unwrap();
        assert_eq!(cfg.api_key.expose(), "stored");
        assert_eq!(cfg.url, "http://localhost:8080");
    }

    #[test]
    fn missing_everywhere_is_fatal() {
        let store = MemoryKeyStore::new();
        let err = resolve(None, None, None, None, &store).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::MissingCredential(_)));
        assert!(err.to_string().contains(API_KEY_ENV));
    }

    #[test]
    fn credential_debug_is_redacted() {
        let cfg = ClientConfig::new("super-secret");
        let dbg = format!("{:?}", cfg);
        assert!(!dbg.contains("super-secret"));
        assert!(dbg.contains("REDACTED"));
    }
}
