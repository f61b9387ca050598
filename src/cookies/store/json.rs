//! JSON-backed cookie store.
//!
//! `JsonCookieStore` keeps the jar in an [`InMemoryCookieStore`] and snapshots
//! it to a single JSON file after **every mutation**, so the legacy consent
//! record and any tracking cookies survive a process restart.
//!
//! ### I/O characteristics & caveats
//! - Every mutation rewrites the entire file. The jar holds a handful of
//!   cookies, so this stays cheap.
//! - File writes are not atomic.
//! - An unreadable or corrupt file is treated as an empty jar (logged at warn).
//!
//! ### Example
//! ```rust,no_run
//! use consent_bridge::cookies::{CookieStore, JsonCookieStore};
//!
//! let store = JsonCookieStore::open("cookies.json").unwrap();
//! println!("{:?}", store.get("consent"));
//! ```
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cookies::store::{CookieStore, InMemoryCookieStore};
use crate::cookies::{Cookie, CookieOptions};

/// On-disk representation of the jar.
#[derive(Debug, Default, Serialize, Deserialize)]
struct CookieStoreFile {
    cookies: Vec<Cookie>,
}

/// A cookie store persisted as a JSON file.
#[derive(Debug)]
pub struct JsonCookieStore {
    /// Path to the JSON file where cookies are stored.
    path: PathBuf,
    /// Live jar; the file is a snapshot of it.
    inner: InMemoryCookieStore,
}

impl JsonCookieStore {
    /// Opens the store at `path`, creating an empty file if none exists.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let file = if path.exists() {
            Self::load_file(&path)
        } else {
            CookieStoreFile::default()
        };

        let store = Self {
            inner: InMemoryCookieStore::from_cookies(file.cookies),
            path,
        };
        store.flush()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the current jar to disk.
    pub fn flush(&self) -> Result<()> {
        let file = CookieStoreFile {
            cookies: self.inner.cookies(),
        };
        let contents = serde_json::to_string_pretty(&file).context("serializing cookie store")?;
        fs::write(&self.path, contents)
            .with_context(|| format!("writing cookie store {}", self.path.display()))
    }

    fn load_file(path: &Path) -> CookieStoreFile {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                log::warn!("cannot read cookie store {}: {}", path.display(), e);
                return CookieStoreFile::default();
            }
        };

        serde_json::from_str(&contents).unwrap_or_else(|e| {
            log::warn!("discarding corrupt cookie store {}: {}", path.display(), e);
            CookieStoreFile::default()
        })
    }
}

impl CookieStore for JsonCookieStore {
    fn get(&self, name: &str) -> Option<String> {
        self.inner.get(name)
    }

    fn get_scoped(&self, name: &str, domain: Option<&str>) -> Option<String> {
        self.inner.get_scoped(name, domain)
    }

    fn set(&self, name: &str, value: &str, options: &CookieOptions) -> Result<()> {
        self.inner.set(name, value, options)?;
        self.flush()
    }

    fn delete(&self, name: &str, domain: Option<&str>) -> Result<()> {
        // Nothing to persist when the cookie was never there
        if self.inner.cookie(name, domain).is_none() {
            return Ok(());
        }
        self.inner.delete(name, domain)?;
        self.flush()
    }

    fn names(&self) -> Vec<String> {
        self.inner.names()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cookies::SameSite;
    use time::{Duration, OffsetDateTime};

    #[test]
    fn open_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");

        let store = JsonCookieStore::open(&path).unwrap();
        assert!(path.exists());
        assert!(store.names().is_empty());
    }

    #[test]
    fn cookies_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");
        let expires = OffsetDateTime::now_utc() + Duration::days(365);

        {
            let store = JsonCookieStore::open(&path).unwrap();
            let options = CookieOptions {
                expires: Some(expires),
                path: Some("/".into()),
                same_site: Some(SameSite::Lax),
                ..CookieOptions::default()
            };
            store.set("consent", "abc", &options).unwrap();
            store.set("_fbp", "fb.1", &CookieOptions::default()).unwrap();
            store.delete("_fbp", None).unwrap();
        }

        let reopened = JsonCookieStore::open(&path).unwrap();
        assert_eq!(reopened.get("consent").as_deref(), Some("abc"));
        assert!(reopened.get("_fbp").is_none());

        let cookie = reopened.inner.cookie("consent", None).unwrap();
        assert_eq!(cookie.same_site, Some(SameSite::Lax));
        assert_eq!(cookie.expires.map(|e| e.unix_timestamp()), Some(expires.unix_timestamp()));
    }

    #[test]
    fn corrupt_file_is_treated_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");
        fs::write(&path, "{ not json").unwrap();

        let store = JsonCookieStore::open(&path).unwrap();
        assert!(store.names().is_empty());

        // and the file is rewritten in a readable shape
        let contents = fs::read_to_string(&path).unwrap();
        assert!(serde_json::from_str::<CookieStoreFile>(&contents).is_ok());
    }
}
