//! Cookie core types.
//!
//! This module defines the **type-erased handle** used by the bridge and the
//! janitor, the serializable [`Cookie`] record and the [`CookieOptions`] passed
//! when writing a cookie.
//!
//! # Concurrency model
//! [`CookieStoreHandle`] is `Arc<dyn CookieStore>`. Stores manage their **own
//! internal synchronization**; all trait methods take `&self`.
//!
//! ```rust
//! use consent_bridge::cookies::{Cookie, SameSite};
//!
//! let c = Cookie {
//!     name: "consent".into(),
//!     value: "%7B%7D".into(),
//!     path: Some("/".into()),
//!     domain: None,
//!     secure: false,
//!     expires: None,
//!     same_site: Some(SameSite::Lax),
//!     http_only: false,
//! };
//! assert!(c.is_host_only());
//! ```

use crate::cookies::store::CookieStore;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use time::OffsetDateTime;

/// A handle to a cookie store trait.
///
/// The bridge and the janitor hold clones of the same handle, so both observe
/// the same jar.
pub type CookieStoreHandle = Arc<dyn CookieStore>;

/// SameSite policy of a cookie.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    /// Parses a `SameSite` attribute value, case-insensitively.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("lax") {
            Some(SameSite::Lax)
        } else if value.eq_ignore_ascii_case("strict") {
            Some(SameSite::Strict)
        } else if value.eq_ignore_ascii_case("none") {
            Some(SameSite::None)
        } else {
            None
        }
    }
}

impl Display for SameSite {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SameSite::Strict => write!(f, "Strict"),
            SameSite::Lax => write!(f, "Lax"),
            SameSite::None => write!(f, "None"),
        }
    }
}

/// A cookie as kept by the stores in this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cookie {
    /// Cookie name (case-sensitive).
    pub name: String,

    /// Raw cookie value (not URL-decoded).
    pub value: String,

    /// Path scoping, `"/"` for everything written by the bridge.
    pub path: Option<String>,

    /// Domain scoping with any leading dot stripped. `None` means host-only.
    pub domain: Option<String>,

    /// If `true`, cookie is sent only over HTTPS.
    pub secure: bool,

    /// Expiration timestamp. Session cookies have `None`.
    #[serde(with = "time::serde::rfc3339::option")]
    pub expires: Option<OffsetDateTime>,

    pub same_site: Option<SameSite>,

    pub http_only: bool,
}

impl Cookie {
    pub fn is_host_only(&self) -> bool {
        self.domain.is_none()
    }

    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.expires.is_some_and(|exp| exp <= now)
    }
}

/// Attributes used when writing a cookie.
///
/// An `expires` at or before the current time deletes the cookie, the same way
/// a browser treats an already-expired assignment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CookieOptions {
    pub expires: Option<OffsetDateTime>,
    pub path: Option<String>,
    pub domain: Option<String>,
    pub same_site: Option<SameSite>,
    pub secure: bool,
}

/// Normalizes a `Domain` attribute: leading dot stripped, lowercase, empty means none.
pub(crate) fn normalize_domain(domain: Option<&str>) -> Option<String> {
    domain
        .map(|d| d.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|d| !d.is_empty())
}

/// Parses a `document.cookie` style header (`"a=1; b=2"`) into name/value pairs.
///
/// Pairs without a `=` are skipped. Values are returned raw, without decoding,
/// and everything after the first `=` belongs to the value.
pub fn parse_cookie_header(header: &str) -> Vec<(String, String)> {
    header
        .split(';')
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some((name.to_string(), value.trim().to_string()))
        })
        .collect()
}
