//! Cookie store infrastructure.
//!
//! A **cookie store** is the persistence layer behind the legacy consent record
//! and the tracking cookies the janitor removes. It stands in for the browser's
//! cookie jar so the bridge can run (and be tested) without one.
//!
//! This module exports two implementations:
//! - [`InMemoryCookieStore`]: process-local jar, optionally seeded from a
//!   `document.cookie` header string.
//! - [`JsonCookieStore`]: the same jar, snapshotted to a JSON file after every
//!   mutation.
//!
//! ## Scoping
//! Cookies are identified by **name and domain**. A leading dot on the domain is
//! ignored, so `example.com` and `.example.com` address the same cookie while a
//! host-only cookie (no domain) is a different one. Deleting therefore has to
//! name the scope the cookie was written under.
//!
//! ## Example
//! ```rust
//! use consent_bridge::cookies::{CookieOptions, CookieStore, InMemoryCookieStore};
//!
//! let store = InMemoryCookieStore::new();
//! store.set("_ga", "GA1.2.3", &CookieOptions::default()).unwrap();
//! assert_eq!(store.get("_ga").as_deref(), Some("GA1.2.3"));
//!
//! store.delete("_ga", None).unwrap();
//! assert!(store.get("_ga").is_none());
//! ```
mod in_memory;
mod json;

use crate::cookies::CookieOptions;
use anyhow::Result;

pub use in_memory::InMemoryCookieStore;
pub use json::JsonCookieStore;

/// Key/value access to a cookie jar.
///
/// Implementations must be `Send + Sync` and internally synchronized.
pub trait CookieStore: Send + Sync {
    /// Returns the value of the first live cookie called `name`, if any.
    fn get(&self, name: &str) -> Option<String>;

    /// Returns the value of `name` written under `domain` (`None` = host-only).
    fn get_scoped(&self, name: &str, domain: Option<&str>) -> Option<String>;

    /// Writes (or replaces) the cookie `name` in the scope described by `options`.
    fn set(&self, name: &str, value: &str, options: &CookieOptions) -> Result<()>;

    /// Removes the cookie `name` written under `domain` (`None` = host-only).
    ///
    /// Deleting a cookie that does not exist is a no-op and returns `Ok`.
    fn delete(&self, name: &str, domain: Option<&str>) -> Result<()>;

    /// Names of all live cookies, sorted and without duplicates.
    fn names(&self) -> Vec<String>;
}
