//! Bridge configuration.
//!
//! `BridgeConfig` controls where the legacy consent record lives and which
//! cookies are purged on revocation. It provides sensible defaults via
//! [`Default`] and a fluent [`BridgeConfig::builder()`] with validation.
//!
//! # Examples
//!
//! ## Use defaults
//! ```rust
//! use consent_bridge::config::BridgeConfig;
//! let cfg = BridgeConfig::default();
//! assert_eq!(cfg.cookie_name, "consent");
//! ```
//!
//! ## Customize with the builder
//! ```rust
//! use consent_bridge::config::BridgeConfig;
//! use consent_bridge::consent::ConsentCategory;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cfg = BridgeConfig::builder()
//!     .host("tours.example.com")
//!     .max_age_days(180)
//!     .tracking_cookies(ConsentCategory::Marketing, &["_pin_*"])
//!     .build()?;
//! # Ok(()) }
//! ```
//!
//! # Fields (summary)
//! - `cookie_name`: name of the legacy record cookie (default: `consent`).
//! - `cookie_path`: path scope of the record (default: `/`).
//! - `max_age`: lifetime of the record, refreshed on every write (default: 365 days).
//! - `same_site`: SameSite policy of the record (default: `Lax`).
//! - `host`: the site's host name, used to build the janitor's domain scopes.
//! - `descriptors`: tracking cookie patterns per category.
//!
//! # Errors
//!
//! Builder validation returns [`BridgeConfigError`] for an unusable cookie name,
//! a non-positive lifetime, an invalid host, or patterns registered for the
//! `necessary` category.

use crate::consent::ConsentCategory;
use crate::cookies::SameSite;
use crate::janitor::TrackingCookieDescriptors;
use std::fmt;
use time::Duration;

const DEFAULT_COOKIE_NAME: &str = "consent";
const DEFAULT_HOST: &str = "localhost";

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub cookie_name: String,
    pub cookie_path: String,
    pub max_age: Duration,
    pub same_site: SameSite,
    pub host: String,
    pub descriptors: TrackingCookieDescriptors,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            cookie_path: "/".to_string(),
            max_age: Duration::days(365),
            same_site: SameSite::Lax,
            host: DEFAULT_HOST.to_string(),
            descriptors: TrackingCookieDescriptors::defaults(),
        }
    }
}

impl BridgeConfig {
    pub fn builder() -> BridgeConfigBuilder {
        BridgeConfigBuilder::default()
    }
}

/// Builder for [`BridgeConfig`].
#[derive(Debug, Clone, Default)]
pub struct BridgeConfigBuilder {
    inner: BridgeConfig,
}

impl BridgeConfigBuilder {
    #[inline]
    fn map(mut self, f: impl FnOnce(&mut BridgeConfig)) -> Self {
        f(&mut self.inner);
        self
    }

    pub fn cookie_name<S: Into<String>>(self, name: S) -> Self { self.map(|c| c.cookie_name = name.into()) }
    pub fn cookie_path<S: Into<String>>(self, path: S) -> Self { self.map(|c| c.cookie_path = path.into()) }
    pub fn max_age(self, age: Duration) -> Self { self.map(|c| c.max_age = age) }
    pub fn max_age_days(self, days: i64) -> Self { self.map(|c| c.max_age = Duration::days(days)) }
    pub fn same_site(self, policy: SameSite) -> Self { self.map(|c| c.same_site = policy) }
    pub fn host<S: Into<String>>(self, host: S) -> Self { self.map(|c| c.host = host.into()) }
    pub fn descriptors(self, table: TrackingCookieDescriptors) -> Self { self.map(|c| c.descriptors = table) }

    /// Adds patterns to the category's descriptor.
    pub fn tracking_cookies(self, category: ConsentCategory, patterns: &[&str]) -> Self {
        self.map(|c| c.descriptors = std::mem::take(&mut c.descriptors).with(category, patterns))
    }

    /// Apply multiple changes in one go.
    pub fn with(self, f: impl FnOnce(&mut BridgeConfig)) -> Self { self.map(f) }

    /// Validate and build the final config.
    pub fn build(self) -> Result<BridgeConfig, BridgeConfigError> {
        validate(&self.inner)?;
        Ok(self.inner)
    }
}

// ---------- Validation ----------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeConfigError {
    InvalidCookieName(String),
    InvalidCookiePath(String),
    NonPositiveMaxAge,
    InvalidHost(String),
    NecessaryDescriptor,
}

impl fmt::Display for BridgeConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BridgeConfigError::InvalidCookieName(name) =>
                write!(f, "cookie name {name:?} is not a valid cookie token"),
            BridgeConfigError::InvalidCookiePath(path) =>
                write!(f, "cookie path {path:?} must start with '/'"),
            BridgeConfigError::NonPositiveMaxAge =>
                write!(f, "max_age must be positive"),
            BridgeConfigError::InvalidHost(host) =>
                write!(f, "host {host:?} is not a valid host name"),
            BridgeConfigError::NecessaryDescriptor =>
                write!(f, "necessary cookies cannot be registered for revocation cleanup"),
        }
    }
}
impl std::error::Error for BridgeConfigError {}

fn validate(c: &BridgeConfig) -> Result<(), BridgeConfigError> {
    let bad_char = |ch: char| ch.is_whitespace() || ch.is_control() || "=;,\"".contains(ch);
    if c.cookie_name.is_empty() || c.cookie_name.chars().any(bad_char) {
        return Err(BridgeConfigError::InvalidCookieName(c.cookie_name.clone()));
    }
    if !c.cookie_path.starts_with('/') {
        return Err(BridgeConfigError::InvalidCookiePath(c.cookie_path.clone()));
    }
    if !c.max_age.is_positive() {
        return Err(BridgeConfigError::NonPositiveMaxAge);
    }
    if c.host.starts_with('.') || url::Host::parse(&c.host).is_err() {
        return Err(BridgeConfigError::InvalidHost(c.host.clone()));
    }
    if !c.descriptors.patterns(ConsentCategory::Necessary).is_empty() {
        return Err(BridgeConfigError::NecessaryDescriptor);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = BridgeConfig::builder().build().unwrap();
        assert_eq!(cfg.cookie_name, "consent");
        assert_eq!(cfg.cookie_path, "/");
        assert_eq!(cfg.max_age, Duration::days(365));
        assert_eq!(cfg.same_site, SameSite::Lax);
        assert_eq!(cfg.descriptors, TrackingCookieDescriptors::defaults());
    }

    #[test]
    fn builder_applies_changes() {
        let cfg = BridgeConfig::builder()
            .host("tours.example.com")
            .cookie_name("legacy_consent")
            .max_age_days(30)
            .tracking_cookies(ConsentCategory::Marketing, &["_pin_*"])
            .build()
            .unwrap();

        assert_eq!(cfg.host, "tours.example.com");
        assert_eq!(cfg.cookie_name, "legacy_consent");
        assert_eq!(cfg.max_age, Duration::days(30));
        assert_eq!(cfg.descriptors.patterns(ConsentCategory::Marketing).len(), 4);
    }

    #[test]
    fn rejects_bad_values() {
        assert_eq!(
            BridgeConfig::builder().cookie_name("con sent").build().unwrap_err(),
            BridgeConfigError::InvalidCookieName("con sent".into())
        );
        assert_eq!(
            BridgeConfig::builder().cookie_name("").build().unwrap_err(),
            BridgeConfigError::InvalidCookieName(String::new())
        );
        assert_eq!(
            BridgeConfig::builder().cookie_path("app").build().unwrap_err(),
            BridgeConfigError::InvalidCookiePath("app".into())
        );
        assert_eq!(
            BridgeConfig::builder().max_age_days(0).build().unwrap_err(),
            BridgeConfigError::NonPositiveMaxAge
        );
        assert_eq!(
            BridgeConfig::builder().host(".example.com").build().unwrap_err(),
            BridgeConfigError::InvalidHost(".example.com".into())
        );
        assert_eq!(
            BridgeConfig::builder().host("").build().unwrap_err(),
            BridgeConfigError::InvalidHost(String::new())
        );
        assert_eq!(
            BridgeConfig::builder()
                .tracking_cookies(ConsentCategory::Necessary, &["session"])
                .build()
                .unwrap_err(),
            BridgeConfigError::NecessaryDescriptor
        );
    }

    #[test]
    fn error_messages() {
        assert_eq!(BridgeConfigError::NonPositiveMaxAge.to_string(), "max_age must be positive");
    }
}
