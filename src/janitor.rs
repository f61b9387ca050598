//! Revocation cleanup.
//!
//! When a category goes from granted to denied, the [`CookieJanitor`] removes
//! every cookie that category's integrations may have written. Which names
//! belong to which category is static configuration: the
//! [`TrackingCookieDescriptors`] table.
//!
//! Integrations write their cookies under different scopes (host-only, the
//! exact host, or the parent domain), and a deletion only hits a cookie when it
//! names the same scope. Each name is therefore deleted once per
//! [`ScopeVariant`].

use crate::consent::ConsentCategory;
use crate::cookies::CookieStoreHandle;
use lazy_static::lazy_static;
use std::fmt::{Display, Formatter};

lazy_static! {
    static ref DEFAULT_DESCRIPTORS: TrackingCookieDescriptors = TrackingCookieDescriptors::new()
        .with(
            ConsentCategory::Analytics,
            &["_ga", "_ga_*", "_gid", "_gat", "_gat_gtag_*", "_gcl_au", "_gcl_dc", "_gcl_aw"],
        )
        .with(ConsentCategory::Marketing, &["_fbp", "_fbc", "fr"]);
}

/// A cookie name, or a name prefix when written with a trailing `*`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum CookiePattern {
    Exact(String),
    Prefix(String),
}

impl CookiePattern {
    pub fn parse(pattern: &str) -> Self {
        match pattern.strip_suffix('*') {
            Some(prefix) => CookiePattern::Prefix(prefix.to_string()),
            None => CookiePattern::Exact(pattern.to_string()),
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        match self {
            CookiePattern::Exact(exact) => exact == name,
            CookiePattern::Prefix(prefix) => name.starts_with(prefix.as_str()),
        }
    }
}

impl Display for CookiePattern {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CookiePattern::Exact(name) => write!(f, "{name}"),
            CookiePattern::Prefix(prefix) => write!(f, "{prefix}*"),
        }
    }
}

/// The cookie patterns written by one category's integrations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackingCookieDescriptor {
    pub category: ConsentCategory,
    pub patterns: Vec<CookiePattern>,
}

/// Static table mapping categories to [`TrackingCookieDescriptor`]s.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TrackingCookieDescriptors {
    descriptors: Vec<TrackingCookieDescriptor>,
}

impl TrackingCookieDescriptors {
    /// An empty table. See [`TrackingCookieDescriptors::defaults`] for the built-in one.
    pub fn new() -> Self {
        Self::default()
    }

    /// Google Analytics / Ads cookies for analytics, Facebook Pixel cookies for marketing.
    pub fn defaults() -> Self {
        DEFAULT_DESCRIPTORS.clone()
    }

    /// Adds `patterns` to `category`, extending any descriptor already present.
    pub fn with(mut self, category: ConsentCategory, patterns: &[&str]) -> Self {
        let parsed = patterns.iter().map(|p| CookiePattern::parse(p));
        match self.descriptors.iter_mut().find(|d| d.category == category) {
            Some(existing) => existing.patterns.extend(parsed),
            None => self.descriptors.push(TrackingCookieDescriptor {
                category,
                patterns: parsed.collect(),
            }),
        }
        self
    }

    pub fn patterns(&self, category: ConsentCategory) -> &[CookiePattern] {
        self.descriptors
            .iter()
            .find(|d| d.category == category)
            .map(|d| d.patterns.as_slice())
            .unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackingCookieDescriptor> {
        self.descriptors.iter()
    }
}

/// The three domain scopes a tracking cookie may have been written under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScopeVariant {
    /// `domain=<host>`
    ExactHost,
    /// `domain=.<host>`
    ParentDomain,
    /// No domain attribute (host-only cookie).
    Unspecified,
}

impl ScopeVariant {
    pub const ALL: [ScopeVariant; 3] = [
        ScopeVariant::ExactHost,
        ScopeVariant::ParentDomain,
        ScopeVariant::Unspecified,
    ];

    /// The `Domain` attribute this variant uses for `host`.
    pub fn domain(&self, host: &str) -> Option<String> {
        match self {
            ScopeVariant::ExactHost => Some(host.to_string()),
            ScopeVariant::ParentDomain => Some(format!(".{host}")),
            ScopeVariant::Unspecified => None,
        }
    }
}

/// What a single [`CookieJanitor::purge`] did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PurgeReport {
    /// Deletion calls issued against the store, over all scope variants.
    pub attempts: usize,
    /// Concrete cookie names targeted, in descriptor order.
    pub names: Vec<String>,
}

/// Deletes the tracking cookies of a revoked category.
pub struct CookieJanitor {
    store: CookieStoreHandle,
    host: String,
    descriptors: TrackingCookieDescriptors,
}

impl CookieJanitor {
    pub fn new(store: CookieStoreHandle, host: impl Into<String>, descriptors: TrackingCookieDescriptors) -> Self {
        Self {
            store,
            host: host.into(),
            descriptors,
        }
    }

    pub fn descriptors(&self) -> &TrackingCookieDescriptors {
        &self.descriptors
    }

    /// Deletes every cookie matching `category`'s descriptor, under every scope variant.
    ///
    /// Exact patterns are deleted whether or not the cookie is present; prefix
    /// patterns expand to the matching names currently in the store. Store
    /// failures are logged and skipped, the remaining deletions still run.
    pub fn purge(&self, category: ConsentCategory) -> PurgeReport {
        let mut report = PurgeReport::default();

        for pattern in self.descriptors.patterns(category) {
            for name in self.resolve(pattern) {
                for variant in ScopeVariant::ALL {
                    let domain = variant.domain(&self.host);
                    report.attempts += 1;
                    if let Err(e) = self.store.delete(&name, domain.as_deref()) {
                        log::warn!("janitor: failed to delete cookie {name} ({variant:?}): {e:#}");
                    }
                }
                report.names.push(name);
            }
        }

        log::debug!(
            "janitor: purged {} cookie name(s) for revoked {} consent",
            report.names.len(),
            category
        );
        report
    }

    fn resolve(&self, pattern: &CookiePattern) -> Vec<String> {
        match pattern {
            CookiePattern::Exact(name) => vec![name.clone()],
            CookiePattern::Prefix(_) => self
                .store
                .names()
                .into_iter()
                .filter(|name| pattern.matches(name))
                .collect(),
        }
    }
}
