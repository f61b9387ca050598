use std::sync::{PoisonError, RwLock};

use anyhow::Result;
use time::OffsetDateTime;

use crate::cookies::cookies::normalize_domain;
use crate::cookies::store::CookieStore;
use crate::cookies::{parse_cookie_header, Cookie, CookieOptions};

/// In-memory cookie jar. Nothing is persisted.
#[derive(Debug, Default)]
pub struct InMemoryCookieStore {
    cookies: RwLock<Vec<Cookie>>,
}

impl InMemoryCookieStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a jar holding `cookies`. Expired entries are dropped.
    pub fn from_cookies(cookies: Vec<Cookie>) -> Self {
        let now = OffsetDateTime::now_utc();
        let mut jar = Vec::with_capacity(cookies.len());
        for cookie in cookies.into_iter().filter(|c| !c.is_expired_at(now)) {
            upsert(&mut jar, cookie);
        }
        Self {
            cookies: RwLock::new(jar),
        }
    }

    /// Creates a jar from a `document.cookie` style header.
    ///
    /// Every pair becomes a host-only session cookie with path `/`.
    pub fn from_header(header: &str) -> Self {
        let cookies = parse_cookie_header(header)
            .into_iter()
            .map(|(name, value)| Cookie {
                name,
                value,
                path: Some("/".to_string()),
                domain: None,
                secure: false,
                expires: None,
                same_site: None,
                http_only: false,
            })
            .collect();
        Self::from_cookies(cookies)
    }

    /// Snapshot of every live cookie, in insertion order.
    pub fn cookies(&self) -> Vec<Cookie> {
        let now = OffsetDateTime::now_utc();
        self.cookies
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|c| !c.is_expired_at(now))
            .cloned()
            .collect()
    }

    /// Looks up the full record for `name` under `domain`.
    pub fn cookie(&self, name: &str, domain: Option<&str>) -> Option<Cookie> {
        let domain = normalize_domain(domain);
        self.cookies()
            .into_iter()
            .find(|c| c.name == name && c.domain == domain)
    }

    pub fn len(&self) -> usize {
        self.cookies().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CookieStore for InMemoryCookieStore {
    fn get(&self, name: &str) -> Option<String> {
        let now = OffsetDateTime::now_utc();
        self.cookies
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|c| c.name == name && !c.is_expired_at(now))
            .map(|c| c.value.clone())
    }

    fn get_scoped(&self, name: &str, domain: Option<&str>) -> Option<String> {
        self.cookie(name, domain).map(|c| c.value)
    }

    fn set(&self, name: &str, value: &str, options: &CookieOptions) -> Result<()> {
        let domain = normalize_domain(options.domain.as_deref());
        let cookie = Cookie {
            name: name.to_string(),
            value: value.to_string(),
            path: options.path.clone().or_else(|| Some("/".to_string())),
            domain,
            secure: options.secure,
            expires: options.expires,
            same_site: options.same_site,
            http_only: false,
        };

        let mut cookies = self.cookies.write().unwrap_or_else(PoisonError::into_inner);

        // An already-expired write is a deletion
        if cookie.is_expired_at(OffsetDateTime::now_utc()) {
            cookies.retain(|c| !(c.name == cookie.name && c.domain == cookie.domain));
            return Ok(());
        }

        upsert(&mut cookies, cookie);
        Ok(())
    }

    fn delete(&self, name: &str, domain: Option<&str>) -> Result<()> {
        let domain = normalize_domain(domain);
        self.cookies
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|c| !(c.name == name && c.domain == domain));
        Ok(())
    }

    fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.cookies().into_iter().map(|c| c.name).collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}

/// Replaces an existing cookie with the same name and scope, or appends.
fn upsert(cookies: &mut Vec<Cookie>, cookie: Cookie) {
    if let Some(existing) = cookies
        .iter_mut()
        .find(|c| c.name == cookie.name && c.domain == cookie.domain)
    {
        *existing = cookie;
    } else {
        cookies.push(cookie);
    }
}
