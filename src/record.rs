//! The legacy consent record.
//!
//! Pre-existing bootstrap code decides whether to start tracking scripts by
//! reading a single `consent` cookie holding the URL-encoded JSON payload
//! `{"analytics":bool,"marketing":bool}`. This module owns that format. The
//! bridge is the record's only writer; everything else just reads it.
//!
//! Reads never fail: a missing, undecodable or incomplete record is reported as
//! absent, and the status helpers fall back to "everything denied".
//!
//! The record is written host-only. Older code may have left a copy scoped to
//! the site's domain; the host-only copy wins on read, and the next write
//! removes the domain-scoped one.

use crate::config::BridgeConfig;
use crate::consent::ConsentDecision;
use crate::cookies::{CookieOptions, CookieStoreHandle, SameSite};
use crate::errors::RecordError;
use crate::janitor::ScopeVariant;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use time::{Duration, OffsetDateTime};

/// Characters `encodeURIComponent` leaves alone.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Reader/writer for the `consent` cookie.
pub struct LegacyConsentRecord {
    store: CookieStoreHandle,
    name: String,
    host: String,
    path: String,
    max_age: Duration,
    same_site: SameSite,
}

impl LegacyConsentRecord {
    pub fn new(store: CookieStoreHandle, config: &BridgeConfig) -> Self {
        Self {
            store,
            name: config.cookie_name.clone(),
            host: config.host.clone(),
            path: config.cookie_path.clone(),
            max_age: config.max_age,
            same_site: config.same_site,
        }
    }

    pub fn cookie_name(&self) -> &str {
        &self.name
    }

    /// Serializes `decision` into the cookie value.
    pub fn encode(decision: &ConsentDecision) -> Result<String, RecordError> {
        let json = serde_json::to_string(decision)?;
        Ok(utf8_percent_encode(&json, URI_COMPONENT).to_string())
    }

    /// Parses a cookie value produced by [`encode`](Self::encode) (or by the legacy code).
    pub fn decode(raw: &str) -> Result<ConsentDecision, RecordError> {
        let json = percent_decode_str(raw.trim()).decode_utf8()?;
        Ok(serde_json::from_str(&json)?)
    }

    /// The stored decision, or `None` when there is no usable record.
    pub fn read(&self) -> Option<ConsentDecision> {
        let raw = self.store.get_scoped(&self.name, None).or_else(|| {
            self.domain_scopes()
                .find_map(|d| self.store.get_scoped(&self.name, Some(d.as_str())))
        })?;
        match Self::decode(&raw) {
            Ok(decision) => Some(decision),
            Err(e) => {
                log::debug!("record: ignoring malformed {} cookie: {}", self.name, e);
                None
            }
        }
    }

    /// Overwrites the record with `decision`, refreshing its expiry.
    pub fn write(&self, decision: &ConsentDecision) -> anyhow::Result<()> {
        let value = Self::encode(decision)?;
        let options = CookieOptions {
            expires: Some(OffsetDateTime::now_utc() + self.max_age),
            path: Some(self.path.clone()),
            domain: None,
            same_site: Some(self.same_site),
            secure: false,
        };
        self.store.set(&self.name, &value, &options)?;
        log::debug!("record: wrote {} = {:?}", self.name, decision);

        for domain in self.domain_scopes() {
            if self.store.get_scoped(&self.name, Some(domain.as_str())).is_none() {
                continue;
            }
            match self.store.delete(&self.name, Some(domain.as_str())) {
                Ok(()) => log::debug!("record: removed stale {} cookie scoped to {domain}", self.name),
                Err(e) => log::warn!("record: failed to remove stale {} cookie scoped to {domain}: {e:#}", self.name),
            }
        }
        Ok(())
    }

    fn domain_scopes(&self) -> impl Iterator<Item = String> + '_ {
        ScopeVariant::ALL.iter().filter_map(|v| v.domain(&self.host))
    }

    /// The stored decision, defaulting to everything denied.
    pub fn status(&self) -> ConsentDecision {
        self.read().unwrap_or_default()
    }

    pub fn has_analytics_consent(&self) -> bool {
        self.status().analytics
    }

    pub fn has_marketing_consent(&self) -> bool {
        self.status().marketing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cookies::{CookieStore, InMemoryCookieStore};
    use std::sync::Arc;

    fn record() -> (Arc<InMemoryCookieStore>, LegacyConsentRecord) {
        let store = Arc::new(InMemoryCookieStore::new());
        let record = LegacyConsentRecord::new(store.clone(), &BridgeConfig::default());
        (store, record)
    }

    #[test]
    fn encodes_like_encode_uri_component() {
        let encoded = LegacyConsentRecord::encode(&ConsentDecision::new(true, false)).unwrap();
        assert_eq!(encoded, "%7B%22analytics%22%3Atrue%2C%22marketing%22%3Afalse%7D");
    }

    #[test]
    fn all_four_decisions_round_trip() {
        for analytics in [false, true] {
            for marketing in [false, true] {
                let decision = ConsentDecision::new(analytics, marketing);
                let encoded = LegacyConsentRecord::encode(&decision).unwrap();
                assert_eq!(LegacyConsentRecord::decode(&encoded).unwrap(), decision);
            }
        }
    }

    #[test]
    fn decodes_unencoded_and_extended_payloads() {
        let plain = LegacyConsentRecord::decode(r#"{"analytics":false,"marketing":true}"#).unwrap();
        assert_eq!(plain, ConsentDecision::new(false, true));

        let extra = LegacyConsentRecord::decode("%7B%22analytics%22%3Atrue%2C%22marketing%22%3Atrue%2C%22v%22%3A2%7D");
        assert_eq!(extra.unwrap(), ConsentDecision::granted());
    }

    #[test]
    fn malformed_records_are_errors() {
        assert!(matches!(LegacyConsentRecord::decode("not-json"), Err(RecordError::Json(_))));
        assert!(matches!(LegacyConsentRecord::decode("%FF%FE"), Err(RecordError::Encoding(_))));
        assert!(LegacyConsentRecord::decode("%7B%22analytics%22%3Atrue%7D").is_err());
    }

    #[test]
    fn missing_or_malformed_record_reads_as_absent() {
        let (store, record) = record();
        assert!(record.read().is_none());
        assert_eq!(record.status(), ConsentDecision::denied());

        store.set("consent", "%7Bgarbage", &CookieOptions::default()).unwrap();
        assert!(record.read().is_none());
        assert!(!record.has_analytics_consent());
        assert!(!record.has_marketing_consent());
    }

    #[test]
    fn write_sets_cookie_attributes() {
        let (store, record) = record();
        let before = OffsetDateTime::now_utc();
        record.write(&ConsentDecision::new(true, false)).unwrap();

        let cookie = store.cookie("consent", None).unwrap();
        assert_eq!(cookie.path.as_deref(), Some("/"));
        assert_eq!(cookie.same_site, Some(SameSite::Lax));
        assert!(cookie.is_host_only());

        let expires = cookie.expires.unwrap();
        assert!(expires >= before + Duration::days(365));
        assert!(expires <= OffsetDateTime::now_utc() + Duration::days(365));

        assert!(record.has_analytics_consent());
        assert!(!record.has_marketing_consent());
    }

    fn domain_scoped(host: &str) -> CookieOptions {
        CookieOptions {
            domain: Some(format!(".{host}")),
            ..CookieOptions::default()
        }
    }

    #[test]
    fn host_only_record_wins_over_a_domain_scoped_copy() {
        let (store, record) = record();
        let host = BridgeConfig::default().host;
        let granted = LegacyConsentRecord::encode(&ConsentDecision::granted()).unwrap();
        store.set("consent", &granted, &domain_scoped(&host)).unwrap();

        // the domain-scoped copy is still honoured when it is the only one
        assert_eq!(record.read(), Some(ConsentDecision::granted()));

        let denied = LegacyConsentRecord::encode(&ConsentDecision::denied()).unwrap();
        store.set("consent", &denied, &CookieOptions::default()).unwrap();
        assert_eq!(record.read(), Some(ConsentDecision::denied()));
    }

    #[test]
    fn write_removes_a_domain_scoped_copy() {
        let (store, record) = record();
        let host = BridgeConfig::default().host;
        let granted = LegacyConsentRecord::encode(&ConsentDecision::granted()).unwrap();
        store.set("consent", &granted, &domain_scoped(&host)).unwrap();

        record.write(&ConsentDecision::new(false, true)).unwrap();

        assert!(store.cookie("consent", Some(host.as_str())).is_none());
        assert!(store.cookie("consent", None).is_some());
        assert_eq!(store.len(), 1);
        assert_eq!(record.read(), Some(ConsentDecision::new(false, true)));
    }

    #[test]
    fn rewrite_replaces_and_refreshes() {
        let (store, record) = record();
        record.write(&ConsentDecision::granted()).unwrap();
        let first = store.cookie("consent", None).unwrap().expires.unwrap();

        record.write(&ConsentDecision::denied()).unwrap();
        let cookie = store.cookie("consent", None).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(record.read(), Some(ConsentDecision::denied()));
        assert!(cookie.expires.unwrap() >= first);
    }
}
