//! The consent bridge.
//!
//! [`ConsentBridge::reconcile`] takes the authoritative decision and brings
//! everything downstream in line with it:
//!
//! 1. read the previous legacy record (absent or malformed means all denied),
//! 2. diff it against the new decision,
//! 3. purge the tracking cookies of every newly revoked category,
//! 4. rewrite the legacy record,
//! 5. push the decision to the consent mode integrations,
//! 6. fire the change notifier once.
//!
//! Purging happens before the record is rewritten. If a cycle is cut short
//! between the two, the record still claims "granted" for cookies that are
//! already gone, and the next cycle purges again.
//!
//! The authoritative decision always wins. The legacy record is a
//! compatibility cache for the bootstrap code, never a second source of truth.
//!
//! # Example
//! ```rust
//! use std::sync::Arc;
//! use consent_bridge::{BridgeConfig, ConsentBridge, ConsentDecision};
//! use consent_bridge::cookies::InMemoryCookieStore;
//! use consent_bridge::notifier::ChangeBus;
//! use consent_bridge::signals::SignalAdapter;
//!
//! let store = Arc::new(InMemoryCookieStore::from_header("_fbp=fb.1.2"));
//! let bus = Arc::new(ChangeBus::new());
//! let mut changes = bus.subscribe();
//!
//! let bridge = ConsentBridge::new(BridgeConfig::default(), store.clone(), SignalAdapter::with_defaults(), bus);
//! bridge.reconcile(&ConsentDecision::granted());
//! let report = bridge.reconcile(&ConsentDecision::new(true, false)).unwrap();
//!
//! assert_eq!(report.revoked(), vec![consent_bridge::ConsentCategory::Marketing]);
//! assert!(changes.try_recv().is_ok());
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::BridgeConfig;
use crate::consent::{ConsentCategory, ConsentDecision, Transition};
use crate::cookies::CookieStoreHandle;
use crate::janitor::{CookieJanitor, PurgeReport};
use crate::manager::ConsentManager;
use crate::notifier::ChangeNotifier;
use crate::record::LegacyConsentRecord;
use crate::signals::SignalAdapter;

/// What one reconciliation cycle did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconcileReport {
    /// The legacy record found at the start of the cycle, if it was usable.
    pub previous: Option<ConsentDecision>,
    pub current: ConsentDecision,
    pub transitions: Vec<(ConsentCategory, Transition)>,
    pub purges: Vec<(ConsentCategory, PurgeReport)>,
    /// `false` when the cookie store refused the write.
    pub record_written: bool,
    /// Integrations that accepted the signal update.
    pub signals_delivered: usize,
}

impl ReconcileReport {
    pub fn transition(&self, category: ConsentCategory) -> Option<Transition> {
        self.transitions
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, t)| *t)
    }

    pub fn revoked(&self) -> Vec<ConsentCategory> {
        self.transitions
            .iter()
            .filter(|(_, t)| t.is_revocation())
            .map(|(c, _)| *c)
            .collect()
    }

    pub fn changed(&self) -> bool {
        self.transitions.iter().any(|(_, t)| t.is_change())
    }
}

/// Keeps the legacy record, tracking cookies and consent signals in line with
/// the authoritative decision.
pub struct ConsentBridge {
    record: LegacyConsentRecord,
    janitor: CookieJanitor,
    signals: SignalAdapter,
    notifier: Arc<dyn ChangeNotifier>,
    /// Set while a cycle runs.
    reconciling: AtomicBool,
}

impl ConsentBridge {
    pub fn new(
        config: BridgeConfig,
        store: CookieStoreHandle,
        signals: SignalAdapter,
        notifier: Arc<dyn ChangeNotifier>,
    ) -> Self {
        let record = LegacyConsentRecord::new(store.clone(), &config);
        let janitor = CookieJanitor::new(store, config.host, config.descriptors);

        Self {
            record,
            janitor,
            signals,
            notifier,
            reconciling: AtomicBool::new(false),
        }
    }

    pub fn record(&self) -> &LegacyConsentRecord {
        &self.record
    }

    pub fn janitor(&self) -> &CookieJanitor {
        &self.janitor
    }

    pub fn signals(&self) -> &SignalAdapter {
        &self.signals
    }

    /// Runs one reconciliation cycle for `current`.
    ///
    /// Returns `None` without touching anything when called from inside a
    /// running cycle (a listener reacting to the bridge's own notification).
    /// Never fails; store and integration errors are logged and the cycle
    /// carries on.
    pub fn reconcile(&self, current: &ConsentDecision) -> Option<ReconcileReport> {
        let Some(_guard) = CycleGuard::enter(&self.reconciling) else {
            log::debug!("bridge: ignoring re-entrant reconcile({current:?})");
            return None;
        };

        let previous = self.record.read();
        let transitions = current.transitions_from(&previous.unwrap_or_default());

        let purges: Vec<(ConsentCategory, PurgeReport)> = transitions
            .iter()
            .filter(|(_, t)| t.is_revocation())
            .map(|(category, _)| {
                log::info!("bridge: {category} consent revoked, purging tracking cookies");
                (*category, self.janitor.purge(*category))
            })
            .collect();

        let record_written = match self.record.write(current) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("bridge: failed to write {} record: {e:#}", self.record.cookie_name());
                false
            }
        };

        let signals_delivered = self.signals.update(current);

        self.notifier.notify();

        log::debug!("bridge: reconciled {previous:?} -> {current:?}");
        Some(ReconcileReport {
            previous,
            current: *current,
            transitions,
            purges,
            record_written,
            signals_delivered,
        })
    }

    /// Reconciles against the manager's current state.
    ///
    /// Does nothing while the manager has not produced a decision yet.
    pub fn sync(&self, manager: &dyn ConsentManager) -> Option<ReconcileReport> {
        if manager.snapshot().is_none() {
            log::debug!("bridge: consent manager not ready, nothing to sync");
            return None;
        }
        let decision = ConsentDecision::from_query(|c| manager.has_consent_for(c));
        self.reconcile(&decision)
    }

    /// Rewrites an existing legacy record that disagrees with the manager.
    ///
    /// This is the mount-time re-sync. Categories the rewrite would revoke are
    /// purged first, so the record never reads "denied" over live tracking
    /// cookies. It does not signal or notify. Any change it could make is also
    /// made by [`sync`](Self::sync). Returns whether the record was rewritten.
    pub fn resync_legacy_record(&self, manager: &dyn ConsentManager) -> bool {
        if manager.snapshot().is_none() {
            return false;
        }
        let Some(legacy) = self.record.read() else {
            return false;
        };

        let authoritative = ConsentDecision::from_query(|c| manager.has_consent_for(c));
        if legacy == authoritative {
            return false;
        }

        log::debug!("bridge: legacy record {legacy:?} differs from manager {authoritative:?}, rewriting");
        for (category, transition) in authoritative.transitions_from(&legacy) {
            if transition.is_revocation() {
                log::info!("bridge: {category} consent revoked, purging tracking cookies");
                self.janitor.purge(category);
            }
        }

        match self.record.write(&authoritative) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("bridge: failed to rewrite {} record: {e:#}", self.record.cookie_name());
                false
            }
        }
    }
}

/// Marks a cycle as running for as long as it is alive.
struct CycleGuard<'a>(&'a AtomicBool);

impl<'a> CycleGuard<'a> {
    fn enter(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| CycleGuard(flag))
    }
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
