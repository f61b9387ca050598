//! The authoritative consent manager, seen from the bridge.
//!
//! The manager owns the user's real decision (collection UI, defaults,
//! persistence). The bridge only needs its current snapshot and the
//! "has consent for X" query.

use crate::consent::{ConsentCategory, ConsentDecision};
use std::sync::{PoisonError, RwLock};

pub trait ConsentManager: Send + Sync {
    /// The current decision, or `None` while the manager is still loading.
    fn snapshot(&self) -> Option<ConsentDecision>;

    fn has_consent_for(&self, category: ConsentCategory) -> bool {
        match self.snapshot() {
            Some(decision) => decision.is_granted(category),
            None => category == ConsentCategory::Necessary,
        }
    }
}

/// A manager holding its decision in memory. Useful for embedding and tests.
#[derive(Debug, Default)]
pub struct InMemoryConsentManager {
    decision: RwLock<Option<ConsentDecision>>,
}

impl InMemoryConsentManager {
    /// A manager that has not loaded a decision yet.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_decision(decision: ConsentDecision) -> Self {
        Self {
            decision: RwLock::new(Some(decision)),
        }
    }

    pub fn set(&self, decision: ConsentDecision) {
        *self.decision.write().unwrap_or_else(PoisonError::into_inner) = Some(decision);
    }

    pub fn clear(&self) {
        *self.decision.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl ConsentManager for InMemoryConsentManager {
    fn snapshot(&self) -> Option<ConsentDecision> {
        *self.decision.read().unwrap_or_else(PoisonError::into_inner)
    }
}
