//! Consent-gated content.
//!
//! The page layer only loads third-party widgets (maps, embedded videos) once
//! the user has granted the matching category. Nothing renders while the
//! manager is still loading.

use crate::consent::ConsentCategory;
use crate::manager::ConsentManager;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateState {
    /// The manager has no decision yet; show the fallback.
    Pending,
    Allowed,
    Blocked,
}

impl GateState {
    pub fn should_render(&self) -> bool {
        matches!(self, GateState::Allowed)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConsentGate {
    preference: ConsentCategory,
}

impl ConsentGate {
    pub fn new(preference: ConsentCategory) -> Self {
        Self { preference }
    }

    pub fn preference(&self) -> ConsentCategory {
        self.preference
    }

    pub fn evaluate(&self, manager: &dyn ConsentManager) -> GateState {
        if manager.snapshot().is_none() {
            return GateState::Pending;
        }
        if manager.has_consent_for(self.preference) {
            GateState::Allowed
        } else {
            GateState::Blocked
        }
    }
}
