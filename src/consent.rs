//! Consent categories, decisions and the transitions between them.
//!
//! The category set is closed: [`ConsentCategory::Necessary`] is always granted and
//! never persisted, the other two are user toggles carried by a [`ConsentDecision`].

use crate::errors::CategoryError;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// One of the fixed consent categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsentCategory {
    /// Strictly necessary storage. Always granted.
    Necessary,
    /// Measurement and analytics integrations.
    Analytics,
    /// Advertising and marketing integrations.
    Marketing,
}

impl ConsentCategory {
    /// Every category, necessary included.
    pub const ALL: [ConsentCategory; 3] = [
        ConsentCategory::Necessary,
        ConsentCategory::Analytics,
        ConsentCategory::Marketing,
    ];

    /// Categories the user can toggle, in persistence order.
    pub const TOGGLEABLE: [ConsentCategory; 2] = [ConsentCategory::Analytics, ConsentCategory::Marketing];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConsentCategory::Necessary => "necessary",
            ConsentCategory::Analytics => "analytics",
            ConsentCategory::Marketing => "marketing",
        }
    }

    pub fn is_toggleable(&self) -> bool {
        !matches!(self, ConsentCategory::Necessary)
    }
}

impl Display for ConsentCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConsentCategory {
    type Err = CategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConsentCategory::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CategoryError::Unknown(s.to_string()))
    }
}

/// Snapshot of the user's choice for every toggleable category.
///
/// The serialized form is exactly the legacy cookie payload:
/// `{"analytics":bool,"marketing":bool}`. Both fields are required when decoding,
/// a payload missing either one is rejected.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConsentDecision {
    pub analytics: bool,
    pub marketing: bool,
}

impl ConsentDecision {
    pub fn new(analytics: bool, marketing: bool) -> Self {
        Self { analytics, marketing }
    }

    /// Everything denied. This is the fail-safe prior state.
    pub fn denied() -> Self {
        Self::default()
    }

    pub fn granted() -> Self {
        Self::new(true, true)
    }

    pub fn is_granted(&self, category: ConsentCategory) -> bool {
        match category {
            ConsentCategory::Necessary => true,
            ConsentCategory::Analytics => self.analytics,
            ConsentCategory::Marketing => self.marketing,
        }
    }

    /// Builds a decision by asking `query` about each toggleable category.
    pub fn from_query(mut query: impl FnMut(ConsentCategory) -> bool) -> Self {
        Self {
            analytics: query(ConsentCategory::Analytics),
            marketing: query(ConsentCategory::Marketing),
        }
    }

    /// Per-category transition from `previous` to `self`, in persistence order.
    pub fn transitions_from(&self, previous: &ConsentDecision) -> Vec<(ConsentCategory, Transition)> {
        ConsentCategory::TOGGLEABLE
            .into_iter()
            .map(|c| (c, Transition::between(previous.is_granted(c), self.is_granted(c))))
            .collect()
    }
}

/// How a single category moved between two decisions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Transition {
    UnchangedGranted,
    UnchangedDenied,
    NewlyGranted,
    NewlyRevoked,
}

impl Transition {
    pub fn between(previous: bool, current: bool) -> Self {
        match (previous, current) {
            (true, true) => Transition::UnchangedGranted,
            (false, false) => Transition::UnchangedDenied,
            (false, true) => Transition::NewlyGranted,
            (true, false) => Transition::NewlyRevoked,
        }
    }

    pub fn is_revocation(&self) -> bool {
        matches!(self, Transition::NewlyRevoked)
    }

    pub fn is_change(&self) -> bool {
        matches!(self, Transition::NewlyGranted | Transition::NewlyRevoked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn necessary_is_always_granted() {
        assert!(ConsentDecision::denied().is_granted(ConsentCategory::Necessary));
        assert!(ConsentDecision::granted().is_granted(ConsentCategory::Necessary));
    }

    #[test]
    fn category_parses_case_insensitively() {
        assert_eq!("Analytics".parse::<ConsentCategory>(), Ok(ConsentCategory::Analytics));
        assert_eq!(" marketing ".parse::<ConsentCategory>(), Ok(ConsentCategory::Marketing));
        assert_eq!(
            "functional".parse::<ConsentCategory>(),
            Err(CategoryError::Unknown("functional".into()))
        );
    }

    #[test]
    fn transition_table() {
        assert_eq!(Transition::between(true, true), Transition::UnchangedGranted);
        assert_eq!(Transition::between(false, false), Transition::UnchangedDenied);
        assert_eq!(Transition::between(false, true), Transition::NewlyGranted);
        assert_eq!(Transition::between(true, false), Transition::NewlyRevoked);
        assert!(Transition::NewlyRevoked.is_revocation());
        assert!(!Transition::NewlyGranted.is_revocation());
    }

    #[test]
    fn transitions_only_cover_toggleable_categories() {
        let previous = ConsentDecision::granted();
        let current = ConsentDecision::new(true, false);

        let transitions = current.transitions_from(&previous);
        assert_eq!(
            transitions,
            vec![
                (ConsentCategory::Analytics, Transition::UnchangedGranted),
                (ConsentCategory::Marketing, Transition::NewlyRevoked),
            ]
        );
    }

    #[test]
    fn decision_serializes_as_legacy_payload() {
        let json = serde_json::to_string(&ConsentDecision::new(true, false)).unwrap();
        assert_eq!(json, r#"{"analytics":true,"marketing":false}"#);
    }

    #[test]
    fn decision_rejects_missing_fields() {
        assert!(serde_json::from_str::<ConsentDecision>(r#"{"analytics":true}"#).is_err());
    }
}
