//! Consent mode signals for downstream integrations.
//!
//! Each downstream integration (Google Consent Mode, the Facebook Pixel, ...)
//! speaks its own vocabulary: a set of signal names, each of which is
//! `granted` or `denied`. A [`ConsentModeIntegration`] declares that vocabulary
//! as a mapping from signal name to the [`ConsentCategory`] that drives it, so
//! a single category may fan out to several signals.
//!
//! The integration's script may not have loaded yet. Until a
//! [`ConsentRuntime`] is attached the integration silently ignores updates;
//! the bridge pushes on every cycle, so a late-loading script still picks up
//! the current state on the next one.

use crate::consent::{ConsentCategory, ConsentDecision};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::{Debug, Display, Formatter};
use std::sync::{Arc, PoisonError, RwLock};

/// Value of a single downstream consent signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsentSignal {
    Granted,
    Denied,
}

impl ConsentSignal {
    pub fn from_granted(granted: bool) -> Self {
        if granted {
            ConsentSignal::Granted
        } else {
            ConsentSignal::Denied
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConsentSignal::Granted => "granted",
            ConsentSignal::Denied => "denied",
        }
    }
}

impl Display for ConsentSignal {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signal name to value, in a stable order.
pub type SignalMap = BTreeMap<String, ConsentSignal>;

/// Which consent call is being made on the downstream runtime.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignalCommand {
    /// Initial state, sent before any tracking script runs.
    Default,
    /// A change of the user's decision.
    Update,
}

/// The native consent entry point of a loaded integration script.
pub trait ConsentRuntime: Send + Sync {
    fn push(&self, command: SignalCommand, signals: &SignalMap) -> anyhow::Result<()>;
}

/// One downstream integration and its signal vocabulary.
pub struct ConsentModeIntegration {
    name: String,
    /// Signal name and the category that drives it.
    vocabulary: Vec<(String, ConsentCategory)>,
    /// Signals only present in the default state, always granted there.
    default_granted: Vec<String>,
    runtime: RwLock<Option<Arc<dyn ConsentRuntime>>>,
}

impl Debug for ConsentModeIntegration {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsentModeIntegration")
            .field("name", &self.name)
            .field("vocabulary", &self.vocabulary)
            .field("loaded", &self.is_loaded())
            .finish_non_exhaustive()
    }
}

impl ConsentModeIntegration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vocabulary: Vec::new(),
            default_granted: Vec::new(),
            runtime: RwLock::new(None),
        }
    }

    /// Adds a signal driven by `category`.
    pub fn signal(mut self, name: impl Into<String>, category: ConsentCategory) -> Self {
        self.vocabulary.push((name.into(), category));
        self
    }

    /// Adds a signal that is reported as granted in the default state only.
    pub fn default_granted(mut self, name: impl Into<String>) -> Self {
        self.default_granted.push(name.into());
        self
    }

    /// Google Consent Mode v2 (`gtag('consent', ...)`).
    pub fn google_consent_mode() -> Self {
        Self::new("google-consent-mode")
            .signal("analytics_storage", ConsentCategory::Analytics)
            .signal("ad_storage", ConsentCategory::Marketing)
            .signal("ad_user_data", ConsentCategory::Marketing)
            .signal("ad_personalization", ConsentCategory::Marketing)
            .signal("functionality_storage", ConsentCategory::Necessary)
            .signal("personalization_storage", ConsentCategory::Analytics)
            .default_granted("security_storage")
    }

    /// Facebook Pixel (`fbq('consent', 'grant' | 'revoke')`).
    pub fn facebook_pixel() -> Self {
        Self::new("facebook-pixel").signal("consent", ConsentCategory::Marketing)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Marks the integration's script as loaded.
    pub fn attach(&self, runtime: Arc<dyn ConsentRuntime>) {
        *self.runtime.write().unwrap_or_else(PoisonError::into_inner) = Some(runtime);
    }

    pub fn detach(&self) {
        *self.runtime.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn is_loaded(&self) -> bool {
        self.runtime.read().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    /// Translates `decision` into this integration's vocabulary.
    pub fn translate(&self, decision: &ConsentDecision) -> SignalMap {
        self.vocabulary
            .iter()
            .map(|(name, category)| (name.clone(), ConsentSignal::from_granted(decision.is_granted(*category))))
            .collect()
    }

    /// The state announced before any decision exists: everything denied,
    /// except the signals registered with [`default_granted`](Self::default_granted).
    pub fn default_signals(&self) -> SignalMap {
        let mut signals: SignalMap = self
            .vocabulary
            .iter()
            .map(|(name, _)| (name.clone(), ConsentSignal::Denied))
            .collect();
        for name in &self.default_granted {
            signals.insert(name.clone(), ConsentSignal::Granted);
        }
        signals
    }

    /// Sends `signals` if the runtime is present. Returns whether anything was sent.
    fn dispatch(&self, command: SignalCommand, signals: &SignalMap) -> bool {
        let runtime = self.runtime.read().unwrap_or_else(PoisonError::into_inner).clone();
        let Some(runtime) = runtime else {
            if cfg!(debug_assertions) {
                log::debug!("signals: {} not loaded, skipping {:?}", self.name, command);
            }
            return false;
        };

        match runtime.push(command, signals) {
            Ok(()) => {
                log::debug!("signals: {} {:?} {:?}", self.name, command, signals);
                true
            }
            Err(e) => {
                log::warn!("signals: {} rejected consent {:?}: {e:#}", self.name, command);
                false
            }
        }
    }
}

/// Fans a [`ConsentDecision`] out to every registered integration.
#[derive(Debug, Default)]
pub struct SignalAdapter {
    integrations: Vec<Arc<ConsentModeIntegration>>,
}

impl SignalAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Google Consent Mode and the Facebook Pixel, neither loaded yet.
    pub fn with_defaults() -> Self {
        Self::new()
            .with_integration(ConsentModeIntegration::google_consent_mode())
            .with_integration(ConsentModeIntegration::facebook_pixel())
    }

    pub fn with_integration(mut self, integration: ConsentModeIntegration) -> Self {
        self.integrations.push(Arc::new(integration));
        self
    }

    pub fn integration(&self, name: &str) -> Option<Arc<ConsentModeIntegration>> {
        self.integrations.iter().find(|i| i.name() == name).cloned()
    }

    pub fn integrations(&self) -> &[Arc<ConsentModeIntegration>] {
        &self.integrations
    }

    /// Pushes `decision` to every loaded integration. Never fails.
    ///
    /// Returns the number of integrations that accepted the update.
    pub fn update(&self, decision: &ConsentDecision) -> usize {
        self.integrations
            .iter()
            .filter(|i| i.dispatch(SignalCommand::Update, &i.translate(decision)))
            .count()
    }

    /// Pushes the default (denied) state to every loaded integration.
    pub fn push_defaults(&self) -> usize {
        self.integrations
            .iter()
            .filter(|i| i.dispatch(SignalCommand::Default, &i.default_signals()))
            .count()
    }
}
