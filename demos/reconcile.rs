//! Walks a visitor through a consent lifecycle against a JSON cookie jar.
//!
//! ```sh
//! RUST_LOG=debug cargo run --example reconcile -- /tmp/cookies.json
//! ```

use std::sync::Arc;

use anyhow::Result;
use consent_bridge::cookies::{CookieOptions, CookieStore, JsonCookieStore};
use consent_bridge::gate::ConsentGate;
use consent_bridge::manager::InMemoryConsentManager;
use consent_bridge::notifier::ChangeBus;
use consent_bridge::signals::{ConsentRuntime, SignalAdapter, SignalCommand, SignalMap};
use consent_bridge::{BridgeConfig, ConsentBridge, ConsentCategory, ConsentDecision};

/// Stands in for `gtag('consent', ...)`.
struct PrintingRuntime;

impl ConsentRuntime for PrintingRuntime {
    fn push(&self, command: SignalCommand, signals: &SignalMap) -> Result<()> {
        println!("gtag consent {:?} {}", command, serde_json::to_string(signals)?);
        Ok(())
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let path = std::env::args().nth(1).unwrap_or_else(|| "cookies.json".to_string());
    let store = Arc::new(JsonCookieStore::open(&path)?);

    let config = BridgeConfig::builder().host("tours.example.com").build()?;
    let signals = SignalAdapter::with_defaults();
    let bus = Arc::new(ChangeBus::new());
    let mut changes = bus.subscribe();

    let bridge = ConsentBridge::new(config, store.clone(), signals, bus.clone());
    let manager = InMemoryConsentManager::new();
    let map_gate = ConsentGate::new(ConsentCategory::Marketing);

    // Before any script loads, the integrations get the denied defaults.
    if let Some(gcm) = bridge.signals().integration("google-consent-mode") {
        gcm.attach(Arc::new(PrintingRuntime));
    }
    bridge.signals().push_defaults();
    println!("map widget: {:?}", map_gate.evaluate(&manager));

    // The visitor accepts everything; tracking scripts drop their cookies.
    manager.set(ConsentDecision::granted());
    bridge.sync(&manager);
    bridge.resync_legacy_record(&manager);
    for name in ["_ga", "_ga_TOURS1", "_fbp"] {
        store.set(name, "1", &CookieOptions { domain: Some(".tours.example.com".into()), ..CookieOptions::default() })?;
    }
    println!("cookies after opt-in: {:?}", store.names());
    println!("map widget: {:?}", map_gate.evaluate(&manager));

    // Then withdraws marketing consent.
    manager.set(ConsentDecision::new(true, false));
    if let Some(report) = bridge.sync(&manager) {
        println!("revoked: {:?}", report.revoked());
    }
    println!("cookies after revocation: {:?}", store.names());
    println!("map widget: {:?}", map_gate.evaluate(&manager));

    let mut seen = 0;
    while changes.try_recv().is_ok() {
        seen += 1;
    }
    println!("change notifications: {seen}");
    println!("legacy record: {:?}", bridge.record().status());

    Ok(())
}
