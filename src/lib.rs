pub mod bridge;
pub mod config;
pub mod consent;
pub mod cookies;
pub mod errors;
pub mod gate;
pub mod janitor;
pub mod manager;
pub mod notifier;
pub mod record;
pub mod signals;

#[cfg(test)]
mod testing;

pub use bridge::{ConsentBridge, ReconcileReport};
pub use config::BridgeConfig;
pub use consent::{ConsentCategory, ConsentDecision, Transition};
pub use errors::{CategoryError, RecordError};
