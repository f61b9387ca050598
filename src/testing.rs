//! Recording doubles shared by the unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;

use crate::cookies::{CookieOptions, CookieStore, InMemoryCookieStore};
use crate::notifier::ChangeNotifier;
use crate::signals::{ConsentRuntime, SignalCommand, SignalMap};

/// Ordered log of side effects, shared between doubles so tests can check ordering.
#[derive(Clone, Debug, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn position(&self, needle: &str) -> Option<usize> {
        self.entries().iter().position(|e| e == needle)
    }
}

/// An in-memory store that journals every write and deletion.
pub struct RecordingCookieStore {
    inner: InMemoryCookieStore,
    journal: Journal,
    deletions: Mutex<Vec<(String, Option<String>)>>,
}

impl RecordingCookieStore {
    pub fn new(journal: Journal) -> Self {
        Self::with_store(InMemoryCookieStore::new(), journal)
    }

    pub fn with_store(inner: InMemoryCookieStore, journal: Journal) -> Self {
        Self {
            inner,
            journal,
            deletions: Mutex::new(Vec::new()),
        }
    }

    pub fn inner(&self) -> &InMemoryCookieStore {
        &self.inner
    }

    pub fn deletions(&self) -> Vec<(String, Option<String>)> {
        self.deletions.lock().unwrap().clone()
    }

    pub fn reset(&self) {
        self.deletions.lock().unwrap().clear();
    }
}

impl CookieStore for RecordingCookieStore {
    fn get(&self, name: &str) -> Option<String> {
        self.inner.get(name)
    }

    fn get_scoped(&self, name: &str, domain: Option<&str>) -> Option<String> {
        self.inner.get_scoped(name, domain)
    }

    fn set(&self, name: &str, value: &str, options: &CookieOptions) -> Result<()> {
        self.journal.push(format!("set {name}"));
        self.inner.set(name, value, options)
    }

    fn delete(&self, name: &str, domain: Option<&str>) -> Result<()> {
        self.journal.push(format!("delete {name}"));
        self.deletions
            .lock()
            .unwrap()
            .push((name.to_string(), domain.map(str::to_string)));
        self.inner.delete(name, domain)
    }

    fn names(&self) -> Vec<String> {
        self.inner.names()
    }
}

/// A store whose writes always fail.
pub struct FailingCookieStore;

impl CookieStore for FailingCookieStore {
    fn get(&self, _name: &str) -> Option<String> {
        None
    }

    fn get_scoped(&self, _name: &str, _domain: Option<&str>) -> Option<String> {
        None
    }

    fn set(&self, _name: &str, _value: &str, _options: &CookieOptions) -> Result<()> {
        anyhow::bail!("disk full")
    }

    fn delete(&self, _name: &str, _domain: Option<&str>) -> Result<()> {
        anyhow::bail!("disk full")
    }

    fn names(&self) -> Vec<String> {
        Vec::new()
    }
}

/// A downstream runtime that records every push.
pub struct RecordingRuntime {
    label: String,
    journal: Journal,
    pushes: Mutex<Vec<(SignalCommand, SignalMap)>>,
    fail: bool,
}

impl RecordingRuntime {
    pub fn new(label: &str, journal: Journal) -> Self {
        Self {
            label: label.to_string(),
            journal,
            pushes: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub fn failing(label: &str, journal: Journal) -> Self {
        Self {
            fail: true,
            ..Self::new(label, journal)
        }
    }

    pub fn pushes(&self) -> Vec<(SignalCommand, SignalMap)> {
        self.pushes.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<(SignalCommand, SignalMap)> {
        self.pushes().pop()
    }
}

impl ConsentRuntime for RecordingRuntime {
    fn push(&self, command: SignalCommand, signals: &SignalMap) -> Result<()> {
        self.journal.push(format!("push {}", self.label));
        self.pushes.lock().unwrap().push((command, signals.clone()));
        if self.fail {
            anyhow::bail!("{} exploded", self.label);
        }
        Ok(())
    }
}

/// Counts notifications.
pub struct RecordingNotifier {
    journal: Journal,
    count: AtomicUsize,
}

impl RecordingNotifier {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            count: AtomicUsize::new(0),
        }
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl ChangeNotifier for RecordingNotifier {
    fn notify(&self) {
        self.journal.push("notify");
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}
