//! Actions that record what happened, for asserting on run behaviour.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use sitedag::exec::{TaskAction, action_fn};

/// Shared, ordered log of action events (`"<task>"`, `"<task>:start"`, ...).
#[derive(Debug, Clone, Default)]
pub struct ActionLog {
    events: Arc<Mutex<Vec<String>>>,
}

impl ActionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: impl Into<String>) {
        self.events.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    /// How often `event` was recorded.
    pub fn count(&self, event: &str) -> usize {
        self.events.lock().unwrap().iter().filter(|e| *e == event).count()
    }

    /// Index of the first occurrence of `event`.
    pub fn position(&self, event: &str) -> Option<usize> {
        self.events.lock().unwrap().iter().position(|e| e == event)
    }
}

/// Records `name` and succeeds.
pub fn recording_action(log: &ActionLog, name: &str) -> Arc<dyn TaskAction> {
    let log = log.clone();
    let name = name.to_string();
    action_fn(move |_ctx| {
        let log = log.clone();
        let name = name.clone();
        async move {
            log.push(name);
            Ok(())
        }
    })
}

/// Records `<name>:start`, sleeps, then records `name` and succeeds.
pub fn slow_action(log: &ActionLog, name: &str, delay: Duration) -> Arc<dyn TaskAction> {
    let log = log.clone();
    let name = name.to_string();
    action_fn(move |_ctx| {
        let log = log.clone();
        let name = name.clone();
        async move {
            log.push(format!("{name}:start"));
            tokio::time::sleep(delay).await;
            log.push(name);
            Ok(())
        }
    })
}

/// Records `name` and fails with `message`.
pub fn failing_action(log: &ActionLog, name: &str, message: &str) -> Arc<dyn TaskAction> {
    let log = log.clone();
    let name = name.to_string();
    let message = message.to_string();
    action_fn(move |_ctx| {
        let log = log.clone();
        let name = name.clone();
        let message = message.clone();
        async move {
            log.push(name);
            anyhow::bail!(message)
        }
    })
}
