//! Identity enrichment — maps Umbrella identity IDs to display names.
//!
//! The cache is filled by the feeds layer on its own cadence. The transformer
//! only ever reads it through [`IdentityResolver`].

use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Read-only lookup from identity ID to display label.
pub trait IdentityResolver {
    fn resolve(&self, id: &str) -> Option<&str>;
}

impl IdentityResolver for HashMap<String, String> {
    fn resolve(&self, id: &str) -> Option<&str> {
        self.get(id).map(String::as_str)
    }
}

/// Identity labels plus the time they were last refreshed.
#[derive(Debug, Default, Clone)]
pub struct IdentityCache {
    labels: HashMap<String, String>,
    refreshed_at: Option<Instant>,
}

impl IdentityCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when the cache has never been filled or is older than `max_age`.
    pub fn needs_refresh(&self, max_age: Duration) -> bool {
        self.needs_refresh_at(Instant::now(), max_age)
    }

    pub fn needs_refresh_at(&self, now: Instant, max_age: Duration) -> bool {
        match self.refreshed_at {
            None => true,
            Some(at) => now.saturating_duration_since(at) > max_age,
        }
    }

    /// Swap in a freshly fetched mapping.
    pub fn replace(&mut self, labels: HashMap<String, String>) {
        self.replace_at(labels, Instant::now());
    }

    pub fn replace_at(&mut self, labels: HashMap<String, String>, now: Instant) {
        self.labels = labels;
        self.refreshed_at = Some(now);
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl IdentityResolver for IdentityCache {
    fn resolve(&self, id: &str) -> Option<&str> {
        self.labels.get(id).map(String::as_str)
    }
}

/// String form of an identity `id`, which the API sends as a string or a number.
pub fn identity_key(id: &Value) -> Option<String> {
    match id {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
