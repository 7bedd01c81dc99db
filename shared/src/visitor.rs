//! Visitor prefill persistence.
//!
//! Records are stored as `{ "data": VisitorRecord, "expires": epoch-ms | null }`
//! under a caller-chosen key. The backing store is abstract so the browser can
//! plug in `localStorage` and tests an in-memory map.

use serde::{Deserialize, Serialize};

use crate::error::WidgetError;

/// Stored under the lead payload's keys (`nome`, `telefone`). English keys
/// are accepted on read.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisitorRecord {
    #[serde(rename = "nome", alias = "name")]
    pub name: String,
    pub email: String,
    #[serde(rename = "telefone", alias = "phone")]
    pub phone: String,
    pub consent: bool,
}

impl VisitorRecord {
    /// Fills every empty field of `self` from `fallback`.
    pub fn or_fallback(mut self, fallback: &VisitorRecord) -> VisitorRecord {
        if self.name.is_empty() {
            self.name = fallback.name.clone();
        }
        if self.email.is_empty() {
            self.email = fallback.email.clone();
        }
        if self.phone.is_empty() {
            self.phone = fallback.phone.clone();
        }
        self.consent = self.consent || fallback.consent;
        self
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredVisitor {
    data: VisitorRecord,
    expires: Option<f64>,
}

/// Minimal string key-value store, shaped after `window.localStorage`.
pub trait KeyValueStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, WidgetError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), WidgetError>;
    fn remove_item(&self, key: &str) -> Result<(), WidgetError>;
}

pub struct VisitorStore<S> {
    backend: Option<S>,
}

impl<S: KeyValueStore> VisitorStore<S> {
    /// `None` means persistent storage is unavailable; every call becomes a no-op.
    pub fn new(backend: Option<S>) -> Self {
        Self { backend }
    }

    /// Returns the stored record if present and unexpired. A stale entry is
    /// removed on the way out.
    pub fn read(&self, key: Option<&str>, now_ms: f64) -> Result<Option<VisitorRecord>, WidgetError> {
        let (Some(store), Some(key)) = (&self.backend, key) else {
            return Ok(None);
        };
        let Some(raw) = store.get_item(key)? else {
            return Ok(None);
        };

        let stored: StoredVisitor = serde_json::from_str(&raw)?;
        match stored.expires {
            Some(expires) if expires <= now_ms => {
                store.remove_item(key)?;
                Ok(None)
            }
            _ => Ok(Some(stored.data)),
        }
    }

    /// Stores `record` under `key`. A TTL of `None` or `0` writes
    /// `expires: null`, which never expires.
    pub fn write(
        &self,
        key: Option<&str>,
        record: &VisitorRecord,
        ttl_minutes: Option<u32>,
        now_ms: f64,
    ) -> Result<(), WidgetError> {
        let (Some(store), Some(key)) = (&self.backend, key) else {
            return Ok(());
        };

        let stored = StoredVisitor {
            data: record.clone(),
            expires: ttl_minutes
                .filter(|minutes| *minutes > 0)
                .map(|minutes| now_ms + f64::from(minutes) * 60_000.0),
        };
        store.set_item(key, &serde_json::to_string(&stored)?)
    }
}
