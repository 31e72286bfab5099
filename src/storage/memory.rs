//! In-Memory Keyspace
//!
//! A store with Redis TTL and SCAN semantics that never reclaims expired
//! keys on its own, so sweeps can be exercised without a server.

use bytes::Bytes;
use hashbrown::HashMap;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::glob::GlobPattern;
use crate::client::Connector;
use crate::config::EndpointConfig;
use crate::error::{Error, Result};
use crate::keyspace::{Key, Keyspace, Liveness, ScanPage};

/// Entry in the store with value and expiration
#[derive(Debug, Clone)]
struct Entry {
    value: Bytes,
    expires_at: Option<Instant>,
    slot: usize,
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<Key, Entry>,
    /// Scan order. Deleted keys leave an empty slot so cursors handed out
    /// earlier stay valid.
    slots: Vec<Option<Key>>,
}

/// Thread-safe in-memory keyspace, cheap to clone
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set key-value pair with optional TTL
    pub fn set(&self, key: impl Into<Key>, value: impl Into<Bytes>, ttl: Option<Duration>) {
        let expires_at = ttl.map(|d| Instant::now() + d);
        self.insert(key.into(), value.into(), expires_at);
    }

    /// Set a key whose expiry has already passed
    pub fn set_expired(&self, key: impl Into<Key>, value: impl Into<Bytes>) {
        self.insert(key.into(), value.into(), Some(Instant::now()));
    }

    fn insert(&self, key: Key, value: Bytes, expires_at: Option<Instant>) {
        let mut inner = self.inner.write();
        if let Some(entry) = inner.entries.get_mut(&key) {
            entry.value = value;
            entry.expires_at = expires_at;
            return;
        }
        let slot = inner.slots.len();
        inner.slots.push(Some(key.clone()));
        inner.entries.insert(
            key,
            Entry {
                value,
                expires_at,
                slot,
            },
        );
    }

    pub fn get(&self, key: impl Into<Key>) -> Option<Bytes> {
        let inner = self.inner.read();
        inner.entries.get(&key.into()).map(|e| e.value.clone())
    }

    /// Whether the key is physically present, expired or not
    pub fn contains(&self, key: impl Into<Key>) -> bool {
        self.inner.read().entries.contains_key(&key.into())
    }

    /// Delete key, returns true if key existed
    pub fn remove(&self, key: &Key) -> bool {
        let mut inner = self.inner.write();
        match inner.entries.remove(key) {
            Some(entry) => {
                inner.slots[entry.slot] = None;
                true
            }
            None => false,
        }
    }

    /// Number of keys, including expired ones
    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remaining TTL in whole seconds the way `TTL` reports it: `-2` when
    /// the key is absent and `-1` when it has no expiry.
    pub fn ttl_secs(&self, key: &Key) -> i64 {
        let inner = self.inner.read();
        match inner.entries.get(key) {
            None => -2,
            Some(Entry {
                expires_at: None, ..
            }) => -1,
            Some(Entry {
                expires_at: Some(deadline),
                ..
            }) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                // Rounded to the nearest second
                ((remaining.as_millis() + 500) / 1000) as i64
            }
        }
    }

    /// One SCAN step: examines up to `count` slots starting at `cursor`
    /// and returns the matching keys with the next cursor.
    pub fn scan_slots(&self, cursor: u64, pattern: &str, count: u64) -> ScanPage {
        let pattern = GlobPattern::compile(pattern);
        let inner = self.inner.read();
        let start = (cursor as usize).min(inner.slots.len());
        let end = start.saturating_add(count.max(1) as usize).min(inner.slots.len());

        let keys = inner.slots[start..end]
            .iter()
            .flatten()
            .filter(|key| pattern.matches(key.as_bytes()))
            .cloned()
            .collect();
        let cursor = if end >= inner.slots.len() { 0 } else { end as u64 };

        ScanPage { cursor, keys }
    }
}

impl Keyspace for MemoryStore {
    async fn ping(&mut self) -> Result<()> {
        Ok(())
    }

    async fn scan(&mut self, cursor: u64, pattern: &str, count: u64) -> Result<ScanPage> {
        Ok(self.scan_slots(cursor, pattern, count))
    }

    async fn ttl(&mut self, key: &Key) -> Result<Liveness> {
        Ok(Liveness::from_ttl_secs(self.ttl_secs(key)))
    }

    async fn del(&mut self, key: &Key) -> Result<bool> {
        Ok(self.remove(key))
    }
}

/// Resolves endpoint addresses to in-memory stores
#[derive(Debug, Clone, Default)]
pub struct MemoryConnector {
    stores: HashMap<String, MemoryStore>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_endpoint(mut self, addr: impl Into<String>, store: MemoryStore) -> Self {
        self.stores.insert(addr.into(), store);
        self
    }
}

impl Connector for MemoryConnector {
    type Conn = MemoryStore;

    async fn connect(&self, endpoint: &EndpointConfig) -> Result<MemoryStore> {
        self.stores
            .get(&endpoint.addr)
            .cloned()
            .ok_or_else(|| Error::Unreachable {
                addr: endpoint.addr.clone(),
                reason: "connection refused".to_string(),
            })
    }
}
