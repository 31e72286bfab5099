//! Scripted keyspace and event capture for unit tests

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::subscriber::DefaultGuard;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::prelude::*;

use crate::error::{Error, Result};
use crate::keyspace::{Key, Keyspace, Liveness, ScanPage};

/// Replays scan pages in order and answers TTL/DEL from fixed tables
#[derive(Default)]
pub(crate) struct ScriptedKeyspace {
    pages: VecDeque<Result<ScanPage>>,
    ttls: HashMap<Key, i64>,
    ttl_failures: HashSet<Key>,
    del_failures: HashSet<Key>,
    scan_cursors: Vec<u64>,
    ttl_queries: Vec<Key>,
    deleted: Vec<Key>,
}

impl ScriptedKeyspace {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn page(mut self, next_cursor: u64, keys: &[&str]) -> Self {
        self.pages.push_back(Ok(ScanPage {
            cursor: next_cursor,
            keys: keys.iter().map(|k| Key::from(*k)).collect(),
        }));
        self
    }

    pub(crate) fn fail_scan(mut self, error: Error) -> Self {
        self.pages.push_back(Err(error));
        self
    }

    /// Raw `TTL` reply for `key`; keys without one report -2
    pub(crate) fn ttl(mut self, key: &str, ttl: i64) -> Self {
        self.ttls.insert(Key::from(key), ttl);
        self
    }

    pub(crate) fn fail_ttl(mut self, key: &str) -> Self {
        self.ttl_failures.insert(Key::from(key));
        self
    }

    pub(crate) fn fail_del(mut self, key: &str) -> Self {
        self.del_failures.insert(Key::from(key));
        self
    }

    pub(crate) fn scan_cursors(&self) -> &[u64] {
        &self.scan_cursors
    }

    pub(crate) fn ttl_queries(&self) -> &[Key] {
        &self.ttl_queries
    }

    pub(crate) fn deleted(&self) -> Vec<String> {
        self.deleted.iter().map(|k| k.to_string()).collect()
    }
}

impl Keyspace for ScriptedKeyspace {
    async fn ping(&mut self) -> Result<()> {
        Ok(())
    }

    async fn scan(&mut self, cursor: u64, _pattern: &str, _count: u64) -> Result<ScanPage> {
        self.scan_cursors.push(cursor);
        self.pages
            .pop_front()
            .unwrap_or_else(|| Err(Error::Protocol("scan script exhausted".to_string())))
    }

    async fn ttl(&mut self, key: &Key) -> Result<Liveness> {
        self.ttl_queries.push(key.clone());
        if self.ttl_failures.contains(key) {
            return Err(Error::Server("LOADING dataset in memory".to_string()));
        }
        let ttl = self.ttls.get(key).copied().unwrap_or(-2);
        Ok(Liveness::from_ttl_secs(ttl))
    }

    async fn del(&mut self, key: &Key) -> Result<bool> {
        if self.del_failures.contains(key) {
            return Err(Error::Server("READONLY You can't write against a read only replica.".to_string()));
        }
        // A deleted key no longer has a TTL
        let existed = self.ttls.remove(key).is_some();
        if existed {
            self.deleted.push(key.clone());
        }
        Ok(existed)
    }
}

/// A recorded tracing event
#[derive(Debug, Clone)]
pub(crate) struct CapturedEvent {
    pub(crate) level: Level,
    pub(crate) message: String,
    fields: HashMap<String, String>,
}

impl CapturedEvent {
    pub(crate) fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Layer that records every event emitted while it is installed
#[derive(Clone, Default)]
pub(crate) struct EventLog {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl EventLog {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Make this log the current thread's subscriber until the guard drops
    pub(crate) fn install(&self) -> DefaultGuard {
        tracing::subscriber::set_default(tracing_subscriber::registry().with(self.clone()))
    }

    pub(crate) fn with_message(&self, message: &str) -> Vec<CapturedEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.message == message)
            .cloned()
            .collect()
    }
}

impl<S: Subscriber> Layer<S> for EventLog {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);
        self.events.lock().push(CapturedEvent {
            level: *event.metadata().level(),
            message: visitor.message,
            fields: visitor.fields,
        });
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: String,
    fields: HashMap<String, String>,
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.fields.insert(field.name().to_string(), value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        let value = format!("{:?}", value);
        if field.name() == "message" {
            self.message = value;
        } else {
            self.fields.insert(field.name().to_string(), value);
        }
    }
}
