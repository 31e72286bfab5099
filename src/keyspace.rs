//! Keyspace Primitives
//!
//! The store operations a sweep is built from: cursor scan, TTL query and
//! delete, plus a liveness probe used when a connection is opened.

use bytes::Bytes;
use std::fmt;
use std::time::Duration;

use crate::error::Result;

/// Binary-safe key name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(Bytes);

impl Key {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Bytes {
        self.0
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Self(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Self(Bytes::from(s))
    }
}

impl From<Bytes> for Key {
    fn from(b: Bytes) -> Self {
        Self(b)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

/// Remaining lifetime of a key as observed by a TTL query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    /// Strictly positive time left
    Alive(Duration),

    /// Expiry set and already reached
    Expired,

    /// No expiry associated with the key
    NoExpiry,

    /// Key does not exist (anymore)
    Missing,
}

impl Liveness {
    /// Decode the integer reply of a RESP `TTL` command.
    ///
    /// `-2` means the key is absent and `-1` that it carries no expiry.
    /// Anything else that is not strictly positive counts as expired.
    pub fn from_ttl_secs(ttl: i64) -> Self {
        match ttl {
            -2 => Liveness::Missing,
            -1 => Liveness::NoExpiry,
            n if n > 0 => Liveness::Alive(Duration::from_secs(n as u64)),
            _ => Liveness::Expired,
        }
    }

    /// Whether a key in this state gets deleted by a sweep.
    ///
    /// Keys without any expiry are deleted too: every non-positive TTL is
    /// treated as due.
    pub fn is_delete_eligible(&self) -> bool {
        matches!(self, Liveness::Expired | Liveness::NoExpiry)
    }
}

/// One step of a cursor scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanPage {
    /// Cursor for the next step, 0 once iteration is complete
    pub cursor: u64,
    pub keys: Vec<Key>,
}

/// A handle onto a store that can enumerate, inspect and delete keys
#[allow(async_fn_in_trait)]
pub trait Keyspace {
    async fn ping(&mut self) -> Result<()>;

    async fn scan(&mut self, cursor: u64, pattern: &str, count: u64) -> Result<ScanPage>;

    async fn ttl(&mut self, key: &Key) -> Result<Liveness>;

    /// Delete a key, returns true if the key existed
    async fn del(&mut self, key: &Key) -> Result<bool>;
}
