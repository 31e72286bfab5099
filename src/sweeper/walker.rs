//! Keyspace Walker
//!
//! Cursor-driven enumeration of the keys matching a pattern.

use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, warn};

use crate::keyspace::{Key, Keyspace};

/// Lazily yields the batches of one full SCAN iteration.
///
/// A walk starts at cursor 0 and ends when a step hands back cursor 0. A
/// failed step is retried on the same cursor after a backoff; once the
/// retries are used up the walk is abandoned rather than restarted.
#[derive(Debug)]
pub struct KeyspaceWalker {
    pattern: String,
    count: u64,
    cursor: u64,
    steps: u64,
    finished: bool,
    abandoned: bool,
    max_retries: u32,
    backoff: Duration,
    scan_errors: u64,
}

impl KeyspaceWalker {
    pub fn new(pattern: impl Into<String>, count: u64) -> Self {
        Self {
            pattern: pattern.into(),
            count: count.max(1),
            cursor: 0,
            steps: 0,
            finished: false,
            abandoned: false,
            max_retries: 0,
            backoff: Duration::ZERO,
            scan_errors: 0,
        }
    }

    /// Retry a failed step up to `retries` more times, pausing `backoff`
    /// before each attempt
    pub fn with_retry(mut self, retries: u32, backoff: Duration) -> Self {
        self.max_retries = retries;
        self.backoff = backoff;
        self
    }

    /// Cursor the next step will be issued with
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Successful steps so far
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn is_abandoned(&self) -> bool {
        self.abandoned
    }

    pub fn scan_errors(&self) -> u64 {
        self.scan_errors
    }

    /// Fetch the next batch, or `None` once the walk is over.
    ///
    /// Batches may be empty; that is not the end of the walk.
    pub async fn next_batch<K: Keyspace>(&mut self, scanner: &mut K) -> Option<Vec<Key>> {
        if self.finished {
            return None;
        }

        let mut attempt: u32 = 0;
        loop {
            match scanner.scan(self.cursor, &self.pattern, self.count).await {
                Ok(page) => {
                    debug!(
                        cursor = self.cursor,
                        next_cursor = page.cursor,
                        keys = page.keys.len(),
                        "scan step"
                    );
                    self.steps += 1;
                    self.cursor = page.cursor;
                    // 0 from any step is terminal; the walk never issues a
                    // second step from the initial 0
                    if page.cursor == 0 {
                        self.finished = true;
                    }
                    return Some(page.keys);
                }
                Err(e) => {
                    attempt += 1;
                    self.scan_errors += 1;
                    if attempt > self.max_retries {
                        error!(
                            cursor = self.cursor,
                            pattern = %self.pattern,
                            attempts = attempt,
                            error = %e,
                            "scan failed, abandoning walk"
                        );
                        self.finished = true;
                        self.abandoned = true;
                        return None;
                    }
                    warn!(
                        cursor = self.cursor,
                        pattern = %self.pattern,
                        attempt,
                        error = %e,
                        "scan failed, retrying same cursor"
                    );
                    sleep(self.backoff).await;
                }
            }
        }
    }
}
