//! Expiry Sweeper
//!
//! Checks the TTL of every key in a batch and deletes the ones that are due.

use tracing::{debug, error, info, trace};

use super::SweepStats;
use crate::client::Handles;
use crate::keyspace::{Key, Keyspace, Liveness};

/// Applies the delete decision to batches, accumulating statistics
#[derive(Debug, Default)]
pub struct ExpirySweeper {
    stats: SweepStats,
}

impl ExpirySweeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process `batch` in order.
    ///
    /// TTL is read through the scan handle and deletes go through the
    /// delete handle. A failing key is logged and skipped; nothing here
    /// aborts the batch.
    pub async fn sweep_batch<C: Keyspace>(&mut self, handles: &mut Handles<C>, batch: &[Key]) {
        self.stats.batches += 1;

        for key in batch {
            self.stats.scanned += 1;

            let liveness = match handles.scanner().ttl(key).await {
                Ok(liveness) => liveness,
                Err(e) => {
                    self.stats.ttl_errors += 1;
                    error!(key = %key, error = %e, "ttl query failed");
                    continue;
                }
            };

            match liveness {
                Liveness::Alive(remaining) => {
                    self.stats.alive += 1;
                    trace!(key = %key, ?remaining, "key alive");
                    continue;
                }
                Liveness::Missing => {
                    self.stats.missing += 1;
                    debug!(key = %key, "ttl query: key absent");
                    continue;
                }
                Liveness::Expired | Liveness::NoExpiry => {}
            }

            match handles.deleter().del(key).await {
                Ok(true) => {
                    self.stats.deleted += 1;
                    info!(key = %key, ?liveness, "deleted expired key");
                }
                Ok(false) => {
                    self.stats.missing += 1;
                    debug!(key = %key, "key vanished before delete");
                }
                Err(e) => {
                    self.stats.delete_errors += 1;
                    error!(key = %key, error = %e, "delete failed");
                }
            }
        }
    }

    pub fn stats(&self) -> &SweepStats {
        &self.stats
    }

    pub fn into_stats(self) -> SweepStats {
        self.stats
    }
}
