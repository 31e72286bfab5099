//! Cleaning Unit Runner
//!
//! Runs every configured unit to completion, one after another.

use tokio::time::sleep;
use tracing::{error, info, info_span, Instrument};

use super::{ExpirySweeper, KeyspaceWalker, SweepStats};
use crate::client::{Connector, Handles};
use crate::config::UnitConfig;
use crate::error::Result;
use crate::keyspace::Keyspace;

/// Result of one cleaning unit
#[derive(Debug)]
pub struct UnitReport {
    pub index: usize,
    pub name: String,
    /// `Err` when the unit could not start
    pub outcome: Result<SweepStats>,
}

/// Results of a whole run, in unit order
#[derive(Debug, Default)]
pub struct RunReport {
    pub units: Vec<UnitReport>,
}

impl RunReport {
    pub fn deleted(&self) -> u64 {
        self.units
            .iter()
            .filter_map(|u| u.outcome.as_ref().ok())
            .map(|s| s.deleted)
            .sum()
    }

    /// Units that failed to start or abandoned their walk
    pub fn failed_units(&self) -> usize {
        self.units
            .iter()
            .filter(|u| match u.outcome {
                Ok(ref stats) => stats.abandoned,
                Err(_) => true,
            })
            .count()
    }
}

/// Drives cleaning units against the stores a connector reaches
pub struct Runner<K> {
    connector: K,
}

impl<K: Connector> Runner<K> {
    pub fn new(connector: K) -> Self {
        Self { connector }
    }

    /// Run all units in order. A unit that fails is logged and skipped.
    pub async fn run(&self, units: &[UnitConfig]) -> RunReport {
        let mut report = RunReport::default();

        for (index, unit) in units.iter().enumerate() {
            let name = unit.display_name(index);
            let span = info_span!("cleaner", unit = %name, index);
            let outcome = self.run_unit(unit).instrument(span).await;

            match outcome {
                Ok(ref stats) if stats.abandoned => {
                    error!(unit = %name, index, ?stats, "cleaning unit abandoned after scan failures");
                }
                Ok(ref stats) => {
                    info!(
                        unit = %name,
                        index,
                        batches = stats.batches,
                        scanned = stats.scanned,
                        deleted = stats.deleted,
                        alive = stats.alive,
                        missing = stats.missing,
                        failures = stats.key_failures(),
                        "cleaning unit finished"
                    );
                }
                Err(ref e) => {
                    error!(
                        unit = %name,
                        index,
                        scanner = %unit.scanner.addr,
                        deleter = ?unit.deleter.as_ref().map(|d| &d.addr),
                        error = %e,
                        "clean failed"
                    );
                }
            }

            report.units.push(UnitReport {
                index,
                name,
                outcome,
            });
        }

        report
    }

    /// Connect the unit's endpoints and sweep until its walk is over
    pub async fn run_unit(&self, unit: &UnitConfig) -> Result<SweepStats> {
        info!(
            pattern = %unit.pattern,
            scanner = %unit.scanner.addr,
            deleter = ?unit.deleter.as_ref().map(|d| &d.addr),
            count = unit.count,
            "starting cleaning unit"
        );
        let mut handles = Handles::open(&self.connector, unit).await?;
        Ok(sweep(&mut handles, unit).await)
    }
}

/// One full pass over the unit's keyspace on already open handles
pub async fn sweep<C: Keyspace>(handles: &mut Handles<C>, unit: &UnitConfig) -> SweepStats {
    let mut walker = KeyspaceWalker::new(unit.pattern.as_str(), unit.count)
        .with_retry(unit.scan_retries, unit.retry_backoff());
    let mut sweeper = ExpirySweeper::new();
    let interval = unit.interval();

    while let Some(batch) = walker.next_batch(handles.scanner()).await {
        sweeper.sweep_batch(handles, &batch).await;

        if !walker.is_finished() && !interval.is_zero() {
            sleep(interval).await;
        }
    }

    let mut stats = sweeper.into_stats();
    stats.scan_errors = walker.scan_errors();
    stats.abandoned = walker.is_abandoned();
    stats
}
