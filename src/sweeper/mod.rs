//! Sweeper
//!
//! The scan-and-clean loop: walk the keyspace in cursor order, check each
//! key's TTL and delete the ones that are due.

#[cfg(test)]
mod fake;
mod runner;
mod stats;
mod sweep;
mod walker;

pub use runner::{sweep, RunReport, Runner, UnitReport};
pub use stats::SweepStats;
pub use sweep::ExpirySweeper;
pub use walker::KeyspaceWalker;
