//! keysweep - expired key reclamation for Redis-protocol stores
//!
//! Walks a store's keyspace with cursor-based SCAN, checks the remaining
//! TTL of every matching key and deletes the keys whose time has run out
//! but which the store has not reclaimed yet.

pub mod client;
pub mod config;
pub mod error;
pub mod keyspace;
pub mod protocol;
#[cfg(any(test, feature = "test-support"))]
pub mod storage;
pub mod sweeper;

pub use client::{Connection, Connector, Handles, TcpConnector};
pub use config::{CliArgs, Config, ConfigError, EndpointConfig, LogFormat, LoggingConfig, UnitConfig};
pub use error::{Error, Result};
pub use keyspace::{Key, Keyspace, Liveness, ScanPage};
pub use protocol::{Command, Reply, RespCodec};
#[cfg(any(test, feature = "test-support"))]
pub use storage::{GlobPattern, MemoryConnector, MemoryStore};
pub use sweeper::{ExpirySweeper, KeyspaceWalker, RunReport, Runner, SweepStats, UnitReport};
