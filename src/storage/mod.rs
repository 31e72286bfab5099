//! Storage Engine
//!
//! In-memory keyspace with Redis TTL and SCAN semantics.

mod glob;
mod memory;

pub use glob::GlobPattern;
pub use memory::{MemoryConnector, MemoryStore};
