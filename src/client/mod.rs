//! Store Client
//!
//! RESP connections and the scan/delete handle pair of a cleaning unit.

mod connection;
mod provider;

pub use connection::Connection;
pub use provider::{Connector, Handles, TcpConnector};
