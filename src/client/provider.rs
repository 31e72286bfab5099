//! Connection Provider
//!
//! Opens the scan and delete handles of a cleaning unit.

use tracing::debug;

use super::Connection;
use crate::config::{EndpointConfig, UnitConfig};
use crate::error::Result;
use crate::keyspace::Keyspace;

/// Opens connections to store endpoints
#[allow(async_fn_in_trait)]
pub trait Connector {
    type Conn: Keyspace;

    async fn connect(&self, endpoint: &EndpointConfig) -> Result<Self::Conn>;
}

/// Connects over TCP
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    type Conn = Connection;

    async fn connect(&self, endpoint: &EndpointConfig) -> Result<Connection> {
        Connection::connect(endpoint).await
    }
}

/// The scan handle and, in dual-endpoint mode, a separate delete handle
pub struct Handles<C> {
    scan: C,
    delete: Option<C>,
}

impl<C: Keyspace> Handles<C> {
    /// Connect and probe every endpoint of `unit`.
    ///
    /// Any failure is returned as is; nothing is retried.
    pub async fn open<K>(connector: &K, unit: &UnitConfig) -> Result<Self>
    where
        K: Connector<Conn = C>,
    {
        let scan = probe(connector, &unit.scanner).await?;
        let delete = match unit.deleter {
            Some(ref endpoint) => Some(probe(connector, endpoint).await?),
            None => None,
        };
        Ok(Self { scan, delete })
    }

    /// One connection used for both scanning and deleting
    pub fn single(scan: C) -> Self {
        Self { scan, delete: None }
    }

    pub fn dual(scan: C, delete: C) -> Self {
        Self {
            scan,
            delete: Some(delete),
        }
    }

    pub fn is_dual(&self) -> bool {
        self.delete.is_some()
    }

    pub fn scanner(&mut self) -> &mut C {
        &mut self.scan
    }

    /// The delete handle, or the scan handle in single-endpoint mode
    pub fn deleter(&mut self) -> &mut C {
        match self.delete {
            Some(ref mut delete) => delete,
            None => &mut self.scan,
        }
    }
}

async fn probe<K: Connector>(connector: &K, endpoint: &EndpointConfig) -> Result<K::Conn> {
    let mut conn = connector.connect(endpoint).await?;
    conn.ping().await?;
    debug!(addr = %endpoint.addr, "endpoint reachable");
    Ok(conn)
}
