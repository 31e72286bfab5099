//! RESP Connection
//!
//! A single TCP connection speaking RESP2 to a Redis-compatible store.

use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time;
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

use crate::config::EndpointConfig;
use crate::error::{Error, Result};
use crate::keyspace::{Key, Keyspace, Liveness, ScanPage};
use crate::protocol::{Command, Reply, RespCodec};

type RespStream = Framed<TcpStream, RespCodec>;

/// Connection to one endpoint.
///
/// The stream is dropped whenever it can no longer be trusted to be in
/// step with the store (timeout, I/O error, malformed frame) and reopened
/// on the next request, including `AUTH` and `SELECT`.
pub struct Connection {
    stream: Option<RespStream>,
    endpoint: EndpointConfig,
    reconnects: u64,
}

impl Connection {
    /// Connect, authenticate and select the configured database
    pub async fn connect(endpoint: &EndpointConfig) -> Result<Self> {
        let stream = open(endpoint).await?;
        debug!(addr = %endpoint.addr, db = endpoint.db, "connected");
        Ok(Self {
            stream: Some(stream),
            endpoint: endpoint.clone(),
            reconnects: 0,
        })
    }

    pub fn addr(&self) -> &str {
        &self.endpoint.addr
    }

    /// Times the stream was reopened after being dropped
    pub fn reconnects(&self) -> u64 {
        self.reconnects
    }

    /// Send one command and wait for its reply.
    ///
    /// RESP error replies come back as `Error::Server`.
    pub async fn request(&mut self, command: Command) -> Result<Reply> {
        if self.stream.is_none() {
            let stream = open(&self.endpoint).await?;
            self.reconnects += 1;
            info!(addr = %self.endpoint.addr, reconnects = self.reconnects, "reconnected");
            self.stream = Some(stream);
        }
        let Some(stream) = self.stream.as_mut() else {
            return Err(Error::ConnectionClosed);
        };

        let result = round_trip(stream, command, self.endpoint.timeout()).await;
        if let Err(ref e) = result {
            if e.breaks_connection() {
                warn!(addr = %self.endpoint.addr, error = %e, "dropping connection");
                self.stream = None;
            }
        }
        result
    }
}

/// Connect over TCP and run the handshake
async fn open(endpoint: &EndpointConfig) -> Result<RespStream> {
    let timeout = endpoint.timeout();
    let tcp = time::timeout(timeout, TcpStream::connect(&endpoint.addr))
        .await
        .map_err(|_| Error::Timeout {
            op: "connect",
            timeout,
        })?
        .map_err(|e| Error::Unreachable {
            addr: endpoint.addr.clone(),
            reason: e.to_string(),
        })?;
    tcp.set_nodelay(true)?;

    let mut stream = Framed::new(tcp, RespCodec::new());

    if let Some(ref password) = endpoint.password {
        let auth = Command::Auth {
            username: endpoint.username.clone(),
            password: password.clone(),
        };
        expect_ok(&mut stream, auth, timeout).await?;
    }

    if endpoint.db != 0 {
        expect_ok(&mut stream, Command::Select { db: endpoint.db }, timeout).await?;
    }

    Ok(stream)
}

async fn round_trip(stream: &mut RespStream, command: Command, timeout: Duration) -> Result<Reply> {
    let op = command.name();
    match time::timeout(timeout, exchange(stream, command)).await {
        Ok(Ok(Reply::Error(msg))) => Err(Error::Server(msg)),
        Ok(result) => result,
        Err(_) => Err(Error::Timeout { op, timeout }),
    }
}

async fn expect_ok(stream: &mut RespStream, command: Command, timeout: Duration) -> Result<()> {
    let op = command.name();
    match round_trip(stream, command, timeout).await? {
        Reply::Simple(s) if s == "OK" => Ok(()),
        other => Err(unexpected(op, &other)),
    }
}

async fn exchange(stream: &mut RespStream, command: Command) -> Result<Reply> {
    stream.send(command.into_frame()).await?;
    match stream.next().await {
        Some(reply) => reply,
        None => Err(Error::ConnectionClosed),
    }
}

fn unexpected(command: &'static str, reply: &Reply) -> Error {
    Error::UnexpectedReply {
        command,
        reply: reply.to_string(),
    }
}

impl Keyspace for Connection {
    async fn ping(&mut self) -> Result<()> {
        match self.request(Command::Ping).await? {
            Reply::Simple(s) if s == "PONG" => Ok(()),
            Reply::Bulk(_) => Ok(()),
            other => Err(unexpected("PING", &other)),
        }
    }

    async fn scan(&mut self, cursor: u64, pattern: &str, count: u64) -> Result<ScanPage> {
        let reply = self
            .request(Command::Scan {
                cursor,
                pattern: pattern.to_string(),
                count,
            })
            .await?;

        let mut parts = match reply {
            Reply::Array(parts) => parts,
            other => return Err(unexpected("SCAN", &other)),
        };
        if parts.len() != 2 {
            return Err(unexpected("SCAN", &Reply::Array(parts)));
        }
        let keys = parts.pop();
        let next = parts.pop();

        let next_cursor = match next {
            Some(Reply::Bulk(ref raw)) => std::str::from_utf8(raw).ok().and_then(|s| s.parse::<u64>().ok()),
            _ => None,
        };
        let Some(next_cursor) = next_cursor else {
            return Err(Error::Protocol("SCAN returned an invalid cursor".to_string()));
        };

        let items = match keys {
            Some(Reply::Array(items)) => items,
            Some(Reply::Null) => Vec::new(),
            _ => return Err(Error::Protocol("SCAN returned an invalid key list".to_string())),
        };
        let mut page = ScanPage {
            cursor: next_cursor,
            keys: Vec::with_capacity(items.len()),
        };
        for item in items {
            match item {
                Reply::Bulk(data) => page.keys.push(Key::new(data)),
                other => return Err(unexpected("SCAN", &other)),
            }
        }
        Ok(page)
    }

    async fn ttl(&mut self, key: &Key) -> Result<Liveness> {
        match self.request(Command::Ttl { key: key.clone() }).await? {
            Reply::Integer(n) => Ok(Liveness::from_ttl_secs(n)),
            other => Err(unexpected("TTL", &other)),
        }
    }

    async fn del(&mut self, key: &Key) -> Result<bool> {
        match self.request(Command::Del { key: key.clone() }).await? {
            Reply::Integer(n) => Ok(n > 0),
            other => Err(unexpected("DEL", &other)),
        }
    }
}
