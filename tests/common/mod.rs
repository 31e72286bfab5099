//! RESP test server backed by a `MemoryStore`, bound to an ephemeral port.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use keysweep::{Command, Key, MemoryStore, Reply, RespCodec};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio_util::codec::Framed;

/// Behaviour switches for the fake server
#[derive(Debug, Clone, Default)]
pub struct ServerOptions {
    /// Require `AUTH` with this password
    pub password: Option<String>,
    /// Reject every `DEL` like a read-only replica
    pub read_only: bool,
    /// Answer `TTL` for this key with an error
    pub failing_ttl_key: Option<String>,
    /// Answer `TTL` for this key only after `delay`
    pub slow_ttl_key: Option<String>,
    /// Answer this many SCAN requests, counted across connections, after
    /// `delay`
    pub slow_scans: usize,
    pub delay: Duration,
}

#[derive(Debug, Default)]
struct Counters {
    connections: AtomicUsize,
    scans: AtomicUsize,
}

pub struct TestServer {
    pub addr: SocketAddr,
    counters: Arc<Counters>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestServer {
    pub async fn start(store: MemoryStore) -> Self {
        Self::start_with(store, ServerOptions::default()).await
    }

    pub async fn start_with(store: MemoryStore, options: ServerOptions) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let counters = Arc::new(Counters::default());
        let shared = Arc::clone(&counters);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    accept = listener.accept() => {
                        let Ok((stream, _)) = accept else { break };
                        shared.connections.fetch_add(1, Ordering::SeqCst);
                        tokio::spawn(serve(stream, store.clone(), options.clone(), Arc::clone(&shared)));
                    }
                }
            }
        });

        Self {
            addr,
            counters,
            shutdown: Some(shutdown_tx),
        }
    }

    pub fn addr(&self) -> String {
        self.addr.to_string()
    }

    /// Connections accepted so far
    pub fn connections(&self) -> usize {
        self.counters.connections.load(Ordering::SeqCst)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// An address nothing listens on
pub async fn closed_addr() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr.to_string()
}

async fn serve(stream: TcpStream, store: MemoryStore, options: ServerOptions, counters: Arc<Counters>) {
    let mut framed = Framed::new(stream, RespCodec::new());
    let mut authed = options.password.is_none();

    while let Some(Ok(frame)) = framed.next().await {
        let command = match Command::from_frame(&frame) {
            Ok(command) => command,
            Err(e) => {
                let _ = framed.send(Reply::Error(format!("ERR {}", e))).await;
                continue;
            }
        };

        let slow = match command {
            Command::Scan { .. } => counters.scans.fetch_add(1, Ordering::SeqCst) < options.slow_scans,
            Command::Ttl { ref key } => options
                .slow_ttl_key
                .as_deref()
                .is_some_and(|k| k.as_bytes() == key.as_bytes()),
            _ => false,
        };
        if slow {
            tokio::time::sleep(options.delay).await;
        }

        let reply = respond(command, &store, &options, &mut authed);
        if framed.send(reply).await.is_err() {
            break;
        }
    }
}

fn respond(command: Command, store: &MemoryStore, options: &ServerOptions, authed: &mut bool) -> Reply {
    if let Command::Auth { password, .. } = &command {
        return match options.password {
            None => Reply::Error(
                "ERR AUTH <password> called without any password configured for the default user"
                    .to_string(),
            ),
            Some(ref expected) if expected == password => {
                *authed = true;
                Reply::ok()
            }
            Some(_) => Reply::Error("WRONGPASS invalid username-password pair".to_string()),
        };
    }
    if !*authed {
        return Reply::Error("NOAUTH Authentication required.".to_string());
    }

    match command {
        Command::Ping => Reply::Simple("PONG".to_string()),
        Command::Select { db } if db < 16 => Reply::ok(),
        Command::Select { .. } => Reply::Error("ERR DB index is out of range".to_string()),
        Command::Scan {
            cursor,
            pattern,
            count,
        } => {
            let page = store.scan_slots(cursor, &pattern, count);
            Reply::Array(vec![
                Reply::bulk(page.cursor.to_string()),
                Reply::Array(page.keys.into_iter().map(|k| Reply::Bulk(k.into_bytes())).collect()),
            ])
        }
        Command::Ttl { key } if is_failing(options, &key) => {
            Reply::Error("LOADING Redis is loading the dataset in memory".to_string())
        }
        Command::Ttl { key } => Reply::Integer(store.ttl_secs(&key)),
        Command::Del { .. } if options.read_only => {
            Reply::Error("READONLY You can't write against a read only replica.".to_string())
        }
        Command::Del { key } => Reply::Integer(store.remove(&key) as i64),
        Command::Auth { .. } => unreachable!(),
    }
}

fn is_failing(options: &ServerOptions, key: &Key) -> bool {
    options
        .failing_ttl_key
        .as_deref()
        .is_some_and(|k| k.as_bytes() == key.as_bytes())
}
