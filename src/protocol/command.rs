//! RESP Commands
//!
//! The requests a sweep sends, and their array-of-bulk-strings frames.

use bytes::Bytes;
use std::fmt;

use super::reply::Reply;
use crate::error::{Error, Result};
use crate::keyspace::Key;

/// Request understood by the store
#[derive(Clone, PartialEq, Eq)]
pub enum Command {
    /// Authenticate, with ACL username when given
    Auth {
        username: Option<String>,
        password: String,
    },

    /// Switch logical database
    Select { db: u32 },

    /// Liveness probe
    Ping,

    /// One cursor step over keys matching `pattern`
    Scan {
        cursor: u64,
        pattern: String,
        count: u64,
    },

    /// Remaining time-to-live in seconds
    Ttl { key: Key },

    /// Delete key
    Del { key: Key },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Auth { .. } => "AUTH",
            Command::Select { .. } => "SELECT",
            Command::Ping => "PING",
            Command::Scan { .. } => "SCAN",
            Command::Ttl { .. } => "TTL",
            Command::Del { .. } => "DEL",
        }
    }

    /// Encode as a RESP array of bulk strings
    pub fn into_frame(self) -> Reply {
        let name = Reply::bulk(self.name());
        let args = match self {
            Command::Auth { username, password } => {
                let mut args = Vec::with_capacity(3);
                args.push(name);
                if let Some(user) = username {
                    args.push(Reply::bulk(user));
                }
                args.push(Reply::bulk(password));
                args
            }
            Command::Select { db } => vec![name, Reply::bulk(db.to_string())],
            Command::Ping => vec![name],
            Command::Scan {
                cursor,
                pattern,
                count,
            } => vec![
                name,
                Reply::bulk(cursor.to_string()),
                Reply::bulk("MATCH"),
                Reply::bulk(pattern),
                Reply::bulk("COUNT"),
                Reply::bulk(count.to_string()),
            ],
            Command::Ttl { key } | Command::Del { key } => vec![name, Reply::Bulk(key.into_bytes())],
        };
        Reply::Array(args)
    }

    /// Parse a request frame as received by a server
    pub fn from_frame(frame: &Reply) -> Result<Self> {
        let Reply::Array(items) = frame else {
            return Err(Error::Protocol(format!("expected command array, got {}", frame)));
        };
        let mut args = Vec::with_capacity(items.len());
        for item in items {
            match item {
                Reply::Bulk(data) => args.push(data.clone()),
                other => {
                    return Err(Error::Protocol(format!(
                        "expected bulk string argument, got {}",
                        other
                    )))
                }
            }
        }

        let Some((name, rest)) = args.split_first() else {
            return Err(Error::Protocol("empty command".to_string()));
        };
        let name = String::from_utf8_lossy(name).to_uppercase();

        match (name.as_str(), rest) {
            ("AUTH", [password]) => Ok(Command::Auth {
                username: None,
                password: utf8(password)?,
            }),
            ("AUTH", [username, password]) => Ok(Command::Auth {
                username: Some(utf8(username)?),
                password: utf8(password)?,
            }),
            ("SELECT", [db]) => Ok(Command::Select { db: number(db)? }),
            ("PING", []) => Ok(Command::Ping),
            ("SCAN", [cursor, options @ ..]) => {
                let cursor = number(cursor)?;
                let mut pattern = "*".to_string();
                let mut count = 10;
                for pair in options.chunks(2) {
                    match pair {
                        [flag, value] if flag.eq_ignore_ascii_case(b"MATCH") => {
                            pattern = utf8(value)?;
                        }
                        [flag, value] if flag.eq_ignore_ascii_case(b"COUNT") => {
                            count = number(value)?;
                        }
                        _ => return Err(Error::Protocol("syntax error in SCAN".to_string())),
                    }
                }
                Ok(Command::Scan {
                    cursor,
                    pattern,
                    count,
                })
            }
            ("TTL", [key]) => Ok(Command::Ttl {
                key: Key::new(key.clone()),
            }),
            ("DEL", [key]) => Ok(Command::Del {
                key: Key::new(key.clone()),
            }),
            _ => Err(Error::Protocol(format!(
                "unknown command or wrong number of arguments for '{}'",
                name.to_lowercase()
            ))),
        }
    }
}

// Hand-written so credentials never end up in logs
impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Auth { username, .. } => f
                .debug_struct("Auth")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Command::Select { db } => f.debug_struct("Select").field("db", db).finish(),
            Command::Ping => write!(f, "Ping"),
            Command::Scan {
                cursor,
                pattern,
                count,
            } => f
                .debug_struct("Scan")
                .field("cursor", cursor)
                .field("pattern", pattern)
                .field("count", count)
                .finish(),
            Command::Ttl { key } => f.debug_struct("Ttl").field("key", key).finish(),
            Command::Del { key } => f.debug_struct("Del").field("key", key).finish(),
        }
    }
}

fn utf8(arg: &Bytes) -> Result<String> {
    String::from_utf8(arg.to_vec()).map_err(|_| Error::Protocol("argument is not UTF-8".to_string()))
}

fn number<T: std::str::FromStr>(arg: &Bytes) -> Result<T> {
    std::str::from_utf8(arg)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| Error::Protocol("value is not an integer or out of range".to_string()))
}
