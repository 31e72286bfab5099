//! RESP Values
//!
//! The RESP2 value model shared by requests and replies, with the
//! check/parse pair used by the codec.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt;
use std::io::Cursor;

/// Largest bulk string accepted, matching the default `proto-max-bulk-len`
pub const MAX_BULK_LEN: usize = 512 * 1024 * 1024;

/// A RESP2 value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// `+OK`
    Simple(String),

    /// `-ERR ...`
    Error(String),

    /// `:42`
    Integer(i64),

    /// `$5\r\nhello`
    Bulk(Bytes),

    /// `$-1` or `*-1`
    Null,

    Array(Vec<Reply>),
}

impl Reply {
    pub fn bulk(data: impl Into<Bytes>) -> Self {
        Reply::Bulk(data.into())
    }

    pub fn ok() -> Self {
        Reply::Simple("OK".to_string())
    }

    /// Serialize into RESP wire format
    pub fn encode(&self, dst: &mut BytesMut) {
        match self {
            Reply::Simple(s) => {
                dst.put_u8(b'+');
                dst.put_slice(s.as_bytes());
                dst.put_slice(b"\r\n");
            }
            Reply::Error(msg) => {
                dst.put_u8(b'-');
                dst.put_slice(msg.as_bytes());
                dst.put_slice(b"\r\n");
            }
            Reply::Integer(n) => {
                dst.put_u8(b':');
                dst.put_slice(n.to_string().as_bytes());
                dst.put_slice(b"\r\n");
            }
            Reply::Bulk(data) => {
                dst.put_u8(b'$');
                dst.put_slice(data.len().to_string().as_bytes());
                dst.put_slice(b"\r\n");
                dst.put_slice(data);
                dst.put_slice(b"\r\n");
            }
            Reply::Null => dst.put_slice(b"$-1\r\n"),
            Reply::Array(items) => {
                dst.put_u8(b'*');
                dst.put_slice(items.len().to_string().as_bytes());
                dst.put_slice(b"\r\n");
                for item in items {
                    item.encode(dst);
                }
            }
        }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Simple(s) => write!(f, "{}", s),
            Reply::Error(msg) => write!(f, "(error) {}", msg),
            Reply::Integer(n) => write!(f, "(integer) {}", n),
            Reply::Bulk(data) => write!(f, "\"{}\"", String::from_utf8_lossy(data)),
            Reply::Null => write!(f, "(nil)"),
            Reply::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

#[derive(Debug)]
pub(crate) enum ParseError {
    /// Not enough data buffered yet
    Incomplete,
    Invalid(String),
}

/// Walk one complete value without allocating, leaving the cursor after it.
pub(crate) fn check(buf: &mut Cursor<&[u8]>) -> Result<(), ParseError> {
    match get_u8(buf)? {
        b'+' | b'-' | b':' => get_line(buf).map(|_| ()),
        b'$' => match get_length(buf)? {
            None => Ok(()),
            Some(len) => skip(buf, len + 2),
        },
        b'*' => {
            if let Some(len) = get_length(buf)? {
                for _ in 0..len {
                    check(buf)?;
                }
            }
            Ok(())
        }
        other => Err(ParseError::Invalid(format!(
            "invalid type byte {:#04x}",
            other
        ))),
    }
}

/// Parse one value. Callers run `check` first.
pub(crate) fn parse(buf: &mut Cursor<&[u8]>) -> Result<Reply, ParseError> {
    match get_u8(buf)? {
        b'+' => {
            let line = get_line(buf)?;
            Ok(Reply::Simple(String::from_utf8_lossy(line).into_owned()))
        }
        b'-' => {
            let line = get_line(buf)?;
            Ok(Reply::Error(String::from_utf8_lossy(line).into_owned()))
        }
        b':' => Ok(Reply::Integer(get_decimal(buf)?)),
        b'$' => {
            let Some(len) = get_length(buf)? else {
                return Ok(Reply::Null);
            };
            if buf.remaining() < len + 2 {
                return Err(ParseError::Incomplete);
            }
            let start = buf.position() as usize;
            let raw = *buf.get_ref();
            if &raw[start + len..start + len + 2] != b"\r\n" {
                return Err(ParseError::Invalid(
                    "bulk string not terminated by CRLF".to_string(),
                ));
            }
            let data = Bytes::copy_from_slice(&raw[start..start + len]);
            buf.advance(len + 2);
            Ok(Reply::Bulk(data))
        }
        b'*' => {
            let Some(len) = get_length(buf)? else {
                return Ok(Reply::Null);
            };
            let mut items = Vec::with_capacity(len.min(1024));
            for _ in 0..len {
                items.push(parse(buf)?);
            }
            Ok(Reply::Array(items))
        }
        other => Err(ParseError::Invalid(format!(
            "invalid type byte {:#04x}",
            other
        ))),
    }
}

fn get_u8(buf: &mut Cursor<&[u8]>) -> Result<u8, ParseError> {
    if !buf.has_remaining() {
        return Err(ParseError::Incomplete);
    }
    Ok(buf.get_u8())
}

fn get_line<'a>(buf: &mut Cursor<&'a [u8]>) -> Result<&'a [u8], ParseError> {
    let start = buf.position() as usize;
    let raw: &'a [u8] = *buf.get_ref();
    let rest = raw.get(start..).unwrap_or_default();

    match rest.windows(2).position(|w| w == b"\r\n") {
        Some(offset) => {
            buf.set_position((start + offset + 2) as u64);
            Ok(&raw[start..start + offset])
        }
        None => Err(ParseError::Incomplete),
    }
}

fn get_decimal(buf: &mut Cursor<&[u8]>) -> Result<i64, ParseError> {
    let line = get_line(buf)?;
    let s = std::str::from_utf8(line)
        .map_err(|_| ParseError::Invalid("integer is not UTF-8".to_string()))?;
    s.parse::<i64>()
        .map_err(|_| ParseError::Invalid(format!("invalid integer {:?}", s)))
}

/// Length prefix of a bulk string or array, `None` for the null form
fn get_length(buf: &mut Cursor<&[u8]>) -> Result<Option<usize>, ParseError> {
    match get_decimal(buf)? {
        -1 => Ok(None),
        n if n < 0 => Err(ParseError::Invalid(format!("invalid length {}", n))),
        n if n as u64 > MAX_BULK_LEN as u64 => {
            Err(ParseError::Invalid(format!("length {} exceeds limit", n)))
        }
        n => Ok(Some(n as usize)),
    }
}

fn skip(buf: &mut Cursor<&[u8]>, n: usize) -> Result<(), ParseError> {
    if buf.remaining() < n {
        return Err(ParseError::Incomplete);
    }
    buf.advance(n);
    Ok(())
}
