//! RESP Codec for Tokio
//!
//! Implements Encoder and Decoder traits for framed I/O.

use bytes::{Buf, BytesMut};
use std::io::Cursor;
use tokio_util::codec::{Decoder, Encoder};

use super::reply::{check, parse, ParseError, Reply};
use crate::error::Error;

/// Tokio codec for RESP2 values
#[derive(Debug, Default)]
pub struct RespCodec;

impl RespCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for RespCodec {
    type Item = Reply;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }

        let mut buf = Cursor::new(&src[..]);
        match check(&mut buf) {
            Ok(()) => {
                let len = buf.position() as usize;
                buf.set_position(0);
                let reply = parse(&mut buf).map_err(|e| match e {
                    ParseError::Incomplete => {
                        Error::Protocol("frame shorter than checked length".to_string())
                    }
                    ParseError::Invalid(msg) => Error::Protocol(msg),
                })?;
                src.advance(len);
                Ok(Some(reply))
            }
            Err(ParseError::Incomplete) => Ok(None),
            Err(ParseError::Invalid(msg)) => Err(Error::Protocol(msg)),
        }
    }
}

impl Encoder<Reply> for RespCodec {
    type Error = Error;

    fn encode(&mut self, item: Reply, dst: &mut BytesMut) -> Result<(), Self::Error> {
        item.encode(dst);
        Ok(())
    }
}
