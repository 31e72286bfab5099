//! RESP Protocol
//!
//! RESP2 framing for the subset of commands a sweep issues.

mod codec;
mod command;
mod reply;

pub use codec::RespCodec;
pub use command::Command;
pub use reply::{Reply, MAX_BULK_LEN};
