//! Binary reply writer (§4.I, §6.2).
//!
//! Every reply is a sequence of fixed-width big-endian words written
//! directly to the peer's socket — no framing header wraps them, unlike
//! the request side. The dispatcher is the only caller; it is also the
//! only writer of peer sockets, which is what gives per-connection
//! replies their strict ordering (§5).

use bytes::Bytes;
use tokio::io::{self, AsyncWrite, AsyncWriteExt};

/// What to write back for one executed command. `Ok` covers every
/// mutating command plus `HAS`; `Value`/`List` cover `GET`/`GETL`; `None`
/// covers `HELLO`, which gets no reply at all.
pub enum Reply {
    Ok(bool),
    Value(Option<Bytes>),
    List(Option<Vec<Bytes>>),
    None,
}

pub async fn write_reply<W: AsyncWrite + Unpin>(w: &mut W, reply: &Reply) -> io::Result<()> {
    match reply {
        Reply::Ok(ok) => w.write_u8(ok_byte(*ok)).await?,
        Reply::Value(Some(val)) => {
            w.write_u8(ok_byte(true)).await?;
            w.write_u64(val.len() as u64).await?;
            w.write_all(val).await?;
        }
        Reply::Value(None) => w.write_u8(ok_byte(false)).await?,
        Reply::List(Some(values)) => {
            w.write_u8(ok_byte(true)).await?;
            w.write_u64(values.len() as u64).await?;
            for value in values {
                w.write_u64(value.len() as u64).await?;
                w.write_all(value).await?;
            }
        }
        Reply::List(None) => w.write_u8(ok_byte(false)).await?,
        Reply::None => return Ok(()),
    }
    w.flush().await
}

fn ok_byte(ok: bool) -> u8 {
    if ok { 0x01 } else { 0x00 }
}
