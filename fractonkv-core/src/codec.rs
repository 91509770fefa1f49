//! Streaming decoder for request frames (§4.A / §6.1).
//!
//! Requests arrive as RESP2 arrays of bulk strings. The reference peer
//! reader treats one socket read as one frame; this decoder upgrades that
//! to a real streaming decoder so a frame split across reads, or several
//! frames packed into one read, both work. Replies are never run through
//! this codec — they are fixed-width binary words written directly to the
//! socket by `reply`.

use bytes::{Bytes, BytesMut};
use redis_protocol::resp2::decode::decode_bytes_mut;
use redis_protocol::resp2::types::BytesFrame;
use tokio_util::codec::Decoder;

use crate::errors::FrameError;

/// A fully decoded request: the raw bulk-string elements, verb included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestFrame {
    pub elements: Vec<Bytes>,
}

pub struct RequestCodec;

impl RequestCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RequestCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for RequestCodec {
    type Item = RequestFrame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<RequestFrame>, FrameError> {
        if src.is_empty() {
            return Ok(None);
        }

        match decode_bytes_mut(src) {
            Ok(Some((frame, _consumed, _remainder))) => Ok(Some(frame_to_request(&frame)?)),
            Ok(None) => Ok(None),
            Err(_) => Err(FrameError::BadFrame),
        }
    }
}

fn frame_to_request(frame: &BytesFrame) -> Result<RequestFrame, FrameError> {
    let BytesFrame::Array(items) = frame else {
        return Err(FrameError::BadFrame);
    };

    let mut elements = Vec::with_capacity(items.len());
    for item in items {
        match item {
            BytesFrame::BulkString(bytes) => elements.push(bytes.clone()),
            _ => return Err(FrameError::BadFrame),
        }
    }

    Ok(RequestFrame { elements })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BufMut;

    fn encode_array(parts: &[&[u8]]) -> BytesMut {
        let mut buf = BytesMut::new();
        buf.put_slice(format!("*{}\r\n", parts.len()).as_bytes());
        for part in parts {
            buf.put_slice(format!("${}\r\n", part.len()).as_bytes());
            buf.put_slice(part);
            buf.put_slice(b"\r\n");
        }
        buf
    }

    #[test]
    fn decodes_one_frame_in_one_read() {
        let mut src = encode_array(&[b"SET", b"foo", b"bar", b"0"]);
        let mut codec = RequestCodec::new();
        let frame = codec.decode(&mut src).unwrap().unwrap();
        assert_eq!(frame.elements, vec![
            Bytes::from_static(b"SET"),
            Bytes::from_static(b"foo"),
            Bytes::from_static(b"bar"),
            Bytes::from_static(b"0"),
        ]);
        assert!(src.is_empty());
    }

    #[test]
    fn returns_none_on_partial_frame() {
        let full = encode_array(&[b"GET", b"foo", b"0"]);
        let mut partial = BytesMut::from(&full[..full.len() - 3]);
        let mut codec = RequestCodec::new();
        assert!(codec.decode(&mut partial).unwrap().is_none());
    }

    #[test]
    fn decodes_two_frames_packed_into_one_read() {
        let mut src = encode_array(&[b"GET", b"foo", b"0"]);
        src.extend_from_slice(&encode_array(&[b"GET", b"bar", b"0"]));
        let mut codec = RequestCodec::new();
        let first = codec.decode(&mut src).unwrap().unwrap();
        assert_eq!(first.elements[1], Bytes::from_static(b"foo"));
        let second = codec.decode(&mut src).unwrap().unwrap();
        assert_eq!(second.elements[1], Bytes::from_static(b"bar"));
        assert!(src.is_empty());
    }

    #[test]
    fn rejects_non_array_outer_type() {
        let mut src = BytesMut::from(&b"+OK\r\n"[..]);
        let mut codec = RequestCodec::new();
        assert_eq!(codec.decode(&mut src), Err(FrameError::BadFrame));
    }
}
