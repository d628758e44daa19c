//! Line-delimited JSON framing for the daemon socket.
//!
//! Frames are newline-terminated UTF-8 JSON documents. This is a deliberate
//! departure from a length-prefixed binary framing: the daemon's socket is
//! meant to be debuggable with `socat`/`nc` and scriptable from shell, so
//! each frame is one `\n`-terminated line, matching how the CLI clients
//! already speak to it.

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::protocol::Message;

/// Maximum size of a single line, guarding against a runaway peer that
/// never sends a newline.
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid utf-8 in frame: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("message exceeds maximum size of {MAX_MESSAGE_SIZE} bytes")]
    MessageTooLarge,
}

#[derive(Debug, Default)]
pub struct JsonRpcCodec;

impl Decoder for JsonRpcCodec {
    type Item = Message;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(newline_pos) = src.iter().position(|&b| b == b'\n') else {
            if src.len() > MAX_MESSAGE_SIZE {
                return Err(CodecError::MessageTooLarge);
            }
            return Ok(None);
        };

        if newline_pos > MAX_MESSAGE_SIZE {
            return Err(CodecError::MessageTooLarge);
        }

        let line = src.split_to(newline_pos);
        src.advance(1); // consume the newline itself

        let text = std::str::from_utf8(&line)?;
        let text = text.trim_end_matches('\r');
        if text.is_empty() {
            // Blank line (e.g. keepalive); try again on whatever remains.
            return self.decode(src);
        }

        let message = Message::parse(text)?;
        Ok(Some(message))
    }
}

impl Encoder<Message> for JsonRpcCodec {
    type Error = CodecError;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let json = item.to_json()?;
        if json.len() > MAX_MESSAGE_SIZE {
            return Err(CodecError::MessageTooLarge);
        }
        dst.reserve(json.len() + 1);
        dst.put_slice(json.as_bytes());
        dst.put_u8(b'\n');
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Request, RequestId};

    #[test]
    fn encode_then_decode_roundtrip() {
        let mut codec = JsonRpcCodec;
        let mut buf = BytesMut::new();
        let msg = Message::Request(Request::new("project.list", None, RequestId::Number(1)));
        codec.encode(msg, &mut buf).unwrap();

        assert_eq!(*buf.last().unwrap(), b'\n');

        let decoded = codec.decode(&mut buf).unwrap().unwrap();
        assert!(decoded.is_request());
        assert!(buf.is_empty());
    }

    #[test]
    fn decode_returns_none_without_trailing_newline() {
        let mut codec = JsonRpcCodec;
        let mut buf = BytesMut::from(&br#"{"jsonrpc":"2.0","method":"ping"}"#[..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn decode_handles_multiple_frames_in_one_buffer() {
        let mut codec = JsonRpcCodec;
        let mut buf = BytesMut::new();
        buf.put_slice(b"{\"jsonrpc\":\"2.0\",\"method\":\"a\"}\n");
        buf.put_slice(b"{\"jsonrpc\":\"2.0\",\"method\":\"b\"}\n");

        let first = codec.decode(&mut buf).unwrap().unwrap();
        let second = codec.decode(&mut buf).unwrap().unwrap();
        assert!(matches!(first, Message::Notification(ref n) if n.method == "a"));
        assert!(matches!(second, Message::Notification(ref n) if n.method == "b"));
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn decode_strips_trailing_carriage_return() {
        let mut codec = JsonRpcCodec;
        let mut buf = BytesMut::from(&b"{\"jsonrpc\":\"2.0\",\"method\":\"ping\"}\r\n"[..]);
        let decoded = codec.decode(&mut buf).unwrap().unwrap();
        assert!(matches!(decoded, Message::Notification(ref n) if n.method == "ping"));
    }

    #[test]
    fn decode_skips_blank_lines() {
        let mut codec = JsonRpcCodec;
        let mut buf = BytesMut::from(&b"\n{\"jsonrpc\":\"2.0\",\"method\":\"ping\"}\n"[..]);
        let decoded = codec.decode(&mut buf).unwrap().unwrap();
        assert!(matches!(decoded, Message::Notification(ref n) if n.method == "ping"));
    }

    #[test]
    fn decode_rejects_malformed_json() {
        let mut codec = JsonRpcCodec;
        let mut buf = BytesMut::from(&b"not json\n"[..]);
        assert!(codec.decode(&mut buf).is_err());
    }

    #[test]
    fn decode_rejects_oversized_frame() {
        let mut codec = JsonRpcCodec;
        let huge = "x".repeat(MAX_MESSAGE_SIZE + 1);
        let mut buf = BytesMut::from(huge.as_bytes());
        assert!(matches!(codec.decode(&mut buf), Err(CodecError::MessageTooLarge)));
    }
}
