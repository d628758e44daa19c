//! Wire format for the i3/Sway IPC protocol.
//!
//! Every frame is `"i3-ipc"` (6 bytes) + a 4-byte little-endian payload
//! length + a 4-byte little-endian message/event type + the JSON payload.
//! Event frames set the high bit (`0x8000_0000`) on the type field to
//! distinguish them from message replies sharing the same connection.

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

pub const MAGIC: &[u8; 6] = b"i3-ipc";
const HEADER_LEN: usize = 6 + 4 + 4;
const EVENT_BIT: u32 = 0x8000_0000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    RunCommand,
    GetWorkspaces,
    Subscribe,
    GetOutputs,
    GetTree,
    GetMarks,
    GetBarConfig,
    GetVersion,
    GetBindingModes,
    GetConfig,
    SendTick,
    Sync,
}

impl MessageType {
    #[must_use]
    pub fn code(self) -> u32 {
        match self {
            MessageType::RunCommand => 0,
            MessageType::GetWorkspaces => 1,
            MessageType::Subscribe => 2,
            MessageType::GetOutputs => 3,
            MessageType::GetTree => 4,
            MessageType::GetMarks => 5,
            MessageType::GetBarConfig => 6,
            MessageType::GetVersion => 7,
            MessageType::GetBindingModes => 8,
            MessageType::GetConfig => 9,
            MessageType::SendTick => 10,
            MessageType::Sync => 11,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    Workspace,
    Output,
    Mode,
    Window,
    BarConfigUpdate,
    Binding,
    Shutdown,
    Tick,
}

impl EventType {
    #[must_use]
    pub fn from_code(code: u32) -> Option<Self> {
        match code & !EVENT_BIT {
            0 => Some(EventType::Workspace),
            1 => Some(EventType::Output),
            2 => Some(EventType::Mode),
            3 => Some(EventType::Window),
            4 => Some(EventType::BarConfigUpdate),
            5 => Some(EventType::Binding),
            6 => Some(EventType::Shutdown),
            7 => Some(EventType::Tick),
            _ => None,
        }
    }
}

/// One decoded frame: either a reply to a request (carries the matching
/// [`MessageType`] code) or a subscribed event (high bit set).
#[derive(Debug, Clone)]
pub struct Frame {
    pub type_code: u32,
    pub payload: Vec<u8>,
}

impl Frame {
    #[must_use]
    pub fn is_event(&self) -> bool {
        self.type_code & EVENT_BIT != 0
    }

    #[must_use]
    pub fn event_type(&self) -> Option<EventType> {
        self.is_event().then(|| EventType::from_code(self.type_code)).flatten()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("bad magic bytes in ipc frame header")]
    BadMagic,
    #[error("frame payload exceeds maximum size ({0} bytes)")]
    TooLarge(usize),
}

pub const MAX_PAYLOAD_SIZE: usize = 64 * 1024 * 1024;

#[derive(Debug, Default)]
pub struct IpcCodec;

impl Decoder for IpcCodec {
    type Item = Frame;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < HEADER_LEN {
            return Ok(None);
        }

        if &src[..6] != MAGIC.as_slice() {
            return Err(CodecError::BadMagic);
        }

        let payload_len = u32::from_le_bytes([src[6], src[7], src[8], src[9]]) as usize;
        let type_code = u32::from_le_bytes([src[10], src[11], src[12], src[13]]);

        if payload_len > MAX_PAYLOAD_SIZE {
            return Err(CodecError::TooLarge(payload_len));
        }

        if src.len() < HEADER_LEN + payload_len {
            src.reserve(HEADER_LEN + payload_len - src.len());
            return Ok(None);
        }

        src.advance(HEADER_LEN);
        let payload = src.split_to(payload_len).to_vec();

        Ok(Some(Frame { type_code, payload }))
    }
}

impl Encoder<(u32, Vec<u8>)> for IpcCodec {
    type Error = CodecError;

    fn encode(&mut self, item: (u32, Vec<u8>), dst: &mut BytesMut) -> Result<(), Self::Error> {
        let (type_code, payload) = item;
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(CodecError::TooLarge(payload.len()));
        }
        dst.reserve(HEADER_LEN + payload.len());
        dst.put_slice(MAGIC);
        dst.put_u32_le(payload.len() as u32);
        dst.put_u32_le(type_code);
        dst.put_slice(&payload);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_then_decode_roundtrip() {
        let mut codec = IpcCodec;
        let mut buf = BytesMut::new();
        codec
            .encode((MessageType::GetTree.code(), b"{}".to_vec()), &mut buf)
            .unwrap();

        let frame = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(frame.type_code, MessageType::GetTree.code());
        assert_eq!(frame.payload, b"{}");
        assert!(buf.is_empty());
    }

    #[test]
    fn decode_waits_for_full_header() {
        let mut codec = IpcCodec;
        let mut buf = BytesMut::from(&b"i3-ipc"[..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn decode_waits_for_full_payload() {
        let mut codec = IpcCodec;
        let mut buf = BytesMut::new();
        codec.encode((0, vec![0u8; 100]), &mut buf).unwrap();
        let mut partial = buf.split_to(HEADER_LEN + 10);
        assert!(codec.decode(&mut partial).unwrap().is_none());
    }

    #[test]
    fn decode_rejects_bad_magic() {
        let mut codec = IpcCodec;
        let mut buf = BytesMut::from(&b"xx-ipc\x00\x00\x00\x00\x00\x00\x00\x00"[..]);
        assert!(matches!(codec.decode(&mut buf), Err(CodecError::BadMagic)));
    }

    #[test]
    fn event_bit_distinguishes_events_from_replies() {
        let reply = Frame { type_code: MessageType::GetTree.code(), payload: vec![] };
        assert!(!reply.is_event());

        let event = Frame { type_code: EVENT_BIT | 3, payload: vec![] };
        assert!(event.is_event());
        assert_eq!(event.event_type(), Some(EventType::Window));
    }
}
