//! Wire format of the TCP binding.
//!
//! Every frame is a 4-byte big-endian length followed by one JSON-encoded
//! [`Packet`]. A connection opens with exactly one `identity` packet.

use bytes::{Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;
use tokio_util::codec::{Decoder, Encoder, LengthDelimitedCodec};

use crate::domain::action::Action;
use crate::domain::foundation::Identity;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Packet {
    Identity { value: Identity },
    Heartbeat,
    Action { action: Action },
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Malformed packet: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Handshake failed: {0}")]
    Handshake(&'static str),
}

/// Length-prefixed JSON packets.
pub struct PacketCodec {
    frames: LengthDelimitedCodec,
}

impl PacketCodec {
    pub fn new(max_frame_bytes: usize) -> Self {
        Self {
            frames: LengthDelimitedCodec::builder()
                .max_frame_length(max_frame_bytes)
                .new_codec(),
        }
    }
}

impl Decoder for PacketCodec {
    type Item = Packet;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Packet>, ProtocolError> {
        match self.frames.decode(src)? {
            Some(frame) => Ok(Some(serde_json::from_slice(&frame)?)),
            None => Ok(None),
        }
    }
}

impl Encoder<Packet> for PacketCodec {
    type Error = ProtocolError;

    fn encode(&mut self, packet: Packet, dst: &mut BytesMut) -> Result<(), ProtocolError> {
        let body = serde_json::to_vec(&packet)?;
        self.frames.encode(Bytes::from(body), dst)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::action::PlayerAction;

    #[test]
    fn frame_is_length_prefixed_json() {
        let mut codec = PacketCodec::new(1024);
        let mut buf = BytesMut::new();
        codec.encode(Packet::Heartbeat, &mut buf).unwrap();

        let body = br#"{"type":"heartbeat"}"#;
        assert_eq!(&buf[..4], &(body.len() as u32).to_be_bytes());
        assert_eq!(&buf[4..], body);
    }

    #[test]
    fn partial_frames_wait_for_more_bytes() {
        let mut codec = PacketCodec::new(1024);
        let mut full = BytesMut::new();
        let packet = Packet::Action {
            action: Action::player(Identity::new("a"), PlayerAction::StartGame),
        };
        codec.encode(packet.clone(), &mut full).unwrap();

        let mut partial = full.split_to(full.len() - 3);
        assert!(codec.decode(&mut partial).unwrap().is_none());
        partial.unsplit(full);
        assert_eq!(codec.decode(&mut partial).unwrap(), Some(packet));
    }

    #[test]
    fn oversized_frames_are_rejected() {
        let mut codec = PacketCodec::new(8);
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&64u32.to_be_bytes());
        buf.extend_from_slice(&[b' '; 64]);

        assert!(matches!(codec.decode(&mut buf), Err(ProtocolError::Io(_))));
    }

    #[test]
    fn garbage_is_a_json_error() {
        let mut codec = PacketCodec::new(1024);
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&3u32.to_be_bytes());
        buf.extend_from_slice(b"???");

        assert!(matches!(codec.decode(&mut buf), Err(ProtocolError::Json(_))));
    }
}
