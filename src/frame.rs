// ABOUTME: Splits an inbound byte stream into complete SMPP PDU frames
// ABOUTME: Validates command_length before any body parsing and exposes raw header fields

use crate::codec::{CodecError, MAX_PDU_SIZE, PduHeader};
use crate::datatypes::{CommandId, CommandStatus, TagRegistry};
use crate::pdu::Pdu;
use bytes::{Buf, Bytes, BytesMut};
use std::io::Cursor;

/// The raw bytes of exactly one PDU, `command_length` included.
///
/// A frame always holds at least a full header, so the header accessors
/// never fail. Decoding the body is a separate step so that a frame whose
/// body is malformed can still be answered by sequence number.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    bytes: Bytes,
}

impl Frame {
    /// Checks whether a whole frame is buffered at the cursor position.
    ///
    /// Returns the frame length on success. `Incomplete` means more bytes are
    /// needed; an out-of-range `command_length` is a fatal `InvalidPduLength`
    /// since the stream can no longer be re-synchronised.
    pub fn check(buf: &mut Cursor<&[u8]>) -> Result<usize, CodecError> {
        if buf.remaining() < 4 {
            return Err(CodecError::Incomplete);
        }

        // Peek at command_length without advancing the cursor
        let pos = buf.position();
        let command_length = buf.get_u32();
        buf.set_position(pos);

        if command_length < PduHeader::SIZE as u32 || command_length > MAX_PDU_SIZE {
            return Err(CodecError::InvalidPduLength {
                length: command_length,
                min: PduHeader::SIZE as u32,
                max: MAX_PDU_SIZE,
            });
        }

        if buf.remaining() < command_length as usize {
            return Err(CodecError::Incomplete);
        }

        Ok(command_length as usize)
    }

    /// Splits one frame off the front of `buf` if it is complete.
    pub fn parse(buf: &mut BytesMut) -> Result<Option<Frame>, CodecError> {
        let mut cursor = Cursor::new(&buf[..]);
        match Frame::check(&mut cursor) {
            Ok(len) => Ok(Some(Frame {
                bytes: buf.split_to(len).freeze(),
            })),
            Err(CodecError::Incomplete) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Wraps already-framed bytes, e.g. the output of [`Pdu::encode`]
    pub fn from_bytes(bytes: Bytes) -> Result<Frame, CodecError> {
        let len = Frame::check(&mut Cursor::new(&bytes[..])).map_err(|e| match e {
            CodecError::Incomplete => CodecError::TruncatedData {
                needed: PduHeader::SIZE,
                available: bytes.len(),
            },
            e => e,
        })?;
        if len != bytes.len() {
            return Err(CodecError::TruncatedData {
                needed: len,
                available: bytes.len(),
            });
        }
        Ok(Frame { bytes })
    }

    pub fn header(&self) -> PduHeader {
        PduHeader {
            command_length: self.word(0),
            command_id: self.command_id(),
            command_status: self.command_status(),
            sequence_number: self.sequence_number(),
        }
    }

    pub fn command_id(&self) -> CommandId {
        CommandId::from(self.word(4))
    }

    pub fn command_status(&self) -> CommandStatus {
        CommandStatus::from(self.word(8))
    }

    pub fn sequence_number(&self) -> u32 {
        self.word(12)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }

    pub fn decode(&self, registry: &TagRegistry) -> Result<Pdu, CodecError> {
        Pdu::decode(&self.bytes, registry)
    }

    fn word(&self, offset: usize) -> u32 {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&self.bytes[offset..offset + 4]);
        u32::from_be_bytes(raw)
    }
}
