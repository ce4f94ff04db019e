// SMPP v3.4 Codec - Separates wire primitives from the PDU domain models
//
// Every PDU body implements Encodable/Decodable on top of the primitives in
// this module. Writes go through `bytes::BufMut`, so a fixed `&mut [u8]`
// destination reports `BufferOverflow` instead of growing. Reads go through
// `Cursor<&[u8]>` positioned over exactly one frame, so running off the end
// of a field is `TruncatedData`.

use crate::datatypes::{CommandId, CommandStatus, TagRegistry};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io::Cursor;
use thiserror::Error;

/// Maximum allowed PDU size to prevent memory exhaustion attacks
pub const MAX_PDU_SIZE: u32 = 65536; // 64KB

/// SMPP v3.4 PDU Header (16 bytes, common to all PDUs)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PduHeader {
    pub command_length: u32,
    pub command_id: CommandId,
    pub command_status: CommandStatus,
    pub sequence_number: u32,
}

impl PduHeader {
    pub const SIZE: usize = 16;

    /// Decode PDU header from buffer with length validation.
    ///
    /// Requests carrying a non-zero status and sequence number 0 are accepted
    /// as-is; neither affects framing.
    pub fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        let command_length = decode_u32(buf)?;

        if !(Self::SIZE as u32..=MAX_PDU_SIZE).contains(&command_length) {
            return Err(CodecError::InvalidPduLength {
                length: command_length,
                min: Self::SIZE as u32,
                max: MAX_PDU_SIZE,
            });
        }

        let command_id = CommandId::from(decode_u32(buf)?);
        let command_status = CommandStatus::from(decode_u32(buf)?);
        let sequence_number = decode_u32(buf)?;

        Ok(PduHeader {
            command_length,
            command_id,
            command_status,
            sequence_number,
        })
    }

    /// Encode PDU header to buffer
    pub fn encode<B: BufMut>(&self, buf: &mut B) -> Result<(), CodecError> {
        encode_u32(buf, self.command_length)?;
        encode_u32(buf, self.command_id.into())?;
        encode_u32(buf, self.command_status.into())?;
        encode_u32(buf, self.sequence_number)
    }

    /// Length of the body (mandatory fields plus optional trailer)
    pub fn body_length(&self) -> usize {
        self.command_length as usize - Self::SIZE
    }
}

/// Trait for PDU bodies that can be written to the wire
pub trait Encodable {
    /// Encode the body (mandatory fields, then optional parameters) to the buffer
    fn encode<B: BufMut>(&self, buf: &mut B) -> Result<(), CodecError>;

    /// Calculate the encoded size without keeping the encoding
    fn encoded_size(&self) -> usize {
        let mut buf = BytesMut::new();
        self.encode(&mut buf).map(|_| buf.len()).unwrap_or(0)
    }
}

/// Trait for PDU bodies that can be read from a frame
pub trait Decodable: Sized {
    /// Decode the body. `buf` is positioned after the header and ends at the
    /// frame boundary; anything past the mandatory fields is the TLV trailer.
    fn decode(
        header: &PduHeader,
        buf: &mut Cursor<&[u8]>,
        registry: &TagRegistry,
    ) -> Result<Self, CodecError>;
}

/// Codec errors with detailed context for debugging
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Incomplete PDU: need more data")]
    Incomplete,

    #[error("Truncated data: needed {needed} bytes, {available} available")]
    TruncatedData { needed: usize, available: usize },

    #[error("Buffer overflow: needed {needed} bytes, {available} available")]
    BufferOverflow { needed: usize, available: usize },

    #[error("Field '{field}' is {length} bytes, maximum is {max}")]
    FieldTooLong {
        field: &'static str,
        length: usize,
        max: usize,
    },

    #[error("Field '{field}' has no NUL terminator within {max_len} bytes")]
    UnterminatedString { field: &'static str, max_len: usize },

    #[error("Malformed optional parameter {tag:#06x}: {reason}")]
    MalformedOptionalParameter { tag: u16, reason: String },

    #[error("Invalid PDU length: {length}, must be {min}-{max}")]
    InvalidPduLength { length: u32, min: u32, max: u32 },

    #[error("UTF-8 decoding error in field '{field}': {source}")]
    Utf8Error {
        field: &'static str,
        #[source]
        source: std::str::Utf8Error,
    },

    #[error("{command_id:?} carries {trailing} unexpected body bytes")]
    UnexpectedBody { command_id: CommandId, trailing: usize },

    #[error("Field '{field}' validation failed: {reason}")]
    FieldValidation { field: &'static str, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CodecError {
    /// Errors after which the byte stream can no longer be trusted.
    ///
    /// Everything else is confined to a single frame and the session keeps
    /// reading.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CodecError::TruncatedData { .. }
                | CodecError::BufferOverflow { .. }
                | CodecError::InvalidPduLength { .. }
                | CodecError::Io(_)
        )
    }

    /// Status used when answering a frame that failed to decode
    pub fn to_command_status(&self) -> CommandStatus {
        match self {
            CodecError::InvalidPduLength { .. } => CommandStatus::InvalidCommandLength,
            CodecError::MalformedOptionalParameter { .. } => {
                CommandStatus::InvalidOptionalParameterValue
            }
            CodecError::FieldTooLong { field, .. }
            | CodecError::UnterminatedString { field, .. }
            | CodecError::FieldValidation { field, .. }
            | CodecError::Utf8Error { field, .. } => match *field {
                "source_addr" => CommandStatus::InvalidSourceAddress,
                "destination_addr" => CommandStatus::InvalidDestinationAddress,
                "short_message" => CommandStatus::InvalidMsgLength,
                "message_id" => CommandStatus::InvalidMessageId,
                "service_type" => CommandStatus::InvalidServiceType,
                _ => CommandStatus::SystemError,
            },
            CodecError::UnexpectedBody { .. } | CodecError::TruncatedData { .. } => {
                CommandStatus::InvalidCommandLength
            }
            _ => CommandStatus::SystemError,
        }
    }
}

fn ensure_remaining(buf: &Cursor<&[u8]>, needed: usize) -> Result<(), CodecError> {
    let available = buf.remaining();
    if available < needed {
        return Err(CodecError::TruncatedData { needed, available });
    }
    Ok(())
}

fn ensure_capacity<B: BufMut>(buf: &B, needed: usize) -> Result<(), CodecError> {
    let available = buf.remaining_mut();
    if available < needed {
        return Err(CodecError::BufferOverflow { needed, available });
    }
    Ok(())
}

/// Decode a NUL-terminated string of at most `max_len` bytes (terminator included).
pub fn decode_cstring(
    buf: &mut Cursor<&[u8]>,
    max_len: usize,
    field: &'static str,
) -> Result<String, CodecError> {
    let window = &buf.chunk()[..buf.remaining().min(max_len)];

    let end = window
        .iter()
        .position(|&b| b == 0)
        .ok_or(CodecError::UnterminatedString { field, max_len })?;

    let value = std::str::from_utf8(&window[..end])
        .map_err(|source| CodecError::Utf8Error { field, source })?
        .to_owned();

    buf.advance(end + 1);
    Ok(value)
}

/// Decode a single byte
pub fn decode_u8(buf: &mut Cursor<&[u8]>) -> Result<u8, CodecError> {
    ensure_remaining(buf, 1)?;
    Ok(buf.get_u8())
}

/// Decode a 16-bit big-endian integer
pub fn decode_u16(buf: &mut Cursor<&[u8]>) -> Result<u16, CodecError> {
    ensure_remaining(buf, 2)?;
    Ok(buf.get_u16())
}

/// Decode a 32-bit big-endian integer
pub fn decode_u32(buf: &mut Cursor<&[u8]>) -> Result<u32, CodecError> {
    ensure_remaining(buf, 4)?;
    Ok(buf.get_u32())
}

/// Decode exactly `len` raw octets
pub fn decode_octets(buf: &mut Cursor<&[u8]>, len: usize) -> Result<Bytes, CodecError> {
    ensure_remaining(buf, len)?;
    Ok(buf.copy_to_bytes(len))
}

/// Encode `value` followed by a NUL. Never pads to `max_len`.
pub fn encode_cstring<B: BufMut>(
    buf: &mut B,
    value: &str,
    max_len: usize,
    field: &'static str,
) -> Result<(), CodecError> {
    let length = value.len() + 1;
    if length > max_len {
        return Err(CodecError::FieldTooLong {
            field,
            length,
            max: max_len,
        });
    }
    ensure_capacity(buf, length)?;
    buf.put_slice(value.as_bytes());
    buf.put_u8(0);
    Ok(())
}

/// Encode a single byte
pub fn encode_u8<B: BufMut>(buf: &mut B, value: u8) -> Result<(), CodecError> {
    ensure_capacity(buf, 1)?;
    buf.put_u8(value);
    Ok(())
}

/// Encode a 16-bit big-endian integer
pub fn encode_u16<B: BufMut>(buf: &mut B, value: u16) -> Result<(), CodecError> {
    ensure_capacity(buf, 2)?;
    buf.put_u16(value);
    Ok(())
}

/// Encode a 32-bit big-endian integer
pub fn encode_u32<B: BufMut>(buf: &mut B, value: u32) -> Result<(), CodecError> {
    ensure_capacity(buf, 4)?;
    buf.put_u32(value);
    Ok(())
}

/// Encode raw octets; the caller writes any length prefix
pub fn encode_octets<B: BufMut>(buf: &mut B, value: &[u8]) -> Result<(), CodecError> {
    ensure_capacity(buf, value.len())?;
    buf.put_slice(value);
    Ok(())
}

/// Fail with `UnexpectedBody` unless the cursor reached the frame boundary
pub fn expect_end(buf: &Cursor<&[u8]>, command_id: CommandId) -> Result<(), CodecError> {
    match buf.remaining() {
        0 => Ok(()),
        trailing => Err(CodecError::UnexpectedBody {
            command_id,
            trailing,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdu_header_encode_decode() {
        let header = PduHeader {
            command_length: 16,
            command_id: CommandId::EnquireLink,
            command_status: CommandStatus::Ok,
            sequence_number: 42,
        };

        let mut buf = BytesMut::new();
        header.encode(&mut buf).unwrap();
        assert_eq!(
            buf.as_ref(),
            &[0, 0, 0, 16, 0, 0, 0, 0x15, 0, 0, 0, 0, 0, 0, 0, 42]
        );

        let mut cursor = Cursor::new(buf.as_ref());
        let decoded = PduHeader::decode(&mut cursor).unwrap();

        assert_eq!(header, decoded);
        assert_eq!(decoded.body_length(), 0);
    }

    #[test]
    fn pdu_header_length_bounds() {
        let data: &[u8] = &[
            0x00, 0x00, 0x00, 0x08, // command_length too small
            0x00, 0x00, 0x00, 0x15, // command_id
            0x00, 0x00, 0x00, 0x00, // command_status
            0x00, 0x00, 0x00, 0x01, // sequence_number
        ];
        let result = PduHeader::decode(&mut Cursor::new(data));
        assert!(matches!(
            result,
            Err(CodecError::InvalidPduLength { length: 8, .. })
        ));

        let data: &[u8] = &[0x00, 0x01, 0x00, 0x01, 0, 0, 0, 0x15, 0, 0, 0, 0, 0, 0, 0, 1];
        let result = PduHeader::decode(&mut Cursor::new(data));
        assert!(matches!(result, Err(CodecError::InvalidPduLength { .. })));
    }

    #[test]
    fn pdu_header_tolerates_zero_sequence_and_request_status() {
        let data: &[u8] = &[0, 0, 0, 16, 0, 0, 0, 0x15, 0, 0, 0, 8, 0, 0, 0, 0];
        let header = PduHeader::decode(&mut Cursor::new(data)).unwrap();
        assert_eq!(header.sequence_number, 0);
        assert_eq!(header.command_status, CommandStatus::SystemError);
    }

    #[test]
    fn decode_cstring_stops_at_terminator() {
        let data = b"hello\0world\0";
        let mut cursor = Cursor::new(&data[..]);
        assert_eq!(decode_cstring(&mut cursor, 16, "test").unwrap(), "hello");
        assert_eq!(cursor.position(), 6);
        assert_eq!(decode_cstring(&mut cursor, 16, "test").unwrap(), "world");
    }

    #[test]
    fn decode_cstring_null_is_empty() {
        let mut cursor = Cursor::new(&b"\0"[..]);
        assert_eq!(decode_cstring(&mut cursor, 1, "test").unwrap(), "");
        assert_eq!(cursor.remaining(), 0);
    }

    #[test]
    fn decode_cstring_unterminated() {
        let data = b"toolongvalue\0";
        let result = decode_cstring(&mut Cursor::new(&data[..]), 6, "system_id");
        assert!(matches!(
            result,
            Err(CodecError::UnterminatedString {
                field: "system_id",
                max_len: 6
            })
        ));

        // running off the end of the frame is the same failure
        let result = decode_cstring(&mut Cursor::new(&b"abc"[..]), 16, "system_id");
        assert!(matches!(result, Err(CodecError::UnterminatedString { .. })));
    }

    #[test]
    fn decode_cstring_rejects_invalid_utf8() {
        let data = [0xFFu8, 0xFE, 0x00];
        let result = decode_cstring(&mut Cursor::new(&data[..]), 16, "system_id");
        assert!(matches!(result, Err(CodecError::Utf8Error { .. })));
    }

    #[test]
    fn encode_cstring_never_pads() {
        let mut buf = BytesMut::new();
        encode_cstring(&mut buf, "hello", 10, "test").unwrap();
        assert_eq!(buf.as_ref(), b"hello\0");
    }

    #[test]
    fn encode_cstring_counts_terminator_in_max() {
        let mut buf = BytesMut::new();
        encode_cstring(&mut buf, "12345678", 9, "password").unwrap();
        let result = encode_cstring(&mut buf, "123456789", 9, "password");
        assert!(matches!(
            result,
            Err(CodecError::FieldTooLong {
                field: "password",
                length: 10,
                max: 9
            })
        ));
    }

    #[test]
    fn fixed_buffer_overflow() {
        let mut storage = [0u8; 3];
        let mut dst = &mut storage[..];
        encode_u16(&mut dst, 0xBEEF).unwrap();
        let result = encode_u16(&mut dst, 1);
        assert!(matches!(
            result,
            Err(CodecError::BufferOverflow {
                needed: 2,
                available: 1
            })
        ));
        assert_eq!(storage[..2], [0xBE, 0xEF]);
    }

    #[test]
    fn truncated_integers() {
        let mut cursor = Cursor::new(&[0x01u8, 0x02, 0x03][..]);
        assert!(matches!(
            decode_u32(&mut cursor),
            Err(CodecError::TruncatedData {
                needed: 4,
                available: 3
            })
        ));
        assert_eq!(decode_u16(&mut cursor).unwrap(), 0x0102);
        assert_eq!(decode_u8(&mut cursor).unwrap(), 0x03);
        assert!(decode_u8(&mut cursor).is_err());
    }

    #[test]
    fn octets_move_exact_length() {
        let mut buf = BytesMut::new();
        encode_octets(&mut buf, &[1, 2, 3]).unwrap();
        let mut cursor = Cursor::new(buf.as_ref());
        assert_eq!(decode_octets(&mut cursor, 2).unwrap().as_ref(), &[1, 2]);
        assert!(decode_octets(&mut cursor, 2).unwrap_err().is_fatal());
    }

    #[test]
    fn fatal_classification() {
        assert!(CodecError::TruncatedData { needed: 1, available: 0 }.is_fatal());
        assert!(CodecError::InvalidPduLength { length: 3, min: 16, max: 65536 }.is_fatal());
        assert!(!CodecError::UnterminatedString { field: "x", max_len: 1 }.is_fatal());
        assert!(
            !CodecError::MalformedOptionalParameter {
                tag: 0x0204,
                reason: String::new()
            }
            .is_fatal()
        );
    }

    #[test]
    fn error_status_mapping() {
        let err = CodecError::FieldTooLong {
            field: "source_addr",
            length: 30,
            max: 21,
        };
        assert_eq!(err.to_command_status(), CommandStatus::InvalidSourceAddress);
        assert_eq!(
            CodecError::InvalidPduLength { length: 4, min: 16, max: 65536 }.to_command_status(),
            CommandStatus::InvalidCommandLength
        );
    }
}
