//! Complete SMPP PDUs: header fields plus a tagged body.
//!
//! `command_id` is implied by the [`PduBody`] variant and `command_length` is
//! computed on encode, so neither can disagree with the body.

use crate::codec::{CodecError, MAX_PDU_SIZE, PduHeader};
use crate::datatypes::{
    AlertNotification, Bind, BindResponse, CancelSm, CommandId, CommandStatus, DataSm, DeliverSm,
    MessageIdResponse, Outbind, QuerySm, QuerySmResp, ReplaceSm, SubmitMulti, SubmitMultiResp,
    SubmitSm, TagRegistry,
};
use bytes::{BufMut, Bytes, BytesMut};
use std::io::Cursor;

crate::macros::pdu_bodies! {
    empty {
        EnquireLink,
        EnquireLinkResp,
        Unbind,
        UnbindResp,
        GenericNack,
        CancelSmResp,
        ReplaceSmResp,
    }
    fields {
        BindTransmitter(Bind),
        BindTransmitterResp(BindResponse),
        BindReceiver(Bind),
        BindReceiverResp(BindResponse),
        BindTransceiver(Bind),
        BindTransceiverResp(BindResponse),
        Outbind(Outbind),
        SubmitSmResp(MessageIdResponse),
        SubmitMultiResp(SubmitMultiResp),
        DeliverSmResp(MessageIdResponse),
        DataSmResp(MessageIdResponse),
        QuerySm(QuerySm),
        QuerySmResp(QuerySmResp),
        CancelSm(CancelSm),
        AlertNotification(AlertNotification),
    }
    boxed {
        SubmitSm(SubmitSm),
        SubmitMulti(SubmitMulti),
        DeliverSm(DeliverSm),
        DataSm(DataSm),
        ReplaceSm(ReplaceSm),
    }
}

impl PduBody {
    pub fn is_response(&self) -> bool {
        self.command_id().is_response()
    }
}

/// One SMPP PDU.
#[derive(Clone, Debug, PartialEq)]
pub struct Pdu {
    pub command_status: CommandStatus,
    pub sequence_number: u32,
    pub body: PduBody,
}

impl Pdu {
    /// A PDU with `command_status` 0, as every request carries
    pub fn new(sequence_number: u32, body: PduBody) -> Self {
        Self {
            command_status: CommandStatus::Ok,
            sequence_number,
            body,
        }
    }

    pub fn with_status(sequence_number: u32, command_status: CommandStatus, body: PduBody) -> Self {
        Self {
            command_status,
            sequence_number,
            body,
        }
    }

    /// generic_nack for a frame that could not be handled
    pub fn generic_nack(sequence_number: u32, command_status: CommandStatus) -> Self {
        Self::with_status(sequence_number, command_status, PduBody::GenericNack)
    }

    pub fn command_id(&self) -> CommandId {
        self.body.command_id()
    }

    pub fn is_response(&self) -> bool {
        self.body.is_response()
    }

    /// Encode a complete frame
    pub fn encode(&self) -> Result<Bytes, CodecError> {
        let mut buf = BytesMut::with_capacity(PduHeader::SIZE + 64);
        self.write_header(&mut buf)?;
        self.body.encode_body(&mut buf)?;

        let length = Self::checked_length(buf.len())?;
        buf[..4].copy_from_slice(&length.to_be_bytes());
        Ok(buf.freeze())
    }

    /// Encode into fixed capacity, returning the number of bytes written.
    ///
    /// Fails with `BufferOverflow` when `dst` is too small; `dst` contents
    /// are unspecified after a failure.
    pub fn encode_to_slice(&self, dst: &mut [u8]) -> Result<usize, CodecError> {
        let capacity = dst.len();
        let written = {
            let mut cursor = &mut dst[..];
            self.write_header(&mut cursor)?;
            self.body.encode_body(&mut cursor)?;
            capacity - cursor.len()
        };

        let length = Self::checked_length(written)?;
        dst[..4].copy_from_slice(&length.to_be_bytes());
        Ok(written)
    }

    /// Decode one complete frame.
    ///
    /// Bytes past `command_length` are ignored; a slice shorter than
    /// `command_length` is `TruncatedData`.
    pub fn decode(frame: &[u8], registry: &TagRegistry) -> Result<Pdu, CodecError> {
        let mut cursor = Cursor::new(frame);
        let header = PduHeader::decode(&mut cursor)?;

        let length = header.command_length as usize;
        if frame.len() < length {
            return Err(CodecError::TruncatedData {
                needed: length,
                available: frame.len(),
            });
        }

        let mut body = Cursor::new(&frame[PduHeader::SIZE..length]);
        let body = PduBody::decode_body(&header, &mut body, registry)?;

        Ok(Pdu {
            command_status: header.command_status,
            sequence_number: header.sequence_number,
            body,
        })
    }

    /// Header with a placeholder length, patched once the body is written
    fn write_header<B: BufMut>(&self, buf: &mut B) -> Result<(), CodecError> {
        PduHeader {
            command_length: 0,
            command_id: self.command_id(),
            command_status: self.command_status,
            sequence_number: self.sequence_number,
        }
        .encode(buf)
    }

    fn checked_length(length: usize) -> Result<u32, CodecError> {
        match u32::try_from(length) {
            Ok(length) if length <= MAX_PDU_SIZE => Ok(length),
            _ => Err(CodecError::InvalidPduLength {
                length: u32::try_from(length).unwrap_or(u32::MAX),
                min: PduHeader::SIZE as u32,
                max: MAX_PDU_SIZE,
            }),
        }
    }
}
