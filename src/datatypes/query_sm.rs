// ABOUTME: query_sm and query_sm_resp bodies for polling the state of a submitted message
// ABOUTME: An empty final_date means the message has not reached a final state

use crate::codec::{
    CodecError, Decodable, Encodable, PduHeader, decode_cstring, decode_u8, encode_cstring,
    encode_u8,
};
use crate::datatypes::{
    ADDR_LEN, Address, MESSAGE_ID_LEN, MessageState, OptionalParams, TIME_LEN, TagRegistry,
    decode_trailer, is_error_without_body,
};
use bytes::BufMut;
use std::io::Cursor;

/// Query the status of a previously submitted short message.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QuerySm {
    /// Identifier the SMSC returned in submit_sm_resp
    pub message_id: String,
    /// Must match the source address of the original submit_sm
    pub source_addr: Address,
    pub optional: OptionalParams,
}

impl QuerySm {
    pub fn new(message_id: impl Into<String>, source_addr: Address) -> Self {
        Self {
            message_id: message_id.into(),
            source_addr,
            optional: OptionalParams::new(),
        }
    }
}

impl Encodable for QuerySm {
    fn encode<B: BufMut>(&self, buf: &mut B) -> Result<(), CodecError> {
        encode_cstring(buf, &self.message_id, MESSAGE_ID_LEN, "message_id")?;
        self.source_addr.encode(buf, ADDR_LEN, "source_addr")?;
        self.optional.encode(buf)
    }
}

impl Decodable for QuerySm {
    fn decode(
        _header: &PduHeader,
        buf: &mut Cursor<&[u8]>,
        registry: &TagRegistry,
    ) -> Result<Self, CodecError> {
        Ok(Self {
            message_id: decode_cstring(buf, MESSAGE_ID_LEN, "message_id")?,
            source_addr: Address::decode(buf, ADDR_LEN, "source_addr")?,
            optional: decode_trailer(buf, registry)?,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuerySmResp {
    pub message_id: String,
    /// When the message reached its final state, empty if it has not
    pub final_date: String,
    pub message_state: MessageState,
    /// Network specific error code
    pub error_code: u8,
    pub optional: OptionalParams,
}

impl Default for QuerySmResp {
    fn default() -> Self {
        Self {
            message_id: String::new(),
            final_date: String::new(),
            message_state: MessageState::Unknown,
            error_code: 0,
            optional: OptionalParams::new(),
        }
    }
}

impl Encodable for QuerySmResp {
    fn encode<B: BufMut>(&self, buf: &mut B) -> Result<(), CodecError> {
        encode_cstring(buf, &self.message_id, MESSAGE_ID_LEN, "message_id")?;
        encode_cstring(buf, &self.final_date, TIME_LEN, "final_date")?;
        encode_u8(buf, self.message_state.into())?;
        encode_u8(buf, self.error_code)?;
        self.optional.encode(buf)
    }
}

impl Decodable for QuerySmResp {
    fn decode(
        header: &PduHeader,
        buf: &mut Cursor<&[u8]>,
        registry: &TagRegistry,
    ) -> Result<Self, CodecError> {
        if is_error_without_body(header, buf) {
            return Ok(Self::default());
        }
        Ok(Self {
            message_id: decode_cstring(buf, MESSAGE_ID_LEN, "message_id")?,
            final_date: decode_cstring(buf, TIME_LEN, "final_date")?,
            message_state: MessageState::from(decode_u8(buf)?),
            error_code: decode_u8(buf)?,
            optional: decode_trailer(buf, registry)?,
        })
    }
}
