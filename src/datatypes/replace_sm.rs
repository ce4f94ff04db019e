// ABOUTME: replace_sm body for replacing the content of a message still queued at the SMSC
// ABOUTME: replace_sm_resp is header-only

use crate::codec::{
    CodecError, Decodable, Encodable, PduHeader, decode_cstring, decode_octets, decode_u8,
    encode_cstring, encode_octets, encode_u8,
};
use crate::datatypes::{
    ADDR_LEN, Address, MAX_SHORT_MESSAGE_LEN, MESSAGE_ID_LEN, OptionalParams, TIME_LEN,
    TagRegistry, decode_trailer,
};
use bytes::{BufMut, Bytes};
use std::io::Cursor;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReplaceSm {
    pub message_id: String,
    /// Must match the source address of the original submit_sm
    pub source_addr: Address,
    pub schedule_delivery_time: String,
    pub validity_period: String,
    pub registered_delivery: u8,
    pub sm_default_msg_id: u8,
    pub short_message: Bytes,
    pub optional: OptionalParams,
}

impl Encodable for ReplaceSm {
    fn encode<B: BufMut>(&self, buf: &mut B) -> Result<(), CodecError> {
        if self.short_message.len() > MAX_SHORT_MESSAGE_LEN {
            return Err(CodecError::FieldTooLong {
                field: "short_message",
                length: self.short_message.len(),
                max: MAX_SHORT_MESSAGE_LEN,
            });
        }
        encode_cstring(buf, &self.message_id, MESSAGE_ID_LEN, "message_id")?;
        self.source_addr.encode(buf, ADDR_LEN, "source_addr")?;
        encode_cstring(
            buf,
            &self.schedule_delivery_time,
            TIME_LEN,
            "schedule_delivery_time",
        )?;
        encode_cstring(buf, &self.validity_period, TIME_LEN, "validity_period")?;
        encode_u8(buf, self.registered_delivery)?;
        encode_u8(buf, self.sm_default_msg_id)?;
        encode_u8(buf, self.short_message.len() as u8)?;
        encode_octets(buf, &self.short_message)?;
        self.optional.encode(buf)
    }
}

impl Decodable for ReplaceSm {
    fn decode(
        _header: &PduHeader,
        buf: &mut Cursor<&[u8]>,
        registry: &TagRegistry,
    ) -> Result<Self, CodecError> {
        let message_id = decode_cstring(buf, MESSAGE_ID_LEN, "message_id")?;
        let source_addr = Address::decode(buf, ADDR_LEN, "source_addr")?;
        let schedule_delivery_time = decode_cstring(buf, TIME_LEN, "schedule_delivery_time")?;
        let validity_period = decode_cstring(buf, TIME_LEN, "validity_period")?;
        let registered_delivery = decode_u8(buf)?;
        let sm_default_msg_id = decode_u8(buf)?;
        let sm_length = decode_u8(buf)? as usize;
        Ok(Self {
            message_id,
            source_addr,
            schedule_delivery_time,
            validity_period,
            registered_delivery,
            sm_default_msg_id,
            short_message: decode_octets(buf, sm_length)?,
            optional: decode_trailer(buf, registry)?,
        })
    }
}
