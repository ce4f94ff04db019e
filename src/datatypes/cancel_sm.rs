// ABOUTME: cancel_sm body for withdrawing one or more pending messages from the SMSC queue
// ABOUTME: cancel_sm_resp is header-only

use crate::codec::{CodecError, Decodable, Encodable, PduHeader, decode_cstring, encode_cstring};
use crate::datatypes::{
    ADDR_LEN, Address, MESSAGE_ID_LEN, OptionalParams, SERVICE_TYPE_LEN, TagRegistry,
    decode_trailer,
};
use bytes::BufMut;
use std::io::Cursor;

/// Cancel a previously submitted message, or with an empty `message_id`
/// every pending message matching source, destination and service type.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CancelSm {
    pub service_type: String,
    pub message_id: String,
    pub source_addr: Address,
    pub dest_addr: Address,
    pub optional: OptionalParams,
}

impl Encodable for CancelSm {
    fn encode<B: BufMut>(&self, buf: &mut B) -> Result<(), CodecError> {
        encode_cstring(buf, &self.service_type, SERVICE_TYPE_LEN, "service_type")?;
        encode_cstring(buf, &self.message_id, MESSAGE_ID_LEN, "message_id")?;
        self.source_addr.encode(buf, ADDR_LEN, "source_addr")?;
        self.dest_addr.encode(buf, ADDR_LEN, "destination_addr")?;
        self.optional.encode(buf)
    }
}

impl Decodable for CancelSm {
    fn decode(
        _header: &PduHeader,
        buf: &mut Cursor<&[u8]>,
        registry: &TagRegistry,
    ) -> Result<Self, CodecError> {
        Ok(Self {
            service_type: decode_cstring(buf, SERVICE_TYPE_LEN, "service_type")?,
            message_id: decode_cstring(buf, MESSAGE_ID_LEN, "message_id")?,
            source_addr: Address::decode(buf, ADDR_LEN, "source_addr")?,
            dest_addr: Address::decode(buf, ADDR_LEN, "destination_addr")?,
            optional: decode_trailer(buf, registry)?,
        })
    }
}
