// ABOUTME: data_sm body, the TLV-centric alternative to submit_sm/deliver_sm
// ABOUTME: User data travels in message_payload; the response reuses MessageIdResponse

use crate::codec::{
    CodecError, Decodable, Encodable, PduHeader, decode_cstring, decode_u8, encode_cstring,
    encode_u8,
};
use crate::datatypes::{
    Address, DataCoding, EXTENDED_ADDR_LEN, EsmClass, OptionalParams, SERVICE_TYPE_LEN,
    TagRegistry, decode_trailer,
};
use bytes::BufMut;
use std::io::Cursor;

/// Transfers data between an SMSC and an ESME in either direction.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DataSm {
    pub service_type: String,
    /// Up to 64 characters
    pub source_addr: Address,
    /// Up to 64 characters
    pub dest_addr: Address,
    pub esm_class: EsmClass,
    pub registered_delivery: u8,
    pub data_coding: DataCoding,
    pub optional: OptionalParams,
}

impl DataSm {
    pub fn payload(&self) -> &[u8] {
        self.optional.message_payload().unwrap_or_default()
    }
}

impl Encodable for DataSm {
    fn encode<B: BufMut>(&self, buf: &mut B) -> Result<(), CodecError> {
        encode_cstring(buf, &self.service_type, SERVICE_TYPE_LEN, "service_type")?;
        self.source_addr
            .encode(buf, EXTENDED_ADDR_LEN, "source_addr")?;
        self.dest_addr
            .encode(buf, EXTENDED_ADDR_LEN, "destination_addr")?;
        encode_u8(buf, self.esm_class.to_byte())?;
        encode_u8(buf, self.registered_delivery)?;
        encode_u8(buf, self.data_coding.to_byte())?;
        self.optional.encode(buf)
    }
}

impl Decodable for DataSm {
    fn decode(
        _header: &PduHeader,
        buf: &mut Cursor<&[u8]>,
        registry: &TagRegistry,
    ) -> Result<Self, CodecError> {
        Ok(Self {
            service_type: decode_cstring(buf, SERVICE_TYPE_LEN, "service_type")?,
            source_addr: Address::decode(buf, EXTENDED_ADDR_LEN, "source_addr")?,
            dest_addr: Address::decode(buf, EXTENDED_ADDR_LEN, "destination_addr")?,
            esm_class: EsmClass::from_byte(decode_u8(buf)?),
            registered_delivery: decode_u8(buf)?,
            data_coding: DataCoding::from_byte(decode_u8(buf)?),
            optional: decode_trailer(buf, registry)?,
        })
    }
}
