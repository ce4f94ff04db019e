// ABOUTME: alert_notification body, sent by the SMSC when a mobile subscriber becomes available
// ABOUTME: There is no response PDU for this operation

use crate::codec::{CodecError, Decodable, Encodable, PduHeader};
use crate::datatypes::{Address, EXTENDED_ADDR_LEN, OptionalParams, TagRegistry, decode_trailer, tags};
use bytes::BufMut;
use std::io::Cursor;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AlertNotification {
    /// The mobile subscriber that became available
    pub source_addr: Address,
    /// The ESME that asked to be alerted (set_dpf in an earlier submit)
    pub esme_addr: Address,
    /// May carry `ms_availability_status`
    pub optional: OptionalParams,
}

impl AlertNotification {
    /// 0 available, 1 denied, 2 unavailable
    pub fn ms_availability_status(&self) -> Option<u8> {
        self.optional
            .get(tags::MS_AVAILABILITY_STATUS)
            .and_then(|tlv| tlv.as_u8())
    }
}

impl Encodable for AlertNotification {
    fn encode<B: BufMut>(&self, buf: &mut B) -> Result<(), CodecError> {
        self.source_addr
            .encode(buf, EXTENDED_ADDR_LEN, "source_addr")?;
        self.esme_addr.encode(buf, EXTENDED_ADDR_LEN, "esme_addr")?;
        self.optional.encode(buf)
    }
}

impl Decodable for AlertNotification {
    fn decode(
        _header: &PduHeader,
        buf: &mut Cursor<&[u8]>,
        registry: &TagRegistry,
    ) -> Result<Self, CodecError> {
        Ok(Self {
            source_addr: Address::decode(buf, EXTENDED_ADDR_LEN, "source_addr")?,
            esme_addr: Address::decode(buf, EXTENDED_ADDR_LEN, "esme_addr")?,
            optional: decode_trailer(buf, registry)?,
        })
    }
}
