// ABOUTME: bind_transmitter/receiver/transceiver request and response bodies, plus outbind
// ABOUTME: The three bind operations share one mandatory layout and differ only in command_id

use crate::codec::{
    CodecError, Decodable, Encodable, PduHeader, decode_cstring, decode_u8, encode_cstring,
    encode_u8,
};
use crate::datatypes::{
    InterfaceVersion, NumericPlanIndicator, OptionalParams, TagRegistry, TypeOfNumber,
    decode_trailer, is_error_without_body,
};
use bytes::BufMut;
use std::io::Cursor;

pub const SYSTEM_ID_LEN: usize = 16;
pub const PASSWORD_LEN: usize = 9;
pub const SYSTEM_TYPE_LEN: usize = 13;
pub const ADDRESS_RANGE_LEN: usize = 41;

/// Body of bind_transmitter, bind_receiver and bind_transceiver.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Bind {
    /// Identifies the ESME requesting to bind. Up to 15 characters.
    pub system_id: String,

    /// Password for authentication. Up to 8 characters; empty when the SMSC
    /// requires none.
    pub password: String,

    /// Categorizes the ESME, e.g. "VMS" or "OTA". Up to 12 characters.
    pub system_type: String,

    /// SMPP version supported by the ESME.
    pub interface_version: InterfaceVersion,

    /// TON of the ESME address(es) served via this session.
    pub addr_ton: TypeOfNumber,

    /// NPI of the ESME address(es) served via this session.
    pub addr_npi: NumericPlanIndicator,

    /// Range of SME addresses serviced by the ESME, usually a regular
    /// expression. Only meaningful for receivers and transceivers.
    pub address_range: String,

    pub optional: OptionalParams,
}

impl Bind {
    pub fn new(system_id: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            system_id: system_id.into(),
            password: password.into(),
            ..Self::default()
        }
    }
}

impl Encodable for Bind {
    fn encode<B: BufMut>(&self, buf: &mut B) -> Result<(), CodecError> {
        encode_cstring(buf, &self.system_id, SYSTEM_ID_LEN, "system_id")?;
        encode_cstring(buf, &self.password, PASSWORD_LEN, "password")?;
        encode_cstring(buf, &self.system_type, SYSTEM_TYPE_LEN, "system_type")?;
        encode_u8(buf, self.interface_version.into())?;
        encode_u8(buf, self.addr_ton.into())?;
        encode_u8(buf, self.addr_npi.into())?;
        encode_cstring(buf, &self.address_range, ADDRESS_RANGE_LEN, "address_range")?;
        self.optional.encode(buf)
    }
}

impl Decodable for Bind {
    fn decode(
        _header: &PduHeader,
        buf: &mut Cursor<&[u8]>,
        registry: &TagRegistry,
    ) -> Result<Self, CodecError> {
        Ok(Self {
            system_id: decode_cstring(buf, SYSTEM_ID_LEN, "system_id")?,
            password: decode_cstring(buf, PASSWORD_LEN, "password")?,
            system_type: decode_cstring(buf, SYSTEM_TYPE_LEN, "system_type")?,
            interface_version: InterfaceVersion::from(decode_u8(buf)?),
            addr_ton: TypeOfNumber::from(decode_u8(buf)?),
            addr_npi: NumericPlanIndicator::from(decode_u8(buf)?),
            address_range: decode_cstring(buf, ADDRESS_RANGE_LEN, "address_range")?,
            optional: decode_trailer(buf, registry)?,
        })
    }
}

/// Body of the three bind responses.
///
/// SMSCs commonly answer a rejected bind with a bare header; that decodes to
/// an empty `system_id`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BindResponse {
    /// SMSC identifier
    pub system_id: String,
    /// Carries `sc_interface_version` when the SMSC reports it
    pub optional: OptionalParams,
}

impl BindResponse {
    pub fn new(system_id: impl Into<String>) -> Self {
        Self {
            system_id: system_id.into(),
            optional: OptionalParams::new(),
        }
    }

    pub fn sc_interface_version(&self) -> Option<InterfaceVersion> {
        self.optional.sc_interface_version()
    }
}

impl Encodable for BindResponse {
    fn encode<B: BufMut>(&self, buf: &mut B) -> Result<(), CodecError> {
        encode_cstring(buf, &self.system_id, SYSTEM_ID_LEN, "system_id")?;
        self.optional.encode(buf)
    }
}

impl Decodable for BindResponse {
    fn decode(
        header: &PduHeader,
        buf: &mut Cursor<&[u8]>,
        registry: &TagRegistry,
    ) -> Result<Self, CodecError> {
        if is_error_without_body(header, buf) {
            return Ok(Self::default());
        }
        Ok(Self {
            system_id: decode_cstring(buf, SYSTEM_ID_LEN, "system_id")?,
            optional: decode_trailer(buf, registry)?,
        })
    }
}

/// Sent by an SMSC to ask the ESME to originate a bind_receiver.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Outbind {
    pub system_id: String,
    pub password: String,
    pub optional: OptionalParams,
}

impl Encodable for Outbind {
    fn encode<B: BufMut>(&self, buf: &mut B) -> Result<(), CodecError> {
        encode_cstring(buf, &self.system_id, SYSTEM_ID_LEN, "system_id")?;
        encode_cstring(buf, &self.password, PASSWORD_LEN, "password")?;
        self.optional.encode(buf)
    }
}

impl Decodable for Outbind {
    fn decode(
        _header: &PduHeader,
        buf: &mut Cursor<&[u8]>,
        registry: &TagRegistry,
    ) -> Result<Self, CodecError> {
        Ok(Self {
            system_id: decode_cstring(buf, SYSTEM_ID_LEN, "system_id")?,
            password: decode_cstring(buf, PASSWORD_LEN, "password")?,
            optional: decode_trailer(buf, registry)?,
        })
    }
}
