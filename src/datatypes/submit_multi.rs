// ABOUTME: submit_multi body with SME and distribution list destinations, and its response
// ABOUTME: The response lists each destination the SMSC could not accept with its error code

use crate::codec::{
    CodecError, Decodable, Encodable, PduHeader, decode_cstring, decode_octets, decode_u8,
    decode_u32, encode_cstring, encode_octets, encode_u8, encode_u32,
};
use crate::datatypes::{
    ADDR_LEN, Address, CommandStatus, DataCoding, EsmClass, MAX_SHORT_MESSAGE_LEN, MESSAGE_ID_LEN,
    OptionalParams, PriorityFlag, SERVICE_TYPE_LEN, TIME_LEN, TagRegistry, decode_trailer,
    is_error_without_body,
};
use bytes::{BufMut, Bytes};
use std::io::Cursor;

/// Maximum number of destinations in one submit_multi
pub const MAX_DESTINATIONS: usize = 254;
pub const DL_NAME_LEN: usize = 21;

const DEST_FLAG_SME: u8 = 0x01;
const DEST_FLAG_DISTRIBUTION_LIST: u8 = 0x02;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DestAddress {
    /// dest_flag 1
    Sme(Address),
    /// dest_flag 2, a list name provisioned on the SMSC
    DistributionList(String),
}

impl DestAddress {
    fn encode<B: BufMut>(&self, buf: &mut B) -> Result<(), CodecError> {
        match self {
            DestAddress::Sme(address) => {
                encode_u8(buf, DEST_FLAG_SME)?;
                address.encode(buf, ADDR_LEN, "destination_addr")
            }
            DestAddress::DistributionList(name) => {
                encode_u8(buf, DEST_FLAG_DISTRIBUTION_LIST)?;
                encode_cstring(buf, name, DL_NAME_LEN, "dl_name")
            }
        }
    }

    fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        match decode_u8(buf)? {
            DEST_FLAG_SME => Ok(DestAddress::Sme(Address::decode(
                buf,
                ADDR_LEN,
                "destination_addr",
            )?)),
            DEST_FLAG_DISTRIBUTION_LIST => Ok(DestAddress::DistributionList(decode_cstring(
                buf,
                DL_NAME_LEN,
                "dl_name",
            )?)),
            other => Err(CodecError::FieldValidation {
                field: "dest_flag",
                reason: format!("invalid destination flag {other}, expected 1 or 2"),
            }),
        }
    }
}

/// Submit one short message to several destinations.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubmitMulti {
    pub service_type: String,
    pub source_addr: Address,
    /// 1 to 254 destinations
    pub dest_addresses: Vec<DestAddress>,
    pub esm_class: EsmClass,
    pub protocol_id: u8,
    pub priority_flag: PriorityFlag,
    pub schedule_delivery_time: String,
    pub validity_period: String,
    pub registered_delivery: u8,
    pub replace_if_present_flag: u8,
    pub data_coding: DataCoding,
    pub sm_default_msg_id: u8,
    pub short_message: Bytes,
    pub optional: OptionalParams,
}

impl Encodable for SubmitMulti {
    fn encode<B: BufMut>(&self, buf: &mut B) -> Result<(), CodecError> {
        if self.dest_addresses.is_empty() || self.dest_addresses.len() > MAX_DESTINATIONS {
            return Err(CodecError::FieldValidation {
                field: "number_of_dests",
                reason: format!(
                    "{} destinations, allowed 1-{MAX_DESTINATIONS}",
                    self.dest_addresses.len()
                ),
            });
        }
        if self.short_message.len() > MAX_SHORT_MESSAGE_LEN {
            return Err(CodecError::FieldTooLong {
                field: "short_message",
                length: self.short_message.len(),
                max: MAX_SHORT_MESSAGE_LEN,
            });
        }

        encode_cstring(buf, &self.service_type, SERVICE_TYPE_LEN, "service_type")?;
        self.source_addr.encode(buf, ADDR_LEN, "source_addr")?;
        encode_u8(buf, self.dest_addresses.len() as u8)?;
        for dest in &self.dest_addresses {
            dest.encode(buf)?;
        }
        encode_u8(buf, self.esm_class.to_byte())?;
        encode_u8(buf, self.protocol_id)?;
        encode_u8(buf, self.priority_flag.into())?;
        encode_cstring(
            buf,
            &self.schedule_delivery_time,
            TIME_LEN,
            "schedule_delivery_time",
        )?;
        encode_cstring(buf, &self.validity_period, TIME_LEN, "validity_period")?;
        encode_u8(buf, self.registered_delivery)?;
        encode_u8(buf, self.replace_if_present_flag)?;
        encode_u8(buf, self.data_coding.to_byte())?;
        encode_u8(buf, self.sm_default_msg_id)?;
        encode_u8(buf, self.short_message.len() as u8)?;
        encode_octets(buf, &self.short_message)?;
        self.optional.encode(buf)
    }
}

impl Decodable for SubmitMulti {
    fn decode(
        _header: &PduHeader,
        buf: &mut Cursor<&[u8]>,
        registry: &TagRegistry,
    ) -> Result<Self, CodecError> {
        let service_type = decode_cstring(buf, SERVICE_TYPE_LEN, "service_type")?;
        let source_addr = Address::decode(buf, ADDR_LEN, "source_addr")?;
        let number_of_dests = decode_u8(buf)?;
        let dest_addresses = (0..number_of_dests)
            .map(|_| DestAddress::decode(buf))
            .collect::<Result<Vec<_>, _>>()?;
        let esm_class = EsmClass::from_byte(decode_u8(buf)?);
        let protocol_id = decode_u8(buf)?;
        let priority_flag = PriorityFlag::from(decode_u8(buf)?);
        let schedule_delivery_time = decode_cstring(buf, TIME_LEN, "schedule_delivery_time")?;
        let validity_period = decode_cstring(buf, TIME_LEN, "validity_period")?;
        let registered_delivery = decode_u8(buf)?;
        let replace_if_present_flag = decode_u8(buf)?;
        let data_coding = DataCoding::from_byte(decode_u8(buf)?);
        let sm_default_msg_id = decode_u8(buf)?;
        let sm_length = decode_u8(buf)? as usize;
        let short_message = decode_octets(buf, sm_length)?;

        Ok(Self {
            service_type,
            source_addr,
            dest_addresses,
            esm_class,
            protocol_id,
            priority_flag,
            schedule_delivery_time,
            validity_period,
            registered_delivery,
            replace_if_present_flag,
            data_coding,
            sm_default_msg_id,
            short_message,
            optional: decode_trailer(buf, registry)?,
        })
    }
}

/// A destination the SMSC rejected
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnsuccessSme {
    pub address: Address,
    pub error_status: CommandStatus,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubmitMultiResp {
    pub message_id: String,
    pub unsuccess_smes: Vec<UnsuccessSme>,
    pub optional: OptionalParams,
}

impl Encodable for SubmitMultiResp {
    fn encode<B: BufMut>(&self, buf: &mut B) -> Result<(), CodecError> {
        let count = u8::try_from(self.unsuccess_smes.len()).map_err(|_| {
            CodecError::FieldValidation {
                field: "no_unsuccess",
                reason: format!("{} entries exceed 255", self.unsuccess_smes.len()),
            }
        })?;
        encode_cstring(buf, &self.message_id, MESSAGE_ID_LEN, "message_id")?;
        encode_u8(buf, count)?;
        for sme in &self.unsuccess_smes {
            sme.address.encode(buf, ADDR_LEN, "destination_addr")?;
            encode_u32(buf, sme.error_status.into())?;
        }
        self.optional.encode(buf)
    }
}

impl Decodable for SubmitMultiResp {
    fn decode(
        header: &PduHeader,
        buf: &mut Cursor<&[u8]>,
        registry: &TagRegistry,
    ) -> Result<Self, CodecError> {
        if is_error_without_body(header, buf) {
            return Ok(Self::default());
        }
        let message_id = decode_cstring(buf, MESSAGE_ID_LEN, "message_id")?;
        let count = decode_u8(buf)?;
        let mut unsuccess_smes = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let address = Address::decode(buf, ADDR_LEN, "destination_addr")?;
            let error_status = CommandStatus::from(decode_u32(buf)?);
            unsuccess_smes.push(UnsuccessSme {
                address,
                error_status,
            });
        }
        Ok(Self {
            message_id,
            unsuccess_smes,
            optional: decode_trailer(buf, registry)?,
        })
    }
}
