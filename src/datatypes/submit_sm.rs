// ABOUTME: submit_sm body (shared with deliver_sm) and the message_id response bodies
// ABOUTME: short_message is length-prefixed raw octets; text encoding lives in crate::encoding

use crate::codec::{
    CodecError, Decodable, Encodable, PduHeader, decode_cstring, decode_octets, decode_u8,
    encode_cstring, encode_octets, encode_u8,
};
use crate::datatypes::{
    ADDR_LEN, Address, DataCoding, EsmClass, OptionalParams, PriorityFlag, TagRegistry,
    decode_trailer, is_error_without_body,
};
use bytes::{BufMut, Bytes};
use std::io::Cursor;

pub const SERVICE_TYPE_LEN: usize = 6;
pub const TIME_LEN: usize = 17;
pub const MESSAGE_ID_LEN: usize = 65;

/// Largest `short_message`; longer content goes in `message_payload`
pub const MAX_SHORT_MESSAGE_LEN: usize = 254;

/// registered_delivery bits 1-0: SMSC delivery receipt requested
pub const REGISTERED_DELIVERY_RECEIPT: u8 = 0x01;

/// This operation is used by an ESME to submit a short message to the SMSC
/// for onward transmission to a specified short message entity (SME). The
/// same mandatory layout carries deliver_sm from the SMSC to the ESME.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubmitSm {
    /// SMS application service, e.g. "CMT" or "WAP". Empty for the default.
    /// Up to 5 characters.
    pub service_type: String,

    /// Address of the SME which originated this message.
    pub source_addr: Address,

    /// Destination address of this short message.
    pub dest_addr: Address,

    /// Messaging mode, message type and UDHI/reply-path features.
    pub esm_class: EsmClass,

    /// Network specific protocol identifier.
    pub protocol_id: u8,

    pub priority_flag: PriorityFlag,

    /// Absolute or relative time in `YYMMDDhhmmsstnnp` form; empty for
    /// immediate delivery.
    pub schedule_delivery_time: String,

    /// Same format as `schedule_delivery_time`; empty for the SMSC default.
    pub validity_period: String,

    /// Delivery receipt, SME acknowledgement and intermediate notification
    /// request bits.
    pub registered_delivery: u8,

    pub replace_if_present_flag: u8,

    pub data_coding: DataCoding,

    /// Index of a canned message stored on the SMSC, 0 when unused.
    pub sm_default_msg_id: u8,

    /// Up to 254 octets of user data, encoded per `data_coding`. When the
    /// UDHI bit of `esm_class` is set, begins with a user data header.
    pub short_message: Bytes,

    pub optional: OptionalParams,
}

impl SubmitSm {
    pub fn new(source_addr: Address, dest_addr: Address, short_message: impl Into<Bytes>) -> Self {
        Self {
            source_addr,
            dest_addr,
            short_message: short_message.into(),
            ..Self::default()
        }
    }

    pub fn requests_delivery_receipt(&self) -> bool {
        self.registered_delivery & 0x03 != 0
    }

    /// User data, whether it travels in `short_message` or `message_payload`
    pub fn payload(&self) -> &[u8] {
        match self.optional.message_payload() {
            Some(payload) if self.short_message.is_empty() => payload,
            _ => &self.short_message,
        }
    }
}

impl Encodable for SubmitSm {
    fn encode<B: BufMut>(&self, buf: &mut B) -> Result<(), CodecError> {
        if self.short_message.len() > MAX_SHORT_MESSAGE_LEN {
            return Err(CodecError::FieldTooLong {
                field: "short_message",
                length: self.short_message.len(),
                max: MAX_SHORT_MESSAGE_LEN,
            });
        }

        encode_cstring(buf, &self.service_type, SERVICE_TYPE_LEN, "service_type")?;
        self.source_addr.encode(buf, ADDR_LEN, "source_addr")?;
        self.dest_addr.encode(buf, ADDR_LEN, "destination_addr")?;
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
        // sm_length fits: checked against MAX_SHORT_MESSAGE_LEN above
        encode_u8(buf, self.short_message.len() as u8)?;
        encode_octets(buf, &self.short_message)?;
        self.optional.encode(buf)
    }
}

impl Decodable for SubmitSm {
    fn decode(
        _header: &PduHeader,
        buf: &mut Cursor<&[u8]>,
        registry: &TagRegistry,
    ) -> Result<Self, CodecError> {
        let service_type = decode_cstring(buf, SERVICE_TYPE_LEN, "service_type")?;
        let source_addr = Address::decode(buf, ADDR_LEN, "source_addr")?;
        let dest_addr = Address::decode(buf, ADDR_LEN, "destination_addr")?;
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
            dest_addr,
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

/// Body of submit_sm_resp, deliver_sm_resp and data_sm_resp.
///
/// deliver_sm_resp leaves `message_id` empty. An error response may arrive
/// with no body at all, which decodes to the default value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MessageIdResponse {
    /// SMSC assigned identifier of the submitted message
    pub message_id: String,
    /// data_sm_resp may carry delivery_failure_reason, network_error_code,
    /// additional_status_info_text and dpf_result
    pub optional: OptionalParams,
}

impl MessageIdResponse {
    pub fn new(message_id: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            optional: OptionalParams::new(),
        }
    }
}

impl Encodable for MessageIdResponse {
    fn encode<B: BufMut>(&self, buf: &mut B) -> Result<(), CodecError> {
        encode_cstring(buf, &self.message_id, MESSAGE_ID_LEN, "message_id")?;
        self.optional.encode(buf)
    }
}

impl Decodable for MessageIdResponse {
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
            optional: decode_trailer(buf, registry)?,
        })
    }
}
