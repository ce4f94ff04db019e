// ABOUTME: SMPP optional parameter (TLV) trailer codec, tag metadata registry and typed accessors
// ABOUTME: Unknown tags are kept opaque and re-encoded verbatim

use crate::codec::{CodecError, encode_octets, encode_u16};
use crate::datatypes::{InterfaceVersion, MessageState};
use bytes::{Buf, BufMut, Bytes};
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::debug;

/// Standard SMPP v3.4 optional parameter tags
pub mod tags {
    pub const DEST_ADDR_SUBUNIT: u16 = 0x0005;
    pub const DEST_NETWORK_TYPE: u16 = 0x0006;
    pub const DEST_BEARER_TYPE: u16 = 0x0007;
    pub const DEST_TELEMATICS_ID: u16 = 0x0008;
    pub const SOURCE_ADDR_SUBUNIT: u16 = 0x000D;
    pub const SOURCE_NETWORK_TYPE: u16 = 0x000E;
    pub const SOURCE_BEARER_TYPE: u16 = 0x000F;
    pub const SOURCE_TELEMATICS_ID: u16 = 0x0010;
    pub const QOS_TIME_TO_LIVE: u16 = 0x0017;
    pub const PAYLOAD_TYPE: u16 = 0x0019;
    pub const ADDITIONAL_STATUS_INFO_TEXT: u16 = 0x001D;
    pub const RECEIPTED_MESSAGE_ID: u16 = 0x001E;
    pub const MS_MSG_WAIT_FACILITIES: u16 = 0x0030;
    pub const PRIVACY_INDICATOR: u16 = 0x0201;
    pub const SOURCE_SUBADDRESS: u16 = 0x0202;
    pub const DEST_SUBADDRESS: u16 = 0x0203;
    pub const USER_MESSAGE_REFERENCE: u16 = 0x0204;
    pub const USER_RESPONSE_CODE: u16 = 0x0205;
    pub const SOURCE_PORT: u16 = 0x020A;
    pub const DESTINATION_PORT: u16 = 0x020B;
    pub const SAR_MSG_REF_NUM: u16 = 0x020C;
    pub const LANGUAGE_INDICATOR: u16 = 0x020D;
    pub const SAR_TOTAL_SEGMENTS: u16 = 0x020E;
    pub const SAR_SEGMENT_SEQNUM: u16 = 0x020F;
    pub const SC_INTERFACE_VERSION: u16 = 0x0210;
    pub const CALLBACK_NUM_PRES_IND: u16 = 0x0302;
    pub const CALLBACK_NUM_ATAG: u16 = 0x0303;
    pub const NUMBER_OF_MESSAGES: u16 = 0x0304;
    pub const CALLBACK_NUM: u16 = 0x0381;
    pub const DPF_RESULT: u16 = 0x0420;
    pub const SET_DPF: u16 = 0x0421;
    pub const MS_AVAILABILITY_STATUS: u16 = 0x0422;
    pub const NETWORK_ERROR_CODE: u16 = 0x0423;
    pub const MESSAGE_PAYLOAD: u16 = 0x0424;
    pub const DELIVERY_FAILURE_REASON: u16 = 0x0425;
    pub const MORE_MESSAGES_TO_SEND: u16 = 0x0426;
    pub const MESSAGE_STATE: u16 = 0x0427;
    pub const USSD_SERVICE_OP: u16 = 0x0501;
    pub const DISPLAY_TIME: u16 = 0x1201;
    pub const SMS_SIGNAL: u16 = 0x1203;
    pub const MS_VALIDITY: u16 = 0x1204;
    pub const ALERT_ON_MESSAGE_DELIVERY: u16 = 0x130C;
    pub const ITS_REPLY_TYPE: u16 = 0x1380;
    pub const ITS_SESSION_INFO: u16 = 0x1383;
}

/// Size of the tag and length fields that precede every value
pub const TLV_HEADER_SIZE: usize = 4;

/// One optional parameter. The wire length is always `value.len()`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tlv {
    pub tag: u16,
    pub value: Bytes,
}

impl Tlv {
    pub fn new(tag: u16, value: impl Into<Bytes>) -> Self {
        Self {
            tag,
            value: value.into(),
        }
    }

    pub fn from_u8(tag: u16, value: u8) -> Self {
        Self::new(tag, vec![value])
    }

    pub fn from_u16(tag: u16, value: u16) -> Self {
        Self::new(tag, value.to_be_bytes().to_vec())
    }

    pub fn from_u32(tag: u16, value: u32) -> Self {
        Self::new(tag, value.to_be_bytes().to_vec())
    }

    /// Value as a NUL-terminated C-octet-string
    pub fn from_cstring(tag: u16, value: &str) -> Self {
        let mut bytes = Vec::with_capacity(value.len() + 1);
        bytes.extend_from_slice(value.as_bytes());
        bytes.push(0);
        Self::new(tag, bytes)
    }

    pub fn encoded_len(&self) -> usize {
        TLV_HEADER_SIZE + self.value.len()
    }

    pub fn as_u8(&self) -> Option<u8> {
        match self.value.as_ref() {
            [value] => Some(*value),
            _ => None,
        }
    }

    pub fn as_u16(&self) -> Option<u16> {
        <[u8; 2]>::try_from(self.value.as_ref())
            .ok()
            .map(u16::from_be_bytes)
    }

    pub fn as_u32(&self) -> Option<u32> {
        <[u8; 4]>::try_from(self.value.as_ref())
            .ok()
            .map(u32::from_be_bytes)
    }

    /// Value as text, without its NUL terminator
    pub fn as_str(&self) -> Option<&str> {
        let bytes = self.value.as_ref();
        let bytes = bytes.strip_suffix(&[0]).unwrap_or(bytes);
        std::str::from_utf8(bytes).ok()
    }
}

/// Write one optional parameter: tag, u16 length, value.
pub fn encode_param<B: BufMut>(buf: &mut B, tag: u16, value: &[u8]) -> Result<(), CodecError> {
    let length = u16::try_from(value.len()).map_err(|_| CodecError::FieldTooLong {
        field: "optional parameter value",
        length: value.len(),
        max: u16::MAX as usize,
    })?;
    encode_u16(buf, tag)?;
    encode_u16(buf, length)?;
    encode_octets(buf, value)
}

/// Lazily decode a TLV trailer. The iterator consumes `bytes` exactly; a
/// trailing partial header or value yields one `MalformedOptionalParameter`
/// and ends iteration.
pub fn decode_params(bytes: Bytes) -> TlvIter {
    TlvIter {
        remaining: bytes,
        failed: false,
    }
}

#[derive(Debug)]
pub struct TlvIter {
    remaining: Bytes,
    failed: bool,
}

impl Iterator for TlvIter {
    type Item = Result<Tlv, CodecError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.remaining.is_empty() {
            return None;
        }

        if self.remaining.len() < TLV_HEADER_SIZE {
            self.failed = true;
            let tag = match self.remaining.as_ref() {
                [hi, lo, ..] => u16::from_be_bytes([*hi, *lo]),
                _ => 0,
            };
            return Some(Err(CodecError::MalformedOptionalParameter {
                tag,
                reason: format!("{} trailing bytes cannot hold a TLV header", self.remaining.len()),
            }));
        }

        let tag = self.remaining.get_u16();
        let length = self.remaining.get_u16() as usize;

        if self.remaining.len() < length {
            self.failed = true;
            return Some(Err(CodecError::MalformedOptionalParameter {
                tag,
                reason: format!(
                    "length {length} exceeds the {} bytes left in the PDU",
                    self.remaining.len()
                ),
            }));
        }

        let value = self.remaining.split_to(length);
        Some(Ok(Tlv { tag, value }))
    }
}

/// Shape a known tag's value must have
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TlvKind {
    Empty,
    U8,
    U16,
    U32,
    /// NUL-terminated, `max` includes the terminator
    CString { max: usize },
    Octets { min: usize, max: usize },
}

impl TlvKind {
    fn validate(&self, value: &[u8]) -> Result<(), String> {
        let len = value.len();
        let exact = |expected: usize| {
            if len == expected {
                Ok(())
            } else {
                Err(format!("expected {expected} bytes, got {len}"))
            }
        };
        match *self {
            TlvKind::Empty => exact(0),
            TlvKind::U8 => exact(1),
            TlvKind::U16 => exact(2),
            TlvKind::U32 => exact(4),
            TlvKind::CString { max } => {
                if len == 0 || len > max {
                    return Err(format!("C-string of {len} bytes, allowed 1-{max}"));
                }
                match value.iter().position(|&b| b == 0) {
                    Some(end) if end == len - 1 => Ok(()),
                    Some(_) => Err("embedded NUL before the end of the value".to_string()),
                    None => Err("missing NUL terminator".to_string()),
                }
            }
            TlvKind::Octets { min, max } => {
                if (min..=max).contains(&len) {
                    Ok(())
                } else {
                    Err(format!("{len} bytes, allowed {min}-{max}"))
                }
            }
        }
    }
}

/// Metadata for one optional parameter tag
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TagSpec {
    pub tag: u16,
    pub name: &'static str,
    pub kind: TlvKind,
}

const fn spec(tag: u16, name: &'static str, kind: TlvKind) -> TagSpec {
    TagSpec { tag, name, kind }
}

const STANDARD_TAGS: &[TagSpec] = &[
    spec(tags::DEST_ADDR_SUBUNIT, "dest_addr_subunit", TlvKind::U8),
    spec(tags::DEST_NETWORK_TYPE, "dest_network_type", TlvKind::U8),
    spec(tags::DEST_BEARER_TYPE, "dest_bearer_type", TlvKind::U8),
    spec(tags::DEST_TELEMATICS_ID, "dest_telematics_id", TlvKind::U16),
    spec(tags::SOURCE_ADDR_SUBUNIT, "source_addr_subunit", TlvKind::U8),
    spec(tags::SOURCE_NETWORK_TYPE, "source_network_type", TlvKind::U8),
    spec(tags::SOURCE_BEARER_TYPE, "source_bearer_type", TlvKind::U8),
    spec(tags::SOURCE_TELEMATICS_ID, "source_telematics_id", TlvKind::U8),
    spec(tags::QOS_TIME_TO_LIVE, "qos_time_to_live", TlvKind::U32),
    spec(tags::PAYLOAD_TYPE, "payload_type", TlvKind::U8),
    spec(
        tags::ADDITIONAL_STATUS_INFO_TEXT,
        "additional_status_info_text",
        TlvKind::CString { max: 256 },
    ),
    spec(
        tags::RECEIPTED_MESSAGE_ID,
        "receipted_message_id",
        TlvKind::CString { max: 65 },
    ),
    spec(tags::MS_MSG_WAIT_FACILITIES, "ms_msg_wait_facilities", TlvKind::U8),
    spec(tags::PRIVACY_INDICATOR, "privacy_indicator", TlvKind::U8),
    spec(
        tags::SOURCE_SUBADDRESS,
        "source_subaddress",
        TlvKind::Octets { min: 2, max: 23 },
    ),
    spec(
        tags::DEST_SUBADDRESS,
        "dest_subaddress",
        TlvKind::Octets { min: 2, max: 23 },
    ),
    spec(tags::USER_MESSAGE_REFERENCE, "user_message_reference", TlvKind::U16),
    spec(tags::USER_RESPONSE_CODE, "user_response_code", TlvKind::U8),
    spec(tags::SOURCE_PORT, "source_port", TlvKind::U16),
    spec(tags::DESTINATION_PORT, "destination_port", TlvKind::U16),
    spec(tags::SAR_MSG_REF_NUM, "sar_msg_ref_num", TlvKind::U16),
    spec(tags::LANGUAGE_INDICATOR, "language_indicator", TlvKind::U8),
    spec(tags::SAR_TOTAL_SEGMENTS, "sar_total_segments", TlvKind::U8),
    spec(tags::SAR_SEGMENT_SEQNUM, "sar_segment_seqnum", TlvKind::U8),
    spec(tags::SC_INTERFACE_VERSION, "sc_interface_version", TlvKind::U8),
    spec(tags::CALLBACK_NUM_PRES_IND, "callback_num_pres_ind", TlvKind::U8),
    spec(
        tags::CALLBACK_NUM_ATAG,
        "callback_num_atag",
        TlvKind::Octets { min: 0, max: 65 },
    ),
    spec(tags::NUMBER_OF_MESSAGES, "number_of_messages", TlvKind::U8),
    spec(
        tags::CALLBACK_NUM,
        "callback_num",
        TlvKind::Octets { min: 4, max: 19 },
    ),
    spec(tags::DPF_RESULT, "dpf_result", TlvKind::U8),
    spec(tags::SET_DPF, "set_dpf", TlvKind::U8),
    spec(tags::MS_AVAILABILITY_STATUS, "ms_availability_status", TlvKind::U8),
    spec(
        tags::NETWORK_ERROR_CODE,
        "network_error_code",
        TlvKind::Octets { min: 3, max: 3 },
    ),
    spec(
        tags::MESSAGE_PAYLOAD,
        "message_payload",
        TlvKind::Octets {
            min: 0,
            max: u16::MAX as usize,
        },
    ),
    spec(tags::DELIVERY_FAILURE_REASON, "delivery_failure_reason", TlvKind::U8),
    spec(tags::MORE_MESSAGES_TO_SEND, "more_messages_to_send", TlvKind::U8),
    spec(tags::MESSAGE_STATE, "message_state", TlvKind::U8),
    spec(tags::USSD_SERVICE_OP, "ussd_service_op", TlvKind::U8),
    spec(tags::DISPLAY_TIME, "display_time", TlvKind::U8),
    spec(tags::SMS_SIGNAL, "sms_signal", TlvKind::U16),
    spec(tags::MS_VALIDITY, "ms_validity", TlvKind::U8),
    spec(
        tags::ALERT_ON_MESSAGE_DELIVERY,
        "alert_on_message_delivery",
        TlvKind::Empty,
    ),
    spec(tags::ITS_REPLY_TYPE, "its_reply_type", TlvKind::U8),
    spec(tags::ITS_SESSION_INFO, "its_session_info", TlvKind::U16),
];

/// Immutable table of known optional parameter tags.
///
/// Known tags are checked against their [`TlvKind`] on access; unregistered
/// tags pass through untouched.
#[derive(Clone, Debug)]
pub struct TagRegistry {
    specs: HashMap<u16, TagSpec>,
}

impl TagRegistry {
    /// The SMPP v3.4 table, built once per process
    pub fn standard() -> &'static TagRegistry {
        static STANDARD: OnceLock<TagRegistry> = OnceLock::new();
        STANDARD.get_or_init(|| TagRegistry {
            specs: STANDARD_TAGS.iter().map(|spec| (spec.tag, *spec)).collect(),
        })
    }

    /// A copy of the standard table extended with SMSC vendor tags.
    /// A vendor spec replaces a standard one with the same tag.
    pub fn with_vendor_tags(vendor: impl IntoIterator<Item = TagSpec>) -> TagRegistry {
        let mut registry = Self::standard().clone();
        registry
            .specs
            .extend(vendor.into_iter().map(|spec| (spec.tag, spec)));
        registry
    }

    pub fn get(&self, tag: u16) -> Option<&TagSpec> {
        self.specs.get(&tag)
    }

    pub fn name(&self, tag: u16) -> Option<&'static str> {
        self.get(tag).map(|spec| spec.name)
    }

    pub fn validate(&self, tlv: &Tlv) -> Result<(), CodecError> {
        match self.get(tlv.tag) {
            Some(spec) => spec.kind.validate(&tlv.value).map_err(|reason| {
                CodecError::MalformedOptionalParameter {
                    tag: tlv.tag,
                    reason: format!("{}: {reason}", spec.name),
                }
            }),
            None => Ok(()),
        }
    }
}

impl Default for TagRegistry {
    fn default() -> Self {
        Self::standard().clone()
    }
}

/// `network_error_code`: network type followed by a 16-bit error code
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NetworkErrorCode {
    /// 1 ANSI-136, 2 IS-95, 3 GSM, 4 reserved
    pub network_type: u8,
    pub error_code: u16,
}

/// SAR (segmentation and reassembly) parameters of one message part
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SarInfo {
    pub msg_ref_num: u16,
    pub total_segments: u8,
    pub segment_seqnum: u8,
}

/// Ordered optional parameter trailer of a PDU.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OptionalParams {
    params: Vec<Tlv>,
}

impl OptionalParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a complete trailer.
    ///
    /// Only a trailer that does not split into whole TLVs fails. A known tag
    /// whose value breaks its [`TlvKind`] is kept as raw bytes; [`validate`]
    /// and [`get_valid`] report it.
    ///
    /// [`validate`]: OptionalParams::validate
    /// [`get_valid`]: OptionalParams::get_valid
    pub fn decode(bytes: Bytes, registry: &TagRegistry) -> Result<Self, CodecError> {
        let mut params = Vec::new();
        for tlv in decode_params(bytes) {
            let tlv = tlv?;
            if let Err(error) = registry.validate(&tlv) {
                debug!(%error, "Keeping malformed optional parameter as raw bytes");
            }
            params.push(tlv);
        }
        Ok(Self { params })
    }

    /// Check every parameter against `registry`; the first violation wins
    pub fn validate(&self, registry: &TagRegistry) -> Result<(), CodecError> {
        self.params.iter().try_for_each(|tlv| registry.validate(tlv))
    }

    /// The parameter for `tag`, failing if its value breaks the registered kind
    pub fn get_valid(
        &self,
        tag: u16,
        registry: &TagRegistry,
    ) -> Result<Option<&Tlv>, CodecError> {
        match self.get(tag) {
            Some(tlv) => registry.validate(tlv).map(|()| Some(tlv)),
            None => Ok(None),
        }
    }

    pub fn encode<B: BufMut>(&self, buf: &mut B) -> Result<(), CodecError> {
        for tlv in &self.params {
            encode_param(buf, tlv.tag, &tlv.value)?;
        }
        Ok(())
    }

    pub fn encoded_len(&self) -> usize {
        self.params.iter().map(Tlv::encoded_len).sum()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tlv> {
        self.params.iter()
    }

    pub fn get(&self, tag: u16) -> Option<&Tlv> {
        self.params.iter().find(|tlv| tlv.tag == tag)
    }

    pub fn contains(&self, tag: u16) -> bool {
        self.get(tag).is_some()
    }

    /// Insert, replacing an existing parameter with the same tag in place
    pub fn set(&mut self, tlv: Tlv) {
        match self.params.iter_mut().find(|existing| existing.tag == tlv.tag) {
            Some(existing) => *existing = tlv,
            None => self.params.push(tlv),
        }
    }

    /// Append without checking for duplicates
    pub fn push(&mut self, tlv: Tlv) {
        self.params.push(tlv);
    }

    pub fn remove(&mut self, tag: u16) -> Option<Tlv> {
        let index = self.params.iter().position(|tlv| tlv.tag == tag)?;
        Some(self.params.remove(index))
    }

    /// Accepts a value with or without its NUL terminator
    pub fn receipted_message_id(&self) -> Option<&str> {
        self.get(tags::RECEIPTED_MESSAGE_ID).and_then(Tlv::as_str)
    }

    pub fn message_state(&self) -> Option<MessageState> {
        self.get(tags::MESSAGE_STATE)
            .and_then(Tlv::as_u8)
            .map(MessageState::from)
    }

    pub fn network_error_code(&self) -> Option<NetworkErrorCode> {
        match self.get(tags::NETWORK_ERROR_CODE)?.value.as_ref() {
            [network_type, hi, lo] => Some(NetworkErrorCode {
                network_type: *network_type,
                error_code: u16::from_be_bytes([*hi, *lo]),
            }),
            _ => None,
        }
    }

    pub fn message_payload(&self) -> Option<&[u8]> {
        self.get(tags::MESSAGE_PAYLOAD).map(|tlv| tlv.value.as_ref())
    }

    pub fn sc_interface_version(&self) -> Option<InterfaceVersion> {
        self.get(tags::SC_INTERFACE_VERSION)
            .and_then(Tlv::as_u8)
            .map(InterfaceVersion::from)
    }

    pub fn user_message_reference(&self) -> Option<u16> {
        self.get(tags::USER_MESSAGE_REFERENCE).and_then(Tlv::as_u16)
    }

    /// All three SAR parameters, or none. A partial set is malformed.
    pub fn sar(&self) -> Result<Option<SarInfo>, CodecError> {
        let reference = self.get(tags::SAR_MSG_REF_NUM).and_then(Tlv::as_u16);
        let total = self.get(tags::SAR_TOTAL_SEGMENTS).and_then(Tlv::as_u8);
        let seqnum = self.get(tags::SAR_SEGMENT_SEQNUM).and_then(Tlv::as_u8);

        match (reference, total, seqnum) {
            (Some(msg_ref_num), Some(total_segments), Some(segment_seqnum)) => Ok(Some(SarInfo {
                msg_ref_num,
                total_segments,
                segment_seqnum,
            })),
            (None, None, None)
                if !self.contains(tags::SAR_MSG_REF_NUM)
                    && !self.contains(tags::SAR_TOTAL_SEGMENTS)
                    && !self.contains(tags::SAR_SEGMENT_SEQNUM) =>
            {
                Ok(None)
            }
            _ => Err(CodecError::MalformedOptionalParameter {
                tag: tags::SAR_MSG_REF_NUM,
                reason: "sar_msg_ref_num, sar_total_segments and sar_segment_seqnum must appear together"
                    .to_string(),
            }),
        }
    }

    pub fn set_receipted_message_id(&mut self, message_id: &str) {
        self.set(Tlv::from_cstring(tags::RECEIPTED_MESSAGE_ID, message_id));
    }

    pub fn set_message_state(&mut self, state: MessageState) {
        self.set(Tlv::from_u8(tags::MESSAGE_STATE, state.into()));
    }

    pub fn set_network_error_code(&mut self, code: NetworkErrorCode) {
        let [hi, lo] = code.error_code.to_be_bytes();
        self.set(Tlv::new(
            tags::NETWORK_ERROR_CODE,
            vec![code.network_type, hi, lo],
        ));
    }

    pub fn set_message_payload(&mut self, payload: impl Into<Bytes>) {
        self.set(Tlv::new(tags::MESSAGE_PAYLOAD, payload));
    }

    pub fn set_sc_interface_version(&mut self, version: InterfaceVersion) {
        self.set(Tlv::from_u8(tags::SC_INTERFACE_VERSION, version.into()));
    }

    pub fn set_user_message_reference(&mut self, reference: u16) {
        self.set(Tlv::from_u16(tags::USER_MESSAGE_REFERENCE, reference));
    }

    pub fn set_sar(&mut self, sar: SarInfo) {
        self.set(Tlv::from_u16(tags::SAR_MSG_REF_NUM, sar.msg_ref_num));
        self.set(Tlv::from_u8(tags::SAR_TOTAL_SEGMENTS, sar.total_segments));
        self.set(Tlv::from_u8(tags::SAR_SEGMENT_SEQNUM, sar.segment_seqnum));
    }

    pub fn clear_sar(&mut self) {
        self.remove(tags::SAR_MSG_REF_NUM);
        self.remove(tags::SAR_TOTAL_SEGMENTS);
        self.remove(tags::SAR_SEGMENT_SEQNUM);
    }
}

impl FromIterator<Tlv> for OptionalParams {
    fn from_iter<I: IntoIterator<Item = Tlv>>(iter: I) -> Self {
        Self {
            params: iter.into_iter().collect(),
        }
    }
}
