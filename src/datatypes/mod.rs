mod address;
mod alert_notification;
mod bind;
mod cancel_sm;
mod command_id;
mod command_status;
mod data_coding;
mod data_sm;
mod deliver_sm;
mod esm_class;
mod interface_version;
mod message_state;
mod numeric_plan_indicator;
mod priority_flag;
mod query_sm;
mod replace_sm;
mod submit_multi;
mod submit_sm;
mod tlv;
mod type_of_number;

pub use address::{ADDR_LEN, Address, EXTENDED_ADDR_LEN};
pub use alert_notification::AlertNotification;
pub use bind::{
    ADDRESS_RANGE_LEN, Bind, BindResponse, Outbind, PASSWORD_LEN, SYSTEM_ID_LEN, SYSTEM_TYPE_LEN,
};
pub use cancel_sm::CancelSm;
pub use command_id::CommandId;
pub use command_status::CommandStatus;
pub use data_coding::{DataCoding, MessageClass, USER_DATA_BITS};
pub use data_sm::DataSm;
pub use deliver_sm::{DeliverSm, DeliveryReceipt};
pub use esm_class::{EsmClass, MessageMode, MessageType};
pub use interface_version::InterfaceVersion;
pub use message_state::MessageState;
pub use numeric_plan_indicator::NumericPlanIndicator;
pub use priority_flag::PriorityFlag;
pub use query_sm::{QuerySm, QuerySmResp};
pub use replace_sm::ReplaceSm;
pub use submit_multi::{
    DL_NAME_LEN, DestAddress, MAX_DESTINATIONS, SubmitMulti, SubmitMultiResp, UnsuccessSme,
};
pub use submit_sm::{
    MAX_SHORT_MESSAGE_LEN, MESSAGE_ID_LEN, MessageIdResponse, REGISTERED_DELIVERY_RECEIPT,
    SERVICE_TYPE_LEN, SubmitSm, TIME_LEN,
};
pub use tlv::{
    NetworkErrorCode, OptionalParams, SarInfo, TLV_HEADER_SIZE, TagRegistry, TagSpec, Tlv,
    TlvIter, TlvKind, decode_params, encode_param, tags,
};
pub use type_of_number::TypeOfNumber;

use crate::codec::{CodecError, PduHeader};
use bytes::Buf;
use std::io::Cursor;

/// Everything left in the frame is the optional parameter trailer
pub(crate) fn decode_trailer(
    buf: &mut Cursor<&[u8]>,
    registry: &TagRegistry,
) -> Result<OptionalParams, CodecError> {
    let trailer = buf.copy_to_bytes(buf.remaining());
    OptionalParams::decode(trailer, registry)
}

/// SMSCs commonly send error responses as a bare header
pub(crate) fn is_error_without_body(header: &PduHeader, buf: &Cursor<&[u8]>) -> bool {
    !header.command_status.is_ok() && !buf.has_remaining()
}
