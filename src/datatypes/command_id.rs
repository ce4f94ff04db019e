// ABOUTME: SMPP v3.4 command identifiers with request/response pairing helpers
// ABOUTME: Reserved and vendor identifiers decode to Unknown instead of failing the frame

use num_enum::{FromPrimitive, IntoPrimitive};

const RESPONSE_BIT: u32 = 0x8000_0000;

#[derive(FromPrimitive, IntoPrimitive)]
#[repr(u32)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CommandId {
    GenericNack = 0x8000_0000,
    BindReceiver = 0x0000_0001,
    BindReceiverResp = 0x8000_0001,
    BindTransmitter = 0x0000_0002,
    BindTransmitterResp = 0x8000_0002,
    QuerySm = 0x0000_0003,
    QuerySmResp = 0x8000_0003,
    SubmitSm = 0x0000_0004,
    SubmitSmResp = 0x8000_0004,
    DeliverSm = 0x0000_0005,
    DeliverSmResp = 0x8000_0005,
    Unbind = 0x0000_0006,
    UnbindResp = 0x8000_0006,
    ReplaceSm = 0x0000_0007,
    ReplaceSmResp = 0x8000_0007,
    CancelSm = 0x0000_0008,
    CancelSmResp = 0x8000_0008,
    BindTransceiver = 0x0000_0009,
    BindTransceiverResp = 0x8000_0009,
    // Reserved 0x0000000A - 0x8000000A
    Outbind = 0x0000_000B,
    EnquireLink = 0x0000_0015,
    EnquireLinkResp = 0x8000_0015,
    SubmitMulti = 0x0000_0021,
    SubmitMultiResp = 0x8000_0021,
    AlertNotification = 0x0000_0102,
    DataSm = 0x0000_0103,
    DataSmResp = 0x8000_0103,
    /// Reserved, SMPP extension or SMSC vendor identifier
    #[num_enum(catch_all)]
    Unknown(u32),
}

impl CommandId {
    /// Check if this command_id represents a response PDU
    pub fn is_response(&self) -> bool {
        u32::from(*self) & RESPONSE_BIT != 0
    }

    /// The response identifier a peer must answer this request with.
    ///
    /// Responses, and requests without a response (alert_notification,
    /// outbind), return `None`.
    pub fn response_id(&self) -> Option<CommandId> {
        match self {
            CommandId::AlertNotification | CommandId::Outbind | CommandId::Unknown(_) => None,
            id if id.is_response() => None,
            id => Some(CommandId::from(u32::from(*id) | RESPONSE_BIT)),
        }
    }

    pub fn is_bind(&self) -> bool {
        matches!(
            self,
            CommandId::BindTransmitter | CommandId::BindReceiver | CommandId::BindTransceiver
        )
    }
}
