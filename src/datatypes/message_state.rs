use num_enum::{FromPrimitive, IntoPrimitive};

/// Message state reported by query_sm_resp and the `message_state` optional
/// parameter of delivery receipts.
#[derive(FromPrimitive, IntoPrimitive)]
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MessageState {
    Enroute = 1,
    Delivered = 2,
    Expired = 3,
    Deleted = 4,
    Undeliverable = 5,
    Accepted = 6,
    Unknown = 7,
    Rejected = 8,
    #[num_enum(catch_all)]
    Other(u8),
}

impl MessageState {
    /// True once the SMSC will no longer change the state
    pub fn is_final(&self) -> bool {
        !matches!(self, MessageState::Enroute | MessageState::Accepted | MessageState::Other(_))
    }

    /// Parse the `stat:` word of a delivery receipt text
    pub fn from_receipt_stat(stat: &str) -> Option<Self> {
        match stat {
            "ENROUTE" => Some(MessageState::Enroute),
            "DELIVRD" => Some(MessageState::Delivered),
            "EXPIRED" => Some(MessageState::Expired),
            "DELETED" => Some(MessageState::Deleted),
            "UNDELIV" => Some(MessageState::Undeliverable),
            "ACCEPTD" => Some(MessageState::Accepted),
            "UNKNOWN" => Some(MessageState::Unknown),
            "REJECTD" => Some(MessageState::Rejected),
            _ => None,
        }
    }
}
