// ABOUTME: SMPP esm_class bitfield: messaging mode, message type and GSM network features
// ABOUTME: Stored as the raw octet so undefined bit combinations survive a decode/encode cycle

use std::fmt;

const MODE_MASK: u8 = 0b0000_0011;
const TYPE_MASK: u8 = 0b0011_1100;
const UDHI: u8 = 0b0100_0000;
const REPLY_PATH: u8 = 0b1000_0000;

/// Messaging mode, bits 1-0
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageMode {
    /// SMSC default mode (usually store and forward)
    Default,
    Datagram,
    /// Transaction mode
    Forward,
    StoreAndForward,
}

/// Message type, bits 5-2
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageType {
    Default,
    /// SMSC delivery receipt (deliver_sm only)
    DeliveryReceipt,
    /// SME delivery acknowledgement
    DeliveryAcknowledgement,
    /// SME manual/user acknowledgement
    ManualAcknowledgement,
    /// Conversation abort (Korean CDMA)
    ConversationAbort,
    /// Intermediate delivery notification
    IntermediateNotification,
    Reserved(u8),
}

/// ESM class of submit_sm, deliver_sm, data_sm and submit_multi.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct EsmClass(u8);

impl EsmClass {
    pub fn new(mode: MessageMode, message_type: MessageType) -> Self {
        Self(0).with_mode(mode).with_message_type(message_type)
    }

    pub fn from_byte(value: u8) -> Self {
        Self(value)
    }

    pub fn to_byte(&self) -> u8 {
        self.0
    }

    pub fn with_mode(self, mode: MessageMode) -> Self {
        let bits = match mode {
            MessageMode::Default => 0,
            MessageMode::Datagram => 1,
            MessageMode::Forward => 2,
            MessageMode::StoreAndForward => 3,
        };
        Self((self.0 & !MODE_MASK) | bits)
    }

    pub fn with_message_type(self, message_type: MessageType) -> Self {
        let bits = match message_type {
            MessageType::Default => 0x00,
            MessageType::DeliveryReceipt => 0x04,
            MessageType::DeliveryAcknowledgement => 0x08,
            MessageType::ManualAcknowledgement => 0x10,
            MessageType::ConversationAbort => 0x18,
            MessageType::IntermediateNotification => 0x20,
            MessageType::Reserved(raw) => raw & TYPE_MASK,
        };
        Self((self.0 & !TYPE_MASK) | bits)
    }

    /// Set the User Data Header Indicator: `short_message` starts with a UDH
    pub fn with_udhi(self) -> Self {
        Self(self.0 | UDHI)
    }

    pub fn without_udhi(self) -> Self {
        Self(self.0 & !UDHI)
    }

    pub fn with_reply_path(self) -> Self {
        Self(self.0 | REPLY_PATH)
    }

    pub fn mode(&self) -> MessageMode {
        match self.0 & MODE_MASK {
            0 => MessageMode::Default,
            1 => MessageMode::Datagram,
            2 => MessageMode::Forward,
            _ => MessageMode::StoreAndForward,
        }
    }

    pub fn message_type(&self) -> MessageType {
        match self.0 & TYPE_MASK {
            0x00 => MessageType::Default,
            0x04 => MessageType::DeliveryReceipt,
            0x08 => MessageType::DeliveryAcknowledgement,
            0x10 => MessageType::ManualAcknowledgement,
            0x18 => MessageType::ConversationAbort,
            0x20 => MessageType::IntermediateNotification,
            other => MessageType::Reserved(other),
        }
    }

    pub fn has_udhi(&self) -> bool {
        self.0 & UDHI != 0
    }

    pub fn has_reply_path(&self) -> bool {
        self.0 & REPLY_PATH != 0
    }

    pub fn is_delivery_receipt(&self) -> bool {
        self.message_type() == MessageType::DeliveryReceipt
    }
}

impl fmt::Debug for EsmClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EsmClass")
            .field("mode", &self.mode())
            .field("message_type", &self.message_type())
            .field("udhi", &self.has_udhi())
            .field("reply_path", &self.has_reply_path())
            .finish()
    }
}

impl From<u8> for EsmClass {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl From<EsmClass> for u8 {
    fn from(esm_class: EsmClass) -> Self {
        esm_class.0
    }
}
