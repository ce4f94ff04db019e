// ABOUTME: SMPP data_coding scheme with the character unit width each scheme implies
// ABOUTME: Unit width fixes how many characters fit one PDU and one concatenated segment

use std::fmt;

/// Bits available for user data in a single short message (140 octets).
pub const USER_DATA_BITS: usize = 1120;

/// Data coding scheme carried in the `data_coding` field.
///
/// Every byte value round-trips: unassigned values and carrier aliases are
/// kept as [`DataCoding::Custom`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum DataCoding {
    /// SMSC Default Alphabet (GSM 03.38 7-bit)
    #[default]
    SmscDefault,
    /// IA5 (CCITT T.50)/ASCII
    Ascii,
    /// 8-bit binary
    Binary,
    /// ISO-8859-1
    Latin1,
    /// ISO/IEC-10646 UCS-2
    Ucs2,
    /// ISO-8859-5
    Cyrillic,
    /// ISO-8859-8
    LatinHebrew,
    /// JIS X 0208-1990
    Jis,
    /// GSM 7-bit default alphabet with message class (0xF0-0xF3)
    Gsm7BitWithClass(MessageClass),
    /// UCS-2 with message class (0xF4-0xF7 in carrier usage)
    Ucs2WithClass(MessageClass),
    /// Reserved values and carrier aliases
    Custom(u8),
}

impl DataCoding {
    pub fn from_byte(value: u8) -> Self {
        match value {
            0x00 => DataCoding::SmscDefault,
            0x01 => DataCoding::Ascii,
            0x02 => DataCoding::Binary,
            0x03 => DataCoding::Latin1,
            0x05 => DataCoding::Jis,
            0x06 => DataCoding::Cyrillic,
            0x07 => DataCoding::LatinHebrew,
            0x08 => DataCoding::Ucs2,
            0xF0..=0xF3 => DataCoding::Gsm7BitWithClass(MessageClass::from_bits(value)),
            0xF4..=0xF7 => DataCoding::Ucs2WithClass(MessageClass::from_bits(value)),
            // 0x04 is the second 8-bit binary code point; Custom keeps it byte exact
            _ => DataCoding::Custom(value),
        }
    }

    pub fn to_byte(&self) -> u8 {
        match self {
            DataCoding::SmscDefault => 0x00,
            DataCoding::Ascii => 0x01,
            DataCoding::Binary => 0x02,
            DataCoding::Latin1 => 0x03,
            DataCoding::Jis => 0x05,
            DataCoding::Cyrillic => 0x06,
            DataCoding::LatinHebrew => 0x07,
            DataCoding::Ucs2 => 0x08,
            DataCoding::Gsm7BitWithClass(class) => 0xF0 | class.bits(),
            DataCoding::Ucs2WithClass(class) => 0xF4 | class.bits(),
            DataCoding::Custom(value) => *value,
        }
    }

    /// Width in bits of one character unit on the air interface.
    ///
    /// GSM and IA5 text is 7 bits per septet, UCS-2 and JIS are 16 bits per
    /// code unit, everything else is one octet per unit.
    pub fn unit_bits(&self) -> usize {
        match self {
            DataCoding::SmscDefault | DataCoding::Ascii | DataCoding::Gsm7BitWithClass(_) => 7,
            DataCoding::Ucs2 | DataCoding::Ucs2WithClass(_) | DataCoding::Jis => 16,
            DataCoding::Binary
            | DataCoding::Latin1
            | DataCoding::Cyrillic
            | DataCoding::LatinHebrew
            | DataCoding::Custom(_) => 8,
        }
    }

    /// Width in octets of one unit once written into `short_message`.
    ///
    /// Septets travel unpacked, one per octet.
    pub fn unit_octets(&self) -> usize {
        if self.unit_bits() == 16 { 2 } else { 1 }
    }

    /// Characters that fit one PDU without concatenation: 160, 140 or 70.
    pub fn max_single_sms_length(&self) -> usize {
        USER_DATA_BITS / self.unit_bits()
    }

    pub fn is_unicode(&self) -> bool {
        matches!(self, DataCoding::Ucs2 | DataCoding::Ucs2WithClass(_))
    }

    pub fn is_gsm(&self) -> bool {
        matches!(self, DataCoding::SmscDefault | DataCoding::Gsm7BitWithClass(_))
    }

    pub fn message_class(&self) -> Option<MessageClass> {
        match self {
            DataCoding::Gsm7BitWithClass(class) | DataCoding::Ucs2WithClass(class) => Some(*class),
            _ => None,
        }
    }

    pub fn charset_name(&self) -> &'static str {
        match self {
            DataCoding::SmscDefault | DataCoding::Gsm7BitWithClass(_) => "GSM 7-bit Default",
            DataCoding::Ascii => "ASCII/IA5",
            DataCoding::Binary => "Binary",
            DataCoding::Latin1 => "ISO-8859-1",
            DataCoding::Jis => "JIS X 0208-1990",
            DataCoding::Cyrillic => "ISO-8859-5",
            DataCoding::LatinHebrew => "ISO-8859-8",
            DataCoding::Ucs2 | DataCoding::Ucs2WithClass(_) => "UCS-2",
            DataCoding::Custom(_) => "Custom/Reserved",
        }
    }
}

/// Message class for SMS delivery
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum MessageClass {
    /// Class 0, displayed immediately and not stored
    Flash,
    /// Class 1
    MobileEquipment,
    /// Class 2, stored on the SIM
    SimSpecific,
    /// Class 3
    TerminalEquipment,
}

impl MessageClass {
    fn from_bits(value: u8) -> Self {
        match value & 0x03 {
            0 => MessageClass::Flash,
            1 => MessageClass::MobileEquipment,
            2 => MessageClass::SimSpecific,
            _ => MessageClass::TerminalEquipment,
        }
    }

    fn bits(&self) -> u8 {
        match self {
            MessageClass::Flash => 0,
            MessageClass::MobileEquipment => 1,
            MessageClass::SimSpecific => 2,
            MessageClass::TerminalEquipment => 3,
        }
    }
}

impl fmt::Display for DataCoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:02X})", self.charset_name(), self.to_byte())
    }
}

impl From<u8> for DataCoding {
    fn from(value: u8) -> Self {
        Self::from_byte(value)
    }
}

impl From<DataCoding> for u8 {
    fn from(data_coding: DataCoding) -> Self {
        data_coding.to_byte()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_byte_round_trips() {
        for value in 0..=u8::MAX {
            assert_eq!(DataCoding::from_byte(value).to_byte(), value);
        }
    }

    #[test]
    fn single_pdu_limits() {
        assert_eq!(DataCoding::SmscDefault.max_single_sms_length(), 160);
        assert_eq!(DataCoding::Binary.max_single_sms_length(), 140);
        assert_eq!(DataCoding::Latin1.max_single_sms_length(), 140);
        assert_eq!(DataCoding::Ucs2.max_single_sms_length(), 70);
        assert_eq!(
            DataCoding::Ucs2WithClass(MessageClass::Flash).max_single_sms_length(),
            70
        );
    }

    #[test]
    fn message_class_variants() {
        assert_eq!(
            DataCoding::from_byte(0xF0),
            DataCoding::Gsm7BitWithClass(MessageClass::Flash)
        );
        assert_eq!(
            DataCoding::from_byte(0xF6),
            DataCoding::Ucs2WithClass(MessageClass::SimSpecific)
        );
        assert_eq!(DataCoding::from_byte(0xF6).unit_octets(), 2);
        assert_eq!(DataCoding::from_byte(0x04), DataCoding::Custom(0x04));
    }
}
