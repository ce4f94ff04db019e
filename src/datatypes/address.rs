// ABOUTME: SMPP address triple (TON, NPI, digits) shared by every message PDU
// ABOUTME: Each PDU field fixes its own C-string maximum, passed in at encode/decode time

use crate::codec::{CodecError, decode_cstring, decode_u8, encode_cstring, encode_u8};
use crate::datatypes::{NumericPlanIndicator, TypeOfNumber};
use bytes::BufMut;
use std::fmt;
use std::io::Cursor;

/// Source and destination addresses of submit_sm, deliver_sm, query_sm,
/// cancel_sm and replace_sm (terminator included)
pub const ADDR_LEN: usize = 21;

/// Addresses of data_sm and alert_notification (terminator included)
pub const EXTENDED_ADDR_LEN: usize = 65;

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Address {
    pub ton: TypeOfNumber,
    pub npi: NumericPlanIndicator,
    pub addr: String,
}

impl Address {
    pub fn new(ton: TypeOfNumber, npi: NumericPlanIndicator, addr: impl Into<String>) -> Self {
        Self {
            ton,
            npi,
            addr: addr.into(),
        }
    }

    /// E.164 number: international TON, ISDN plan
    pub fn international(addr: impl Into<String>) -> Self {
        Self::new(
            TypeOfNumber::International,
            NumericPlanIndicator::Isdn,
            addr,
        )
    }

    /// Alphanumeric sender id
    pub fn alphanumeric(addr: impl Into<String>) -> Self {
        Self::new(
            TypeOfNumber::Alphanumeric,
            NumericPlanIndicator::Unknown,
            addr,
        )
    }

    pub fn is_empty(&self) -> bool {
        self.addr.is_empty()
    }

    pub(crate) fn encode<B: BufMut>(
        &self,
        buf: &mut B,
        max_len: usize,
        field: &'static str,
    ) -> Result<(), CodecError> {
        encode_u8(buf, self.ton.into())?;
        encode_u8(buf, self.npi.into())?;
        encode_cstring(buf, &self.addr, max_len, field)
    }

    pub(crate) fn decode(
        buf: &mut Cursor<&[u8]>,
        max_len: usize,
        field: &'static str,
    ) -> Result<Self, CodecError> {
        Ok(Self {
            ton: TypeOfNumber::from(decode_u8(buf)?),
            npi: NumericPlanIndicator::from(decode_u8(buf)?),
            addr: decode_cstring(buf, max_len, field)?,
        })
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ton {
            TypeOfNumber::International => write!(f, "+{}", self.addr),
            _ => f.write_str(&self.addr),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn address_layout() {
        let mut buf = BytesMut::new();
        Address::international("447700900123")
            .encode(&mut buf, ADDR_LEN, "destination_addr")
            .unwrap();
        assert_eq!(&buf[..2], &[0x01, 0x01]);
        assert_eq!(&buf[2..], b"447700900123\0");
    }

    #[test]
    fn address_too_long_for_field() {
        let mut buf = BytesMut::new();
        let addr = Address::international("1".repeat(21));
        let result = addr.encode(&mut buf, ADDR_LEN, "source_addr");
        assert!(matches!(
            result,
            Err(CodecError::FieldTooLong {
                field: "source_addr",
                ..
            })
        ));
        assert!(addr.encode(&mut buf, EXTENDED_ADDR_LEN, "source_addr").is_ok());
    }

    #[test]
    fn display_prefixes_international() {
        assert_eq!(Address::international("15551234").to_string(), "+15551234");
        assert_eq!(Address::alphanumeric("ACME").to_string(), "ACME");
    }
}
