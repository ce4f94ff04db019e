// ABOUTME: Character encoders and decoders for the SMPP data_coding schemes
// ABOUTME: GSM 03.38 with its extension table, IA5, Latin-1, UCS-2 and 8-bit passthrough

use crate::datatypes::DataCoding;
use thiserror::Error;

/// GSM 03.38 escape to the extension table
pub const GSM_ESCAPE: u8 = 0x1B;

/// GSM 03.38 default alphabet indexed by septet value.
///
/// Slot 0x1B is the escape code and never matches a character.
const GSM_BASIC: [char; 128] = [
    '@', '£', '$', '¥', 'è', 'é', 'ù', 'ì', 'ò', 'Ç', '\n', 'Ø', 'ø', '\r', 'Å', 'å', //
    'Δ', '_', 'Φ', 'Γ', 'Λ', 'Ω', 'Π', 'Ψ', 'Σ', 'Θ', 'Ξ', '\u{1B}', 'Æ', 'æ', 'ß', 'É', //
    ' ', '!', '"', '#', '¤', '%', '&', '\'', '(', ')', '*', '+', ',', '-', '.', '/', //
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', ':', ';', '<', '=', '>', '?', //
    '¡', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', //
    'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z', 'Ä', 'Ö', 'Ñ', 'Ü', '§', //
    '¿', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', //
    'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z', 'ä', 'ö', 'ñ', 'ü', 'à', //
];

/// Characters reached through the escape code, as (septet, char)
const GSM_EXTENSION: [(u8, char); 10] = [
    (0x0A, '\u{0C}'),
    (0x14, '^'),
    (0x28, '{'),
    (0x29, '}'),
    (0x2F, '\\'),
    (0x3C, '['),
    (0x3D, '~'),
    (0x3E, ']'),
    (0x40, '|'),
    (0x65, '€'),
];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    #[error("character {ch:?} cannot be encoded as {charset}")]
    Unencodable { ch: char, charset: &'static str },

    #[error("no text encoder for data_coding {0}")]
    UnsupportedCoding(DataCoding),

    #[error("invalid {charset} data: {reason}")]
    InvalidData {
        charset: &'static str,
        reason: String,
    },
}

/// The text encoder a data_coding value selects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Charset {
    /// GSM 03.38 septets, one per octet
    Gsm7,
    Ia5,
    Latin1,
    /// UTF-16BE; characters outside the BMP take a surrogate pair
    Ucs2,
    /// UTF-8 bytes passed through unchanged
    Octets,
}

impl Charset {
    pub fn for_coding(coding: DataCoding) -> Result<Charset, EncodingError> {
        match coding {
            DataCoding::SmscDefault | DataCoding::Gsm7BitWithClass(_) => Ok(Charset::Gsm7),
            DataCoding::Ascii => Ok(Charset::Ia5),
            DataCoding::Latin1 => Ok(Charset::Latin1),
            DataCoding::Ucs2 | DataCoding::Ucs2WithClass(_) => Ok(Charset::Ucs2),
            DataCoding::Binary | DataCoding::Custom(_) => Ok(Charset::Octets),
            DataCoding::Jis | DataCoding::Cyrillic | DataCoding::LatinHebrew => {
                Err(EncodingError::UnsupportedCoding(coding))
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Charset::Gsm7 => "GSM 03.38",
            Charset::Ia5 => "IA5",
            Charset::Latin1 => "Latin-1",
            Charset::Ucs2 => "UCS-2",
            Charset::Octets => "8-bit",
        }
    }

    /// Append the encoding of one character.
    ///
    /// A character always encodes to a whole unit sequence (an escape pair,
    /// a surrogate pair or a UTF-8 sequence), so splitting between calls
    /// never breaks a character.
    pub fn encode_char(&self, ch: char, out: &mut Vec<u8>) -> Result<(), EncodingError> {
        match self {
            Charset::Gsm7 => {
                if let Some(septet) = gsm_septet(ch) {
                    out.push(septet);
                } else if let Some(septet) = gsm_extension_septet(ch) {
                    out.extend_from_slice(&[GSM_ESCAPE, septet]);
                } else {
                    return Err(self.unencodable(ch));
                }
            }
            Charset::Ia5 => {
                if !ch.is_ascii() {
                    return Err(self.unencodable(ch));
                }
                out.push(ch as u8);
            }
            Charset::Latin1 => {
                let code = u32::from(ch);
                if code > 0xFF {
                    return Err(self.unencodable(ch));
                }
                out.push(code as u8);
            }
            Charset::Ucs2 => {
                let mut units = [0u16; 2];
                for unit in ch.encode_utf16(&mut units) {
                    out.extend_from_slice(&unit.to_be_bytes());
                }
            }
            Charset::Octets => {
                let mut utf8 = [0u8; 4];
                out.extend_from_slice(ch.encode_utf8(&mut utf8).as_bytes());
            }
        }
        Ok(())
    }

    pub fn encode(&self, text: &str) -> Result<Vec<u8>, EncodingError> {
        let mut out = Vec::with_capacity(text.len());
        for ch in text.chars() {
            self.encode_char(ch, &mut out)?;
        }
        Ok(out)
    }

    pub fn decode(&self, data: &[u8]) -> Result<String, EncodingError> {
        match self {
            Charset::Gsm7 => decode_gsm(data),
            Charset::Ia5 => match data.iter().position(|b| !b.is_ascii()) {
                Some(index) => Err(EncodingError::InvalidData {
                    charset: self.name(),
                    reason: format!("byte 0x{:02X} at offset {index}", data[index]),
                }),
                None => Ok(data.iter().map(|&b| char::from(b)).collect()),
            },
            Charset::Latin1 => Ok(data.iter().map(|&b| char::from(b)).collect()),
            Charset::Ucs2 => {
                if data.len() % 2 != 0 {
                    return Err(EncodingError::InvalidData {
                        charset: self.name(),
                        reason: format!("odd length {}", data.len()),
                    });
                }
                let units = data
                    .chunks_exact(2)
                    .map(|pair| u16::from_be_bytes([pair[0], pair[1]]));
                Ok(char::decode_utf16(units)
                    .map(|unit| unit.unwrap_or(char::REPLACEMENT_CHARACTER))
                    .collect())
            }
            Charset::Octets => Ok(String::from_utf8_lossy(data).into_owned()),
        }
    }

    fn unencodable(&self, ch: char) -> EncodingError {
        EncodingError::Unencodable {
            ch,
            charset: self.name(),
        }
    }
}

/// Encode `text` for `coding`
pub fn encode(text: &str, coding: DataCoding) -> Result<Vec<u8>, EncodingError> {
    Charset::for_coding(coding)?.encode(text)
}

/// Decode a `short_message` or `message_payload` written in `coding`
pub fn decode(data: &[u8], coding: DataCoding) -> Result<String, EncodingError> {
    Charset::for_coding(coding)?.decode(data)
}

/// Whether every character of `text` exists in the GSM default alphabet or
/// its extension table
pub fn is_gsm_encodable(text: &str) -> bool {
    text.chars()
        .all(|ch| gsm_septet(ch).is_some() || gsm_extension_septet(ch).is_some())
}

/// GSM 03.38 when possible, UCS-2 otherwise
pub fn preferred_coding(text: &str) -> DataCoding {
    if is_gsm_encodable(text) {
        DataCoding::SmscDefault
    } else {
        DataCoding::Ucs2
    }
}

fn gsm_septet(ch: char) -> Option<u8> {
    if ch == '\u{1B}' {
        return None;
    }
    GSM_BASIC
        .iter()
        .position(|&c| c == ch)
        .map(|index| index as u8)
}

fn gsm_extension_septet(ch: char) -> Option<u8> {
    GSM_EXTENSION
        .iter()
        .find(|&&(_, c)| c == ch)
        .map(|&(septet, _)| septet)
}

fn decode_gsm(data: &[u8]) -> Result<String, EncodingError> {
    let mut text = String::with_capacity(data.len());
    let mut bytes = data.iter().copied().enumerate();
    while let Some((index, septet)) = bytes.next() {
        if septet > 0x7F {
            return Err(EncodingError::InvalidData {
                charset: Charset::Gsm7.name(),
                reason: format!("byte 0x{septet:02X} at offset {index} is not a septet"),
            });
        }
        if septet != GSM_ESCAPE {
            text.push(GSM_BASIC[usize::from(septet)]);
            continue;
        }
        match bytes.next() {
            Some((_, next)) => {
                let extended = GSM_EXTENSION
                    .iter()
                    .find(|&&(code, _)| code == next)
                    .map(|&(_, ch)| ch);
                // Unassigned extension codes fall back to the default table
                match extended {
                    Some(ch) => text.push(ch),
                    None => text.push(GSM_BASIC[usize::from(next & 0x7F)]),
                }
            }
            None => text.push(' '),
        }
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gsm_basic_characters() {
        let encoded = encode("Hello @£$", DataCoding::SmscDefault).unwrap();
        assert_eq!(encoded, vec![0x48, 0x65, 0x6C, 0x6C, 0x6F, 0x20, 0x00, 0x01, 0x02]);
        assert_eq!(decode(&encoded, DataCoding::SmscDefault).unwrap(), "Hello @£$");
    }

    #[test]
    fn gsm_extension_uses_escape_pairs() {
        let encoded = encode("€[]", DataCoding::SmscDefault).unwrap();
        assert_eq!(encoded, vec![0x1B, 0x65, 0x1B, 0x3C, 0x1B, 0x3E]);
        assert_eq!(decode(&encoded, DataCoding::SmscDefault).unwrap(), "€[]");
    }

    #[test]
    fn gsm_greek_and_accents() {
        let text = "ΔΦΓ ÄÖÑÜ§ äöñüà ¿¡";
        let encoded = encode(text, DataCoding::SmscDefault).unwrap();
        assert_eq!(encoded.len(), text.chars().count());
        assert_eq!(decode(&encoded, DataCoding::SmscDefault).unwrap(), text);
    }

    #[test]
    fn gsm_rejects_outside_alphabet() {
        let err = encode("日本", DataCoding::SmscDefault).unwrap_err();
        assert_eq!(
            err,
            EncodingError::Unencodable {
                ch: '日',
                charset: "GSM 03.38"
            }
        );
        assert!(encode("\u{1B}", DataCoding::SmscDefault).is_err());
    }

    #[test]
    fn gsm_decode_rejects_high_bytes() {
        assert!(decode(&[0x41, 0x80], DataCoding::SmscDefault).is_err());
    }

    #[test]
    fn gsm_unknown_escape_falls_back() {
        assert_eq!(decode(&[0x1B, 0x41], DataCoding::SmscDefault).unwrap(), "A");
    }

    #[test]
    fn ia5_is_strict_ascii() {
        assert_eq!(encode("abc", DataCoding::Ascii).unwrap(), b"abc".to_vec());
        assert!(encode("é", DataCoding::Ascii).is_err());
        assert!(decode(&[0x61, 0xE9], DataCoding::Ascii).is_err());
    }

    #[test]
    fn latin1_single_octets() {
        assert_eq!(encode("café", DataCoding::Latin1).unwrap(), vec![0x63, 0x61, 0x66, 0xE9]);
        assert!(encode("€", DataCoding::Latin1).is_err());
        assert_eq!(decode(&[0x63, 0xE9], DataCoding::Latin1).unwrap(), "cé");
    }

    #[test]
    fn ucs2_big_endian_with_surrogates() {
        let encoded = encode("A😀", DataCoding::Ucs2).unwrap();
        assert_eq!(encoded, vec![0x00, 0x41, 0xD8, 0x3D, 0xDE, 0x00]);
        assert_eq!(decode(&encoded, DataCoding::Ucs2).unwrap(), "A😀");
        assert!(decode(&[0x00], DataCoding::Ucs2).is_err());
    }

    #[test]
    fn binary_passes_utf8_through() {
        assert_eq!(encode("ü", DataCoding::Binary).unwrap(), vec![0xC3, 0xBC]);
        assert_eq!(decode(&[0xC3, 0xBC], DataCoding::Custom(0x04)).unwrap(), "ü");
    }

    #[test]
    fn unsupported_codings() {
        assert_eq!(
            encode("x", DataCoding::Jis),
            Err(EncodingError::UnsupportedCoding(DataCoding::Jis))
        );
    }

    #[test]
    fn preferred_coding_picks_gsm_first() {
        assert_eq!(preferred_coding("Price: 5€"), DataCoding::SmscDefault);
        assert_eq!(preferred_coding("Привет"), DataCoding::Ucs2);
    }
}
