// ABOUTME: Splits long messages into concatenated SMS segments using UDH or SAR parameters
// ABOUTME: Also recognises inbound concatenated parts so callers can group them for reassembly

use crate::codec::CodecError;
use crate::datatypes::{DataCoding, SarInfo, SubmitSm, USER_DATA_BITS};
use crate::encoding::{Charset, EncodingError};
use bytes::{BufMut, Bytes, BytesMut};
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::debug;

/// Concatenation user data header length in octets: `05 00 03 ref total seq`
pub const UDH_CONCAT_LEN: usize = 6;

/// Information element identifier, 8-bit reference concatenation
const IEI_CONCAT_8BIT: u8 = 0x00;
/// Information element identifier, 16-bit reference concatenation
const IEI_CONCAT_16BIT: u8 = 0x08;

pub const MAX_SEGMENTS: usize = 255;

#[derive(Error, Debug)]
pub enum SegmentationError {
    #[error("message needs {count} segments, at most {MAX_SEGMENTS} are addressable")]
    TooManySegments { count: usize },

    #[error("UDH concatenation reference {reference} does not fit one octet")]
    ReferenceOutOfRange { reference: u16 },

    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error("malformed user data header: {reason}")]
    MalformedUdh { reason: String },

    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// How segments of one message are tied together.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SegmentationMethod {
    /// User data header prefixed to each `short_message`, UDHI set in `esm_class`
    #[default]
    Udh,
    /// `sar_*` optional parameters, payload untouched
    Sar,
}

impl SegmentationMethod {
    /// Bits of the 1120-bit budget taken by concatenation metadata
    pub fn overhead_bits(&self) -> usize {
        match self {
            SegmentationMethod::Udh => UDH_CONCAT_LEN * 8,
            SegmentationMethod::Sar => 0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Concatenation {
    pub reference: u16,
    pub total: u8,
    /// 1-based
    pub sequence: u8,
}

/// One PDU's worth of a message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Segment {
    /// Bytes for `short_message`, including the UDH when `method` is `Udh`
    pub payload: Bytes,
    pub method: SegmentationMethod,
    /// `None` when the message fits a single PDU
    pub concatenation: Option<Concatenation>,
}

impl Segment {
    /// Payload without any user data header. Empty when a concatenated UDH
    /// segment is too short to hold its header.
    pub fn text_payload(&self) -> &[u8] {
        match (self.method, self.concatenation) {
            (SegmentationMethod::Udh, Some(_)) => {
                self.payload.get(UDH_CONCAT_LEN..).unwrap_or_default()
            }
            _ => &self.payload,
        }
    }

    /// Write this segment into a submit_sm: `short_message` plus either the
    /// UDHI bit or the SAR parameters. Any previous concatenation markers
    /// are cleared first.
    pub fn apply_to(&self, sm: &mut SubmitSm) {
        sm.short_message = self.payload.clone();
        sm.esm_class = sm.esm_class.without_udhi();
        sm.optional.clear_sar();

        if let Some(concat) = self.concatenation {
            match self.method {
                SegmentationMethod::Udh => sm.esm_class = sm.esm_class.with_udhi(),
                SegmentationMethod::Sar => sm.optional.set_sar(SarInfo {
                    msg_ref_num: concat.reference,
                    total_segments: concat.total,
                    segment_seqnum: concat.sequence,
                }),
            }
        }
    }
}

/// Encode `text` for `coding` and split it into as few segments as possible.
///
/// A message that fits one PDU (160 GSM, 140 8-bit or 70 UCS-2 units) yields
/// a single segment without concatenation metadata; an empty message yields
/// one empty segment. Splits fall on character boundaries only.
pub fn split_message(
    text: &str,
    coding: DataCoding,
    method: SegmentationMethod,
    reference: u16,
) -> Result<Vec<Segment>, SegmentationError> {
    let charset = Charset::for_coding(coding)?;

    // Encoded bytes plus the end offset of every character
    let mut encoded = Vec::with_capacity(text.len() * coding.unit_octets());
    let mut boundaries = Vec::with_capacity(text.len());
    for ch in text.chars() {
        charset.encode_char(ch, &mut encoded)?;
        boundaries.push(encoded.len());
    }

    split_encoded(Bytes::from(encoded), &boundaries, coding, method, reference)
}

/// Split an already encoded 8-bit payload; any byte is a valid cut point.
pub fn split_bytes(
    data: &[u8],
    method: SegmentationMethod,
    reference: u16,
) -> Result<Vec<Segment>, SegmentationError> {
    let boundaries: Vec<usize> = (1..=data.len()).collect();
    split_encoded(
        Bytes::copy_from_slice(data),
        &boundaries,
        DataCoding::Binary,
        method,
        reference,
    )
}

fn split_encoded(
    encoded: Bytes,
    boundaries: &[usize],
    coding: DataCoding,
    method: SegmentationMethod,
    reference: u16,
) -> Result<Vec<Segment>, SegmentationError> {
    if method == SegmentationMethod::Udh && reference > u16::from(u8::MAX) {
        return Err(SegmentationError::ReferenceOutOfRange { reference });
    }

    let single_limit = coding.max_single_sms_length() * coding.unit_octets();
    if encoded.len() <= single_limit {
        return Ok(vec![Segment {
            payload: encoded,
            method,
            concatenation: None,
        }]);
    }

    let segment_limit =
        (USER_DATA_BITS - method.overhead_bits()) / coding.unit_bits() * coding.unit_octets();

    // Greedy: extend each chunk up to the last character boundary that fits
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut end = 0;
    for &boundary in boundaries {
        if boundary - start > segment_limit {
            chunks.push(start..end);
            start = end;
            if chunks.len() > MAX_SEGMENTS {
                break;
            }
        }
        end = boundary;
    }
    if end > start {
        chunks.push(start..end);
    }

    if chunks.len() > MAX_SEGMENTS {
        // Estimate the rest so the error reports the real size
        let covered = chunks.last().map_or(0, |range| range.end);
        let count = chunks.len() + (encoded.len() - covered).div_ceil(segment_limit);
        return Err(SegmentationError::TooManySegments { count });
    }

    let total = chunks.len() as u8;
    debug!(
        segments = total,
        reference,
        ?method,
        octets = encoded.len(),
        "Split message"
    );

    let segments = chunks
        .into_iter()
        .enumerate()
        .map(|(index, range)| {
            let concat = Concatenation {
                reference,
                total,
                sequence: index as u8 + 1,
            };
            let payload = match method {
                SegmentationMethod::Udh => {
                    let mut payload = BytesMut::with_capacity(UDH_CONCAT_LEN + range.len());
                    payload.put_slice(&[
                        0x05,
                        IEI_CONCAT_8BIT,
                        0x03,
                        reference as u8,
                        concat.total,
                        concat.sequence,
                    ]);
                    payload.put_slice(&encoded[range]);
                    payload.freeze()
                }
                SegmentationMethod::Sar => encoded.slice(range),
            };
            Segment {
                payload,
                method,
                concatenation: Some(concat),
            }
        })
        .collect();

    Ok(segments)
}

/// Rolling source of concatenation references.
///
/// References repeat once the counter wraps; keeping them distinct across
/// concurrently outstanding messages for the same destination is up to the
/// caller.
#[derive(Debug)]
pub struct ReferenceGenerator {
    next: AtomicU16,
}

impl ReferenceGenerator {
    pub fn new(start: u16) -> Self {
        Self {
            next: AtomicU16::new(start),
        }
    }

    /// Next reference for `method`: the low byte for UDH, all 16 bits for SAR
    pub fn next(&self, method: SegmentationMethod) -> u16 {
        let value = self.next.fetch_add(1, Ordering::Relaxed);
        match method {
            SegmentationMethod::Udh => value & 0x00FF,
            SegmentationMethod::Sar => value,
        }
    }
}

impl Default for ReferenceGenerator {
    /// Seeded from the clock so restarts do not reuse the same references
    fn default() -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.subsec_nanos() as u16)
            .unwrap_or(0);
        Self::new(seed)
    }
}

/// One part of an inbound concatenated message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundPart {
    pub reference: u16,
    pub total: u8,
    pub sequence: u8,
    /// User data with any header stripped
    pub payload: Bytes,
}

impl InboundPart {
    /// Extract concatenation info from a submit_sm or deliver_sm.
    ///
    /// Looks at the UDH when UDHI is set (8-bit or 16-bit reference
    /// elements), otherwise at the SAR parameters. `Ok(None)` means the
    /// message is not part of a concatenated message.
    pub fn from_message(sm: &SubmitSm) -> Result<Option<InboundPart>, SegmentationError> {
        let payload = sm.payload();

        if sm.esm_class.has_udhi() {
            return parse_udh(payload);
        }

        Ok(sm.optional.sar()?.map(|sar| InboundPart {
            reference: sar.msg_ref_num,
            total: sar.total_segments,
            sequence: sar.segment_seqnum,
            payload: Bytes::copy_from_slice(payload),
        }))
    }

    /// Key shared by every part of the same message
    pub fn key(&self) -> (u16, u8) {
        (self.reference, self.total)
    }
}

fn parse_udh(user_data: &[u8]) -> Result<Option<InboundPart>, SegmentationError> {
    let malformed = |reason: &str| SegmentationError::MalformedUdh {
        reason: reason.to_string(),
    };

    let udhl = usize::from(*user_data.first().ok_or_else(|| malformed("empty user data"))?);
    if user_data.len() < 1 + udhl {
        return Err(malformed("header length exceeds user data"));
    }
    let header = &user_data[1..1 + udhl];
    let body = &user_data[1 + udhl..];

    let mut offset = 0;
    while offset + 2 <= header.len() {
        let iei = header[offset];
        let len = usize::from(header[offset + 1]);
        let data = header
            .get(offset + 2..offset + 2 + len)
            .ok_or_else(|| malformed("information element overruns header"))?;

        let concat = match (iei, data) {
            (IEI_CONCAT_8BIT, &[reference, total, sequence]) => {
                Some((u16::from(reference), total, sequence))
            }
            (IEI_CONCAT_16BIT, &[high, low, total, sequence]) => {
                Some((u16::from_be_bytes([high, low]), total, sequence))
            }
            (IEI_CONCAT_8BIT | IEI_CONCAT_16BIT, _) => {
                return Err(malformed("concatenation element has the wrong length"));
            }
            _ => None,
        };

        if let Some((reference, total, sequence)) = concat {
            if total == 0 || sequence == 0 || sequence > total {
                return Err(malformed("segment number outside 1..=total"));
            }
            return Ok(Some(InboundPart {
                reference,
                total,
                sequence,
                payload: Bytes::copy_from_slice(body),
            }));
        }
        offset += 2 + len;
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatypes::Address;

    fn count(text: &str, coding: DataCoding) -> usize {
        split_message(text, coding, SegmentationMethod::Udh, 1)
            .unwrap()
            .len()
    }

    #[test]
    fn gsm_segment_counts() {
        for (len, expected) in [
            (159, 1),
            (160, 1),
            (161, 2),
            (305, 2),
            (306, 2),
            (307, 3),
            (459, 3),
        ] {
            let text = "a".repeat(len);
            assert_eq!(count(&text, DataCoding::SmscDefault), expected, "{len} chars");
        }
    }

    #[test]
    fn ucs2_segment_counts() {
        for (len, expected) in [(69, 1), (70, 1), (71, 2), (133, 2), (134, 2), (135, 3)] {
            let text = "ж".repeat(len);
            assert_eq!(count(&text, DataCoding::Ucs2), expected, "{len} chars");
        }
    }

    #[test]
    fn sar_segments_are_larger() {
        let text = "a".repeat(320);
        let segments =
            split_message(&text, DataCoding::SmscDefault, SegmentationMethod::Sar, 700).unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].payload.len(), 160);
        assert_eq!(segments[1].concatenation.unwrap().reference, 700);
    }

    #[test]
    fn udh_header_layout() {
        let text = "b".repeat(200);
        let segments =
            split_message(&text, DataCoding::SmscDefault, SegmentationMethod::Udh, 0x42).unwrap();
        assert_eq!(&segments[0].payload[..6], &[0x05, 0x00, 0x03, 0x42, 0x02, 0x01]);
        assert_eq!(&segments[1].payload[..6], &[0x05, 0x00, 0x03, 0x42, 0x02, 0x02]);
        assert_eq!(segments[0].payload.len(), 6 + 153);
        assert_eq!(segments[1].text_payload().len(), 47);
    }

    #[test]
    fn concatenation_reproduces_encoded_text() {
        let text = "Grüße {from} the [team] €".repeat(12);
        let segments =
            split_message(&text, DataCoding::SmscDefault, SegmentationMethod::Udh, 9).unwrap();
        assert!(segments.len() > 1);

        let joined: Vec<u8> = segments
            .iter()
            .flat_map(|s| s.text_payload().to_vec())
            .collect();
        assert_eq!(joined, crate::encoding::encode(&text, DataCoding::SmscDefault).unwrap());

        // No segment ends on a dangling escape
        for segment in &segments {
            assert_ne!(segment.text_payload().last(), Some(&0x1B));
        }
    }

    #[test]
    fn escape_pairs_are_not_split() {
        // 152 plain septets then an escape pair: the pair moves to segment two
        let text = format!("{}€{}", "a".repeat(152), "a".repeat(10));
        let segments =
            split_message(&text, DataCoding::SmscDefault, SegmentationMethod::Udh, 1).unwrap();
        assert_eq!(segments[0].text_payload().len(), 152);
        assert_eq!(&segments[1].text_payload()[..2], &[0x1B, 0x65]);
    }

    #[test]
    fn surrogate_pairs_are_not_split() {
        let text = format!("{}😀", "x".repeat(70));
        let segments =
            split_message(&text, DataCoding::Ucs2, SegmentationMethod::Udh, 1).unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text_payload().len(), 134);
        assert_eq!(segments[1].text_payload(), &[0x00, 0x78, 0x00, 0x78, 0x00, 0x78, 0xD8, 0x3D, 0xDE, 0x00]);
    }

    #[test]
    fn empty_message_is_one_segment() {
        let segments =
            split_message("", DataCoding::SmscDefault, SegmentationMethod::Udh, 1).unwrap();
        assert_eq!(segments.len(), 1);
        assert!(segments[0].payload.is_empty());
        assert!(segments[0].concatenation.is_none());
    }

    #[test]
    fn hand_built_segment_shorter_than_its_udh() {
        let segment = Segment {
            payload: Bytes::from_static(&[0x05, 0x00, 0x03]),
            method: SegmentationMethod::Udh,
            concatenation: Some(Concatenation {
                reference: 1,
                total: 2,
                sequence: 1,
            }),
        };
        assert!(segment.text_payload().is_empty());
    }

    #[test]
    fn too_many_segments() {
        let text = "a".repeat(153 * 255 + 1);
        let result = split_message(&text, DataCoding::SmscDefault, SegmentationMethod::Udh, 1);
        assert!(matches!(
            result,
            Err(SegmentationError::TooManySegments { count: 256 })
        ));

        let text = "a".repeat(153 * 255);
        assert_eq!(count(&text, DataCoding::SmscDefault), 255);
    }

    #[test]
    fn udh_reference_must_fit_a_byte() {
        let result = split_message("hi", DataCoding::SmscDefault, SegmentationMethod::Udh, 256);
        assert!(matches!(
            result,
            Err(SegmentationError::ReferenceOutOfRange { reference: 256 })
        ));
        assert!(split_message("hi", DataCoding::SmscDefault, SegmentationMethod::Sar, 256).is_ok());
    }

    #[test]
    fn unencodable_text_is_reported() {
        let result = split_message("日本", DataCoding::SmscDefault, SegmentationMethod::Udh, 1);
        assert!(matches!(result, Err(SegmentationError::Encoding(_))));
    }

    #[test]
    fn split_binary_payload() {
        let data = vec![0xAB; 300];
        let segments = split_bytes(&data, SegmentationMethod::Udh, 3).unwrap();
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].text_payload().len(), 134);
        assert_eq!(segments[2].text_payload().len(), 32);

        assert_eq!(split_bytes(&data[..140], SegmentationMethod::Udh, 3).unwrap().len(), 1);
    }

    #[test]
    fn reference_generator_masks_for_udh() {
        let generator = ReferenceGenerator::new(0x01FF);
        assert_eq!(generator.next(SegmentationMethod::Udh), 0xFF);
        assert_eq!(generator.next(SegmentationMethod::Sar), 0x0200);
        assert_eq!(generator.next(SegmentationMethod::Udh), 0x01);

        let generator = ReferenceGenerator::new(u16::MAX);
        assert_eq!(generator.next(SegmentationMethod::Sar), u16::MAX);
        assert_eq!(generator.next(SegmentationMethod::Sar), 0);
    }

    fn submit() -> SubmitSm {
        SubmitSm::new(
            Address::international("447700900001"),
            Address::international("447700900002"),
            Bytes::new(),
        )
    }

    #[test]
    fn apply_udh_segment_and_read_it_back() {
        let text = "c".repeat(170);
        let segments =
            split_message(&text, DataCoding::SmscDefault, SegmentationMethod::Udh, 77).unwrap();

        let mut sm = submit();
        segments[1].apply_to(&mut sm);
        assert!(sm.esm_class.has_udhi());
        assert!(sm.optional.sar().unwrap().is_none());

        let part = InboundPart::from_message(&sm).unwrap().unwrap();
        assert_eq!((part.reference, part.total, part.sequence), (77, 2, 2));
        assert_eq!(part.payload.len(), 17);
    }

    #[test]
    fn apply_sar_segment_and_read_it_back() {
        let text = "d".repeat(170);
        let segments =
            split_message(&text, DataCoding::SmscDefault, SegmentationMethod::Sar, 4000).unwrap();

        let mut sm = submit();
        segments[0].apply_to(&mut sm);
        assert!(!sm.esm_class.has_udhi());

        let part = InboundPart::from_message(&sm).unwrap().unwrap();
        assert_eq!(part.key(), (4000, 2));
        assert_eq!(part.sequence, 1);
        assert_eq!(part.payload.len(), 160);
    }

    #[test]
    fn single_segment_clears_previous_markers() {
        let segments =
            split_message(&"e".repeat(170), DataCoding::SmscDefault, SegmentationMethod::Sar, 5)
                .unwrap();
        let mut sm = submit();
        segments[0].apply_to(&mut sm);

        let single =
            split_message("short", DataCoding::SmscDefault, SegmentationMethod::Sar, 6).unwrap();
        single[0].apply_to(&mut sm);
        assert!(sm.optional.sar().unwrap().is_none());
        assert!(InboundPart::from_message(&sm).unwrap().is_none());
    }

    #[test]
    fn sixteen_bit_udh_reference() {
        let mut sm = submit();
        sm.esm_class = sm.esm_class.with_udhi();
        sm.short_message = Bytes::from_static(&[0x06, 0x08, 0x04, 0x12, 0x34, 0x03, 0x01, 0x41]);
        let part = InboundPart::from_message(&sm).unwrap().unwrap();
        assert_eq!(part.reference, 0x1234);
        assert_eq!(part.total, 3);
        assert_eq!(part.payload.as_ref(), &[0x41]);
    }

    #[test]
    fn udh_without_concatenation_element() {
        let mut sm = submit();
        sm.esm_class = sm.esm_class.with_udhi();
        // port addressing element only
        sm.short_message = Bytes::from_static(&[0x06, 0x05, 0x04, 0x0B, 0x84, 0x23, 0xF0, 0x41]);
        assert!(InboundPart::from_message(&sm).unwrap().is_none());
    }

    #[test]
    fn truncated_udh_is_malformed() {
        let mut sm = submit();
        sm.esm_class = sm.esm_class.with_udhi();
        sm.short_message = Bytes::from_static(&[0x05, 0x00, 0x03, 0x01]);
        assert!(matches!(
            InboundPart::from_message(&sm),
            Err(SegmentationError::MalformedUdh { .. })
        ));
    }
}
