//! Cheap structural checks that route a frame to a reassembly protocol

use bbqr::header::Header;
use tracing::trace;
use winnow::{
    Parser as _, Result as WinnowResult,
    ascii::digit1,
    token::{literal, rest},
};

use crate::frame::Frame;

const UR_PREFIX: &str = "ur:";

/// Upper bound on `n` in `p<i>of<n>`, slots are allocated up front
pub const MAX_LEGACY_SEGMENTS: usize = 10_000;

/// The two generations of the UR fountain encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum Dialect {
    /// Version 1: bc32 fragments with an optional `iofn` sequence and digest
    Legacy,
    /// Current: bytewords fragments with a `seq-len` header
    Indexed,
}

/// One `p<i>of<n> <payload>` frame, `index` is 1-based
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacySegment {
    pub index: usize,
    pub total: usize,
    pub payload: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolTag {
    Fountain(Dialect),
    SegmentedBlock,
    LegacySegments(LegacySegment),
}

impl ProtocolTag {
    /// Frames with the same protocol can feed the same accumulator
    pub fn same_protocol(&self, other: &Self) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

/// `None` means the frame is a complete payload on its own
pub fn classify(frame: &Frame) -> Option<ProtocolTag> {
    let raw = frame.text_str()?;
    let text = raw.trim();

    let tag = if is_ur(text) {
        ProtocolTag::Fountain(dialect(text))
    } else if Header::try_from_str(text).is_ok() {
        ProtocolTag::SegmentedBlock
    } else {
        // payload whitespace is significant, segments may be split on a space
        ProtocolTag::LegacySegments(legacy_segment(raw.trim_start())?)
    };

    trace!("classified frame as {tag:?}");
    Some(tag)
}

pub fn is_ur(text: &str) -> bool {
    text.get(..UR_PREFIX.len()).is_some_and(|prefix| prefix.eq_ignore_ascii_case(UR_PREFIX))
}

/// Version 1 URs put a bc32 fragment last, bc32 never uses `b`, `i` or `o`, bytewords never
/// use digits
pub fn dialect(text: &str) -> Dialect {
    let lower = text.to_ascii_lowercase();
    let body = lower.strip_prefix(UR_PREFIX).unwrap_or(&lower);
    let components = body.split('/').collect::<Vec<_>>();

    if components.len() > 3 {
        return Dialect::Legacy;
    }

    let last = components.last().copied().unwrap_or_default();
    if last.contains(['b', 'i', 'o']) {
        Dialect::Indexed
    } else if last.bytes().any(|b| b.is_ascii_digit()) {
        Dialect::Legacy
    } else {
        Dialect::Indexed
    }
}

fn legacy_segment(text: &str) -> Option<LegacySegment> {
    let segment = parse_legacy_segment.parse(text).ok()?;

    let valid = segment.index >= 1
        && segment.index <= segment.total
        && segment.total <= MAX_LEGACY_SEGMENTS;
    (valid && !segment.payload.is_empty()).then_some(segment)
}

fn parse_legacy_segment(input: &mut &str) -> WinnowResult<LegacySegment> {
    let _ = literal('p').parse_next(input)?;
    let index = digit1.parse_to().parse_next(input)?;
    let _ = literal("of").parse_next(input)?;
    let total = digit1.parse_to().parse_next(input)?;
    let _ = literal(' ').parse_next(input)?;
    let payload = rest.parse_next(input)?;

    Ok(LegacySegment { index, total, payload: payload.to_string() })
}
