//! Version 1 URs
//!
//! `ur:type/fragment`, `ur:type/digest/fragment` or `ur:type/<i>of<n>/digest/fragment`, where
//! the joined fragments are bc32 and the digest is `bc32(sha256(payload))`

use cove_ur::{UrError, bc32};
use sha2::{Digest as _, Sha256};
use tracing::{debug, warn};
use winnow::{Parser as _, Result as WinnowResult, ascii::digit1, token::literal};

use super::{FountainDecoder, FountainError, UrPayload};
use crate::classify::MAX_LEGACY_SEGMENTS;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Part {
    ur_type: String,
    index: usize,
    total: usize,
    digest: Option<String>,
    fragment: String,
}

#[derive(Debug, Default)]
pub struct LegacyDecoder {
    ur_type: String,
    digest: Option<String>,
    slots: Vec<Option<String>>,
    received: usize,
}

impl LegacyDecoder {
    fn accepts(&self, part: &Part) -> bool {
        if self.slots.is_empty() {
            return true;
        }

        if part.ur_type != self.ur_type || part.total != self.slots.len() {
            warn!(
                "ignoring {} part {} of {}, already collecting {} parts of {}",
                part.ur_type,
                part.index,
                part.total,
                self.slots.len(),
                self.ur_type
            );
            return false;
        }

        if part.digest != self.digest {
            warn!("ignoring part {} of {} from a different message", part.index, part.total);
            return false;
        }

        true
    }

    fn finish(&self) -> Result<UrPayload, FountainError> {
        let joined = self.slots.iter().flatten().map(String::as_str).collect::<String>();
        let cbor = bc32::decode(&joined)?;

        if let Some(expected) = &self.digest {
            let actual = bc32::encode(&Sha256::digest(&cbor));
            if *expected != actual {
                return Err(FountainError::DigestMismatch);
            }
        }

        Ok(UrPayload { ur_type: self.ur_type.clone(), cbor })
    }
}

impl FountainDecoder for LegacyDecoder {
    fn receive(&mut self, text: &str) -> Result<Option<UrPayload>, FountainError> {
        let part = parse_part(text)?;
        if !self.accepts(&part) {
            return Ok(None);
        }

        if self.slots.is_empty() {
            debug!("starting v1 {} UR, expecting {} parts", part.ur_type, part.total);
            self.slots = vec![None; part.total];
            self.ur_type = part.ur_type;
            self.digest = part.digest;
        }

        // index was range checked by the parser
        if let Some(slot) = self.slots.get_mut(part.index - 1) {
            *slot = Some(part.fragment);
        }

        self.received = self.slots.iter().filter(|slot| slot.is_some()).count();
        if self.received < self.slots.len() {
            return Ok(None);
        }

        self.finish().map(Some)
    }

    fn estimated_percent_complete(&self) -> f64 {
        if self.slots.is_empty() {
            return 0.0;
        }

        self.received as f64 / self.slots.len() as f64
    }
}

fn parse_part(text: &str) -> Result<Part, FountainError> {
    let lower = text.trim().to_ascii_lowercase();
    let body = lower
        .strip_prefix("ur:")
        .ok_or_else(|| UrError::UrParseError("missing ur: prefix".to_string()))?;

    let components = body.split('/').collect::<Vec<_>>();
    let (ur_type, sequence, digest, fragment) = match components.as_slice() {
        [ur_type, fragment] => (*ur_type, None, None, *fragment),
        [ur_type, digest, fragment] => (*ur_type, None, Some(*digest), *fragment),
        [ur_type, sequence, digest, fragment] => {
            (*ur_type, Some(*sequence), Some(*digest), *fragment)
        }
        _ => {
            let reason = format!("{} path components", components.len());
            return Err(UrError::UrParseError(reason).into());
        }
    };

    if ur_type.is_empty() {
        return Err(UrError::MissingField("ur type").into());
    }

    if fragment.is_empty() {
        return Err(UrError::MissingField("fragment").into());
    }

    let (index, total) = match sequence {
        None => (1, 1),
        Some(sequence) => parse_sequence
            .parse(sequence)
            .map_err(|_| FountainError::InvalidSequence(sequence.to_string()))?,
    };

    if index == 0 || index > total || total > MAX_LEGACY_SEGMENTS {
        return Err(FountainError::InvalidSequence(format!("{index}of{total}")));
    }

    Ok(Part {
        ur_type: ur_type.to_string(),
        index,
        total,
        digest: digest.map(str::to_string),
        fragment: fragment.to_string(),
    })
}

fn parse_sequence(input: &mut &str) -> WinnowResult<(usize, usize)> {
    let index = digit1.parse_to().parse_next(input)?;
    let _ = literal("of").parse_next(input)?;
    let total = digit1.parse_to().parse_next(input)?;

    Ok((index, total))
}
