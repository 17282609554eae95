//! Shared CBOR plumbing for registry items
//!
//! Every registry item has a fixed tag, but the tag is optional wherever the surrounding
//! context (the UR type, or a parent map key) already says what the item is. Items implement
//! [`RegistryItem`] for their untagged body and get tagged, untagged and maybe-tagged decoding
//! for free.

use minicbor::{
    Decoder, Encoder,
    data::{Tag, Type},
};

use crate::error::*;

pub type CborEncoder<'a> = Encoder<&'a mut Vec<u8>>;

pub trait RegistryItem: Sized {
    const TAG: u64;

    fn decode_body(decoder: &mut Decoder<'_>) -> Result<Self>;

    fn encode_body(&self, encoder: &mut CborEncoder<'_>) -> Result<()>;

    /// Decode a value that must carry this item's tag
    fn decode_tagged(decoder: &mut Decoder<'_>) -> Result<Self> {
        expect_tag(decoder, Self::TAG)?;
        Self::decode_body(decoder)
    }

    /// Decode a value whose tag may be omitted
    fn decode_maybe_tagged(decoder: &mut Decoder<'_>) -> Result<Self> {
        match decoder.datatype().map_err_cbor_decode()? {
            Type::Tag => Self::decode_tagged(decoder),
            _ => Self::decode_body(decoder),
        }
    }

    /// Decode a top level UR message, tagged or not
    fn from_cbor(cbor: &[u8]) -> Result<Self> {
        Self::decode_maybe_tagged(&mut Decoder::new(cbor))
    }

    fn encode_tagged(&self, encoder: &mut CborEncoder<'_>) -> Result<()> {
        encoder.tag(Tag::new(Self::TAG)).map_err_cbor_encode()?;
        self.encode_body(encoder)
    }

    /// Encode as tagged CBOR
    fn to_cbor(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        self.encode_tagged(&mut Encoder::new(&mut buffer))?;
        Ok(buffer)
    }
}

pub(crate) fn expect_tag(decoder: &mut Decoder<'_>, expected: u64) -> Result<()> {
    let actual = decoder.tag().map_err_cbor_decode()?.as_u64();
    if actual != expected {
        return Err(UrError::InvalidTag { expected, actual });
    }

    Ok(())
}

/// Read the next tag without consuming it
pub(crate) fn peek_tag(decoder: &mut Decoder<'_>) -> Result<Option<u64>> {
    if decoder.datatype().map_err_cbor_decode()? != Type::Tag {
        return Ok(None);
    }

    let position = decoder.position();
    let tag = decoder.tag().map_err_cbor_decode()?;
    decoder.set_position(position);

    Ok(Some(tag.as_u64()))
}

pub(crate) fn map_len(decoder: &mut Decoder<'_>) -> Result<u64> {
    decoder
        .map()
        .map_err_cbor_decode()?
        .ok_or_else(|| UrError::CborDecodeError("Expected definite-length map".to_string()))
}

pub(crate) fn array_len(decoder: &mut Decoder<'_>) -> Result<u64> {
    decoder
        .array()
        .map_err_cbor_decode()?
        .ok_or_else(|| UrError::CborDecodeError("Expected definite-length array".to_string()))
}

/// Fingerprints travel as big-endian u32
pub(crate) fn fingerprint(decoder: &mut Decoder<'_>) -> Result<[u8; 4]> {
    Ok(decoder.u32().map_err_cbor_decode()?.to_be_bytes())
}

pub(crate) fn text(decoder: &mut Decoder<'_>) -> Result<String> {
    Ok(decoder.str().map_err_cbor_decode()?.to_string())
}

pub(crate) fn bytes(decoder: &mut Decoder<'_>) -> Result<Vec<u8>> {
    Ok(decoder.bytes().map_err_cbor_decode()?.to_vec())
}

/// Write a map key followed by a fingerprint
pub(crate) fn put_fingerprint(
    encoder: &mut CborEncoder<'_>,
    key: u32,
    fingerprint: [u8; 4],
) -> Result<()> {
    encoder.u32(key).map_err_cbor_encode()?;
    encoder.u32(u32::from_be_bytes(fingerprint)).map_err_cbor_encode()?;
    Ok(())
}
