use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

use abe_core::{bytes_to_number, number_to_bytes, padding_len, BLOCK_SIZE, HALF_BLOCK};

// Presence bits in the first byte of the leading block.
const HAS_RESULT_KIND: u8 = 1;
const HAS_CONTENT_TYPE: u8 = 2;
const HAS_BODY: u8 = 4;

const RESULT_KIND_ELEMENT: u8 = 1;
const RESULT_KIND_VALUE: u8 = 2;

/// What an HTML selector resolved to: a whole element or its text value.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum HtmlResultKind {
    Element,
    Value,
}

/// Request fields that may or may not accompany an attestation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionalFields {
    pub html_result_kind: Option<HtmlResultKind>,
    pub content_type: Option<String>,
    pub body: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OptionalFieldsError {
    #[error("cannot decode buffer of unexpected size")]
    BufferTooShort,
    #[error("buffer length doesn't match the block count in the leading block")]
    BlockCountMismatch,
    #[error("unknown HTML result kind {0}")]
    UnknownResultKind(u8),
    #[error("encoded content type length is bigger than the buffer")]
    ContentTypeTooLong,
    #[error("encoded body length is bigger than the buffer")]
    BodyTooLong,
    #[error("could not consume the whole buffer")]
    TrailingData,
    #[error("decoded field is not valid UTF-8")]
    InvalidUtf8,
}

/// Encode the optional request fields.
///
/// # Layout
/// ```text
/// [BLOCK 0: presence bitmask (byte 0) | count of following blocks]
/// [BLOCK 1: HTML result kind tag — 1 = element, 2 = value, 0 = absent]
/// [content type: length block + padded bytes]
/// [body:         length block + padded bytes]
/// ```
/// Absent fields keep their zero placeholder blocks, so at least 3 blocks
/// always follow the header.
pub fn encode_optional_fields(fields: &OptionalFields) -> Vec<u8> {
    let mut header = vec![0u8; BLOCK_SIZE];

    let mut result_kind_buf = vec![0u8; BLOCK_SIZE];
    if let Some(kind) = fields.html_result_kind {
        header[0] |= HAS_RESULT_KIND;
        result_kind_buf[0] = match kind {
            HtmlResultKind::Element => RESULT_KIND_ELEMENT,
            HtmlResultKind::Value => RESULT_KIND_VALUE,
        };
    }

    if fields.content_type.is_some() {
        header[0] |= HAS_CONTENT_TYPE;
    }
    let content_type_buf = length_prefixed(fields.content_type.as_deref());

    if fields.body.is_some() {
        header[0] |= HAS_BODY;
    }
    let body_buf = length_prefixed(fields.body.as_deref());

    let data_len = result_kind_buf.len() + content_type_buf.len() + body_buf.len();
    header[HALF_BLOCK..BLOCK_SIZE]
        .copy_from_slice(&number_to_bytes((data_len / BLOCK_SIZE) as u64));

    let mut buf = Vec::with_capacity(BLOCK_SIZE + data_len);
    buf.extend_from_slice(&header);
    buf.extend_from_slice(&result_kind_buf);
    buf.extend_from_slice(&content_type_buf);
    buf.extend_from_slice(&body_buf);
    buf
}

/// One block carrying the byte length, then the bytes padded to alignment.
/// `None` collapses to the single zero length block.
fn length_prefixed(value: Option<&str>) -> Vec<u8> {
    let mut buf = vec![0u8; BLOCK_SIZE];
    if let Some(value) = value {
        buf[..HALF_BLOCK].copy_from_slice(&number_to_bytes(value.len() as u64));
        buf.extend_from_slice(value.as_bytes());
        let padded_len = buf.len() + padding_len(buf.len(), BLOCK_SIZE);
        buf.resize(padded_len, 0);
    }
    buf
}

/// Decode the optional fields section.
///
/// A zero bitmask returns three absent fields once the block count checks
/// out, without inspecting the placeholder blocks. The result-kind byte is
/// only validated when its presence bit is set; with the bit unset, a
/// nonzero byte in that block is ignored. Declared lengths are
/// bounds-checked before any slicing, and the decoder must have consumed
/// the buffer exactly at the end.
pub fn decode_optional_fields(buf: &[u8]) -> Result<OptionalFields, OptionalFieldsError> {
    if buf.len() < 4 * BLOCK_SIZE {
        return Err(OptionalFieldsError::BufferTooShort);
    }

    let block_count = bytes_to_number(&buf[HALF_BLOCK..BLOCK_SIZE]);
    let expected = (block_count as usize)
        .checked_add(1)
        .and_then(|blocks| blocks.checked_mul(BLOCK_SIZE));
    if expected != Some(buf.len()) {
        return Err(OptionalFieldsError::BlockCountMismatch);
    }

    let mut fields = OptionalFields::default();
    let mask = buf[0];
    if mask == 0 {
        return Ok(fields);
    }

    let mut offset = BLOCK_SIZE;

    if mask & HAS_RESULT_KIND != 0 {
        fields.html_result_kind = Some(match buf[offset] {
            RESULT_KIND_ELEMENT => HtmlResultKind::Element,
            RESULT_KIND_VALUE => HtmlResultKind::Value,
            other => return Err(OptionalFieldsError::UnknownResultKind(other)),
        });
    }
    offset += BLOCK_SIZE;

    if mask & HAS_CONTENT_TYPE != 0 {
        let content_len = bytes_to_number(&buf[offset..offset + HALF_BLOCK]) as usize;
        // the body length block still has to fit after the content bytes
        if content_len > buf.len() - offset - BLOCK_SIZE {
            return Err(OptionalFieldsError::ContentTypeTooLong);
        }

        let content = &buf[offset + BLOCK_SIZE..offset + BLOCK_SIZE + content_len];
        fields.content_type = Some(
            String::from_utf8(content.to_vec()).map_err(|_| OptionalFieldsError::InvalidUtf8)?,
        );
        offset += content_len + padding_len(content_len, BLOCK_SIZE);
    }
    offset += BLOCK_SIZE;

    if mask & HAS_BODY != 0 {
        if offset + BLOCK_SIZE > buf.len() {
            return Err(OptionalFieldsError::BodyTooLong);
        }
        let body_len = bytes_to_number(&buf[offset..offset + HALF_BLOCK]) as usize;
        if body_len > buf.len() - offset - BLOCK_SIZE {
            return Err(OptionalFieldsError::BodyTooLong);
        }

        let body = &buf[offset + BLOCK_SIZE..offset + BLOCK_SIZE + body_len];
        fields.body =
            Some(String::from_utf8(body.to_vec()).map_err(|_| OptionalFieldsError::InvalidUtf8)?);
        offset += body_len + padding_len(body_len, BLOCK_SIZE);
    }
    offset += BLOCK_SIZE;

    if offset != buf.len() {
        return Err(OptionalFieldsError::TrailingData);
    }

    Ok(fields)
}
