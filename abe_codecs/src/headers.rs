use std::collections::BTreeMap;

use thiserror::Error;

use abe_core::{block_to_numbers, number_to_bytes, padding_len, BLOCK_SIZE, HALF_BLOCK};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HeadersError {
    #[error("cannot decode buffer of unexpected size")]
    BufferTooShort,
    #[error("buffer length doesn't match the block count in the leading block")]
    BlockCountMismatch,
    #[error("encoded entry length is bigger than the buffer")]
    EntryTooLong,
    #[error("encoded entry has no separator")]
    MissingSeparator,
    #[error("encoded entry has an empty name")]
    EmptyName,
    #[error("buffer contains non-zero padding")]
    UnexpectedPadding,
    #[error("number of decoded entries doesn't match the count in the leading block")]
    CountMismatch,
    #[error("decoded entry is not valid UTF-8")]
    InvalidUtf8,
}

/// Encode a header map.
///
/// `BTreeMap` iteration is already sorted by name, so the encoding is
/// independent of how the map was built.
///
/// # Layout
/// ```text
/// [BLOCK 0: entry count | entry-block count]     ← leading block, not counted
/// per entry: [len: u16 LE]["name:value"][zero padding to block boundary]
/// ```
/// An empty map is a single zero block.
pub fn encode_headers(headers: &BTreeMap<String, String>) -> Vec<u8> {
    let mut buf = vec![0u8; BLOCK_SIZE];

    for (name, value) in headers {
        let entry = format!("{name}:{value}");
        buf.extend_from_slice(&(entry.len() as u16).to_le_bytes());
        buf.extend_from_slice(entry.as_bytes());
        let padded_len = buf.len() + padding_len(buf.len(), BLOCK_SIZE);
        buf.resize(padded_len, 0);
    }

    let entry_blocks = (buf.len() / BLOCK_SIZE - 1) as u64;
    buf[..HALF_BLOCK].copy_from_slice(&number_to_bytes(headers.len() as u64));
    buf[HALF_BLOCK..BLOCK_SIZE].copy_from_slice(&number_to_bytes(entry_blocks));

    buf
}

/// Decode a header buffer back into a map, rejecting every structural
/// inconsistency: a wrong block count, an entry length past the buffer, a
/// missing `:` separator, an empty name, non-zero padding bytes, and a
/// declared entry count that doesn't match what was parsed.
pub fn decode_headers(buf: &[u8]) -> Result<BTreeMap<String, String>, HeadersError> {
    if buf.len() < BLOCK_SIZE {
        return Err(HeadersError::BufferTooShort);
    }

    let mut headers = BTreeMap::new();

    // a lone leading block is an empty map
    if buf.len() == BLOCK_SIZE {
        return Ok(headers);
    }

    let Some((entry_count, block_count)) = block_to_numbers(&buf[..BLOCK_SIZE]) else {
        return Err(HeadersError::BufferTooShort);
    };

    let expected = (block_count as usize)
        .checked_add(1)
        .and_then(|blocks| blocks.checked_mul(BLOCK_SIZE));
    if expected != Some(buf.len()) {
        return Err(HeadersError::BlockCountMismatch);
    }

    let mut decoded = 0u64;
    let mut offset = BLOCK_SIZE;
    while offset < buf.len() {
        // offset is block-aligned here, so the 2-byte length always fits
        let entry_len = u16::from_le_bytes([buf[offset], buf[offset + 1]]) as usize;
        offset += 2;
        if entry_len > buf.len() - offset {
            return Err(HeadersError::EntryTooLong);
        }

        let entry = std::str::from_utf8(&buf[offset..offset + entry_len])
            .map_err(|_| HeadersError::InvalidUtf8)?;
        offset += entry_len;

        // an entry is "name:value", split around the first colon
        let (name, value) = entry
            .split_once(':')
            .ok_or(HeadersError::MissingSeparator)?;
        if name.is_empty() {
            return Err(HeadersError::EmptyName);
        }
        headers.insert(name.to_string(), value.to_string());
        decoded += 1;

        // skip the entry's padding, verifying it really is zero
        let trailing = offset % BLOCK_SIZE;
        if trailing != 0 {
            let padding = &buf[offset..offset + BLOCK_SIZE - trailing];
            if padding.iter().any(|&byte| byte != 0) {
                return Err(HeadersError::UnexpectedPadding);
            }
            offset += BLOCK_SIZE - trailing;
        }
    }

    if decoded != entry_count {
        return Err(HeadersError::CountMismatch);
    }

    Ok(headers)
}
