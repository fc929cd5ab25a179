use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::block::BLOCK_SIZE;

/// Fixed size of the encoded meta header: 2 blocks.
///   10 × u16 section lengths at offsets 0, 2, ..., 18
///   + reserved[12] (zero)
///   = 20 + 12 = 32
pub const META_HEADER_SIZE: usize = BLOCK_SIZE * 2;

/// A timestamp section holds one `u64`, so its length is always 8.
pub const TIMESTAMP_LEN: u16 = 8;
/// A status-code section holds one `u64`, so its length is always 8.
pub const STATUS_CODE_LEN: u16 = 8;
/// A response-format section carries a single tag byte.
pub const RESPONSE_FORMAT_LEN: u16 = 1;
/// An encoding-options section holds two `u64` halves, 16 bytes.
pub const ENCODING_OPTIONS_LEN: u16 = 16;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MetaHeaderError {
    /// The supplied buffer is not exactly [`META_HEADER_SIZE`] bytes.
    #[error("meta header requires an exact 2-block buffer")]
    InvalidSize,
}

/// Byte length of every section in an encoded attestation report.
///
/// The header occupies a fixed 32 bytes with one little-endian `u16` per
/// section, in encoding order, so a consumer can locate any section without
/// a length-prefix scanning pass. Variable-length sections record the
/// unpadded length of their content; sections with a fixed encoding always
/// record their fixed length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaHeader {
    pub attestation_data_len: u16,
    pub timestamp_len: u16,
    pub status_code_len: u16,
    pub method_len: u16,
    pub response_format_len: u16,
    pub url_len: u16,
    pub selector_len: u16,
    pub encoding_options_len: u16,
    pub headers_len: u16,
    pub optional_fields_len: u16,
}

impl MetaHeader {
    /// Build a header for the given variable-length sections; the
    /// fixed-encoding sections get their constant lengths.
    pub fn new(
        attestation_data_len: u16,
        method_len: u16,
        url_len: u16,
        selector_len: u16,
        headers_len: u16,
        optional_fields_len: u16,
    ) -> Self {
        Self {
            attestation_data_len,
            timestamp_len: TIMESTAMP_LEN,
            status_code_len: STATUS_CODE_LEN,
            method_len,
            response_format_len: RESPONSE_FORMAT_LEN,
            url_len,
            selector_len,
            encoding_options_len: ENCODING_OPTIONS_LEN,
            headers_len,
            optional_fields_len,
        }
    }

    /// Serialize into a caller-supplied buffer of exactly
    /// [`META_HEADER_SIZE`] bytes. Bytes 20..32 are zeroed.
    pub fn write_into(&self, header: &mut [u8]) -> Result<(), MetaHeaderError> {
        if header.len() != META_HEADER_SIZE {
            return Err(MetaHeaderError::InvalidSize);
        }

        header[0..2].copy_from_slice(&self.attestation_data_len.to_le_bytes());
        header[2..4].copy_from_slice(&self.timestamp_len.to_le_bytes());
        header[4..6].copy_from_slice(&self.status_code_len.to_le_bytes());
        header[6..8].copy_from_slice(&self.method_len.to_le_bytes());
        header[8..10].copy_from_slice(&self.response_format_len.to_le_bytes());
        header[10..12].copy_from_slice(&self.url_len.to_le_bytes());
        header[12..14].copy_from_slice(&self.selector_len.to_le_bytes());
        header[14..16].copy_from_slice(&self.encoding_options_len.to_le_bytes());
        header[16..18].copy_from_slice(&self.headers_len.to_le_bytes());
        header[18..20].copy_from_slice(&self.optional_fields_len.to_le_bytes());
        header[20..].fill(0);

        Ok(())
    }

    /// Deserialize from exactly [`META_HEADER_SIZE`] bytes.
    pub fn from_bytes(header: &[u8]) -> Result<Self, MetaHeaderError> {
        if header.len() != META_HEADER_SIZE {
            return Err(MetaHeaderError::InvalidSize);
        }

        let field = |i: usize| u16::from_le_bytes([header[i * 2], header[i * 2 + 1]]);
        Ok(Self {
            attestation_data_len: field(0),
            timestamp_len: field(1),
            status_code_len: field(2),
            method_len: field(3),
            response_format_len: field(4),
            url_len: field(5),
            selector_len: field(6),
            encoding_options_len: field(7),
            headers_len: field(8),
            optional_fields_len: field(9),
        })
    }
}
