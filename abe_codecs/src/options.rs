use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

use abe_core::{number_to_bytes, BLOCK_SIZE, HALF_BLOCK};

/// Highest fractional-digit count the fixed-point float encoding carries.
pub const MAX_FLOAT_PRECISION: u32 = 12;

pub(crate) const KIND_STRING: u8 = 0;
pub(crate) const KIND_INT: u8 = 1;
pub(crate) const KIND_FLOAT: u8 = 2;

/// Domain of the attested value: raw string, unsigned 64-bit integer, or
/// fixed-point decimal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ValueKind {
    String,
    Int,
    Float,
}

/// How the attested value is encoded.
///
/// `precision` is the number of decimal fractional digits the fixed-point
/// encoding keeps. It is only meaningful for [`ValueKind::Float`] and rides
/// along as 0 for the other kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodingOptions {
    #[serde(rename = "value")]
    pub kind: ValueKind,
    #[serde(default)]
    pub precision: u32,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OptionsError {
    /// The supplied buffer is not exactly one block.
    #[error("encoding options require an exact 1-block buffer")]
    InvalidSize,
    /// The kind byte is not one of 0 (string), 1 (int), 2 (float).
    #[error("unknown value kind {0}")]
    UnknownKind(u8),
    #[error("encoding precision is too big")]
    PrecisionTooBig,
}

/// Encode options as one block: the first half holds the value kind
/// (0 = string, 1 = int, 2 = float), the second half the float precision.
/// Non-float kinds always write a zero precision.
pub fn encode_encoding_options(options: &EncodingOptions) -> Result<Vec<u8>, OptionsError> {
    let (kind, precision) = match options.kind {
        ValueKind::String => (KIND_STRING, 0),
        ValueKind::Int => (KIND_INT, 0),
        ValueKind::Float => {
            if options.precision > MAX_FLOAT_PRECISION {
                return Err(OptionsError::PrecisionTooBig);
            }
            (KIND_FLOAT, options.precision as u64)
        }
    };

    let mut buf = Vec::with_capacity(BLOCK_SIZE);
    buf.extend_from_slice(&number_to_bytes(u64::from(kind)));
    buf.extend_from_slice(&number_to_bytes(precision));
    Ok(buf)
}

/// Decode one block back into options. The precision half is only read for
/// float values; string and int decode with precision 0 no matter what the
/// buffer carries there.
pub fn decode_encoding_options(buf: &[u8]) -> Result<EncodingOptions, OptionsError> {
    if buf.len() != BLOCK_SIZE {
        return Err(OptionsError::InvalidSize);
    }

    match buf[0] {
        KIND_STRING => Ok(EncodingOptions {
            kind: ValueKind::String,
            precision: 0,
        }),
        KIND_INT => Ok(EncodingOptions {
            kind: ValueKind::Int,
            precision: 0,
        }),
        KIND_FLOAT => Ok(EncodingOptions {
            kind: ValueKind::Float,
            precision: u32::from(buf[HALF_BLOCK]),
        }),
        other => Err(OptionsError::UnknownKind(other)),
    }
}
