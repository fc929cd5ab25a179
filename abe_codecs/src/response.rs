use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

use abe_core::BLOCK_SIZE;

const FORMAT_JSON: u8 = 0;
const FORMAT_HTML: u8 = 1;

/// Shape of the attested web response the value was extracted from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ResponseFormat {
    Json,
    Html,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResponseFormatError {
    /// The supplied buffer is not exactly one block.
    #[error("response format requires an exact 1-block buffer")]
    InvalidSize,
    /// The tag byte is not one of 0 (json), 1 (html).
    #[error("unknown response format {0}")]
    Unknown(u8),
}

/// One block whose first byte tags the format: 0 = json, 1 = html.
pub fn encode_response_format(format: ResponseFormat) -> Vec<u8> {
    let mut buf = vec![0; BLOCK_SIZE];
    buf[0] = match format {
        ResponseFormat::Json => FORMAT_JSON,
        ResponseFormat::Html => FORMAT_HTML,
    };
    buf
}

pub fn decode_response_format(buf: &[u8]) -> Result<ResponseFormat, ResponseFormatError> {
    if buf.len() != BLOCK_SIZE {
        return Err(ResponseFormatError::InvalidSize);
    }

    match buf[0] {
        FORMAT_JSON => Ok(ResponseFormat::Json),
        FORMAT_HTML => Ok(ResponseFormat::Html),
        other => Err(ResponseFormatError::Unknown(other)),
    }
}
