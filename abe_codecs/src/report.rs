use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use abe_core::{
    bytes_to_number, number_to_bytes, write_padded, MetaHeader, MetaHeaderError, PositionInfo,
    PositionRecorder, WriteError, BLOCK_SIZE,
};

use crate::headers::{decode_headers, encode_headers, HeadersError};
use crate::optional::{
    decode_optional_fields, encode_optional_fields, OptionalFields, OptionalFieldsError,
};
use crate::options::{
    decode_encoding_options, encode_encoding_options, EncodingOptions, OptionsError,
};
use crate::response::{
    decode_response_format, encode_response_format, ResponseFormat, ResponseFormatError,
};
use crate::value::{decode_value, encode_value, ValueError};

/// Block-unit location of every section in an encoded report, in the order
/// the sections are written. An external proof builder keys its
/// field→offset map off this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofPositions {
    pub data: PositionInfo,
    pub timestamp: PositionInfo,
    pub status_code: PositionInfo,
    pub method: PositionInfo,
    pub response_format: PositionInfo,
    pub url: PositionInfo,
    pub selector: PositionInfo,
    pub encoding_options: PositionInfo,
    pub request_headers: PositionInfo,
    pub optional_fields: PositionInfo,
}

/// Everything attested for one request, in decoded form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestationReport {
    pub attestation_data: String,
    pub timestamp: u64,
    pub status_code: u64,
    pub method: String,
    pub response_format: ResponseFormat,
    pub url: String,
    pub selector: String,
    pub encoding_options: EncodingOptions,
    pub request_headers: BTreeMap<String, String>,
    pub optional_fields: OptionalFields,
}

/// An encoded report: the block-aligned buffer plus the sidecar metadata a
/// consumer needs to slice it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedReport {
    pub buffer: Vec<u8>,
    pub meta: MetaHeader,
    pub positions: ProofPositions,
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("attestation data: {0}")]
    Value(#[from] ValueError),
    #[error("encoding options: {0}")]
    Options(#[from] OptionsError),
    #[error("response format: {0}")]
    ResponseFormat(#[from] ResponseFormatError),
    #[error("request headers: {0}")]
    Headers(#[from] HeadersError),
    #[error("optional fields: {0}")]
    OptionalFields(#[from] OptionalFieldsError),
    #[error("meta header: {0}")]
    MetaHeader(#[from] MetaHeaderError),
    #[error(transparent)]
    Write(#[from] WriteError),
    #[error("section `{0}` lies outside the buffer")]
    SectionOutOfRange(&'static str),
    #[error("section `{0}` is shorter than its recorded length")]
    SectionLengthMismatch(&'static str),
    #[error("section `{0}` is not valid UTF-8")]
    InvalidUtf8(&'static str),
}

/// Encode every section of `report` into one block-aligned buffer,
/// recording where each section lands.
///
/// The returned meta header carries the unpadded byte length of each
/// variable section. For the attested value that is the *string* length —
/// exactly what float decoding needs to reproduce trailing redundant
/// zeros.
pub fn encode_report(report: &AttestationReport) -> Result<EncodedReport, ReportError> {
    let mut recorder = PositionRecorder::new(Vec::new(), BLOCK_SIZE);

    let value_buf = encode_value(&report.attestation_data, &report.encoding_options)?;
    let options_buf = encode_encoding_options(&report.encoding_options)?;
    let headers_buf = encode_headers(&report.request_headers);
    let optional_buf = encode_optional_fields(&report.optional_fields);

    let positions = ProofPositions {
        data: write_padded(&mut recorder, &value_buf)?,
        timestamp: write_padded(&mut recorder, &number_to_bytes(report.timestamp))?,
        status_code: write_padded(&mut recorder, &number_to_bytes(report.status_code))?,
        method: write_padded(&mut recorder, report.method.as_bytes())?,
        response_format: write_padded(
            &mut recorder,
            &encode_response_format(report.response_format),
        )?,
        url: write_padded(&mut recorder, report.url.as_bytes())?,
        selector: write_padded(&mut recorder, report.selector.as_bytes())?,
        encoding_options: write_padded(&mut recorder, &options_buf)?,
        request_headers: write_padded(&mut recorder, &headers_buf)?,
        optional_fields: write_padded(&mut recorder, &optional_buf)?,
    };

    let meta = MetaHeader::new(
        report.attestation_data.len() as u16,
        report.method.len() as u16,
        report.url.len() as u16,
        report.selector.len() as u16,
        headers_buf.len() as u16,
        optional_buf.len() as u16,
    );

    Ok(EncodedReport {
        buffer: recorder.into_inner(),
        meta,
        positions,
    })
}

/// Decode a report buffer using the section positions collected at encode
/// time and the lengths from the meta header.
///
/// Sections are sliced independently, so the encoding options can be read
/// first even though the value section precedes them in the buffer.
pub fn decode_report(
    buffer: &[u8],
    meta: &MetaHeader,
    positions: &ProofPositions,
) -> Result<AttestationReport, ReportError> {
    let encoding_options =
        decode_encoding_options(section(buffer, &positions.encoding_options, "encodingOptions")?)?;

    let attestation_data = decode_value(
        section(buffer, &positions.data, "data")?,
        usize::from(meta.attestation_data_len),
        Some(&encoding_options),
    )?;

    let timestamp = bytes_to_number(section(buffer, &positions.timestamp, "timestamp")?);
    let status_code = bytes_to_number(section(buffer, &positions.status_code, "statusCode")?);

    let method = section_string(buffer, &positions.method, meta.method_len, "method")?;
    let response_format =
        decode_response_format(section(buffer, &positions.response_format, "responseFormat")?)?;
    let url = section_string(buffer, &positions.url, meta.url_len, "url")?;
    let selector = section_string(buffer, &positions.selector, meta.selector_len, "selector")?;

    let request_headers =
        decode_headers(section(buffer, &positions.request_headers, "requestHeaders")?)?;
    let optional_fields =
        decode_optional_fields(section(buffer, &positions.optional_fields, "optionalFields")?)?;

    Ok(AttestationReport {
        attestation_data,
        timestamp,
        status_code,
        method,
        response_format,
        url,
        selector,
        encoding_options,
        request_headers,
        optional_fields,
    })
}

/// Slice a section out of the buffer by its block-unit position.
fn section<'a>(
    buffer: &'a [u8],
    pos: &PositionInfo,
    name: &'static str,
) -> Result<&'a [u8], ReportError> {
    let start = pos
        .start_block
        .checked_mul(BLOCK_SIZE)
        .ok_or(ReportError::SectionOutOfRange(name))?;
    let len = pos
        .block_count
        .checked_mul(BLOCK_SIZE)
        .ok_or(ReportError::SectionOutOfRange(name))?;
    let end = start
        .checked_add(len)
        .ok_or(ReportError::SectionOutOfRange(name))?;

    buffer
        .get(start..end)
        .ok_or(ReportError::SectionOutOfRange(name))
}

/// Slice a string section and trim it to its recorded unpadded length.
fn section_string(
    buffer: &[u8],
    pos: &PositionInfo,
    len: u16,
    name: &'static str,
) -> Result<String, ReportError> {
    let section = section(buffer, pos, name)?;
    let len = usize::from(len);
    if len > section.len() {
        return Err(ReportError::SectionLengthMismatch(name));
    }

    String::from_utf8(section[..len].to_vec()).map_err(|_| ReportError::InvalidUtf8(name))
}
