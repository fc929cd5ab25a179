mod headers;
mod optional;
mod options;
mod report;
mod response;
mod value;

pub use headers::{decode_headers, encode_headers, HeadersError};
pub use optional::{
    decode_optional_fields, encode_optional_fields, HtmlResultKind, OptionalFields,
    OptionalFieldsError,
};
pub use options::{
    decode_encoding_options, encode_encoding_options, EncodingOptions, OptionsError, ValueKind,
    MAX_FLOAT_PRECISION,
};
pub use report::{
    decode_report, encode_report, AttestationReport, EncodedReport, ProofPositions, ReportError,
};
pub use response::{
    decode_response_format, encode_response_format, ResponseFormat, ResponseFormatError,
};
pub use value::{decode_value, encode_value, ValueError};
