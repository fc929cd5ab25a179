use std::collections::BTreeMap;
use std::str::FromStr;

use abe_codecs::{
    decode_encoding_options, decode_headers, decode_optional_fields, decode_response_format,
    encode_encoding_options, encode_headers, encode_optional_fields, encode_response_format,
    EncodingOptions, HeadersError, HtmlResultKind, OptionalFields, OptionalFieldsError,
    OptionsError, ResponseFormat, ResponseFormatError, ValueKind,
};

fn headers(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
    entries
        .iter()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect()
}

// ── response format ────────────────────────────────────────────────────────

#[test]
fn response_format_encodes_a_tag_block() {
    assert_eq!(encode_response_format(ResponseFormat::Json), vec![0u8; 16]);

    let mut html = vec![0u8; 16];
    html[0] = 1;
    assert_eq!(encode_response_format(ResponseFormat::Html), html);
}

#[test]
fn response_format_decodes_the_tag_byte() {
    assert_eq!(
        decode_response_format(&[0u8; 16]).unwrap(),
        ResponseFormat::Json
    );

    let mut html = [0u8; 16];
    html[0] = 1;
    assert_eq!(decode_response_format(&html).unwrap(), ResponseFormat::Html);
}

#[test]
fn response_format_rejects_unknown_tags() {
    let mut buf = [0u8; 16];
    buf[0] = 2;
    assert_eq!(
        decode_response_format(&buf),
        Err(ResponseFormatError::Unknown(2))
    );
    assert_eq!(
        decode_response_format(&[0xffu8; 16]),
        Err(ResponseFormatError::Unknown(0xff))
    );
}

#[test]
fn response_format_requires_one_block() {
    assert_eq!(
        decode_response_format(&[]),
        Err(ResponseFormatError::InvalidSize)
    );
    assert_eq!(
        decode_response_format(&[0u8; 6]),
        Err(ResponseFormatError::InvalidSize)
    );
    assert_eq!(
        decode_response_format(&[0u8; 19]),
        Err(ResponseFormatError::InvalidSize)
    );
}

#[test]
fn response_format_parses_from_lowercase_names() {
    assert_eq!(ResponseFormat::from_str("json").unwrap(), ResponseFormat::Json);
    assert_eq!(ResponseFormat::from_str("html").unwrap(), ResponseFormat::Html);
    assert!(ResponseFormat::from_str("xml").is_err());
}

// ── encoding options ───────────────────────────────────────────────────────

#[test]
fn options_encode_kind_and_precision_halves() {
    let string = EncodingOptions {
        kind: ValueKind::String,
        precision: 0,
    };
    assert_eq!(encode_encoding_options(&string).unwrap(), vec![0u8; 16]);

    // precision rides along as zero for non-float kinds
    let string_with_precision = EncodingOptions {
        kind: ValueKind::String,
        precision: 5,
    };
    assert_eq!(
        encode_encoding_options(&string_with_precision).unwrap(),
        vec![0u8; 16]
    );

    let int = EncodingOptions {
        kind: ValueKind::Int,
        precision: 5,
    };
    assert_eq!(
        encode_encoding_options(&int).unwrap(),
        vec![1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]
    );

    let float = EncodingOptions {
        kind: ValueKind::Float,
        precision: 5,
    };
    assert_eq!(
        encode_encoding_options(&float).unwrap(),
        vec![2, 0, 0, 0, 0, 0, 0, 0, 5, 0, 0, 0, 0, 0, 0, 0]
    );

    let float10 = EncodingOptions {
        kind: ValueKind::Float,
        precision: 10,
    };
    assert_eq!(
        encode_encoding_options(&float10).unwrap(),
        vec![2, 0, 0, 0, 0, 0, 0, 0, 0x0a, 0, 0, 0, 0, 0, 0, 0]
    );
}

#[test]
fn options_encode_rejects_excess_float_precision() {
    let options = EncodingOptions {
        kind: ValueKind::Float,
        precision: 100,
    };
    assert_eq!(
        encode_encoding_options(&options),
        Err(OptionsError::PrecisionTooBig)
    );
}

#[test]
fn options_decode_reads_precision_only_for_floats() {
    let mut buf = [0u8; 16];
    buf[8] = 7; // garbage precision for a string kind
    let decoded = decode_encoding_options(&buf).unwrap();
    assert_eq!(decoded.kind, ValueKind::String);
    assert_eq!(decoded.precision, 0);

    buf[0] = 2;
    let decoded = decode_encoding_options(&buf).unwrap();
    assert_eq!(decoded.kind, ValueKind::Float);
    assert_eq!(decoded.precision, 7);
}

#[test]
fn options_decode_rejects_unknown_kind_and_bad_sizes() {
    let mut buf = [0u8; 16];
    buf[0] = 3;
    assert_eq!(decode_encoding_options(&buf), Err(OptionsError::UnknownKind(3)));

    assert_eq!(decode_encoding_options(&[]), Err(OptionsError::InvalidSize));
    assert_eq!(
        decode_encoding_options(&[0u8; 9]),
        Err(OptionsError::InvalidSize)
    );
    assert_eq!(
        decode_encoding_options(&[0u8; 19]),
        Err(OptionsError::InvalidSize)
    );
}

#[test]
fn options_round_trip() {
    for options in [
        EncodingOptions { kind: ValueKind::String, precision: 0 },
        EncodingOptions { kind: ValueKind::Int, precision: 0 },
        EncodingOptions { kind: ValueKind::Float, precision: 0 },
        EncodingOptions { kind: ValueKind::Float, precision: 12 },
    ] {
        let encoded = encode_encoding_options(&options).unwrap();
        assert_eq!(decode_encoding_options(&encoded).unwrap(), options);
    }
}

#[test]
fn options_parse_from_the_original_json_shape() {
    let options: EncodingOptions =
        serde_json::from_str(r#"{"value": "float", "precision": 5}"#).unwrap();
    assert_eq!(options.kind, ValueKind::Float);
    assert_eq!(options.precision, 5);

    let options: EncodingOptions = serde_json::from_str(r#"{"value": "int"}"#).unwrap();
    assert_eq!(options.kind, ValueKind::Int);
    assert_eq!(options.precision, 0);
}

// ── headers ────────────────────────────────────────────────────────────────

#[test]
fn empty_header_map_is_one_zero_block() {
    assert_eq!(encode_headers(&BTreeMap::new()), vec![0u8; 16]);
    assert_eq!(decode_headers(&[0u8; 16]).unwrap(), BTreeMap::new());
}

#[test]
fn single_header_layout() {
    assert_eq!(
        encode_headers(&headers(&[("a", "b")])),
        vec![
            1, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, // count 1, one entry block
            3, 0, 0x61, 0x3a, 0x62, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
        ]
    );
}

#[test]
fn headers_are_sorted_by_name() {
    assert_eq!(
        encode_headers(&headers(&[("c", "?"), ("a", "b")])),
        vec![
            2, 0, 0, 0, 0, 0, 0, 0, 2, 0, 0, 0, 0, 0, 0, 0, //
            3, 0, 0x61, 0x3a, 0x62, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, //
            3, 0, 0x63, 0x3a, 0x3f, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
        ]
    );
}

#[test]
fn long_header_spans_blocks() {
    let map = headers(&[("a", "b"), ("c", "abcdefghijklmnopqrstuvwxyz")]);
    let encoded = encode_headers(&map);

    assert_eq!(encoded.len(), 64);
    assert_eq!(encoded[0], 2, "two entries");
    assert_eq!(encoded[8], 3, "three entry blocks");
    assert_eq!(&encoded[32..34], &[28, 0], "second entry length");
    assert_eq!(&encoded[34..37], b"c:a");
    assert_eq!(decode_headers(&encoded).unwrap(), map);
}

#[test]
fn header_values_may_contain_colons() {
    let map = headers(&[("host", "example.com:8080")]);
    let decoded = decode_headers(&encode_headers(&map)).unwrap();
    assert_eq!(decoded, map);
}

#[test]
fn headers_decode_rejects_short_buffers() {
    assert_eq!(decode_headers(&[]), Err(HeadersError::BufferTooShort));
    assert_eq!(
        decode_headers(&[0, 0, 0, 0]),
        Err(HeadersError::BufferTooShort)
    );
}

#[test]
fn headers_decode_rejects_count_length_mismatch() {
    // declares 1 entry block but carries none
    let mut buf = vec![0u8; 32];
    buf[0] = 2;
    buf[8] = 3;
    assert_eq!(decode_headers(&buf), Err(HeadersError::BlockCountMismatch));
}

#[test]
fn headers_decode_rejects_entry_length_past_buffer() {
    let mut buf = vec![0u8; 32];
    buf[0] = 1;
    buf[8] = 1;
    buf[16] = 255;
    assert_eq!(decode_headers(&buf), Err(HeadersError::EntryTooLong));
}

#[test]
fn headers_decode_rejects_entry_without_separator() {
    let mut buf = vec![0u8; 32];
    buf[0] = 1;
    buf[8] = 1;
    buf[16] = 14;
    assert_eq!(decode_headers(&buf), Err(HeadersError::MissingSeparator));
}

#[test]
fn headers_decode_rejects_empty_name() {
    let mut buf = vec![0u8; 32];
    buf[0] = 1;
    buf[8] = 1;
    buf[16] = 14;
    buf[18] = b':';
    buf[19..32].fill(b'a');
    assert_eq!(decode_headers(&buf), Err(HeadersError::EmptyName));
}

#[test]
fn headers_decode_rejects_count_mismatch() {
    // one valid entry, but the leading block declares two
    let mut buf = vec![0u8; 32];
    buf[0] = 2;
    buf[8] = 1;
    buf[16] = 14;
    buf[18] = b'a';
    buf[19] = b':';
    buf[20..32].fill(b'a');
    assert_eq!(decode_headers(&buf), Err(HeadersError::CountMismatch));
}

#[test]
fn headers_decode_rejects_nonzero_padding() {
    // a 15-byte entry leaves 13 bytes of padding in the second entry block;
    // filling them with 'a' keeps the lengths consistent but must fail
    let mut buf = vec![0u8; 48];
    buf[0] = 1;
    buf[8] = 2;
    buf[16] = 15;
    buf[18] = b'a';
    buf[19] = b':';
    buf[20..33].fill(b'a');
    buf[33..48].fill(b'a');
    assert_eq!(decode_headers(&buf), Err(HeadersError::UnexpectedPadding));
}

#[test]
fn headers_decode_parses_valid_buffers() {
    let mut buf = vec![0u8; 32];
    buf[0] = 1;
    buf[8] = 1;
    buf[16] = 14;
    buf[18] = b'a';
    buf[19] = b':';
    buf[20..32].fill(b'a');
    assert_eq!(
        decode_headers(&buf).unwrap(),
        headers(&[("a", "aaaaaaaaaaaa")])
    );
}

#[test]
fn headers_round_trip_is_order_independent() {
    let forward = headers(&[("accept", "text/html"), ("host", "example.com"), ("x-a", "1")]);
    let reverse = headers(&[("x-a", "1"), ("host", "example.com"), ("accept", "text/html")]);

    assert_eq!(encode_headers(&forward), encode_headers(&reverse));
    assert_eq!(decode_headers(&encode_headers(&forward)).unwrap(), forward);
}

// ── optional fields ────────────────────────────────────────────────────────

#[test]
fn absent_optional_fields_still_occupy_four_blocks() {
    let encoded = encode_optional_fields(&OptionalFields::default());

    let mut expected = vec![0u8; 64];
    expected[8] = 3; // three placeholder blocks follow the header
    assert_eq!(encoded, expected);
    assert_eq!(
        decode_optional_fields(&encoded).unwrap(),
        OptionalFields::default()
    );
}

#[test]
fn html_result_kind_occupies_the_second_block() {
    let fields = OptionalFields {
        html_result_kind: Some(HtmlResultKind::Element),
        ..Default::default()
    };
    let encoded = encode_optional_fields(&fields);
    assert_eq!(encoded[0], 1, "presence bit");
    assert_eq!(encoded[8], 3, "block count");
    assert_eq!(encoded[16], 1, "element tag");
    assert_eq!(decode_optional_fields(&encoded).unwrap(), fields);

    let fields = OptionalFields {
        html_result_kind: Some(HtmlResultKind::Value),
        ..Default::default()
    };
    let encoded = encode_optional_fields(&fields);
    assert_eq!(encoded[16], 2, "value tag");
    assert_eq!(decode_optional_fields(&encoded).unwrap(), fields);
}

#[test]
fn content_type_is_length_prefixed_and_padded() {
    let fields = OptionalFields {
        content_type: Some("text/plain".to_string()),
        ..Default::default()
    };
    let encoded = encode_optional_fields(&fields);

    assert_eq!(encoded.len(), 80);
    assert_eq!(encoded[0], 2, "presence bit");
    assert_eq!(encoded[8], 4, "block count");
    assert_eq!(encoded[32], 10, "content length");
    assert_eq!(&encoded[48..58], b"text/plain");
    assert_eq!(decode_optional_fields(&encoded).unwrap(), fields);
}

#[test]
fn body_is_length_prefixed_and_padded() {
    let fields = OptionalFields {
        body: Some("short body text".to_string()),
        ..Default::default()
    };
    let encoded = encode_optional_fields(&fields);

    assert_eq!(encoded.len(), 80);
    assert_eq!(encoded[0], 4, "presence bit");
    assert_eq!(encoded[8], 4, "block count");
    assert_eq!(encoded[48], 15, "body length");
    assert_eq!(&encoded[64..79], b"short body text");
    assert_eq!(decode_optional_fields(&encoded).unwrap(), fields);
}

#[test]
fn all_optional_fields_together() {
    let fields = OptionalFields {
        html_result_kind: Some(HtmlResultKind::Value),
        content_type: Some("text/plain".to_string()),
        body: Some("short body text".to_string()),
    };
    let encoded = encode_optional_fields(&fields);

    assert_eq!(encoded[0], 7, "all three presence bits");
    assert_eq!(encoded[8], 5, "block count");
    assert_eq!(decode_optional_fields(&encoded).unwrap(), fields);
}

#[test]
fn every_subset_of_optional_fields_round_trips() {
    let kinds = [None, Some(HtmlResultKind::Element)];
    let contents = [None, Some("multipart/form-data".to_string())];
    let bodies = [None, Some("Lorem ipsum dolor sit amet".to_string())];

    for kind in kinds {
        for content_type in &contents {
            for body in &bodies {
                let fields = OptionalFields {
                    html_result_kind: kind,
                    content_type: content_type.clone(),
                    body: body.clone(),
                };
                let decoded = decode_optional_fields(&encode_optional_fields(&fields)).unwrap();
                assert_eq!(decoded, fields);
            }
        }
    }
}

#[test]
fn optional_fields_decode_requires_four_blocks() {
    assert_eq!(
        decode_optional_fields(&[]),
        Err(OptionalFieldsError::BufferTooShort)
    );
    assert_eq!(
        decode_optional_fields(&[0u8; 63]),
        Err(OptionalFieldsError::BufferTooShort)
    );
}

#[test]
fn optional_fields_decode_checks_the_block_count() {
    // an all-zero buffer declares 0 following blocks but carries 3
    assert_eq!(
        decode_optional_fields(&[0u8; 64]),
        Err(OptionalFieldsError::BlockCountMismatch)
    );

    let mut buf = vec![0u8; 64];
    buf[8] = 2;
    assert_eq!(
        decode_optional_fields(&buf),
        Err(OptionalFieldsError::BlockCountMismatch)
    );
}

#[test]
fn unknown_result_kind_is_rejected_when_its_bit_is_set() {
    let mut buf = vec![0u8; 64];
    buf[0] = 1;
    buf[8] = 3;
    buf[16] = 3;
    assert_eq!(
        decode_optional_fields(&buf),
        Err(OptionalFieldsError::UnknownResultKind(3))
    );
}

#[test]
fn stray_result_kind_byte_is_ignored_when_its_bit_is_unset() {
    // only the content-type bit is set; the nonzero byte in the result-kind
    // placeholder block is not inspected
    let fields = OptionalFields {
        content_type: Some("text/plain".to_string()),
        ..Default::default()
    };
    let mut encoded = encode_optional_fields(&fields);
    encoded[16] = 3;
    assert_eq!(decode_optional_fields(&encoded).unwrap(), fields);
}

#[test]
fn oversized_content_type_length_is_rejected() {
    let fields = OptionalFields {
        content_type: Some("text/plain".to_string()),
        ..Default::default()
    };
    let mut encoded = encode_optional_fields(&fields);
    encoded[32] = 200;
    assert_eq!(
        decode_optional_fields(&encoded),
        Err(OptionalFieldsError::ContentTypeTooLong)
    );
}

#[test]
fn oversized_body_length_is_rejected() {
    let fields = OptionalFields {
        body: Some("short body text".to_string()),
        ..Default::default()
    };
    let mut encoded = encode_optional_fields(&fields);
    encoded[48] = 200;
    assert_eq!(
        decode_optional_fields(&encoded),
        Err(OptionalFieldsError::BodyTooLong)
    );
}
