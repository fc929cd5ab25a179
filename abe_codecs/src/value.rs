use std::str::FromStr;

use bigdecimal::{BigDecimal, ToPrimitive, Zero};
use thiserror::Error;

use abe_core::{bytes_to_number, number_to_bytes, padding_len, BLOCK_SIZE, HALF_BLOCK};

use crate::options::{EncodingOptions, ValueKind, MAX_FLOAT_PRECISION};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValueError {
    #[error("expected value to parse as an unsigned 64-bit integer")]
    IntParse,
    #[error("encoding precision is too big")]
    PrecisionTooBig,
    #[error("negative numbers are not supported")]
    Negative,
    #[error("decimalless scientific notation is not supported")]
    DecimallessNotation,
    #[error("scientific notation is not supported")]
    ScientificNotation,
    #[error("expected value to parse as a decimal number")]
    FloatParse,
    #[error("cannot encode value without losing information")]
    InfoLoss,
    #[error("value is more precise than the encoding precision")]
    NotEnoughPrecision,
    #[error("cannot decode buffer of unexpected size")]
    BufferTooShort,
    #[error("cannot decode attestation data without encoding options")]
    MissingOptions,
    #[error("decoded string is not valid UTF-8")]
    InvalidUtf8,
}

/// Encode one attested value as a block-aligned buffer.
///
/// Strings are copied as raw bytes; an empty string still occupies one zero
/// block so the section never vanishes. Integers and floats become a single
/// block holding a little-endian `u64` in the first half — floats as the
/// fixed-point value `round(value × 10^precision)`, verified to reproduce
/// the attested string exactly before the encoding is committed.
pub fn encode_value(data: &str, options: &EncodingOptions) -> Result<Vec<u8>, ValueError> {
    let mut buf = match options.kind {
        ValueKind::String => {
            if data.is_empty() {
                return Ok(vec![0; BLOCK_SIZE]);
            }
            data.as_bytes().to_vec()
        }
        ValueKind::Int => int_to_half_block(data)?.to_vec(),
        ValueKind::Float => float_to_half_block(data, options.precision)?.to_vec(),
    };

    let padded_len = buf.len() + padding_len(buf.len(), BLOCK_SIZE);
    buf.resize(padded_len, 0);
    Ok(buf)
}

/// Decode one attested value back to its string form.
///
/// `string_len` is the byte length of the original attested string. It is
/// required for strings (padding is indistinguishable from data) and for
/// floats (it drives the reproduction of trailing redundant zeros); integer
/// decoding ignores it.
pub fn decode_value(
    buf: &[u8],
    string_len: usize,
    options: Option<&EncodingOptions>,
) -> Result<String, ValueError> {
    if buf.len() < BLOCK_SIZE {
        return Err(ValueError::BufferTooShort);
    }
    let options = options.ok_or(ValueError::MissingOptions)?;

    match options.kind {
        ValueKind::String => {
            if string_len > buf.len() {
                return Err(ValueError::BufferTooShort);
            }
            String::from_utf8(buf[..string_len].to_vec()).map_err(|_| ValueError::InvalidUtf8)
        }
        ValueKind::Int => Ok(bytes_to_number(&buf[..HALF_BLOCK]).to_string()),
        ValueKind::Float => {
            // Not producible by this encoder; computing 10^precision past 12
            // would overflow, so reject outright.
            if options.precision > MAX_FLOAT_PRECISION {
                return Err(ValueError::PrecisionTooBig);
            }
            let scaled = bytes_to_number(&buf[..HALF_BLOCK]);
            let digits = adjusted_precision(scaled, options.precision, string_len);
            Ok(format_scaled(scaled, options.precision, digits))
        }
    }
}

/// Parse a base-10 unsigned 64-bit integer and pack it little-endian.
fn int_to_half_block(data: &str) -> Result<[u8; HALF_BLOCK], ValueError> {
    // u64::from_str tolerates a leading '+'; the attested form is bare digits
    if data.starts_with('+') {
        return Err(ValueError::IntParse);
    }

    match data.parse::<u64>() {
        Ok(number) => Ok(number_to_bytes(number)),
        Err(err) => {
            log::debug!("attested value failed to parse as int: {err}");
            Err(ValueError::IntParse)
        }
    }
}

/// Parse a non-negative decimal string and pack `value × 10^precision` as a
/// little-endian `u64`, failing whenever the fixed-point form could not
/// reproduce the attested string exactly.
fn float_to_half_block(data: &str, precision: u32) -> Result<[u8; HALF_BLOCK], ValueError> {
    if precision > MAX_FLOAT_PRECISION {
        return Err(ValueError::PrecisionTooBig);
    }

    let trimmed = trim_redundant_zeros(&data.to_lowercase())?;

    // whatever fraction survived the trim has to fit in the precision
    if let Some(dot) = trimmed.find('.') {
        if trimmed.len() - dot - 1 > precision as usize {
            return Err(ValueError::NotEnoughPrecision);
        }
    }

    if trimmed.contains("p-") {
        return Err(ValueError::DecimallessNotation);
    }
    if trimmed.contains("e+") || trimmed.contains("e-") || trimmed.contains("p+") {
        return Err(ValueError::ScientificNotation);
    }
    if trimmed.contains('-') {
        return Err(ValueError::Negative);
    }

    let value = match BigDecimal::from_str(&trimmed) {
        Ok(value) => value,
        Err(err) => {
            log::debug!("attested value failed to parse as decimal: {err}");
            return Err(ValueError::FloatParse);
        }
    };
    if value < BigDecimal::zero() {
        return Err(ValueError::Negative);
    }

    let scaled = &value * &BigDecimal::from(pow10(precision));

    // exact decimal arithmetic: any fractional digits surviving the scaling
    // mean the precision cannot carry the value
    if scaled.normalized().as_bigint_and_exponent().1 > 0 {
        return Err(ValueError::NotEnoughPrecision);
    }

    // the wire word is 64-bit; a scaled value past u64::MAX cannot be stored
    let scaled = scaled.to_u64().ok_or(ValueError::InfoLoss)?;

    // prove the decoder will recover the exact attested string before
    // committing to the fixed-point representation
    let digits = adjusted_precision(scaled, precision, trimmed.len());
    if format_scaled(scaled, precision, digits) != trimmed {
        return Err(ValueError::InfoLoss);
    }

    Ok(number_to_bytes(scaled))
}

/// Strip trailing fractional zeros (and a then-dangling dot). Those digits
/// carry no information: the original string length is recorded alongside
/// the buffer, so the decoder can put them back.
fn trim_redundant_zeros(data: &str) -> Result<String, ValueError> {
    let Some(dot) = data.find('.') else {
        return Ok(data.to_string());
    };
    if dot == data.len() - 1 {
        // dangling dot with no fraction at all
        return Err(ValueError::FloatParse);
    }

    let trimmed = data.trim_end_matches('0');
    // only a fraction that trimmed away completely leaves the dot dangling;
    // a dot that is not the one found above stays and fails the parse later
    if dot == trimmed.len() - 1 {
        Ok(trimmed[..dot].to_string())
    } else {
        Ok(trimmed.to_string())
    }
}

/// Fractional-digit count that reproduces a string of `target_len` bytes
/// when rendering `scaled / 10^precision`.
///
/// Rendering at full precision and at the original string can differ in
/// length exactly when trailing zeros were trimmed before encoding; the
/// difference corrects the rendering precision so the output length lands
/// on `target_len`.
fn adjusted_precision(scaled: u64, precision: u32, target_len: usize) -> i64 {
    let test = format_scaled(scaled, precision, i64::from(precision));
    let len_diff = test.len() as i64 - target_len as i64;

    let mut adjusted = i64::from(precision);
    if precision != 0 && target_len != 0 && len_diff != 0 {
        adjusted -= len_diff;
    }
    adjusted
}

/// Render `scaled / 10^precision` with exactly `digits` fractional digits,
/// or as a bare integer when `digits <= 0`. Dropped digits round half away
/// from zero.
fn format_scaled(scaled: u64, precision: u32, digits: i64) -> String {
    let magnitude = pow10(precision);
    let mut int_part = scaled / magnitude;
    let frac_part = scaled % magnitude;

    if digits <= 0 {
        if precision > 0 && frac_part * 2 >= magnitude {
            int_part += 1;
        }
        return int_part.to_string();
    }

    let digits = digits as usize;
    let mut frac = format!("{frac_part:0width$}", width = precision as usize);
    if digits >= precision as usize {
        frac.extend(std::iter::repeat('0').take(digits - precision as usize));
    } else {
        let mut kept: u64 = frac[..digits].parse().unwrap_or(0);
        if frac.as_bytes()[digits] >= b'5' {
            kept += 1;
            if kept >= pow10(digits as u32) {
                int_part += 1;
                kept = 0;
            }
        }
        frac = format!("{kept:0width$}", width = digits);
    }

    format!("{int_part}.{frac}")
}

/// Integer power of ten. Callers validate `exp <= MAX_FLOAT_PRECISION`, so
/// the result always fits.
fn pow10(exp: u32) -> u64 {
    10u64.pow(exp)
}
