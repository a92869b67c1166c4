//! Decoder for HERE's flexible polyline encoding.
//!
//! The payload is a sequence of base64url-alphabet characters, each carrying
//! five value bits plus a continuation bit. The first two values are a format
//! version and a header describing precision and an optional third dimension;
//! the rest are zigzag-encoded deltas per coordinate.

use thiserror::Error;

const FORMAT_VERSION: u64 = 1;
const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("invalid character '{0}'")]
    InvalidCharacter(char),

    #[error("unexpected end of input")]
    UnexpectedEnd,

    #[error("unsupported format version {0}")]
    UnsupportedVersion(u64),

    #[error("value overflow")]
    Overflow,
}

fn decode_char(c: u8) -> Result<u64, DecodeError> {
    ALPHABET
        .iter()
        .position(|&a| a == c)
        .map(|p| p as u64)
        .ok_or(DecodeError::InvalidCharacter(c as char))
}

struct Values<'a> {
    bytes: std::slice::Iter<'a, u8>,
}

impl Values<'_> {
    fn next_unsigned(&mut self) -> Result<Option<u64>, DecodeError> {
        let mut result: u64 = 0;
        let mut shift = 0;
        let mut started = false;

        for &byte in self.bytes.by_ref() {
            started = true;
            let value = decode_char(byte)?;
            if shift > 60 {
                return Err(DecodeError::Overflow);
            }
            result |= (value & 0x1f) << shift;
            if value & 0x20 == 0 {
                return Ok(Some(result));
            }
            shift += 5;
        }

        if started {
            Err(DecodeError::UnexpectedEnd)
        } else {
            Ok(None)
        }
    }

    fn next_signed(&mut self) -> Result<Option<i64>, DecodeError> {
        Ok(self.next_unsigned()?.map(|v| {
            let magnitude = (v >> 1) as i64;
            if v & 1 == 1 {
                !magnitude
            } else {
                magnitude
            }
        }))
    }
}

/// Decode into `(lat, lng)` pairs. A third dimension, if present, is read
/// and dropped.
pub fn decode(encoded: &str) -> Result<Vec<(f64, f64)>, DecodeError> {
    let mut values = Values {
        bytes: encoded.trim().as_bytes().iter(),
    };

    let version = values.next_unsigned()?.ok_or(DecodeError::UnexpectedEnd)?;
    if version != FORMAT_VERSION {
        return Err(DecodeError::UnsupportedVersion(version));
    }

    let header = values.next_unsigned()?.ok_or(DecodeError::UnexpectedEnd)?;
    let precision = (header & 0x0f) as i32;
    let has_third_dimension = (header >> 4) & 0x07 != 0;
    let factor = 10_f64.powi(precision);

    let mut points = Vec::new();
    let (mut lat, mut lng) = (0_i64, 0_i64);

    while let Some(delta_lat) = values.next_signed()? {
        let delta_lng = values.next_signed()?.ok_or(DecodeError::UnexpectedEnd)?;
        if has_third_dimension {
            values.next_signed()?.ok_or(DecodeError::UnexpectedEnd)?;
        }

        lat = lat.checked_add(delta_lat).ok_or(DecodeError::Overflow)?;
        lng = lng.checked_add(delta_lng).ok_or(DecodeError::Overflow)?;
        points.push((lat as f64 / factor, lng as f64 / factor));
    }

    Ok(points)
}
