//! Decoders for the small encodings embedded in pebble's listings

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};

/// Marker pebble prints for an unknown value
pub const UNKNOWN: &str = "-";

/// Decode a 9-character `rwxr-xr-x` permission string into mode bits.
///
/// Each position must hold its own letter or `-`; any other length or
/// character is a decode error.
pub fn permissions(text: &str) -> Result<u32> {
    const LETTERS: [u8; 3] = [b'r', b'w', b'x'];

    let bytes = text.as_bytes();
    if bytes.len() != 9 {
        return Err(Error::decode("permissions", text));
    }

    bytes.iter().enumerate().try_fold(0u32, |mode, (i, &b)| {
        let bit = if b == LETTERS[i % 3] {
            1
        } else if b == b'-' {
            0
        } else {
            return Err(Error::decode("permissions", text));
        };
        Ok((mode << 1) | bit)
    })
}

/// Decode a human-readable size such as `811kB`, `1.5MB` or `12B`.
///
/// Units are powers of 1024 and case-insensitive. `-` means the size is
/// unknown and decodes to `None`.
pub fn human_size(text: &str) -> Result<Option<u64>> {
    let text = text.trim();
    if text == UNKNOWN {
        return Ok(None);
    }

    let split = text
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(text.len());
    let (number, unit) = text.split_at(split);

    let multiplier: u64 = match unit.to_ascii_uppercase().as_str() {
        "" | "B" => 1,
        "KB" | "K" => 1 << 10,
        "MB" | "M" => 1 << 20,
        "GB" | "G" => 1 << 30,
        "TB" | "T" => 1 << 40,
        _ => return Err(Error::decode("size", text)),
    };

    if number.is_empty() {
        return Err(Error::decode("size", text));
    }
    if let Ok(whole) = number.parse::<u64>() {
        return whole
            .checked_mul(multiplier)
            .map(Some)
            .ok_or_else(|| Error::decode("size", text));
    }

    let mantissa: f64 = number.parse().map_err(|_| Error::decode("size", text))?;
    let bytes = (mantissa * multiplier as f64).round();
    // 2^64 itself does not fit
    if !(bytes.is_finite() && bytes < u64::MAX as f64) {
        return Err(Error::decode("size", text));
    }
    Ok(Some(bytes as u64))
}

/// Decode an RFC 3339 timestamp as printed with `--abs-time`
pub fn timestamp(text: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text.trim())
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| Error::decode("timestamp", text))
}

/// Decode a timestamp that may be absent (`-` or empty)
pub fn optional_timestamp(text: &str) -> Result<Option<DateTime<Utc>>> {
    let text = text.trim();
    if text.is_empty() || text == UNKNOWN {
        return Ok(None);
    }
    timestamp(text).map(Some)
}

/// Decode a notice's user column; `public` means no specific user
pub fn user_id(text: &str) -> Result<Option<u32>> {
    match text.trim() {
        "public" => Ok(None),
        other => other
            .parse()
            .map(Some)
            .map_err(|_| Error::decode("user", text)),
    }
}

/// Decode a non-negative count
pub fn count(field: &str, text: &str) -> Result<u64> {
    text.trim().parse().map_err(|_| Error::decode(field, text))
}
