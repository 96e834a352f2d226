// src/nmea/fields.rs
//! Decoders for raw NMEA field text
//!
//! Decoding is strict: a malformed digit rejects the field, and a rejected
//! field rejects the whole sentence. Empty text for an optional numeric
//! field means the field is absent, never zero.

use crate::position::KNOT_TO_METER_PER_SECOND;

const MS_PER_DAY: u32 = 24 * 60 * 60 * 1000;

fn digit(b: u8) -> Option<u32> {
    if b.is_ascii_digit() {
        Some(u32::from(b - b'0'))
    } else {
        None
    }
}

/// Decode an `HHMMSS[.SSSS]` time of day to milliseconds since midnight.
///
/// Up to three fractional digits contribute milliseconds; a fourth rounds
/// the last millisecond up when it exceeds 5. Anything past the fourth
/// fractional digit is ignored.
pub fn decode_time(text: &str) -> Option<u32> {
    let b = text.as_bytes();
    if b.len() < 6 {
        return None;
    }
    let h = digit(b[0])? * 10 + digit(b[1])?;
    let m = digit(b[2])? * 10 + digit(b[3])?;
    let s = digit(b[4])? * 10 + digit(b[5])?;
    if h > 23 || m > 59 || s > 59 {
        return None;
    }
    let mut x = ((h * 60 + m) * 60 + s) * 1000;
    match b.get(6) {
        None => {}
        Some(b'.') => {
            if let Some(&c) = b.get(7) {
                x += digit(c)? * 100;
                if let Some(&c) = b.get(8) {
                    x += digit(c)? * 10;
                    if let Some(&c) = b.get(9) {
                        x += digit(c)?;
                        if let Some(&c) = b.get(10) {
                            digit(c)?;
                            if c > b'5' {
                                x += 1;
                            }
                        }
                    }
                }
            }
        }
        Some(_) => return None,
    }
    // 235959.9996 would otherwise round into the next day
    if x >= MS_PER_DAY {
        return None;
    }
    Some(x)
}

/// Decode an NMEA `dddmm.mmm` angle into decimal degrees.
///
/// The decimal point position decides the split: the last two digits
/// before it belong to the minutes, anything further left is whole
/// degrees.
pub fn decode_angle(text: &str) -> Option<f64> {
    let b = text.as_bytes();
    let dot = text.find('.').unwrap_or(text.len());
    if dot > 5 {
        return None;
    }
    let deg_digits = dot.saturating_sub(2);
    let mut degrees: u32 = 0;
    for &c in &b[..deg_digits] {
        degrees = degrees * 10 + digit(c)?;
    }
    let minutes = &text[deg_digits..];
    if minutes.is_empty() || !minutes.bytes().all(|c| c.is_ascii_digit() || c == b'.') {
        return None;
    }
    let minutes: f64 = minutes.parse().ok()?;
    Some(f64::from(degrees) + minutes / 60.0)
}

/// Latitude in signed degrees from an angle field and its `N`/`S` letter.
pub fn decode_latitude(angle: &str, hemisphere: &str) -> Option<f64> {
    let value = decode_angle(angle)?;
    match hemisphere {
        "N" => Some(value),
        "S" => Some(-value),
        _ => None,
    }
}

/// Longitude from an angle field and its `E`/`W` letter.
///
/// West longitudes come back as `360 - angle`, so the result lives on a
/// 0..360 scale where values above 180 lie west of Greenwich.
pub fn decode_longitude(angle: &str, hemisphere: &str) -> Option<f64> {
    let value = decode_angle(angle)?;
    match hemisphere {
        "E" => Some(value),
        "W" => Some(360.0 - value),
        _ => None,
    }
}

/// Strictly parse a plain decimal number, optional leading minus allowed.
pub fn decode_number(text: &str) -> Option<f64> {
    let digits = text.strip_prefix('-').unwrap_or(text);
    if digits.is_empty() || !digits.bytes().all(|c| c.is_ascii_digit() || c == b'.') {
        return None;
    }
    text.parse().ok()
}

/// Speed over ground in m/s from a knots field.
pub fn decode_speed(text: &str) -> Option<f64> {
    decode_number(text).map(|knots| knots * KNOT_TO_METER_PER_SECOND)
}
