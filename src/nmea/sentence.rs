// src/nmea/sentence.rs
//! GGA and RMC sentence decoding

use super::fields;
use crate::position::Fix;

/// Field count after the `GGA,` tag, trailing empties included.
const GGA_FIELDS: usize = 14;
/// Field count after the `RMC,` tag.
const RMC_FIELDS: usize = 12;

/// Decode one sentence body (leading `$` and checksum already stripped).
///
/// Only GGA and RMC sentences are understood, from any talker. Anything
/// else comes back as `None`, as does a sentence that fails validation.
pub fn decode_sentence(line: &str) -> Option<Fix> {
    let b = line.as_bytes();
    if b.len() < 6 {
        return None;
    }
    match &b[2..6] {
        b"GGA," => decode_gga(&line[6..]),
        b"RMC," => decode_rmc(&line[6..]),
        _ => None,
    }
}

/// GGA carries time, position and altitude. Rejected when the fix-quality
/// field starts with `0`.
fn decode_gga(body: &str) -> Option<Fix> {
    let f: Vec<&str> = body.split(',').collect();
    if f.len() != GGA_FIELDS {
        return None;
    }
    if f[5].starts_with('0') {
        return None;
    }

    let mut fix = Fix::new();
    fix.time_ms = Some(fields::decode_time(f[0])?);
    fix.latitude = Some(fields::decode_latitude(f[1], f[2])?);
    fix.longitude = Some(fields::decode_longitude(f[3], f[4])?);
    fix.altitude = match (f[8], f[9]) {
        ("", "M") => None,
        (value, "M") => Some(fields::decode_number(value)?),
        _ => return None,
    };
    Some(fix)
}

/// RMC carries time, position, speed and track. Rejected unless the status
/// field reads `A`.
fn decode_rmc(body: &str) -> Option<Fix> {
    let f: Vec<&str> = body.split(',').collect();
    if f.len() != RMC_FIELDS {
        return None;
    }
    if f[1] != "A" {
        return None;
    }

    let mut fix = Fix::new();
    fix.time_ms = Some(fields::decode_time(f[0])?);
    fix.latitude = Some(fields::decode_latitude(f[2], f[3])?);
    fix.longitude = Some(fields::decode_longitude(f[4], f[5])?);
    fix.speed = match f[6] {
        "" => None,
        knots => Some(fields::decode_speed(knots)?),
    };
    fix.track = match f[7] {
        "" => None,
        degrees => Some(fields::decode_number(degrees)?),
    };
    // the date field (f[8]) is not carried into the fix
    Some(fix)
}
