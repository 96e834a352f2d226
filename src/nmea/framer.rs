// src/nmea/framer.rs
//! Sentence framing for a raw NMEA byte stream

/// Longest line the accumulator holds, `\n` excluded.
pub const MAX_SENTENCE_LEN: usize = 160;

/// Reassembles newline-terminated NMEA sentences from arbitrary read
/// chunks.
///
/// A complete sentence must start with `$` and end with `\r` before the
/// `\n`; a trailing `*XY` checksum is stripped without being verified.
/// When a line outgrows the accumulator it is discarded together with
/// everything up to the next terminator, so a truncated tail never parses
/// as a sentence of its own.
#[derive(Debug)]
pub struct SentenceFramer {
    buffer: Vec<u8>,
    overflow: bool,
}

impl SentenceFramer {
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(MAX_SENTENCE_LEN),
            overflow: false,
        }
    }

    /// Feed one read chunk. Returns the bodies of the sentences it closed,
    /// in arrival order, with the leading `$` and the `\r`/checksum tail
    /// stripped.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut bodies = Vec::new();
        for &b in bytes {
            if b == b'\n' {
                if !self.overflow {
                    if let Some(body) = strip(&self.buffer) {
                        bodies.push(body);
                    }
                }
                self.buffer.clear();
                self.overflow = false;
            } else {
                self.buffer.push(b);
                if self.buffer.len() == MAX_SENTENCE_LEN {
                    self.overflow = true;
                    self.buffer.clear();
                }
            }
        }
        bodies
    }
}

impl Default for SentenceFramer {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate one accumulated line and cut it down to the sentence body.
fn strip(line: &[u8]) -> Option<String> {
    if line.first() != Some(&b'$') || line.last() != Some(&b'\r') {
        return None;
    }
    let body = if line.len() > 3 && line[line.len() - 4] == b'*' {
        // TODO: verify the checksum instead of dropping it
        &line[1..line.len() - 4]
    } else {
        &line[1..line.len() - 1]
    };
    std::str::from_utf8(body).ok().map(str::to_owned)
}
